//! The artwork root entity, its enumerations, and its dependent rows.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::{fmt, str::FromStr};
use uuid::Uuid;

/// Declares a text-backed enumeration stored as its snake_case name.
///
/// Every enum gets `as_str`, `Display`, and a `FromStr` that rejects unknown
/// values with the list of accepted ones.
macro_rules! text_enum {
    (
        $(#[$meta:meta])*
        $name:ident { $($(#[$vmeta:meta])* $variant:ident => $text:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, sqlx::Type)]
        #[serde(rename_all = "snake_case")]
        #[sqlx(rename_all = "snake_case")]
        pub enum $name {
            $($(#[$vmeta])* $variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                match value {
                    $($text => Ok($name::$variant),)+
                    other => Err(format!(
                        "`{}` is not one of: {}",
                        other,
                        [$($text),+].join(", ")
                    )),
                }
            }
        }
    };
}

text_enum! {
    /// Moderation state of an artwork. New artworks always start `pending`.
    #[derive(Default)]
    ArtworkStatus {
        #[default]
        Pending => "pending",
        Approved => "approved",
        Rejected => "rejected",
    }
}

text_enum! {
    /// Broad classification of the work.
    #[derive(Default)]
    ArtworkType {
        #[default]
        Traditional => "traditional",
        Digital => "digital",
        Photography => "photography",
        MixedMedia => "mixed_media",
        Sculpture => "sculpture",
        Performance => "performance",
    }
}

text_enum! {
    /// Physical condition of the piece.
    #[derive(Default)]
    ConditionType {
        #[default]
        Pristine => "pristine",
        Excellent => "excellent",
        Good => "good",
        Acceptable => "acceptable",
        Restored => "restored",
        Damaged => "damaged",
    }
}

text_enum! {
    /// Licensing terms the owner offers.
    #[derive(Default)]
    LicenseType {
        #[default]
        AllRightsReserved => "all_rights_reserved",
        CreativeCommons => "creative_commons",
        PublicDomain => "public_domain",
        ExclusiveLicense => "exclusive_license",
        NonExclusiveLicense => "non_exclusive_license",
        Custom => "custom",
    }
}

text_enum! {
    /// Sale state of a single numbered edition.
    EditionStatus {
        Available => "available",
        Sold => "sold",
        Reserved => "reserved",
    }
}

/// A single artwork owned by the account that created it.
///
/// Dependent rows (images, editions, tag/category/attribute links) reference
/// it by `id` and are removed with it.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
pub struct Artwork {
    /// Generated identifier, shared by every dependent row.
    pub id: Uuid,

    /// Owning account.
    pub user_id: Uuid,

    /// Collection the artwork is filed under, if any. Always owned by `user_id`.
    pub collection_id: Option<Uuid>,

    pub title: String,
    pub description: String,

    /// Calendar date the work was made (`YYYY-MM-DD`).
    pub creation_date: Option<NaiveDate>,

    pub price: f64,
    pub is_for_sale: bool,
    pub status: ArtworkStatus,

    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub artwork_type: ArtworkType,

    pub dimensions: String,

    /// Weight in kilograms.
    pub weight: f64,
    pub is_framed: bool,
    pub condition: ConditionType,
    pub medium_id: Option<Uuid>,
    pub technique_id: Option<Uuid>,
    pub license_type: LicenseType,
    pub license_details: String,

    /// Public view counter, maintained outside the creation path.
    pub view_count: i64,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One stored image of an artwork.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
pub struct ArtworkImage {
    pub id: Uuid,
    pub artwork_id: Uuid,

    /// Public URL returned by the blob store.
    pub image_url: String,

    /// Exactly one image per artwork is primary: the first one submitted.
    pub is_primary: bool,

    /// Zero-based submission index.
    pub position: i64,
    pub created_at: DateTime<Utc>,
}

/// A numbered edition of a multiple (print, cast, ...).
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
pub struct Edition {
    pub id: Uuid,
    pub artwork_id: Uuid,
    pub edition_number: i64,
    pub total_editions: i64,
    pub status: EditionStatus,
    pub created_at: DateTime<Utc>,
}

/// Value of a custom attribute attached to an artwork.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
pub struct ArtworkAttribute {
    pub attribute_id: Uuid,
    pub value: String,
}

/// An artwork together with everything created alongside it.
#[derive(Serialize, Debug)]
pub struct ArtworkDetails {
    #[serde(flatten)]
    pub artwork: Artwork,
    pub images: Vec<ArtworkImage>,
    pub editions: Vec<Edition>,
    pub tag_ids: Vec<Uuid>,
    pub category_ids: Vec<Uuid>,
    pub attributes: Vec<ArtworkAttribute>,
}
