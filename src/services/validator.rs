//! Checks a normalized request before any write happens.

use crate::{
    errors::{PipelineError, PipelineResult},
    models::{
        artwork::{ArtworkType, ConditionType, LicenseType},
        collection::Collection,
    },
    services::normalizer::ArtworkCreationRequest,
};
use chrono::NaiveDate;
use sqlx::SqlitePool;
use std::str::FromStr;
use uuid::Uuid;

/// Calendar format accepted for `creation_date`.
pub const CREATION_DATE_FORMAT: &str = "%Y-%m-%d";

/// A request whose scalar fields are typed and whose references are
/// well-formed. Tag, category and attribute ids are still raw: each fan-out
/// unit parses its own list.
#[derive(Clone, Debug)]
pub struct ValidatedRequest {
    pub request: ArtworkCreationRequest,
    pub artwork_type: ArtworkType,
    pub condition: ConditionType,
    pub license_type: LicenseType,
    pub creation_date: Option<NaiveDate>,
    pub collection_id: Option<Uuid>,
    pub medium_id: Option<Uuid>,
    pub technique_id: Option<Uuid>,
}

/// Field-level checks that need no database access.
pub fn validate_fields(request: ArtworkCreationRequest) -> PipelineResult<ValidatedRequest> {
    if request.title.trim().is_empty() {
        return Err(PipelineError::ValidationFailed("title is required".into()));
    }
    if request.artwork_type.trim().is_empty() {
        return Err(PipelineError::ValidationFailed("type is required".into()));
    }

    let artwork_type = parse_enum::<ArtworkType>("type", &request.artwork_type)?;
    let condition = parse_enum::<ConditionType>("condition", &request.condition)?;
    let license_type = parse_enum::<LicenseType>("license_type", &request.license_type)?;

    let creation_date = if request.creation_date.is_empty() {
        None
    } else {
        Some(parse_creation_date(&request.creation_date)?)
    };

    let collection_id = parse_optional_id("collection", &request.collection_id)?;
    let medium_id = parse_optional_id("medium", &request.medium_id)?;
    let technique_id = parse_optional_id("technique", &request.technique_id)?;

    Ok(ValidatedRequest {
        request,
        artwork_type,
        condition,
        license_type,
        creation_date,
        collection_id,
        medium_id,
        technique_id,
    })
}

/// Parse a zero-padded `YYYY-MM-DD` date. chrono alone also takes `2024-1-5`.
fn parse_creation_date(value: &str) -> PipelineResult<NaiveDate> {
    let invalid =
        || PipelineError::ValidationFailed("invalid creation date format, use YYYY-MM-DD".into());
    let padded = value.len() == 10
        && value.bytes().enumerate().all(|(i, b)| match i {
            4 | 7 => b == b'-',
            _ => b.is_ascii_digit(),
        });
    if !padded {
        return Err(invalid());
    }
    NaiveDate::parse_from_str(value, CREATION_DATE_FORMAT).map_err(|_| invalid())
}

/// Confirm the caller owns the referenced collection.
///
/// A collection that does not exist and one owned by someone else produce the
/// same `ReferenceNotOwned` error.
pub async fn ensure_collection_owned(
    db: &SqlitePool,
    collection_id: Option<Uuid>,
    caller: Uuid,
) -> PipelineResult<Option<Collection>> {
    let Some(collection_id) = collection_id else {
        return Ok(None);
    };

    let collection = sqlx::query_as::<_, Collection>(
        "SELECT id, user_id, name, description, status, created_at
         FROM collections WHERE id = ? AND user_id = ?",
    )
    .bind(collection_id)
    .bind(caller)
    .fetch_optional(db)
    .await?;

    match collection {
        Some(collection) => Ok(Some(collection)),
        None => Err(PipelineError::ReferenceNotOwned),
    }
}

/// Empty means "use the default"; anything else must be a known value.
fn parse_enum<T>(field: &str, value: &str) -> PipelineResult<T>
where
    T: FromStr<Err = String> + Default,
{
    if value.is_empty() {
        return Ok(T::default());
    }
    value
        .parse()
        .map_err(|reason| PipelineError::ValidationFailed(format!("invalid {field}: {reason}")))
}

fn parse_optional_id(kind: &'static str, value: &str) -> PipelineResult<Option<Uuid>> {
    if value.is_empty() {
        return Ok(None);
    }
    Uuid::parse_str(value)
        .map(Some)
        .map_err(|_| PipelineError::invalid_reference(kind, value))
}
