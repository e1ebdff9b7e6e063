//! Turns a multipart artwork submission into an [`ArtworkCreationRequest`].
//!
//! Optional fields that are absent default to their zero value. Numbers and
//! booleans that do not parse also fall back to the default instead of
//! failing the request.

use crate::{
    errors::{PipelineError, PipelineResult},
    services::blob_store::ImageFile,
};
use axum::extract::Multipart;
use std::{collections::HashMap, str::FromStr};
use tracing::debug;

/// Multipart field that carries image file parts.
pub const IMAGES_FIELD: &str = "images";

/// One custom attribute as submitted: raw id plus value.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AttributeInput {
    pub id: String,
    pub value: String,
}

/// Text fields and image parts of a submission, in arrival order.
#[derive(Debug, Default)]
pub struct RawSubmission {
    fields: HashMap<String, Vec<String>>,
    images: Vec<ImageFile>,
}

impl RawSubmission {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_field(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields
            .entry(name.into())
            .or_default()
            .push(value.into());
    }

    pub fn push_image(&mut self, image: ImageFile) {
        self.images.push(image);
    }

    /// First value submitted under `name`.
    fn first(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// Drain an axum multipart body. File parts are only accepted under
    /// [`IMAGES_FIELD`]; every other part must be UTF-8 text.
    pub async fn from_multipart(mut multipart: Multipart) -> PipelineResult<Self> {
        let mut raw = Self::new();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|err| PipelineError::malformed("form", err.body_text()))?
        {
            let name = field.name().unwrap_or_default().to_string();
            if name == IMAGES_FIELD {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let content_type = field.content_type().map(str::to_string);
                let data = field
                    .bytes()
                    .await
                    .map_err(|err| PipelineError::malformed(&name, err.body_text()))?;
                raw.push_image(ImageFile {
                    file_name,
                    content_type,
                    data,
                });
            } else if field.file_name().is_some() {
                debug!(field = %name, "ignoring unexpected file part");
            } else {
                let value = field
                    .text()
                    .await
                    .map_err(|err| PipelineError::malformed(&name, err.body_text()))?;
                raw.push_field(name, value);
            }
        }
        Ok(raw)
    }
}

/// A normalized, not yet validated, artwork submission.
///
/// Identifier fields are kept as submitted; they are checked by the validator
/// and by the fan-out units.
#[derive(Clone, Debug, Default)]
pub struct ArtworkCreationRequest {
    pub title: String,
    pub description: String,
    pub artwork_type: String,
    pub categories: Vec<String>,
    pub tags: Vec<String>,
    pub collection_id: String,
    pub dimensions: String,
    pub weight: f64,
    pub is_framed: bool,
    pub condition: String,
    pub creation_date: String,
    pub medium_id: String,
    pub technique_id: String,
    pub price: f64,
    pub is_for_sale: bool,
    pub license_type: String,
    pub license_details: String,
    pub edition_number: i64,
    pub total_editions: i64,
    pub attributes: Vec<AttributeInput>,
    pub images: Vec<ImageFile>,
}

impl ArtworkCreationRequest {
    pub fn from_submission(raw: RawSubmission) -> PipelineResult<Self> {
        let text = |name: &str| raw.first(name).unwrap_or_default().to_string();

        let mut req = Self {
            title: text("title"),
            description: text("description"),
            artwork_type: text("type"),
            collection_id: text("collection_id"),
            dimensions: text("dimensions"),
            condition: text("condition"),
            creation_date: text("creation_date"),
            medium_id: text("medium_id"),
            technique_id: text("technique_id"),
            license_type: text("license_type"),
            license_details: text("license_details"),
            categories: split_ids(raw.first("categories")),
            tags: split_ids(raw.first("tags")),
            weight: lenient_number(&raw, "weight"),
            price: lenient_number(&raw, "price"),
            edition_number: lenient_number(&raw, "edition_number"),
            total_editions: lenient_number(&raw, "total_editions"),
            is_for_sale: lenient_bool(&raw, "is_for_sale"),
            is_framed: lenient_bool(&raw, "is_framed"),
            attributes: indexed_attributes(&raw),
            images: Vec::new(),
        };
        req.images = raw.images;
        Ok(req)
    }

    /// Edition numbering is only recorded when both numbers are positive.
    pub fn has_edition(&self) -> bool {
        self.edition_number > 0 && self.total_editions > 0
    }
}

/// Split a comma-delimited id list. Blank entries are dropped, so an empty
/// field yields an empty list.
fn split_ids(value: Option<&str>) -> Vec<String> {
    value
        .map(|v| {
            v.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn lenient_number<T>(raw: &RawSubmission, name: &str) -> T
where
    T: FromStr + Default,
{
    match raw.first(name) {
        Some(value) => value.trim().parse().unwrap_or_else(|_| {
            debug!(field = name, value, "unparseable number, using default");
            T::default()
        }),
        None => T::default(),
    }
}

fn lenient_bool(raw: &RawSubmission, name: &str) -> bool {
    raw.first(name)
        .map(|value| value.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

/// Collect `attributes[i][id]` / `attributes[i][value]` for i = 0, 1, ...
/// stopping at the first index without an id.
fn indexed_attributes(raw: &RawSubmission) -> Vec<AttributeInput> {
    let mut attributes = Vec::new();
    for i in 0.. {
        let Some(id) = raw.first(&format!("attributes[{i}][id]")) else {
            break;
        };
        let value = raw
            .first(&format!("attributes[{i}][value]"))
            .unwrap_or_default();
        attributes.push(AttributeInput {
            id: id.to_string(),
            value: value.to_string(),
        });
    }
    attributes
}
