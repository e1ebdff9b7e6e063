//! Caller identity.
//!
//! Authentication happens upstream; by the time a request reaches this
//! service the authenticated user id is carried in the `x-user-id` header.

use crate::errors::AppError;
use axum::{extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

pub const CALLER_HEADER: &str = "x-user-id";

/// The authenticated user making the request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Caller(pub Uuid);

impl Caller {
    pub fn from_parts(parts: &Parts) -> Result<Self, AppError> {
        let value = parts
            .headers
            .get(CALLER_HEADER)
            .ok_or_else(|| AppError::unauthorized("authentication required"))?;
        value
            .to_str()
            .ok()
            .and_then(|raw| Uuid::parse_str(raw.trim()).ok())
            .map(Caller)
            .ok_or_else(|| AppError::unauthorized("invalid user id"))
    }
}

impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Self::from_parts(parts)
    }
}
