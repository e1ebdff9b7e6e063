//! Core data models for the artwork service.
//!
//! These entities map to database tables via `sqlx::FromRow` and serialize
//! as JSON via `serde`.

pub mod artwork;
pub mod collection;
