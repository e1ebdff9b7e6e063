//! Represents a collection, a named grouping of one owner's artworks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A collection of artworks.
///
/// Only the owning account may file artworks under a collection; the
/// creation pipeline checks this before opening a transaction.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
pub struct Collection {
    /// Unique identifier.
    pub id: Uuid,

    /// Account that owns the collection.
    pub user_id: Uuid,

    /// Display name.
    pub name: String,

    pub description: String,

    /// `draft`, `published` or `archived`.
    pub status: String,

    /// When the collection was created.
    pub created_at: DateTime<Utc>,
}
