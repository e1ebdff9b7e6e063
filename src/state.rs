use crate::services::{
    artwork_service::ArtworkService, blob_store::LocalBlobStore, rate_limiter::RateLimiter,
};
use sqlx::SqlitePool;
use std::sync::Arc;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub artworks: ArtworkService,

    /// Serves `/media` and backs the readiness disk check.
    pub media: Arc<LocalBlobStore>,

    pub rate_limiter: RateLimiter,
}

impl AppState {
    pub fn new(artworks: ArtworkService, media: Arc<LocalBlobStore>, rate_limiter: RateLimiter) -> Self {
        Self {
            artworks,
            media,
            rate_limiter,
        }
    }

    pub fn db(&self) -> &SqlitePool {
        &self.artworks.db
    }
}
