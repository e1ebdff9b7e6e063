//! Test application wiring.

use artworks_api::{
    db,
    routes::routes::routes,
    services::{
        artwork_service::ArtworkService,
        blob_store::{BlobStore, LocalBlobStore},
        rate_limiter::RateLimiter,
        upload_pool::UploadPolicy,
    },
    state::AppState,
};
use super::MemoryErrorSink;
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::Value;
use sqlx::SqlitePool;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;
use uuid::Uuid;

pub const MAX_IMAGE_BYTES: usize = 5 << 20;

/// Service, router and database over a temporary directory.
/// Note: #[allow(dead_code)] because each test file compiles common/ separately.
#[allow(dead_code)]
pub struct TestApp {
    pub pool: SqlitePool,
    pub service: ArtworkService,
    pub sink: Arc<MemoryErrorSink>,
    pub media: Arc<LocalBlobStore>,
    pub router: Router,
    _temp_dir: TempDir,
}

#[allow(dead_code)]
impl TestApp {
    /// Images go to `store`; `/media` serves from a local store that stays empty.
    pub async fn with_store(store: Arc<dyn BlobStore>, rate_per_minute: u32) -> Self {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
        let media = Arc::new(LocalBlobStore::new(
            temp_dir.path().join("media"),
            "http://localhost/media",
        ));
        Self::build(temp_dir, store, media, rate_per_minute).await
    }

    /// Images go to a local store that `/media` also serves.
    pub async fn with_local_store(rate_per_minute: u32) -> Self {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
        let media = Arc::new(LocalBlobStore::new(
            temp_dir.path().join("media"),
            "http://localhost/media",
        ));
        Self::build(temp_dir, media.clone(), media, rate_per_minute).await
    }

    async fn build(
        temp_dir: TempDir,
        store: Arc<dyn BlobStore>,
        media: Arc<LocalBlobStore>,
        rate_per_minute: u32,
    ) -> Self {
        let db_url = format!("sqlite://{}", temp_dir.path().join("artworks.db").display());
        let pool = db::connect(&db_url)
            .await
            .expect("Failed to open test database");
        db::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let sink = Arc::new(MemoryErrorSink::default());
        let service = ArtworkService::new(
            Arc::new(pool.clone()),
            store,
            sink.clone(),
            UploadPolicy {
                max_image_bytes: MAX_IMAGE_BYTES,
                max_workers: 4,
            },
        );
        let state = AppState::new(service.clone(), media.clone(), RateLimiter::new(rate_per_minute));
        let router = routes(state, MAX_IMAGE_BYTES * 16);

        Self {
            pool,
            service,
            sink,
            media,
            router,
            _temp_dir: temp_dir,
        }
    }

    /// Send a request and return status, headers and raw body.
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, headers, body.to_vec())
    }

    pub async fn get_json(&self, uri: &str, caller: Option<Uuid>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method("GET").uri(uri);
        if let Some(caller) = caller {
            builder = builder.header("x-user-id", caller.to_string());
        }
        let (status, _, body) = self.send(builder.body(Body::empty()).unwrap()).await;
        (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
    }

    /// POST a multipart submission to `/artworks`.
    pub async fn post_artwork(
        &self,
        caller: Option<Uuid>,
        form: super::MultipartBody,
    ) -> (StatusCode, axum::http::HeaderMap, Value) {
        let (content_type, body) = form.finish();
        let mut builder = Request::builder()
            .method("POST")
            .uri("/artworks")
            .header("content-type", content_type);
        if let Some(caller) = caller {
            builder = builder.header("x-user-id", caller.to_string());
        }
        let (status, headers, body) = self.send(builder.body(Body::from(body)).unwrap()).await;
        (
            status,
            headers,
            serde_json::from_slice(&body).unwrap_or(Value::Null),
        )
    }
}
