//! Database seeding, request builders and row counting.

use artworks_api::services::{
    blob_store::ImageFile,
    normalizer::ArtworkCreationRequest,
};
use bytes::Bytes;
use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

/// Tables that hang off an artwork.
#[allow(dead_code)]
pub const DEPENDENT_TABLES: [&str; 5] = [
    "artwork_tags",
    "artwork_categories",
    "artwork_attributes",
    "artwork_images",
    "editions",
];

#[allow(dead_code)]
pub async fn seed_user(pool: &SqlitePool) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO users (id, username, created_at) VALUES (?, ?, ?)")
        .bind(id)
        .bind(format!("user-{}", id))
        .bind(Utc::now())
        .execute(pool)
        .await
        .expect("Failed to seed user");
    id
}

#[allow(dead_code)]
pub async fn seed_collection(pool: &SqlitePool, owner: Uuid) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO collections (id, user_id, name, created_at) VALUES (?, ?, ?, ?)")
        .bind(id)
        .bind(owner)
        .bind("Landscapes")
        .bind(Utc::now())
        .execute(pool)
        .await
        .expect("Failed to seed collection");
    id
}

#[allow(dead_code)]
pub async fn count(pool: &SqlitePool, table: &str) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
        .fetch_one(pool)
        .await
        .expect("Failed to count rows")
}

/// Zero rows anywhere in the artwork tables.
#[allow(dead_code)]
pub async fn assert_nothing_persisted(pool: &SqlitePool) {
    assert_eq!(count(pool, "artworks").await, 0, "artworks");
    for table in DEPENDENT_TABLES {
        assert_eq!(count(pool, table).await, 0, "{}", table);
    }
}

/// Minimal valid request.
#[allow(dead_code)]
pub fn sunset() -> ArtworkCreationRequest {
    ArtworkCreationRequest {
        title: "Sunset".into(),
        artwork_type: "digital".into(),
        ..Default::default()
    }
}

#[allow(dead_code)]
pub fn png(name: &str, bytes: usize) -> ImageFile {
    ImageFile::new(name, Some("image/png"), Bytes::from(vec![0x89u8; bytes]))
}

/// Hand-built `multipart/form-data` body.
#[allow(dead_code)]
pub struct MultipartBody {
    boundary: String,
    buf: Vec<u8>,
}

#[allow(dead_code)]
impl MultipartBody {
    pub fn new() -> Self {
        Self {
            boundary: format!("artworks-test-{}", Uuid::new_v4().simple()),
            buf: Vec::new(),
        }
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.buf.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                self.boundary, name, value
            )
            .as_bytes(),
        );
        self
    }

    pub fn file(mut self, name: &str, file_name: &str, content_type: &str, data: &[u8]) -> Self {
        self.buf.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                self.boundary, name, file_name, content_type
            )
            .as_bytes(),
        );
        self.buf.extend_from_slice(data);
        self.buf.extend_from_slice(b"\r\n");
        self
    }

    /// `(content-type header, body)`
    pub fn finish(mut self) -> (String, Vec<u8>) {
        self.buf
            .extend_from_slice(format!("--{}--\r\n", self.boundary).as_bytes());
        (
            format!("multipart/form-data; boundary={}", self.boundary),
            self.buf,
        )
    }
}
