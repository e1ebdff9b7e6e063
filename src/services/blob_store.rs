//! Blob storage for uploaded images.
//!
//! The pipeline only depends on the [`BlobStore`] trait. [`LocalBlobStore`]
//! keeps payloads on local disk below `base_path/{destination}/` and hands out
//! URLs below a configurable public base URL; a CDN-backed store can replace it
//! without touching the pipeline.

use async_trait::async_trait;
use bytes::Bytes;
use std::{
    io::{self, ErrorKind},
    path::{Path, PathBuf},
};
use thiserror::Error;
use tokio::{
    fs::{self, File},
    io::AsyncWriteExt,
};
use tracing::debug;
use uuid::Uuid;

const MAX_KEY_LEN: usize = 1024;

/// One file part of a submission, fully buffered.
#[derive(Clone, Debug)]
pub struct ImageFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub data: Bytes,
}

impl ImageFile {
    pub fn new(file_name: impl Into<String>, content_type: Option<&str>, data: Bytes) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.map(str::to_string),
            data,
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[derive(Debug, Error)]
pub enum BlobError {
    #[error("invalid blob key `{0}`")]
    InvalidKey(String),
    #[error("url `{0}` is not served by this store")]
    ForeignUrl(String),
    #[error("blob `{0}` not found")]
    NotFound(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type BlobResult<T> = Result<T, BlobError>;

/// External object storage, as seen by the artwork pipeline.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `file` below `destination` and return its public URL.
    async fn upload(&self, file: &ImageFile, destination: &str) -> BlobResult<String>;

    /// Remove a blob previously returned by [`BlobStore::upload`].
    async fn delete(&self, url: &str) -> BlobResult<()>;
}

/// Disk-backed blob store.
#[derive(Clone, Debug)]
pub struct LocalBlobStore {
    base_path: PathBuf,
    public_base_url: String,
}

impl LocalBlobStore {
    pub fn new(base_path: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            base_path: base_path.into(),
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Rejects keys that are empty, absolute, or able to climb out of `base_path`.
    fn ensure_key_safe(key: &str) -> BlobResult<()> {
        let bad = key.is_empty()
            || key.len() > MAX_KEY_LEN
            || key.starts_with('/')
            || key.contains("..")
            || key
                .bytes()
                .any(|b| b.is_ascii_control() || b == b'\\' || b == b'\0');
        if bad {
            return Err(BlobError::InvalidKey(key.to_string()));
        }
        Ok(())
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let mut path = self.base_path.clone();
        path.push(key);
        path
    }

    fn key_for_url<'a>(&self, url: &'a str) -> BlobResult<&'a str> {
        url.strip_prefix(&self.public_base_url)
            .and_then(|rest| rest.strip_prefix('/'))
            .ok_or_else(|| BlobError::ForeignUrl(url.to_string()))
    }

    /// Open a stored blob for streaming, along with its guessed content type.
    pub async fn open(&self, key: &str) -> BlobResult<(File, &'static str)> {
        Self::ensure_key_safe(key)?;
        let file = File::open(self.path_for(key)).await.map_err(|err| {
            if err.kind() == ErrorKind::NotFound {
                BlobError::NotFound(key.to_string())
            } else {
                BlobError::Io(err)
            }
        })?;
        Ok((file, content_type_for(key)))
    }

    /// Recursively remove empty directories up to the store root.
    async fn prune_empty_dirs(&self, start: &Path) {
        let mut current = start.to_path_buf();
        while current.starts_with(&self.base_path) && current != self.base_path {
            match fs::remove_dir(&current).await {
                Ok(_) => match current.parent() {
                    Some(parent) => current = parent.to_path_buf(),
                    None => break,
                },
                Err(err) if err.kind() == ErrorKind::NotFound => break,
                Err(err) if err.kind() == ErrorKind::DirectoryNotEmpty => break,
                Err(err) => {
                    debug!("failed to prune directory {}: {}", current.display(), err);
                    break;
                }
            }
        }
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    /// Writes to a temporary file, fsyncs, then renames into place so readers
    /// never observe a partial image.
    async fn upload(&self, file: &ImageFile, destination: &str) -> BlobResult<String> {
        let key = format!(
            "{}/{}.{}",
            destination.trim_matches('/'),
            Uuid::new_v4(),
            extension_for(file)
        );
        Self::ensure_key_safe(&key)?;

        let final_path = self.path_for(&key);
        let parent = final_path.parent().map(Path::to_path_buf).ok_or_else(|| {
            BlobError::Io(io::Error::new(
                ErrorKind::Other,
                "blob path missing parent directory",
            ))
        })?;
        fs::create_dir_all(&parent).await?;

        let tmp_path = parent.join(format!(".tmp-{}", Uuid::new_v4()));
        if let Err(err) = write_synced(&tmp_path, &file.data).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(BlobError::Io(err));
        }
        if let Err(err) = fs::rename(&tmp_path, &final_path).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(BlobError::Io(err));
        }

        debug!(key = %key, bytes = file.len(), "stored blob");
        Ok(format!("{}/{}", self.public_base_url, key))
    }

    async fn delete(&self, url: &str) -> BlobResult<()> {
        let key = self.key_for_url(url)?;
        Self::ensure_key_safe(key)?;

        let path = self.path_for(key);
        match fs::remove_file(&path).await {
            Ok(_) => debug!("removed blob {}", path.display()),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(BlobError::NotFound(key.to_string()));
            }
            Err(err) => return Err(BlobError::Io(err)),
        }

        if let Some(parent) = path.parent() {
            self.prune_empty_dirs(parent).await;
        }
        Ok(())
    }
}

async fn write_synced(path: &Path, data: &Bytes) -> io::Result<()> {
    let mut out = File::create(path).await?;
    out.write_all(data).await?;
    out.flush().await?;
    out.sync_all().await
}

/// File extension for the stored object, taken from the declared content type.
///
/// The submitted file name never decides it. Anything that is not a plain
/// raster format is stored as `bin` and later served as an opaque download.
fn extension_for(file: &ImageFile) -> &'static str {
    let essence = file
        .content_type
        .as_deref()
        .and_then(|ct| ct.split(';').next())
        .map(|ct| ct.trim().to_ascii_lowercase());
    match essence.as_deref() {
        Some("image/jpeg") | Some("image/jpg") => "jpg",
        Some("image/png") => "png",
        Some("image/gif") => "gif",
        Some("image/webp") => "webp",
        Some("image/avif") => "avif",
        Some("image/tiff") => "tiff",
        _ => "bin",
    }
}

/// Content type served for a stored key. Only the extensions written by
/// [`extension_for`] map to an image type.
fn content_type_for(key: &str) -> &'static str {
    let ext = Path::new(key)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("avif") => "image/avif",
        Some("tif") | Some("tiff") => "image/tiff",
        _ => "application/octet-stream",
    }
}
