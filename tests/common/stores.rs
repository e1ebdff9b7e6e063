//! Blob stores with scripted behaviour.

use artworks_api::services::blob_store::{BlobError, BlobResult, BlobStore, ImageFile};
use async_trait::async_trait;
use std::{
    sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

/// Accepts everything and records each upload.
///
/// Files whose name starts with `slow` sleep before returning, so they finish
/// after the files submitted behind them.
#[derive(Default)]
#[allow(dead_code)]
pub struct RecordingStore {
    uploads: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

#[allow(dead_code)]
impl RecordingStore {
    pub fn upload_count(&self) -> usize {
        self.uploads.lock().unwrap().len()
    }

    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BlobStore for RecordingStore {
    async fn upload(&self, file: &ImageFile, destination: &str) -> BlobResult<String> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        if file.file_name.starts_with("slow") {
            tokio::time::sleep(Duration::from_millis(50)).await;
        } else {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let url = format!("mem://{}/{}", destination, file.file_name);
        self.uploads.lock().unwrap().push(url.clone());
        Ok(url)
    }

    async fn delete(&self, _url: &str) -> BlobResult<()> {
        Ok(())
    }
}

/// Fails every upload with a transport error.
#[allow(dead_code)]
pub struct UnreachableStore;

#[async_trait]
impl BlobStore for UnreachableStore {
    async fn upload(&self, _file: &ImageFile, _destination: &str) -> BlobResult<String> {
        Err(BlobError::Io(std::io::Error::other("storage backend unreachable")))
    }

    async fn delete(&self, _url: &str) -> BlobResult<()> {
        Ok(())
    }
}

/// Panics inside the upload worker.
#[allow(dead_code)]
pub struct PanickingStore;

#[async_trait]
impl BlobStore for PanickingStore {
    async fn upload(&self, _file: &ImageFile, _destination: &str) -> BlobResult<String> {
        panic!("blob client crashed");
    }

    async fn delete(&self, _url: &str) -> BlobResult<()> {
        Ok(())
    }
}
