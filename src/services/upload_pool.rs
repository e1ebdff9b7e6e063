//! Bounded worker pool that validates and uploads submitted images.
//!
//! All jobs are queued up front and the queue is closed; a fixed number of
//! workers drain it and report `(index, outcome)` on a results channel sized to
//! the number of images. Once every worker has exited the results are put back
//! into submission order, which is what makes "the first image is primary"
//! deterministic regardless of which upload finished first.

use crate::{
    errors::{PipelineError, PipelineResult},
    models::artwork::ArtworkImage,
    services::blob_store::{BlobStore, ImageFile},
};
use chrono::Utc;
use futures::future::join_all;
use std::{num::NonZeroUsize, sync::Arc, thread};
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, warn};
use uuid::Uuid;

/// Limits applied to every image in a submission.
#[derive(Clone, Copy, Debug)]
pub struct UploadPolicy {
    pub max_image_bytes: usize,
    pub max_workers: usize,
}

/// Outcome of one image, tagged with its submission index.
#[derive(Debug)]
pub struct UploadResult {
    pub index: usize,
    pub outcome: PipelineResult<String>,
}

struct Job {
    index: usize,
    file: ImageFile,
}

/// `min(max_workers, available parallelism)`, never more than there are jobs.
pub fn worker_count(max_workers: usize, jobs: usize) -> usize {
    let cpus = thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1);
    max_workers.min(cpus).min(jobs).max(1)
}

/// Blob-store folder for an artwork's images.
pub fn destination_for(artwork_id: Uuid) -> String {
    format!("artworks/{}", artwork_id)
}

/// Reject empty files, files over the size ceiling, and non-image content.
pub fn validate_image(file: &ImageFile, max_bytes: usize) -> PipelineResult<()> {
    if file.is_empty() {
        return Err(PipelineError::UploadRejected(format!(
            "image `{}` is empty",
            file.file_name
        )));
    }
    if file.len() > max_bytes {
        return Err(PipelineError::UploadRejected(format!(
            "image too large, maximum size is {}",
            human_size(max_bytes)
        )));
    }
    let is_image = file
        .content_type
        .as_deref()
        .is_some_and(|ct| ct.starts_with("image/"));
    if !is_image {
        return Err(PipelineError::UploadRejected(
            "only image files are allowed".into(),
        ));
    }
    Ok(())
}

/// Upload `files` and return one URL per file, in submission order.
///
/// Fails with the error of the lowest-indexed image that failed. Images that
/// were uploaded before the failure stay in the blob store.
pub async fn upload_images(
    store: Arc<dyn BlobStore>,
    artwork_id: Uuid,
    files: Vec<ImageFile>,
    policy: UploadPolicy,
) -> PipelineResult<Vec<String>> {
    let total = files.len();
    if total == 0 {
        return Ok(Vec::new());
    }

    let (job_tx, job_rx) = mpsc::channel::<Job>(total);
    for (index, file) in files.into_iter().enumerate() {
        job_tx
            .send(Job { index, file })
            .await
            .map_err(|_| PipelineError::Internal("upload queue closed early".into()))?;
    }
    drop(job_tx);

    let job_rx = Arc::new(Mutex::new(job_rx));
    let (result_tx, mut result_rx) = mpsc::channel::<UploadResult>(total);
    let destination = Arc::new(destination_for(artwork_id));
    let workers = worker_count(policy.max_workers, total);
    debug!(%artwork_id, images = total, workers, "starting image upload pool");

    let handles = (0..workers)
        .map(|worker| {
            let job_rx = Arc::clone(&job_rx);
            let result_tx = result_tx.clone();
            let store = Arc::clone(&store);
            let destination = Arc::clone(&destination);
            tokio::spawn(async move {
                loop {
                    let next = job_rx.lock().await.recv().await;
                    let Some(Job { index, file }) = next else {
                        break;
                    };
                    let outcome = upload_one(store.as_ref(), &file, &destination, policy).await;
                    debug!(worker, index, ok = outcome.is_ok(), "image job finished");
                    if result_tx.send(UploadResult { index, outcome }).await.is_err() {
                        break;
                    }
                }
            })
        })
        .collect::<Vec<_>>();
    drop(result_tx);

    for joined in join_all(handles).await {
        if let Err(err) = joined {
            if err.is_panic() {
                // Surface the panic to the caller's task; the transaction
                // boundary turns it into a rollback.
                std::panic::resume_unwind(err.into_panic());
            }
            return Err(PipelineError::Internal(format!(
                "image worker did not finish: {}",
                err
            )));
        }
    }

    let mut results = Vec::with_capacity(total);
    while let Some(result) = result_rx.recv().await {
        results.push(result);
    }
    collect_in_order(results, total)
}

async fn upload_one(
    store: &dyn BlobStore,
    file: &ImageFile,
    destination: &str,
    policy: UploadPolicy,
) -> PipelineResult<String> {
    validate_image(file, policy.max_image_bytes)?;
    store.upload(file, destination).await.map_err(|err| {
        warn!(file = %file.file_name, error = %err, "image upload failed");
        PipelineError::StorageFailure(err.to_string())
    })
}

/// Sort results by submission index and fail on the first error.
pub fn collect_in_order(
    mut results: Vec<UploadResult>,
    expected: usize,
) -> PipelineResult<Vec<String>> {
    results.sort_by_key(|result| result.index);

    let mut urls = Vec::with_capacity(results.len());
    for result in results {
        urls.push(result.outcome?);
    }
    if urls.len() != expected {
        return Err(PipelineError::Internal(format!(
            "expected {} upload results, got {}",
            expected,
            urls.len()
        )));
    }
    Ok(urls)
}

/// Image rows for uploaded URLs; the image at index 0 is primary.
pub fn image_rows(artwork_id: Uuid, urls: Vec<String>) -> Vec<ArtworkImage> {
    let now = Utc::now();
    urls.into_iter()
        .enumerate()
        .map(|(index, image_url)| ArtworkImage {
            id: Uuid::new_v4(),
            artwork_id,
            image_url,
            is_primary: index == 0,
            position: index as i64,
            created_at: now,
        })
        .collect()
}

fn human_size(bytes: usize) -> String {
    if bytes >= 1 << 20 && bytes % (1 << 20) == 0 {
        format!("{}MB", bytes >> 20)
    } else if bytes >= 1 << 10 && bytes % (1 << 10) == 0 {
        format!("{}KB", bytes >> 10)
    } else {
        format!("{} bytes", bytes)
    }
}
