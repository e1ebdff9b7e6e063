//! ArtworkService: creates an artwork and everything attached to it as one
//! all-or-nothing unit.
//!
//! ## Pipeline
//! 1. Field validation and the collection ownership check run before any
//!    transaction exists.
//! 2. A transaction is opened and the root `artworks` row is written.
//! 3. One task per non-empty dependent collection (editions, tags,
//!    categories, attributes, images) is spawned. Every task writes through the
//!    same transaction handle; none of them commits.
//! 4. The coordinator waits for **every** task, even after one has failed, and
//!    only then reads the report channel. The first reported error decides the
//!    rollback. No task is cancelled early, and none holds the transaction
//!    once the coordinator takes it back.
//! 5. Commit if every task succeeded, roll back otherwise.
//!
//! Images uploaded to the blob store before a rollback are not removed.

use crate::{
    errors::{PipelineError, PipelineResult},
    models::artwork::{
        Artwork, ArtworkAttribute, ArtworkDetails, ArtworkStatus, Edition, EditionStatus,
    },
    services::{
        blob_store::{BlobStore, ImageFile},
        error_sink::ErrorSink,
        normalizer::{ArtworkCreationRequest, AttributeInput},
        repository::{self, LinkTable},
        upload_pool::{self, UploadPolicy},
        validator::{self, ValidatedRequest},
    },
};
use chrono::Utc;
use futures::{
    FutureExt,
    future::{BoxFuture, join_all},
};
use sqlx::{Sqlite, SqlitePool, Transaction};
use std::{any::Any, fmt, panic::AssertUnwindSafe, sync::Arc};
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// One transaction shared by every fan-out unit. The mutex makes the engine's
/// one-writer-per-connection rule explicit.
pub type SharedTx = Arc<Mutex<Transaction<'static, Sqlite>>>;

/// Lifecycle of the creation transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TxState {
    Open,
    AllUnitsSucceeded,
    Committing,
    Committed,
    AnyUnitFailed,
    ValidationFailed,
    PanicRecovered,
    RollingBack,
    RolledBack,
}

/// Dependent collection handled by one fan-out unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnitKind {
    Editions,
    Tags,
    Categories,
    Attributes,
    Images,
}

impl fmt::Display for UnitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            UnitKind::Editions => "editions",
            UnitKind::Tags => "tags",
            UnitKind::Categories => "categories",
            UnitKind::Attributes => "attributes",
            UnitKind::Images => "images",
        })
    }
}

/// What a unit sends back on the report channel.
#[derive(Debug)]
struct UnitReport {
    unit: UnitKind,
    result: PipelineResult<()>,
    panicked: bool,
}

/// Why the fan-out did not succeed, and which rollback state it leads to.
#[derive(Debug)]
struct FanOutFailure {
    error: PipelineError,
    cause: TxState,
}

/// Owns the transaction from the root write to commit or rollback.
struct TransactionCoordinator {
    tx: SharedTx,
    state: TxState,
    artwork_id: Uuid,
}

impl TransactionCoordinator {
    async fn begin(db: &SqlitePool, artwork_id: Uuid) -> PipelineResult<Self> {
        let tx = db.begin().await?;
        debug!(%artwork_id, "transaction open");
        Ok(Self {
            tx: Arc::new(Mutex::new(tx)),
            state: TxState::Open,
            artwork_id,
        })
    }

    fn handle(&self) -> SharedTx {
        Arc::clone(&self.tx)
    }

    fn advance(&mut self, next: TxState) {
        debug!(artwork_id = %self.artwork_id, from = ?self.state, to = ?next, "transaction state");
        self.state = next;
    }

    /// Recover sole ownership of the transaction. Every unit has been joined
    /// by the time this runs, so no other handle can remain.
    fn into_transaction(self) -> PipelineResult<Transaction<'static, Sqlite>> {
        Arc::try_unwrap(self.tx)
            .map(Mutex::into_inner)
            .map_err(|_| PipelineError::Internal("transaction still shared after fan-in".into()))
    }

    async fn commit(mut self) -> PipelineResult<TxState> {
        self.advance(TxState::AllUnitsSucceeded);
        self.advance(TxState::Committing);
        let artwork_id = self.artwork_id;
        let tx = self.into_transaction()?;
        tx.commit().await.map_err(|err| {
            warn!(%artwork_id, error = %err, "commit failed");
            PipelineError::PersistenceFailure(err)
        })?;
        debug!(%artwork_id, to = ?TxState::Committed, "transaction state");
        Ok(TxState::Committed)
    }

    async fn rollback(mut self, cause: TxState) -> TxState {
        self.advance(cause);
        self.advance(TxState::RollingBack);
        let artwork_id = self.artwork_id;
        match self.into_transaction() {
            Ok(tx) => {
                if let Err(err) = tx.rollback().await {
                    warn!(%artwork_id, error = %err, "rollback failed");
                }
            }
            // Dropping the last handle rolls the transaction back.
            Err(err) => warn!(%artwork_id, error = %err, "rolling back on drop"),
        }
        debug!(%artwork_id, to = ?TxState::RolledBack, "transaction state");
        TxState::RolledBack
    }
}

/// Creates and reads artworks.
#[derive(Clone)]
pub struct ArtworkService {
    /// Shared SQLite connection pool.
    pub db: Arc<SqlitePool>,

    /// Where image payloads go.
    pub blobs: Arc<dyn BlobStore>,

    /// Receives unexpected (server-side) failures.
    pub sink: Arc<dyn ErrorSink>,

    pub upload_policy: UploadPolicy,
}

impl ArtworkService {
    pub fn new(
        db: Arc<SqlitePool>,
        blobs: Arc<dyn BlobStore>,
        sink: Arc<dyn ErrorSink>,
        upload_policy: UploadPolicy,
    ) -> Self {
        Self {
            db,
            blobs,
            sink,
            upload_policy,
        }
    }

    /// Create an artwork owned by `caller` from a normalized request.
    ///
    /// Returns the new artwork id. Calling this twice with the same input
    /// creates two artworks.
    pub async fn create_artwork(
        &self,
        caller: Uuid,
        request: ArtworkCreationRequest,
    ) -> PipelineResult<Uuid> {
        let result = self.run_pipeline(caller, request).await;
        if let Err(err) = &result {
            if err.is_unexpected() {
                self.sink.record("create_artwork", caller, err);
            }
        }
        result
    }

    async fn run_pipeline(
        &self,
        caller: Uuid,
        request: ArtworkCreationRequest,
    ) -> PipelineResult<Uuid> {
        let validated = validator::validate_fields(request)?;
        validator::ensure_collection_owned(&self.db, validated.collection_id, caller).await?;

        let artwork = build_artwork(caller, &validated);
        let artwork_id = artwork.id;
        let coordinator = TransactionCoordinator::begin(&self.db, artwork_id).await?;

        let root_write = {
            let mut tx = coordinator.tx.lock().await;
            repository::insert_artwork(&mut **tx, &artwork).await
        };
        if let Err(err) = root_write {
            warn!(%artwork_id, error = %err, "failed to create artwork row");
            coordinator.rollback(TxState::AnyUnitFailed).await;
            return Err(err.into());
        }

        let units = self.units(artwork_id, validated.request);
        match fan_out(coordinator.handle(), units).await {
            Ok(()) => {
                coordinator.commit().await?;
                info!(%artwork_id, %caller, "artwork created");
                Ok(artwork_id)
            }
            Err(FanOutFailure { error, cause }) => {
                warn!(%artwork_id, cause = ?cause, error = %error, "rolling back artwork");
                coordinator.rollback(cause).await;
                Err(error)
            }
        }
    }

    /// One unit per non-empty dependent collection.
    fn units(
        &self,
        artwork_id: Uuid,
        request: ArtworkCreationRequest,
    ) -> Vec<(UnitKind, Unit)> {
        let mut units: Vec<(UnitKind, Unit)> = Vec::new();

        if request.has_edition() {
            let (number, total) = (request.edition_number, request.total_editions);
            units.push((
                UnitKind::Editions,
                Box::new(move |tx| editions_unit(tx, artwork_id, number, total).boxed()),
            ));
        }
        if !request.tags.is_empty() {
            let tags = request.tags;
            units.push((
                UnitKind::Tags,
                Box::new(move |tx| {
                    links_unit(tx, artwork_id, LinkTable::Tags, "tag", tags).boxed()
                }),
            ));
        }
        if !request.categories.is_empty() {
            let categories = request.categories;
            units.push((
                UnitKind::Categories,
                Box::new(move |tx| {
                    links_unit(tx, artwork_id, LinkTable::Categories, "category", categories)
                        .boxed()
                }),
            ));
        }
        if !request.attributes.is_empty() {
            let attributes = request.attributes;
            units.push((
                UnitKind::Attributes,
                Box::new(move |tx| attributes_unit(tx, artwork_id, attributes).boxed()),
            ));
        }
        if !request.images.is_empty() {
            let images = request.images;
            let store = Arc::clone(&self.blobs);
            let policy = self.upload_policy;
            units.push((
                UnitKind::Images,
                Box::new(move |tx| images_unit(tx, store, artwork_id, images, policy).boxed()),
            ));
        }
        units
    }

    /// An artwork and its dependents, if it exists.
    pub async fn get_artwork(&self, id: Uuid) -> PipelineResult<Option<ArtworkDetails>> {
        Ok(repository::fetch_artwork(&self.db, id).await?)
    }

    /// Every artwork owned by `user_id`, newest first.
    pub async fn list_artworks(&self, user_id: Uuid) -> PipelineResult<Vec<Artwork>> {
        Ok(repository::list_artworks_for_user(&self.db, user_id).await?)
    }
}

/// Deferred unit of work, started once it is handed the shared transaction.
type Unit = Box<dyn FnOnce(SharedTx) -> BoxFuture<'static, PipelineResult<()>> + Send>;

/// Spawn every unit, wait for all of them, then drain the report channel.
async fn fan_out(tx: SharedTx, units: Vec<(UnitKind, Unit)>) -> Result<(), FanOutFailure> {
    if units.is_empty() {
        return Ok(());
    }

    let (report_tx, mut report_rx) = mpsc::channel::<UnitReport>(units.len());
    let handles = units
        .into_iter()
        .map(|(unit, start)| {
            let work = start(Arc::clone(&tx));
            let report_tx = report_tx.clone();
            let handle = tokio::spawn(async move {
                let (result, panicked) = match AssertUnwindSafe(work).catch_unwind().await {
                    Ok(result) => (result, false),
                    Err(payload) => (
                        Err(PipelineError::Internal(format!(
                            "{} unit panicked: {}",
                            unit,
                            panic_message(payload.as_ref())
                        ))),
                        true,
                    ),
                };
                // Capacity equals the number of units, so this never waits.
                let _ = report_tx
                    .send(UnitReport {
                        unit,
                        result,
                        panicked,
                    })
                    .await;
            });
            (unit, handle)
        })
        .collect::<Vec<_>>();
    drop(report_tx);
    drop(tx);

    let mut lost = Vec::new();
    let (kinds, handles): (Vec<_>, Vec<_>) = handles.into_iter().unzip();
    for (unit, joined) in kinds.into_iter().zip(join_all(handles).await) {
        if let Err(err) = joined {
            lost.push(FanOutFailure {
                error: PipelineError::Internal(format!("{} unit did not finish: {}", unit, err)),
                cause: if err.is_panic() {
                    TxState::PanicRecovered
                } else {
                    TxState::AnyUnitFailed
                },
            });
        }
    }

    let mut first_failure = None;
    while let Some(report) = report_rx.recv().await {
        match report.result {
            Ok(()) => debug!(unit = %report.unit, "unit succeeded"),
            Err(error) => {
                warn!(unit = %report.unit, error = %error, "unit failed");
                if first_failure.is_none() {
                    let cause = if report.panicked {
                        TxState::PanicRecovered
                    } else if error.is_unexpected() {
                        TxState::AnyUnitFailed
                    } else {
                        TxState::ValidationFailed
                    };
                    first_failure = Some(FanOutFailure { error, cause });
                }
            }
        }
    }

    match first_failure.or_else(|| lost.into_iter().next()) {
        Some(failure) => Err(failure),
        None => Ok(()),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn build_artwork(caller: Uuid, validated: &ValidatedRequest) -> Artwork {
    let req = &validated.request;
    let now = Utc::now();
    Artwork {
        id: Uuid::new_v4(),
        user_id: caller,
        collection_id: validated.collection_id,
        title: req.title.clone(),
        description: req.description.clone(),
        creation_date: validated.creation_date,
        price: req.price,
        is_for_sale: req.is_for_sale,
        status: ArtworkStatus::default(),
        artwork_type: validated.artwork_type,
        dimensions: req.dimensions.clone(),
        weight: req.weight,
        is_framed: req.is_framed,
        condition: validated.condition,
        medium_id: validated.medium_id,
        technique_id: validated.technique_id,
        license_type: validated.license_type,
        license_details: req.license_details.clone(),
        view_count: 0,
        created_at: now,
        updated_at: now,
    }
}

/// Parse every id or none: the first malformed one fails the whole list.
fn parse_refs(kind: &'static str, raw: &[String]) -> PipelineResult<Vec<Uuid>> {
    raw.iter()
        .map(|value| {
            Uuid::parse_str(value).map_err(|_| PipelineError::invalid_reference(kind, value))
        })
        .collect()
}

async fn editions_unit(
    tx: SharedTx,
    artwork_id: Uuid,
    edition_number: i64,
    total_editions: i64,
) -> PipelineResult<()> {
    let edition = Edition {
        id: Uuid::new_v4(),
        artwork_id,
        edition_number,
        total_editions,
        status: EditionStatus::Available,
        created_at: Utc::now(),
    };
    let mut tx = tx.lock().await;
    repository::insert_edition(&mut **tx, &edition).await?;
    Ok(())
}

async fn links_unit(
    tx: SharedTx,
    artwork_id: Uuid,
    table: LinkTable,
    kind: &'static str,
    raw_ids: Vec<String>,
) -> PipelineResult<()> {
    let ids = parse_refs(kind, &raw_ids)?;
    let mut tx = tx.lock().await;
    repository::insert_links(&mut **tx, table, artwork_id, &ids).await?;
    Ok(())
}

async fn attributes_unit(
    tx: SharedTx,
    artwork_id: Uuid,
    inputs: Vec<AttributeInput>,
) -> PipelineResult<()> {
    let attributes = inputs
        .into_iter()
        .map(|input| {
            Uuid::parse_str(&input.id)
                .map(|attribute_id| ArtworkAttribute {
                    attribute_id,
                    value: input.value,
                })
                .map_err(|_| PipelineError::invalid_reference("attribute", input.id.as_str()))
        })
        .collect::<PipelineResult<Vec<_>>>()?;
    let mut tx = tx.lock().await;
    repository::insert_attributes(&mut **tx, artwork_id, &attributes).await?;
    Ok(())
}

/// Uploads run without the transaction lock; only the final bulk insert
/// takes it.
async fn images_unit(
    tx: SharedTx,
    store: Arc<dyn BlobStore>,
    artwork_id: Uuid,
    images: Vec<ImageFile>,
    policy: UploadPolicy,
) -> PipelineResult<()> {
    let urls = upload_pool::upload_images(store, artwork_id, images, policy).await?;
    let rows = upload_pool::image_rows(artwork_id, urls);
    let mut tx = tx.lock().await;
    repository::insert_images(&mut **tx, &rows).await?;
    Ok(())
}
