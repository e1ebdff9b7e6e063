//! End-to-end behaviour of artwork creation at the service boundary.

mod common;

use artworks_api::{
    errors::PipelineError,
    models::artwork::{
        ArtworkStatus, ArtworkType, ConditionType, EditionStatus, LicenseType,
    },
    services::normalizer::AttributeInput,
};
use common::*;
use std::sync::Arc;
use uuid::Uuid;

#[tokio::test]
async fn minimal_request_creates_only_the_root_row() {
    let app = TestApp::with_store(Arc::new(RecordingStore::default()), 0).await;
    let caller = seed_user(&app.pool).await;

    let id = app.service.create_artwork(caller, sunset()).await.unwrap();

    assert_eq!(count(&app.pool, "artworks").await, 1);
    for table in DEPENDENT_TABLES {
        assert_eq!(count(&app.pool, table).await, 0, "{}", table);
    }

    let details = app.service.get_artwork(id).await.unwrap().unwrap();
    let artwork = details.artwork;
    assert_eq!(artwork.user_id, caller);
    assert_eq!(artwork.title, "Sunset");
    assert_eq!(artwork.artwork_type, ArtworkType::Digital);
    assert_eq!(artwork.status, ArtworkStatus::Pending);
    assert_eq!(artwork.condition, ConditionType::Pristine);
    assert_eq!(artwork.license_type, LicenseType::AllRightsReserved);
    assert_eq!(artwork.view_count, 0);
}

#[tokio::test]
async fn tags_and_images_are_committed_together() {
    let store = Arc::new(RecordingStore::default());
    let app = TestApp::with_store(store.clone(), 0).await;
    let caller = seed_user(&app.pool).await;
    let tags = vec![Uuid::new_v4(), Uuid::new_v4()];

    let mut request = sunset();
    request.tags = tags.iter().map(Uuid::to_string).collect();
    request.images = vec![png("front.png", 64), png("back.png", 64)];

    let id = app.service.create_artwork(caller, request).await.unwrap();

    let details = app.service.get_artwork(id).await.unwrap().unwrap();
    assert_eq!(details.tag_ids, tags);
    assert_eq!(details.images.len(), 2);
    assert!(details.images[0].is_primary);
    assert!(!details.images[1].is_primary);
    assert_eq!(
        details.images[0].image_url,
        format!("mem://artworks/{}/front.png", id)
    );
    assert_eq!(store.upload_count(), 2);
}

#[tokio::test]
async fn one_bad_tag_rolls_back_everything_including_the_root() {
    let store = Arc::new(RecordingStore::default());
    let app = TestApp::with_store(store.clone(), 0).await;
    let caller = seed_user(&app.pool).await;

    let mut request = sunset();
    request.tags = vec![Uuid::new_v4().to_string(), "not-a-uuid".into()];
    request.categories = vec![Uuid::new_v4().to_string()];
    request.images = vec![png("a.png", 16), png("b.png", 16)];

    let err = app.service.create_artwork(caller, request).await.unwrap_err();
    assert!(matches!(
        err,
        PipelineError::InvalidReference { kind: "tag", ref value } if value == "not-a-uuid"
    ));

    assert_nothing_persisted(&app.pool).await;
    // The image unit ran to completion before the rollback.
    assert_eq!(store.upload_count(), 2);
    // Client mistakes are not reported as unexpected failures.
    assert!(app.sink.entries().is_empty());
}

#[tokio::test]
async fn collection_owned_by_someone_else_is_rejected_before_any_work() {
    let store = Arc::new(RecordingStore::default());
    let app = TestApp::with_store(store.clone(), 0).await;
    let owner = seed_user(&app.pool).await;
    let intruder = seed_user(&app.pool).await;
    let collection = seed_collection(&app.pool, owner).await;

    let mut request = sunset();
    request.collection_id = collection.to_string();
    request.images = vec![png("a.png", 16)];

    let err = app
        .service
        .create_artwork(intruder, request)
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::ReferenceNotOwned));
    assert_nothing_persisted(&app.pool).await;
    assert_eq!(store.upload_count(), 0);
}

#[tokio::test]
async fn owned_collection_is_linked() {
    let app = TestApp::with_store(Arc::new(RecordingStore::default()), 0).await;
    let owner = seed_user(&app.pool).await;
    let collection = seed_collection(&app.pool, owner).await;

    let mut request = sunset();
    request.collection_id = collection.to_string();
    let id = app.service.create_artwork(owner, request).await.unwrap();

    let details = app.service.get_artwork(id).await.unwrap().unwrap();
    assert_eq!(details.artwork.collection_id, Some(collection));
}

#[tokio::test]
async fn missing_collection_looks_the_same_as_a_foreign_one() {
    let app = TestApp::with_store(Arc::new(RecordingStore::default()), 0).await;
    let caller = seed_user(&app.pool).await;

    let mut request = sunset();
    request.collection_id = Uuid::new_v4().to_string();
    let err = app.service.create_artwork(caller, request).await.unwrap_err();
    assert!(matches!(err, PipelineError::ReferenceNotOwned));
}

#[tokio::test]
async fn oversized_image_rejects_the_whole_artwork() {
    let app = TestApp::with_store(Arc::new(RecordingStore::default()), 0).await;
    let caller = seed_user(&app.pool).await;

    let mut request = sunset();
    request.tags = vec![Uuid::new_v4().to_string()];
    request.images = vec![png("ok.png", 10), png("huge.png", MAX_IMAGE_BYTES + 1)];

    let err = app.service.create_artwork(caller, request).await.unwrap_err();
    assert_eq!(err.to_string(), "image too large, maximum size is 5MB");
    assert_nothing_persisted(&app.pool).await;
}

#[tokio::test]
async fn non_image_content_is_rejected() {
    let app = TestApp::with_store(Arc::new(RecordingStore::default()), 0).await;
    let caller = seed_user(&app.pool).await;

    let mut request = sunset();
    request.images = vec![artworks_api::services::blob_store::ImageFile::new(
        "notes.txt",
        Some("text/plain"),
        bytes::Bytes::from_static(b"hello"),
    )];

    let err = app.service.create_artwork(caller, request).await.unwrap_err();
    assert!(matches!(err, PipelineError::UploadRejected(msg) if msg == "only image files are allowed"));
    assert_nothing_persisted(&app.pool).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn image_order_survives_out_of_order_completion() {
    let store = Arc::new(RecordingStore::default());
    let app = TestApp::with_store(store.clone(), 0).await;
    let caller = seed_user(&app.pool).await;

    let names = ["slow-0.png", "1.png", "2.png", "3.png", "4.png"];
    let mut request = sunset();
    request.images = names.iter().map(|n| png(n, 32)).collect();

    let id = app.service.create_artwork(caller, request).await.unwrap();

    let details = app.service.get_artwork(id).await.unwrap().unwrap();
    let urls: Vec<_> = details.images.iter().map(|i| i.image_url.clone()).collect();
    let expected: Vec<_> = names
        .iter()
        .map(|n| format!("mem://artworks/{}/{}", id, n))
        .collect();
    assert_eq!(urls, expected);
    assert!(details.images[0].is_primary);
    assert_eq!(details.images.iter().filter(|i| i.is_primary).count(), 1);
    assert!(store.peak_concurrency() <= 4);
}

#[tokio::test]
async fn storage_outage_rolls_back_and_is_reported() {
    let app = TestApp::with_store(Arc::new(UnreachableStore), 0).await;
    let caller = seed_user(&app.pool).await;

    let mut request = sunset();
    request.tags = vec![Uuid::new_v4().to_string()];
    request.images = vec![png("a.png", 16)];

    let err = app.service.create_artwork(caller, request).await.unwrap_err();
    assert!(matches!(err, PipelineError::StorageFailure(_)));
    assert_nothing_persisted(&app.pool).await;

    let entries = app.sink.entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].0, "storage_failure");
}

#[tokio::test]
async fn panic_in_a_unit_rolls_back_and_the_service_keeps_working() {
    let app = TestApp::with_store(Arc::new(PanickingStore), 0).await;
    let caller = seed_user(&app.pool).await;

    let mut request = sunset();
    request.tags = vec![Uuid::new_v4().to_string()];
    request.images = vec![png("a.png", 16)];

    let err = app.service.create_artwork(caller, request).await.unwrap_err();
    assert!(matches!(err, PipelineError::Internal(ref msg) if msg.contains("images unit panicked")));
    assert_nothing_persisted(&app.pool).await;
    assert_eq!(app.sink.entries()[0].0, "internal");

    // Same service, no images: nothing is left locked.
    let id = app.service.create_artwork(caller, sunset()).await.unwrap();
    assert!(app.service.get_artwork(id).await.unwrap().is_some());
}

#[tokio::test]
async fn persistence_failure_in_a_unit_undoes_the_root_row() {
    let app = TestApp::with_store(Arc::new(RecordingStore::default()), 0).await;
    let caller = seed_user(&app.pool).await;
    sqlx::query("DROP TABLE artwork_categories")
        .execute(&app.pool)
        .await
        .unwrap();

    let mut request = sunset();
    request.categories = vec![Uuid::new_v4().to_string()];
    request.tags = vec![Uuid::new_v4().to_string()];

    let err = app.service.create_artwork(caller, request).await.unwrap_err();
    assert!(matches!(err, PipelineError::PersistenceFailure(_)));
    assert_eq!(count(&app.pool, "artworks").await, 0);
    assert_eq!(count(&app.pool, "artwork_tags").await, 0);
    assert_eq!(app.sink.entries()[0].0, "persistence_failure");
}

#[tokio::test]
async fn edition_is_recorded_only_when_both_numbers_are_positive() {
    let app = TestApp::with_store(Arc::new(RecordingStore::default()), 0).await;
    let caller = seed_user(&app.pool).await;

    let mut request = sunset();
    request.edition_number = 3;
    request.total_editions = 25;
    let id = app.service.create_artwork(caller, request).await.unwrap();
    let details = app.service.get_artwork(id).await.unwrap().unwrap();
    assert_eq!(details.editions.len(), 1);
    assert_eq!(details.editions[0].edition_number, 3);
    assert_eq!(details.editions[0].total_editions, 25);
    assert_eq!(details.editions[0].status, EditionStatus::Available);

    let mut request = sunset();
    request.edition_number = 0;
    request.total_editions = 25;
    app.service.create_artwork(caller, request).await.unwrap();
    assert_eq!(count(&app.pool, "editions").await, 1);
}

#[tokio::test]
async fn attributes_keep_their_values() {
    let app = TestApp::with_store(Arc::new(RecordingStore::default()), 0).await;
    let caller = seed_user(&app.pool).await;
    let palette = Uuid::new_v4();

    let mut request = sunset();
    request.attributes = vec![AttributeInput {
        id: palette.to_string(),
        value: "warm".into(),
    }];
    let id = app.service.create_artwork(caller, request).await.unwrap();

    let details = app.service.get_artwork(id).await.unwrap().unwrap();
    assert_eq!(details.attributes.len(), 1);
    assert_eq!(details.attributes[0].attribute_id, palette);
    assert_eq!(details.attributes[0].value, "warm");
}

#[tokio::test]
async fn malformed_attribute_id_rolls_back() {
    let app = TestApp::with_store(Arc::new(RecordingStore::default()), 0).await;
    let caller = seed_user(&app.pool).await;

    let mut request = sunset();
    request.tags = vec![Uuid::new_v4().to_string()];
    request.attributes = vec![AttributeInput {
        id: "palette".into(),
        value: "warm".into(),
    }];

    let err = app.service.create_artwork(caller, request).await.unwrap_err();
    assert!(matches!(err, PipelineError::InvalidReference { kind: "attribute", .. }));
    assert_nothing_persisted(&app.pool).await;
}

#[tokio::test]
async fn validation_failures_touch_nothing() {
    let store = Arc::new(RecordingStore::default());
    let app = TestApp::with_store(store.clone(), 0).await;
    let caller = seed_user(&app.pool).await;

    let mut request = sunset();
    request.title.clear();
    request.images = vec![png("a.png", 16)];
    let err = app.service.create_artwork(caller, request).await.unwrap_err();
    assert!(matches!(err, PipelineError::ValidationFailed(_)));

    let mut request = sunset();
    request.creation_date = "31/12/2024".into();
    let err = app.service.create_artwork(caller, request).await.unwrap_err();
    assert_eq!(err.to_string(), "invalid creation date format, use YYYY-MM-DD");

    assert_nothing_persisted(&app.pool).await;
    assert_eq!(store.upload_count(), 0);
}

#[tokio::test]
async fn identical_submissions_create_distinct_artworks() {
    let app = TestApp::with_store(Arc::new(RecordingStore::default()), 0).await;
    let caller = seed_user(&app.pool).await;

    let first = app.service.create_artwork(caller, sunset()).await.unwrap();
    let second = app.service.create_artwork(caller, sunset()).await.unwrap();

    assert_ne!(first, second);
    assert_eq!(count(&app.pool, "artworks").await, 2);
    let listed = app.service.list_artworks(caller).await.unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].id, second);
}
