use crate::{
    errors::AppError,
    handlers::caller::Caller,
    models::artwork::{Artwork, ArtworkDetails},
    services::normalizer::{ArtworkCreationRequest, RawSubmission},
    state::AppState,
};
use axum::{
    Json,
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Serialize)]
pub struct CreatedResponse {
    pub message: &'static str,
    pub artwork_id: Uuid,
}

/// `POST /artworks` (multipart/form-data).
pub async fn create_artwork(
    State(state): State<AppState>,
    Caller(caller): Caller,
    multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let raw = RawSubmission::from_multipart(multipart).await?;
    let request = ArtworkCreationRequest::from_submission(raw)?;
    let artwork_id = state.artworks.create_artwork(caller, request).await?;

    Ok((
        StatusCode::CREATED,
        Json(CreatedResponse {
            message: "Artwork created successfully",
            artwork_id,
        }),
    ))
}

/// `GET /artworks/{id}` for any identified caller.
pub async fn get_artwork(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(id): Path<Uuid>,
) -> Result<Json<ArtworkDetails>, AppError> {
    tracing::debug!(%caller, artwork_id = %id, "reading artwork");
    state
        .artworks
        .get_artwork(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("artwork not found"))
}

/// `GET /artworks` lists the caller's own artworks.
pub async fn list_artworks(
    State(state): State<AppState>,
    Caller(caller): Caller,
) -> Result<Json<Vec<Artwork>>, AppError> {
    Ok(Json(state.artworks.list_artworks(caller).await?))
}
