//! HTTP surface of the artworks service.
//!
//! ## Structure
//! - **Artworks**
//!   - `POST /artworks`: create an artwork from a multipart submission
//!     (rate limited per caller, body capped by `max_body_bytes`)
//!   - `GET  /artworks`: the caller's artworks, newest first
//!   - `GET  /artworks/{id}`: one artwork with images, editions and links
//!
//! - **Media**
//!   - `GET  /media/{*path}`: stream a stored image
//!
//! - **Health**
//!   - `GET  /healthz`, `GET /readyz`
//!
//! Every response carries `nosniff` and a deny-all content security policy.

use crate::{
    handlers::{
        artwork_handlers::{create_artwork, get_artwork, list_artworks},
        health_handlers::{healthz, readyz},
        media_handlers::get_media,
    },
    middleware::{rate_limit::rate_limit_middleware, security_headers::security_headers_middleware},
    state::AppState,
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
};

/// Build the full router with its state attached.
pub fn routes(state: AppState, max_body_bytes: usize) -> Router {
    let create = post(create_artwork)
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ))
        .route_layer(DefaultBodyLimit::max(max_body_bytes));

    Router::new()
        // health endpoints (mounted at root)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/artworks", create.get(list_artworks))
        .route("/artworks/{id}", get(get_artwork))
        .route("/media/{*path}", get(get_media))
        .layer(middleware::from_fn(security_headers_middleware))
        .with_state(state)
}
