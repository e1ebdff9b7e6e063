//! Health & readiness handlers.
//!
//! - GET /healthz  -> simple liveness ("ok")
//! - GET /readyz   -> readiness that checks SQLite and the media directory

use crate::state::AppState;
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use std::{collections::BTreeMap, path::Path};
use tokio::fs;
use uuid::Uuid;

/// `GET /healthz`
///
/// Liveness only; never touches the database or disk.
pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, Json(HealthResponse { status: "ok" }))
}

/// `GET /readyz`
///
/// 1. `SELECT 1` against SQLite.
/// 2. Write, read back and delete a sentinel file in the media directory.
///
/// HTTP 200 when both pass, 503 otherwise. The body lists each check.
pub async fn readyz(State(state): State<AppState>) -> impl IntoResponse {
    let sqlite = match sqlx::query_scalar::<_, i64>("SELECT 1")
        .fetch_one(state.db())
        .await
    {
        Ok(1) => CheckStatus::ok(),
        Ok(v) => CheckStatus::failed(format!("unexpected result: {}", v)),
        Err(e) => CheckStatus::failed(format!("error: {}", e)),
    };

    let sentinel = state
        .media
        .base_path()
        .join(format!(".readyz-{}", Uuid::new_v4()));
    let media = match sentinel_round_trip(&sentinel).await {
        Ok(()) => CheckStatus::ok(),
        Err(e) => {
            let _ = fs::remove_file(&sentinel).await;
            CheckStatus::failed(e)
        }
    };

    let ready = sqlite.ok && media.ok;
    let body = ReadyResponse {
        status: if ready { "ok" } else { "error" },
        checks: BTreeMap::from([("sqlite", sqlite), ("media", media)]),
    };
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(body))
}

/// The media directory is created by the first upload, so the check creates
/// it too.
async fn sentinel_round_trip(path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| format!("could not create media dir: {}", e))?;
    }
    fs::write(path, b"readyz")
        .await
        .map_err(|e| format!("could not write sentinel file: {}", e))?;
    let read = fs::read(path)
        .await
        .map_err(|e| format!("could not read sentinel file: {}", e))?;
    if read != b"readyz" {
        return Err("sentinel file content mismatch".into());
    }
    fs::remove_file(path)
        .await
        .map_err(|e| format!("could not remove sentinel file: {}", e))
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

#[derive(Serialize)]
struct ReadyResponse {
    status: &'static str,
    checks: BTreeMap<&'static str, CheckStatus>,
}

#[derive(Serialize)]
struct CheckStatus {
    ok: bool,
    error: Option<String>,
}

impl CheckStatus {
    fn ok() -> Self {
        Self {
            ok: true,
            error: None,
        }
    }

    fn failed(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            error: Some(error.into()),
        }
    }
}
