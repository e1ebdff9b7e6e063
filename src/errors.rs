use crate::services::blob_store::BlobError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;
use thiserror::Error;

/// Everything that can stop an artwork from being created.
///
/// The first three kinds are detected before a transaction is opened; the rest
/// surface from inside the transaction and force a rollback.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("malformed field `{field}`: {reason}")]
    MalformedInput { field: String, reason: String },
    #[error("{0}")]
    ValidationFailed(String),
    #[error("collection does not belong to you")]
    ReferenceNotOwned,
    #[error("invalid {kind} ID format: {value}")]
    InvalidReference { kind: &'static str, value: String },
    #[error("{0}")]
    UploadRejected(String),
    #[error("failed to upload image: {0}")]
    StorageFailure(String),
    #[error("database error: {0}")]
    PersistenceFailure(#[from] sqlx::Error),
    #[error("{0}")]
    Internal(String),
}

pub type PipelineResult<T> = Result<T, PipelineError>;

impl PipelineError {
    pub fn malformed(field: impl Into<String>, reason: impl fmt::Display) -> Self {
        Self::MalformedInput {
            field: field.into(),
            reason: reason.to_string(),
        }
    }

    pub fn invalid_reference(kind: &'static str, value: impl Into<String>) -> Self {
        Self::InvalidReference {
            kind,
            value: value.into(),
        }
    }

    /// Stable machine-readable name, returned alongside the message.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MalformedInput { .. } => "malformed_input",
            Self::ValidationFailed(_) => "validation_failed",
            Self::ReferenceNotOwned => "reference_not_owned",
            Self::InvalidReference { .. } => "invalid_reference",
            Self::UploadRejected(_) => "upload_rejected",
            Self::StorageFailure(_) => "storage_failure",
            Self::PersistenceFailure(_) => "persistence_failure",
            Self::Internal(_) => "internal",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::MalformedInput { .. }
            | Self::ValidationFailed(_)
            | Self::InvalidReference { .. }
            | Self::UploadRejected(_) => StatusCode::BAD_REQUEST,
            Self::ReferenceNotOwned => StatusCode::FORBIDDEN,
            Self::StorageFailure(_) | Self::PersistenceFailure(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Server-side failures are reported to the error sink; client mistakes are not.
    pub fn is_unexpected(&self) -> bool {
        self.status().is_server_error()
    }
}

/// A lightweight wrapper for general errors that keeps the message local.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub kind: Option<&'static str>,
    pub message: String,
}

impl AppError {
    /// Create a new AppError with a specific status and message.
    pub fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            kind: None,
            message: msg.into(),
        }
    }

    /// Shortcut for a 500 Internal Server Error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, msg)
    }

    /// Shortcut for 404 Not Found
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, msg)
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, msg)
    }

    pub fn too_many_requests(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::TOO_MANY_REQUESTS, msg)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.message,
            "kind": self.kind,
            "status": self.status.as_u16()
        }));

        (self.status, body).into_response()
    }
}

impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        let message = match &err {
            // Driver messages stay in the logs.
            PipelineError::PersistenceFailure(_) => "failed to save artwork".to_string(),
            other => other.to_string(),
        };
        Self {
            status: err.status(),
            kind: Some(err.kind()),
            message,
        }
    }
}

impl From<BlobError> for AppError {
    fn from(err: BlobError) -> Self {
        match err {
            BlobError::NotFound(_) => AppError::not_found(err.to_string()),
            BlobError::InvalidKey(_) | BlobError::ForeignUrl(_) => {
                AppError::new(StatusCode::BAD_REQUEST, err.to_string())
            }
            BlobError::Io(_) => AppError::internal("failed to read media"),
        }
    }
}
