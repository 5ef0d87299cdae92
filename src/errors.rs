use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;
use thiserror::Error;

use crate::services::state_store::StoreError;

/// Failures of a single reconciliation pass.
///
/// Remote variants carry the operation name, the identity token and the
/// remote message verbatim. Nothing here is retried.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("invalid bucket identity `{zone}:{label}`: {reason}")]
    InvalidIdentity {
        zone: String,
        label: String,
        reason: &'static str,
    },
    #[error("bucket ID must be of the form <zone>:<label>, was provided: `{0}`")]
    MalformedIdentity(String),
    #[error("invalid bucket configuration: {0}")]
    InvalidConfig(String),
    #[error("changing {field} of bucket `{token}` requires replacing the bucket")]
    RequiresReplacement { token: String, field: &'static str },
    #[error("bucket `{0}` not found")]
    RemoteNotFound(String),
    #[error("{operation} failed for bucket `{token}`: {message}")]
    RemoteFetch {
        operation: &'static str,
        token: String,
        message: String,
    },
    #[error("{operation} failed for bucket `{token}`: {message}")]
    RemoteCreate {
        operation: &'static str,
        token: String,
        message: String,
    },
    #[error("{operation} failed for bucket `{token}`: {message}")]
    RemoteUpdate {
        operation: &'static str,
        token: String,
        message: String,
    },
    #[error("{operation} failed for bucket `{token}`: {message}")]
    RemoteDelete {
        operation: &'static str,
        token: String,
        message: String,
    },
    #[error("resource `{0}` used before the provider was configured")]
    Unconfigured(&'static str),
    #[error("resource `{0}` was not provided a schema")]
    MissingSchema(&'static str),
}

pub type ReconcileResult<T> = Result<T, ReconcileError>;

/// A lightweight wrapper for general errors that keeps the message local.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    /// Create a new AppError with a specific status and message.
    pub fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
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

    /// Shortcut for 409 Conflict
    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, msg)
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
            "status": self.status.as_u16()
        }));

        (self.status, body).into_response()
    }
}

impl From<ReconcileError> for AppError {
    fn from(err: ReconcileError) -> Self {
        let status = match &err {
            ReconcileError::InvalidIdentity { .. }
            | ReconcileError::MalformedIdentity(_)
            | ReconcileError::InvalidConfig(_) => StatusCode::BAD_REQUEST,
            ReconcileError::RequiresReplacement { .. } => StatusCode::CONFLICT,
            ReconcileError::RemoteNotFound(_) => StatusCode::NOT_FOUND,
            ReconcileError::RemoteFetch { .. }
            | ReconcileError::RemoteCreate { .. }
            | ReconcileError::RemoteUpdate { .. }
            | ReconcileError::RemoteDelete { .. } => StatusCode::BAD_GATEWAY,
            ReconcileError::Unconfigured(_) | ReconcileError::MissingSchema(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        AppError::new(status, err.to_string())
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Identity(inner) => inner.into(),
            other => AppError::internal(other.to_string()),
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::internal(err.to_string())
    }
}
