//! Error types shared across layers.
//!
//! - [`StorageError`] - failures of the persistence backends
//! - [`SchedulingError`] - the expiration scheduler could not arm a callback
//! - [`LifecycleError`] - everything an entry operation can fail with
//! - [`AppError`] - HTTP-facing error rendered as a JSON envelope

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::{Value, json};
use thiserror::Error;

/// Failure of a persistence backend.
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),
    #[error("storage query failed: {0}")]
    Query(String),
    #[error("stored data is invalid: {0}")]
    InvalidData(String),
}

impl From<sqlx::Error> for StorageError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                Self::Unavailable(e.to_string())
            }
            sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
                Self::InvalidData(e.to_string())
            }
            other => Self::Query(other.to_string()),
        }
    }
}

/// The scheduler could not register an expiration callback.
#[derive(Debug, Clone, Error)]
pub enum SchedulingError {
    #[error("failed to register reminder '{name}' after {attempts} attempts: {source}")]
    RegistrationFailed {
        name: String,
        attempts: usize,
        #[source]
        source: StorageError,
    },
    #[error("failed to unregister reminder '{name}': {source}")]
    UnregistrationFailed {
        name: String,
        #[source]
        source: StorageError,
    },
}

/// Errors surfaced by entry lifecycle operations.
#[derive(Debug, Clone, Error)]
pub enum LifecycleError {
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("invalid ttl: {0} seconds")]
    InvalidTtl(i64),
    #[error("short code not found: {0}")]
    NotFound(String),
    #[error("short code expired: {0}")]
    Expired(String),
    #[error("short code already consumed: {0}")]
    InvocationExceeded(String),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorInfo,
}

/// Machine-readable error description embedded in every error response.
#[derive(Debug, Serialize)]
pub struct ErrorInfo {
    pub code: &'static str,
    pub message: String,
    pub details: Value,
}

#[derive(Debug)]
pub enum AppError {
    Validation { message: String, details: Value },
    NotFound { message: String, details: Value },
    Expired { message: String, details: Value },
    TooManyInvocations { message: String, details: Value },
    Internal { message: String, details: Value },
}

impl AppError {
    pub fn bad_request(message: impl Into<String>, details: Value) -> Self {
        Self::Validation {
            message: message.into(),
            details,
        }
    }
    pub fn not_found(message: impl Into<String>, details: Value) -> Self {
        Self::NotFound {
            message: message.into(),
            details,
        }
    }
    pub fn internal(message: impl Into<String>, details: Value) -> Self {
        Self::Internal {
            message: message.into(),
            details,
        }
    }

    fn parts(&self) -> (StatusCode, &'static str, &str, &Value) {
        match self {
            AppError::Validation { message, details } => (
                StatusCode::BAD_REQUEST,
                "validation_error",
                message,
                details,
            ),
            AppError::NotFound { message, details } => {
                (StatusCode::NOT_FOUND, "not_found", message, details)
            }
            // 400, not 410.
            AppError::Expired { message, details } => {
                (StatusCode::BAD_REQUEST, "expired", message, details)
            }
            AppError::TooManyInvocations { message, details } => (
                StatusCode::TOO_MANY_REQUESTS,
                "invocation_exceeded",
                message,
                details,
            ),
            AppError::Internal { message, details } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                message,
                details,
            ),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.parts().0
    }

    pub fn to_error_info(&self) -> ErrorInfo {
        let (_, code, message, details) = self.parts();
        ErrorInfo {
            code,
            message: message.to_string(),
            details: details.clone(),
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (_, code, message, _) = self.parts();
        write!(f, "{code}: {message}")
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorBody {
            error: self.to_error_info(),
        };

        (status, Json(body)).into_response()
    }
}

impl From<LifecycleError> for AppError {
    fn from(e: LifecycleError) -> Self {
        match e {
            LifecycleError::InvalidUrl(reason) => {
                AppError::bad_request("Invalid URL", json!({ "reason": reason }))
            }
            LifecycleError::InvalidTtl(ttl) => {
                AppError::bad_request("Invalid TTL", json!({ "ttl_seconds": ttl }))
            }
            LifecycleError::NotFound(code) => {
                AppError::not_found("Short link not found", json!({ "code": code }))
            }
            LifecycleError::Expired(code) => AppError::Expired {
                message: "Short link expired".to_string(),
                details: json!({ "code": code }),
            },
            LifecycleError::InvocationExceeded(code) => AppError::TooManyInvocations {
                message: "One-shot link already used".to_string(),
                details: json!({ "code": code }),
            },
            LifecycleError::Storage(e) => {
                tracing::error!(error = %e, "storage failure");
                AppError::internal("Storage error", json!({}))
            }
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(e: validator::ValidationErrors) -> Self {
        let details = serde_json::to_value(&e).unwrap_or_else(|_| json!({}));
        AppError::bad_request("Request validation failed", details)
    }
}
