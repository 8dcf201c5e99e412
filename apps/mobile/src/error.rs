//! # App Error Type
//!
//! Unified error type handed across the UI bridge.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in Rxdist Mobile                          │
//! │                                                                         │
//! │  Screen                      Rust Runtime                               │
//! │  ──────                      ────────────                               │
//! │                                                                         │
//! │  resource.reload()                                                      │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │  snapshot not ready? ─────────────► AUTHORIZATION_PENDING        │  │
//! │  │  role not allowed?  ──────────────► UNAUTHORIZED                 │  │
//! │  │  SyncError::FetchFailed ──────────► FETCH_FAILED                 │  │
//! │  │  DbError ─────────────────────────► STORAGE_ERROR                │  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! │                                                                         │
//! │  { "code": "FETCH_FAILED", "message": "Fetch failed: 503" }            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::Serialize;
use thiserror::Error;

use rxdist_db::DbError;
use rxdist_sync::SyncError;

/// Error returned to screens.
///
/// ## Serialization
/// ```json
/// {
///   "code": "UNAUTHORIZED",
///   "message": "Role BODEGA cannot open this screen"
/// }
/// ```
#[derive(Debug, Clone, Error, Serialize)]
#[serde(rename_all = "camelCase")]
#[error("{message}")]
pub struct AppError {
    /// Machine-readable error code
    pub code: ErrorCode,

    /// Human-readable error message
    pub message: String,
}

/// Error codes for the UI bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// The role is still being resolved; keep showing the loading state.
    AuthorizationPending,

    /// The current role may not use this resource.
    Unauthorized,

    /// A business fetcher failed.
    FetchFailed,

    /// Durable storage failed.
    StorageError,

    /// Configuration is missing or invalid.
    ConfigError,

    /// Identity provider failure.
    IdentityError,

    /// Anything else.
    Internal,
}

impl AppError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        AppError {
            code,
            message: message.into(),
        }
    }

    pub fn authorization_pending() -> Self {
        AppError::new(ErrorCode::AuthorizationPending, "Authorization is still loading")
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        AppError::new(ErrorCode::Unauthorized, message)
    }

    pub fn config(message: impl Into<String>) -> Self {
        AppError::new(ErrorCode::ConfigError, message)
    }

    /// JSON payload for the bridge.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!(r#"{{"code":"INTERNAL","message":{:?}}}"#, self.message)
        })
    }
}

/// Converts sync errors to app errors.
impl From<SyncError> for AppError {
    fn from(err: SyncError) -> Self {
        let code = match &err {
            SyncError::FetchFailed(_) => ErrorCode::FetchFailed,
            SyncError::Storage(_) => ErrorCode::StorageError,
            SyncError::SessionUnavailable(_) => ErrorCode::IdentityError,
            e if e.is_config_error() => ErrorCode::ConfigError,
            _ => ErrorCode::Internal,
        };
        AppError::new(code, err.to_string())
    }
}

/// Converts database errors to app errors.
impl From<DbError> for AppError {
    fn from(err: DbError) -> Self {
        tracing::error!("Storage failure: {}", err);
        AppError::new(ErrorCode::StorageError, "Local storage is unavailable")
    }
}

/// Result type for runtime operations.
pub type AppResult<T> = Result<T, AppError>;
