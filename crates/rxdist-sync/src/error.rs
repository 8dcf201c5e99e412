//! # Sync Error Types
//!
//! Error types for authorization sync and cached loading.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sync Error Categories                             │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Configuration  │  │    Identity     │  │     Resolution          │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  InvalidConfig  │  │  SessionUnavail │  │  StrategyFailed         │ │
//! │  │  ConfigLoad     │  │                 │  │  ResolutionFailed       │ │
//! │  │  ConfigSave     │  │                 │  │  NoStrategies           │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐                              │
//! │  │    Storage      │  │    Loader       │                              │
//! │  │                 │  │                 │                              │
//! │  │  Storage        │  │  FetchFailed    │                              │
//! │  └─────────────────┘  └─────────────────┘                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Identity and resolution errors never reach screens: the role store folds
//! them into snapshot state. `FetchFailed` is returned to the caller and
//! mirrored into the loader's view.

use thiserror::Error;

/// Result type alias for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Sync error type covering every failure the engine can observe.
#[derive(Debug, Error)]
pub enum SyncError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Invalid sync configuration.
    #[error("Invalid sync configuration: {0}")]
    InvalidConfig(String),

    /// Failed to load config file.
    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    /// Failed to save config file.
    #[error("Failed to save config: {0}")]
    ConfigSaveFailed(String),

    // =========================================================================
    // Identity Errors
    // =========================================================================
    /// The identity provider could not report the current session.
    ///
    /// ## When This Occurs
    /// - Token storage unreadable at cold start
    /// - Provider SDK not initialised yet
    #[error("Session unavailable: {0}")]
    SessionUnavailable(String),

    // =========================================================================
    // Resolution Errors
    // =========================================================================
    /// One role strategy failed. The resolver moves on to the next one.
    #[error("Role strategy '{strategy}' failed: {reason}")]
    StrategyFailed { strategy: String, reason: String },

    /// Every strategy failed or returned nothing.
    #[error("Could not resolve role for {user_id}: {reason}")]
    ResolutionFailed { user_id: String, reason: String },

    /// The resolver was built without any strategy.
    #[error("No role strategies configured")]
    NoStrategies,

    // =========================================================================
    // Loader Errors
    // =========================================================================
    /// A screen-supplied business fetcher failed.
    #[error("Fetch failed: {0}")]
    FetchFailed(String),

    // =========================================================================
    // Storage Errors
    // =========================================================================
    /// Durable storage failed.
    #[error("Storage error: {0}")]
    Storage(String),

    // =========================================================================
    // Internal Errors
    // =========================================================================
    /// The engine is shutting down.
    #[error("Sync engine is shutting down")]
    ShuttingDown,

    /// Channel send/receive failed.
    #[error("Channel error: {0}")]
    ChannelError(String),
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<rxdist_db::DbError> for SyncError {
    fn from(err: rxdist_db::DbError) -> Self {
        SyncError::Storage(err.to_string())
    }
}

impl From<std::io::Error> for SyncError {
    fn from(err: std::io::Error) -> Self {
        SyncError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for SyncError {
    fn from(err: toml::de::Error) -> Self {
        SyncError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for SyncError {
    fn from(err: toml::ser::Error) -> Self {
        SyncError::ConfigSaveFailed(err.to_string())
    }
}

// =============================================================================
// Error Categorization
// =============================================================================

impl SyncError {
    /// Returns true if the failure is expected to clear on its own, so the
    /// last known state should be kept and the next trigger retried.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            SyncError::SessionUnavailable(_)
                | SyncError::StrategyFailed { .. }
                | SyncError::ResolutionFailed { .. }
                | SyncError::FetchFailed(_)
                | SyncError::Storage(_)
        )
    }

    /// Returns true if this error indicates a configuration problem.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            SyncError::InvalidConfig(_)
                | SyncError::ConfigLoadFailed(_)
                | SyncError::ConfigSaveFailed(_)
                | SyncError::NoStrategies
        )
    }
}
