//! Core error types for gapfit-core.
//!
//! This module defines the error hierarchy using thiserror. The taxonomy
//! follows the recovery behavior each class gets: source failures degrade a
//! scan, store write failures are reported but never block a decision, and
//! invalid windows are precondition violations that fail fast.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for gapfit-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// A calendar provider could not be read
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    /// History store errors
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// No calendar access at all -- the scan is skipped entirely
    #[error("Calendar authorization missing")]
    AuthorizationMissing,

    /// A scan was requested while another was in flight (dropped, not queued)
    #[error("A scan is already in progress")]
    ScanInProgress,

    /// The in-flight scan was cancelled by the caller
    #[error("Scan cancelled")]
    ScanCancelled,

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// One calendar provider failed to yield events.
///
/// Recovered locally: the failing source's events are excluded from the
/// merge and the scan continues, reporting the failure as a soft warning.
#[derive(Error, Debug)]
pub enum SourceError {
    /// Provider unreachable
    #[error("Source '{source_id}' unreachable: {message}")]
    Unreachable { source_id: String, message: String },

    /// Provider rejected our credentials
    #[error("Source '{source_id}' unauthorized")]
    Unauthorized { source_id: String },

    /// Provider returned events we could not decode
    #[error("Source '{source_id}' returned malformed data: {message}")]
    Malformed { source_id: String, message: String },
}

impl SourceError {
    /// Identifier of the source that failed.
    pub fn source_id(&self) -> &str {
        match self {
            SourceError::Unreachable { source_id, .. } => source_id,
            SourceError::Unauthorized { source_id } => source_id,
            SourceError::Malformed { source_id, .. } => source_id,
        }
    }
}

/// History-store errors.
///
/// Write failures are reported but the notification decision still proceeds;
/// read failures make the rule engine treat history as empty (fail open).
#[derive(Error, Debug)]
pub enum StoreError {
    /// Failed to open the backing store
    #[error("Failed to open history store at {path}: {message}")]
    OpenFailed { path: PathBuf, message: String },

    /// A read query failed
    #[error("History read failed: {0}")]
    ReadFailed(String),

    /// A write failed
    #[error("History write failed: {0}")]
    WriteFailed(String),

    /// No record of the requested kind exists to update
    #[error("No record of kind '{kind}' to update")]
    NoSuchRecord { kind: String },
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::ReadFailed(err.to_string())
    }
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
