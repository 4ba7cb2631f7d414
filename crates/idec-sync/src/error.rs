//! Error types for the sync module.

use thiserror::Error;

/// Errors that can occur while tossing, serving or syncing.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Store operation failed.
    #[error("store error: {0}")]
    Store(#[from] idec_store::StoreError),

    /// A message, submission or identifier failed validation.
    #[error("codec error: {0}")]
    Codec(#[from] idec_core::CoreError),

    /// The remote could not be reached or answered with a failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// The remote answered with something that does not parse.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// An operation needed a point authstr that is missing or unknown.
    #[error("not authorized: {0}")]
    NotAuthorized(String),
}

/// Result type for sync operations.
pub type Result<T> = std::result::Result<T, SyncError>;
