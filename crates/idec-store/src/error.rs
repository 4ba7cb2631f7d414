//! Error types for the store module.

use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// I/O error from the flat-file backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Message not found.
    #[error("message not found: {0}")]
    NotFound(String),

    /// Invalid data handed to or read from storage.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// Record or identifier failed codec validation.
    #[error("codec error: {0}")]
    Codec(#[from] idec_core::CoreError),

    /// Migration error.
    #[error("migration error: {0}")]
    Migration(String),

    /// A blocking task failed to run to completion.
    #[error("blocking task failed: {0}")]
    Blocking(String),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
