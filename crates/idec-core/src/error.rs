//! Error types for IDEC core primitives.

use thiserror::Error;

/// Errors produced while building, parsing or validating messages.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("message too large: {size} bytes exceeds limit of {limit}")]
    TooLarge { size: usize, limit: usize },

    #[error("malformed submission: {0}")]
    MalformedSubmission(String),

    #[error("malformed record: {0}")]
    MalformedRecord(String),

    #[error("invalid msgid: {0:?}")]
    InvalidMsgId(String),

    #[error("invalid echoarea name: {0:?}")]
    InvalidEchoarea(String),

    #[error("invalid username: {0:?}")]
    InvalidUsername(String),

    #[error("decoding error: {0}")]
    Decoding(String),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
