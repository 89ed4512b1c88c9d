//! Error types for the memory capabilities.

use thiserror::Error;

/// Result type alias for retrieval operations.
pub type Result<T> = std::result::Result<T, RetrievalError>;

/// Errors that can occur while searching or storing memories.
#[derive(Error, Debug)]
pub enum RetrievalError {
    /// The backing service could not be reached.
    #[error("memory service unavailable: {0}")]
    Unavailable(String),

    /// A store request was refused.
    #[error("store rejected: {0}")]
    Rejected(String),

    /// Query processing error.
    #[error("query error: {0}")]
    Query(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
