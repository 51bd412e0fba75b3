//! Error types for store operations
//!
//! Storage failures are never fatal for callers of the content cache: the
//! cache logs them and degrades to a miss or a dropped write. Other users of
//! [`KvStore`](crate::kv::KvStore) see them as ordinary errors.

use thiserror::Error;

/// Main error type for key-value and cache storage
#[derive(Error, Debug)]
pub enum StoreError {
    /// The backing store could not be reached or refused the operation
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    /// A persisted record could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Filesystem error from a file-backed store
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration values
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias for store operations
pub type Result<T> = std::result::Result<T, StoreError>;
