//! Error types for the file cache
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the file cache.
#[derive(Error, Debug)]
pub enum CacheError {
    /// No record exists for the key
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Record exists but is older than the validity window
    #[error("Key expired: {0}")]
    Stale(String),

    /// Cached value does not have the requested kind
    #[error("Data '{key}' is not {expected} (found {found})")]
    TypeMismatch {
        key: String,
        expected: String,
        found: String,
    },

    /// A list element does not have the requested kind
    #[error("Array value at key '{index}' of '{key}' is not {expected} (found {found})")]
    ElementMismatch {
        key: String,
        index: usize,
        expected: String,
        found: String,
    },

    /// Cached value could not be converted into the requested kind
    #[error("Data '{key}' could not be parsed: {message}")]
    ParseFailure { key: String, message: String },

    /// Key cannot be mapped to a storage location
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Underlying storage failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Value could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Record bytes are not a cache record
    #[error("Corrupt record: {0}")]
    Corrupt(String),

    /// Record was written by an incompatible format version
    #[error("Record version mismatch: expected {expected}, found {actual}")]
    VersionMismatch { expected: u8, actual: u8 },
}

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        CacheError::Serialization(err.to_string())
    }
}

// == Result Type Alias ==
/// Convenience Result type for the file cache.
pub type Result<T> = std::result::Result<T, CacheError>;
