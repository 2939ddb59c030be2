//! Object store error types

use thiserror::Error;

/// Errors produced by the content-addressed object store
#[derive(Debug, Error)]
pub enum StorageError {
    /// Requested object does not exist locally
    #[error("object not found: {0}")]
    NotFound(String),

    /// A finalized or just-written object's bytes did not MD5 to its key
    #[error("integrity error: expected {expected}, got {actual}")]
    IntegrityError {
        /// Key the object was written/read under
        expected: String,
        /// MD5 actually computed over the object's bytes
        actual: String,
    },

    /// A key was not valid lowercase hex, or had an unexpected length
    #[error("malformed key: {0}")]
    MalformedKey(String),

    /// I/O error talking to the local filesystem
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for object store operations
pub type StorageResult<T> = Result<T, StorageError>;
