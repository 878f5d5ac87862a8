//! File-store error type.

use thiserror::Error;

/// Errors raised by atomic file I/O and lock acquisition.
#[derive(Debug, Error)]
pub enum FileStoreError {
    /// Underlying filesystem operation failed.
    #[error("io error at {path}: {source}")]
    Io {
        /// Path the operation was acting on.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// Lock could not be acquired before the retry ceiling.
    #[error("lock contention on {0}")]
    LockContention(String),
    /// Value failed to serialize to JSON.
    #[error("serialize error: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub(crate) fn io_err(path: impl Into<String>, source: std::io::Error) -> FileStoreError {
    FileStoreError::Io {
        path: path.into(),
        source,
    }
}
