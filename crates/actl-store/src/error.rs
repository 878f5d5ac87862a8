//! Store-local error type. Callers that need the daemon-wide taxonomy wrap
//! this into [`actl_core::HubError`] at the boundary.

use thiserror::Error;

/// Errors raised by any `actl-store` store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The underlying SQLite driver returned an error.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// Filesystem I/O failed while preparing the database directory.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// A stored JSON blob (context map, payload) failed to deserialize.
    #[error("corrupt stored json: {0}")]
    CorruptJson(#[from] serde_json::Error),
    /// A row referenced an id that does not exist.
    #[error("not found: {0}")]
    NotFound(String),
}

impl From<StoreError> for actl_core::HubError {
    fn from(err: StoreError) -> Self {
        actl_core::HubError::new(actl_core::ErrorCode::StoreIoFailed, err.to_string())
    }
}
