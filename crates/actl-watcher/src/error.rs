//! Session-watcher error type.

use thiserror::Error;

/// Errors raised while setting up or running the filesystem watch.
#[derive(Debug, Error)]
pub enum WatcherError {
    /// The watched directory could not be read.
    #[error("io error at {path}: {source}")]
    Io {
        /// Path the operation was acting on.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The underlying `notify` watcher failed to start.
    #[error("filesystem watch error: {0}")]
    Notify(#[from] notify::Error),
}

impl From<WatcherError> for actl_core::HubError {
    fn from(err: WatcherError) -> Self {
        actl_core::HubError::new(actl_core::ErrorCode::Internal, err.to_string())
    }
}
