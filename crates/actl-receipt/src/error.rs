//! Receipt hashing and signing errors.

use thiserror::Error;

/// Errors raised while hashing, signing, or verifying a receipt.
#[derive(Debug, Error)]
pub enum ReceiptError {
    /// The value could not be serialized to canonical JSON.
    #[error("failed to canonicalize value: {0}")]
    Serialize(#[from] serde_json::Error),
    /// The signing key file could not be read, created, or had its
    /// permissions set.
    #[error("signing key io error at {path}: {source}")]
    KeyIo {
        /// Path the operation was acting on.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl From<ReceiptError> for actl_core::HubError {
    fn from(err: ReceiptError) -> Self {
        actl_core::HubError::new(actl_core::ErrorCode::Internal, err.to_string())
    }
}
