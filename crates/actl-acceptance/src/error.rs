//! Acceptance-runner error type.

use thiserror::Error;

/// Errors raised while spawning a command; a rejected or timed-out command
/// is represented as a [`CommandOutcome`](crate::CommandOutcome), not an
/// error — only process-spawn failures reach here.
#[derive(Debug, Error)]
pub enum AcceptanceError {
    /// The command could not be spawned at all.
    #[error("failed to spawn command: {0}")]
    Spawn(#[from] std::io::Error),
}

impl From<AcceptanceError> for actl_core::HubError {
    fn from(err: AcceptanceError) -> Self {
        actl_core::HubError::new(actl_core::ErrorCode::Internal, err.to_string())
    }
}
