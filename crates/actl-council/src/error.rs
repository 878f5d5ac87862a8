//! Council error type.

use thiserror::Error;

/// Errors raised while running a council fan-out.
#[derive(Debug, Error)]
pub enum CouncilError {
    /// Every member call failed; the caller should treat the degraded
    /// result returned alongside this as authoritative rather than retry.
    #[error("no council member produced a usable response")]
    AllMembersFailed,
}

impl From<CouncilError> for actl_core::HubError {
    fn from(err: CouncilError) -> Self {
        actl_core::HubError::new(actl_core::ErrorCode::CouncilDegraded, err.to_string())
    }
}
