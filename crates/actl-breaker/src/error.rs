use thiserror::Error;

/// Errors from circuit-breaker quarantine orchestration.
#[derive(Debug, Error)]
pub enum BreakerError {
    /// The named agent is not currently quarantined.
    #[error("agent not quarantined: {0}")]
    NotQuarantined(String),
    /// The task board file could not be read or written.
    #[error("task board file error: {0}")]
    FileStore(#[from] actl_filestore::FileStoreError),
    /// A task mutation failed while unassigning the agent's work.
    #[error("task mutation error: {0}")]
    Task(#[from] actl_tasks::TaskError),
}

impl From<BreakerError> for actl_core::HubError {
    fn from(err: BreakerError) -> Self {
        actl_core::HubError::new(actl_core::ErrorCode::Internal, err.to_string())
    }
}
