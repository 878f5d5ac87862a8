//! Errors raised by the workspace manager.

use actl_core::Workspace;
use thiserror::Error;

/// Failure modes for workspace operations.
#[derive(Debug, Error)]
pub enum WorkspaceManagerError {
    /// A required field was missing or malformed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    /// The branch name failed validation.
    #[error("invalid branch: {0}")]
    InvalidBranch(String),
    /// No workspace with the given id or key exists.
    #[error("workspace not found: {0}")]
    NotFound(String),
    /// `git worktree add` failed; the caller receives the workspace row,
    /// now in `failed` status, alongside the error.
    #[error("git worktree add failed: {stderr}")]
    PrepareFailed {
        /// Captured stderr.
        stderr: String,
        /// The workspace row, now `failed`.
        workspace: Box<Workspace>,
    },
    /// `git worktree remove` failed; the workspace row is now `failed`.
    #[error("git worktree remove failed: {stderr}")]
    CleanupFailed {
        /// Captured stderr.
        stderr: String,
        /// The workspace row, now `failed`.
        workspace: Box<Workspace>,
    },
    /// The underlying store failed.
    #[error(transparent)]
    Store(#[from] actl_store::StoreError),
}
