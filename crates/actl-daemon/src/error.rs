//! Maps the hub's various crate-local error types onto the wire-facing
//! [`actl_core::HubError`] taxonomy for crates that don't carry their own
//! conversion.

use actl_core::{ErrorCode, HubError};
use actl_filestore::FileStoreError;
use actl_tasks::TaskError;
use actl_workspace::WorkspaceManagerError;

/// Maps a task-board mutation failure onto a `HubError`.
#[must_use]
pub fn task_error(err: TaskError) -> HubError {
    match err {
        TaskError::NotFound(id) => {
            HubError::new(ErrorCode::TaskNotFound, format!("task not found: {id}")).with_context("task_id", id)
        }
        TaskError::InvalidTransition { task_id, from, to } => HubError::new(
            ErrorCode::InvalidTransition,
            format!("cannot transition task {task_id} from {from:?} to {to:?}"),
        )
        .with_context("task_id", task_id),
        TaskError::WrongStatus {
            task_id,
            required,
            actual,
        } => HubError::new(
            ErrorCode::InvalidTransition,
            format!("task {task_id} must be {required:?} but is {actual:?}"),
        )
        .with_context("task_id", task_id),
        TaskError::EmptyField { field } => {
            HubError::new(ErrorCode::InvalidRequest, format!("{field} must not be empty"))
        }
    }
}

/// Maps a workspace-manager failure onto a `HubError`.
pub fn workspace_error(err: WorkspaceManagerError) -> HubError {
    match err {
        WorkspaceManagerError::InvalidRequest(msg) => HubError::new(ErrorCode::InvalidRequest, msg),
        WorkspaceManagerError::InvalidBranch(msg) => HubError::new(ErrorCode::InvalidBranch, msg),
        WorkspaceManagerError::NotFound(msg) => HubError::new(ErrorCode::WorkspaceNotFound, msg),
        WorkspaceManagerError::PrepareFailed { stderr, workspace } => {
            HubError::new(ErrorCode::GitFailed, stderr).with_context("workspace_id", workspace.id)
        }
        WorkspaceManagerError::CleanupFailed { stderr, workspace } => {
            HubError::new(ErrorCode::GitFailed, stderr).with_context("workspace_id", workspace.id)
        }
        WorkspaceManagerError::Store(err) => err.into(),
    }
}

/// Maps a task-board file I/O failure onto a `HubError`.
#[must_use]
pub fn filestore_error(err: FileStoreError) -> HubError {
    match err {
        FileStoreError::Io { path, source } => {
            HubError::new(ErrorCode::StoreIoFailed, source.to_string()).with_context("path", path)
        }
        FileStoreError::LockContention(path) => {
            HubError::new(ErrorCode::LockContention, format!("lock contention on {path}")).with_context("path", path)
        }
        FileStoreError::Serialize(err) => HubError::new(ErrorCode::Internal, err.to_string()),
    }
}
