//! Errors raised by the pure task-board mutators.

use thiserror::Error;

/// Failure modes for a board mutation. Every mutator either returns a new
/// board or one of these — never a partially-applied mutation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TaskError {
    /// No task with the given id exists on the board.
    #[error("task not found: {0}")]
    NotFound(String),
    /// The requested status is not reachable from the task's current status.
    #[error("cannot transition task {task_id} from {from:?} to {to:?}")]
    InvalidTransition {
        /// Offending task id.
        task_id: String,
        /// Current status.
        from: actl_core::TaskStatus,
        /// Requested status.
        to: actl_core::TaskStatus,
    },
    /// The task is not in the status this mutator requires.
    #[error("task {task_id} must be {required:?} but is {actual:?}")]
    WrongStatus {
        /// Offending task id.
        task_id: String,
        /// Status the mutator requires.
        required: actl_core::TaskStatus,
        /// Task's actual status.
        actual: actl_core::TaskStatus,
    },
    /// A required string argument (e.g. a rejection reason) was empty.
    #[error("{field} must not be empty")]
    EmptyField {
        /// Name of the empty field.
        field: &'static str,
    },
}
