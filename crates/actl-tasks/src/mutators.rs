//! Pure mutators: each takes a [`TaskBoard`] by value and returns a new one,
//! or an error describing why the mutation was rejected. No mutator ever
//! applies part of a change; a rejected mutation leaves the caller's
//! original board (which they still own, since these take `&TaskBoard` and
//! clone internally) untouched.

use std::collections::BTreeSet;

use actl_core::{is_valid_transition, Priority, Task, TaskEvent, TaskStatus, WorkspaceContext};
use chrono::Utc;
use uuid::Uuid;

use crate::board::TaskBoard;
use crate::error::TaskError;

/// Optional fields for [`add_task`].
#[derive(Debug, Clone, Default)]
pub struct AddTaskOptions {
    /// Initial priority.
    pub priority: Option<Priority>,
    /// Optional ISO-8601 due date.
    pub due_date: Option<String>,
    /// Initial tag set.
    pub tags: BTreeSet<String>,
}

/// Appends a new task in status `todo` with an empty event log.
#[must_use]
pub fn add_task(
    board: &TaskBoard,
    title: impl Into<String>,
    assignee: Option<String>,
    opts: AddTaskOptions,
) -> TaskBoard {
    let task = Task {
        id: Uuid::new_v4().to_string(),
        title: title.into(),
        status: TaskStatus::Todo,
        assignee,
        created_at: Utc::now().to_rfc3339(),
        priority: opts.priority,
        due_date: opts.due_date,
        tags: opts.tags,
        events: Vec::new(),
        workspace: None,
    };
    board.clone().push(task)
}

/// Transitions `id` to `target`, appending a `status_changed` event.
///
/// # Errors
///
/// Returns [`TaskError::NotFound`] if `id` doesn't exist, or
/// [`TaskError::InvalidTransition`] if `target` isn't reachable from the
/// task's current status.
pub fn update_task_status(
    board: &TaskBoard,
    id: &str,
    target: TaskStatus,
) -> Result<TaskBoard, TaskError> {
    let task = board.find(id).ok_or_else(|| TaskError::NotFound(id.to_string()))?;
    if !is_valid_transition(task.status, target) {
        return Err(TaskError::InvalidTransition {
            task_id: id.to_string(),
            from: task.status,
            to: target,
        });
    }
    let mut updated = task.clone();
    let from = updated.status;
    updated.status = target;
    updated.events.push(TaskEvent::StatusChanged {
        from,
        to: target,
        at: Utc::now().to_rfc3339(),
    });
    Ok(board.clone().replace(id, updated))
}

/// Rejects a `ready_for_review` task: appends the compound sequence
/// `status_changed(→rejected) · review_rejected(reason) · status_changed(→in_progress)`
/// and leaves the task in `in_progress`.
///
/// # Errors
///
/// Returns [`TaskError::NotFound`], [`TaskError::WrongStatus`] if the task
/// isn't `ready_for_review`, or [`TaskError::EmptyField`] if `reason` is
/// empty.
pub fn reject_task(board: &TaskBoard, id: &str, reason: &str) -> Result<TaskBoard, TaskError> {
    let task = board.find(id).ok_or_else(|| TaskError::NotFound(id.to_string()))?;
    if task.status != TaskStatus::ReadyForReview {
        return Err(TaskError::WrongStatus {
            task_id: id.to_string(),
            required: TaskStatus::ReadyForReview,
            actual: task.status,
        });
    }
    if reason.trim().is_empty() {
        return Err(TaskError::EmptyField { field: "reason" });
    }
    let mut updated = task.clone();
    let at = Utc::now().to_rfc3339();
    updated.events.push(TaskEvent::StatusChanged {
        from: TaskStatus::ReadyForReview,
        to: TaskStatus::Rejected,
        at: at.clone(),
    });
    updated.events.push(TaskEvent::ReviewRejected {
        reason: reason.to_string(),
        at: at.clone(),
    });
    updated.events.push(TaskEvent::StatusChanged {
        from: TaskStatus::Rejected,
        to: TaskStatus::InProgress,
        at,
    });
    updated.status = TaskStatus::InProgress;
    Ok(board.clone().replace(id, updated))
}

/// Accepts a `ready_for_review` task: appends `status_changed(→accepted)`,
/// `review_accepted(justification)`, and — only if the task carries a
/// workspace context — `cleanup_queued`.
///
/// # Errors
///
/// Returns [`TaskError::NotFound`] or [`TaskError::WrongStatus`].
pub fn accept_task(
    board: &TaskBoard,
    id: &str,
    justification: Option<String>,
) -> Result<TaskBoard, TaskError> {
    let task = board.find(id).ok_or_else(|| TaskError::NotFound(id.to_string()))?;
    if task.status != TaskStatus::ReadyForReview {
        return Err(TaskError::WrongStatus {
            task_id: id.to_string(),
            required: TaskStatus::ReadyForReview,
            actual: task.status,
        });
    }
    let mut updated = task.clone();
    let at = Utc::now().to_rfc3339();
    updated.events.push(TaskEvent::StatusChanged {
        from: TaskStatus::ReadyForReview,
        to: TaskStatus::Accepted,
        at: at.clone(),
    });
    updated.events.push(TaskEvent::ReviewAccepted {
        justification,
        at: at.clone(),
    });
    if updated.workspace.is_some() {
        updated.events.push(TaskEvent::CleanupQueued { at });
    }
    updated.status = TaskStatus::Accepted;
    Ok(board.clone().replace(id, updated))
}

/// Submits an `in_progress` task for review. If `workspace_ctx` is absent,
/// any workspace context already on the task is preserved rather than
/// cleared.
///
/// # Errors
///
/// Returns [`TaskError::NotFound`] or [`TaskError::WrongStatus`].
pub fn submit_for_review(
    board: &TaskBoard,
    id: &str,
    workspace_ctx: Option<WorkspaceContext>,
) -> Result<TaskBoard, TaskError> {
    let task = board.find(id).ok_or_else(|| TaskError::NotFound(id.to_string()))?;
    if task.status != TaskStatus::InProgress {
        return Err(TaskError::WrongStatus {
            task_id: id.to_string(),
            required: TaskStatus::InProgress,
            actual: task.status,
        });
    }
    let mut updated = task.clone();
    updated.events.push(TaskEvent::StatusChanged {
        from: TaskStatus::InProgress,
        to: TaskStatus::ReadyForReview,
        at: Utc::now().to_rfc3339(),
    });
    updated.status = TaskStatus::ReadyForReview;
    if workspace_ctx.is_some() {
        updated.workspace = workspace_ctx;
    }
    Ok(board.clone().replace(id, updated))
}

/// Assigns (or reassigns) `id` to `assignee`, appending an `assigned` event.
///
/// # Errors
///
/// Returns [`TaskError::NotFound`] if `id` doesn't exist.
pub fn assign_task(board: &TaskBoard, id: &str, assignee: impl Into<String>) -> Result<TaskBoard, TaskError> {
    let task = board.find(id).ok_or_else(|| TaskError::NotFound(id.to_string()))?;
    let mut updated = task.clone();
    let assignee = assignee.into();
    updated.events.push(TaskEvent::Assigned {
        assignee: assignee.clone(),
        at: Utc::now().to_rfc3339(),
    });
    updated.assignee = Some(assignee);
    Ok(board.clone().replace(id, updated))
}

/// Clears `id`'s assignee, e.g. when its agent is quarantined.
///
/// # Errors
///
/// Returns [`TaskError::NotFound`] if `id` doesn't exist.
pub fn unassign_task(board: &TaskBoard, id: &str) -> Result<TaskBoard, TaskError> {
    let task = board.find(id).ok_or_else(|| TaskError::NotFound(id.to_string()))?;
    let mut updated = task.clone();
    updated.assignee = None;
    Ok(board.clone().replace(id, updated))
}

/// Removes `id` from the board entirely.
///
/// # Errors
///
/// Returns [`TaskError::NotFound`] if `id` doesn't exist.
pub fn remove_task(board: &TaskBoard, id: &str) -> Result<TaskBoard, TaskError> {
    if board.find(id).is_none() {
        return Err(TaskError::NotFound(id.to_string()));
    }
    Ok(board.clone().without(id))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board_with_one_task() -> (TaskBoard, String) {
        let board = add_task(&TaskBoard::new(), "write docs", None, AddTaskOptions::default());
        let id = board.tasks()[0].id.clone();
        (board, id)
    }

    #[test]
    fn add_task_starts_in_todo_with_no_events() {
        let (board, id) = board_with_one_task();
        let task = board.find(&id).unwrap();
        assert_eq!(task.status, TaskStatus::Todo);
        assert!(task.events.is_empty());
    }

    #[test]
    fn update_status_rejects_invalid_jump() {
        let (board, id) = board_with_one_task();
        let err = update_task_status(&board, &id, TaskStatus::ReadyForReview).unwrap_err();
        assert!(matches!(err, TaskError::InvalidTransition { .. }));
    }

    #[test]
    fn reject_task_produces_compound_sequence_and_reopens() {
        let (board, id) = board_with_one_task();
        let board = update_task_status(&board, &id, TaskStatus::InProgress).unwrap();
        let board = submit_for_review(&board, &id, None).unwrap();
        let board = reject_task(&board, &id, "needs more tests").unwrap();
        let task = board.find(&id).unwrap();
        assert_eq!(task.status, TaskStatus::InProgress);
        assert_eq!(task.events.len(), 4);
        assert!(matches!(task.events[3], TaskEvent::StatusChanged { to: TaskStatus::InProgress, .. }));
    }

    #[test]
    fn reject_task_requires_nonempty_reason() {
        let (board, id) = board_with_one_task();
        let board = update_task_status(&board, &id, TaskStatus::InProgress).unwrap();
        let board = submit_for_review(&board, &id, None).unwrap();
        let err = reject_task(&board, &id, "  ").unwrap_err();
        assert!(matches!(err, TaskError::EmptyField { field: "reason" }));
    }

    #[test]
    fn accept_task_queues_cleanup_only_with_workspace() {
        let (board, id) = board_with_one_task();
        let board = update_task_status(&board, &id, TaskStatus::InProgress).unwrap();
        let ctx = WorkspaceContext {
            workspace_id: "w1".to_string(),
            repo_path: "/repo".to_string(),
            branch: "feature/x".to_string(),
        };
        let board = submit_for_review(&board, &id, Some(ctx)).unwrap();
        let board = accept_task(&board, &id, Some("lgtm".to_string())).unwrap();
        let task = board.find(&id).unwrap();
        assert_eq!(task.status, TaskStatus::Accepted);
        assert_eq!(task.events.len(), 3);
        assert!(matches!(task.events[2], TaskEvent::CleanupQueued { .. }));
    }

    #[test]
    fn submit_for_review_preserves_prior_workspace_when_absent() {
        let (board, id) = board_with_one_task();
        let board = update_task_status(&board, &id, TaskStatus::InProgress).unwrap();
        let ctx = WorkspaceContext {
            workspace_id: "w1".to_string(),
            repo_path: "/repo".to_string(),
            branch: "feature/x".to_string(),
        };
        let board = submit_for_review(&board, &id, Some(ctx.clone())).unwrap();
        let board = reject_task(&board, &id, "bad").unwrap();
        let board = submit_for_review(&board, &id, None).unwrap();
        let task = board.find(&id).unwrap();
        assert_eq!(task.workspace, Some(ctx));
    }

    #[test]
    fn priority_sort_is_stable_with_absent_as_p2() {
        let board = TaskBoard::new();
        let board = add_task(&board, "a", None, AddTaskOptions::default());
        let board = add_task(
            &board,
            "b",
            None,
            AddTaskOptions { priority: Some(Priority::P0), ..Default::default() },
        );
        let board = add_task(&board, "c", None, AddTaskOptions::default());
        let sorted = board.sorted_by_priority();
        assert_eq!(sorted[0].title, "b");
        assert_eq!(sorted[1].title, "a");
        assert_eq!(sorted[2].title, "c");
    }

    #[test]
    fn remove_task_drops_it() {
        let (board, id) = board_with_one_task();
        let board = remove_task(&board, &id).unwrap();
        assert!(board.find(&id).is_none());
    }
}
