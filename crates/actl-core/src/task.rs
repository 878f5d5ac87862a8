//! Task data model: status graph, events, and the `Task`/`TaskBoard` records.
//!
//! The pure mutators over [`TaskBoard`] live in `actl-tasks`; this crate only
//! owns the shapes and the admissible-transition table, since several other
//! crates (routing, SLA, circuit breaker) need to read task state without
//! depending on the mutator crate.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Task lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Not yet started.
    Todo,
    /// Actively being worked.
    InProgress,
    /// Submitted and awaiting review.
    ReadyForReview,
    /// Terminal: review accepted the work.
    Accepted,
    /// Terminal (from the transition table's perspective): review rejected
    /// the work. A rejection always resolves back into `InProgress` — see
    /// `actl-tasks::reject_task`.
    Rejected,
}

/// Task priority. `P0 < P1 < P2`; tasks without a priority sort as `P2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Priority {
    /// Highest priority.
    P0,
    /// Medium priority.
    P1,
    /// Lowest priority (default sort position for tasks without a priority).
    P2,
}

/// Returns the admissible next statuses for `from`.
///
/// This is the single source of truth for the transition graph:
/// `todo -> in_progress -> ready_for_review -> {accepted, rejected}`, with
/// `rejected` compound-resolving back into `in_progress` (handled by the
/// mutator, not this table).
#[must_use]
pub fn valid_transitions(from: TaskStatus) -> &'static [TaskStatus] {
    use TaskStatus::*;
    match from {
        Todo => &[InProgress],
        InProgress => &[ReadyForReview],
        ReadyForReview => &[Accepted, Rejected],
        Accepted => &[],
        Rejected => &[InProgress],
    }
}

/// Returns `true` when `from -> to` is an admissible transition.
#[must_use]
pub fn is_valid_transition(from: TaskStatus, to: TaskStatus) -> bool {
    valid_transitions(from).contains(&to)
}

/// Context describing the git worktree a task is running in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceContext {
    /// Workspace id.
    pub workspace_id: String,
    /// Repository path.
    pub repo_path: String,
    /// Branch name.
    pub branch: String,
}

/// A single entry in a task's append-only event log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TaskEvent {
    /// Status changed from `from` to `to`.
    StatusChanged {
        /// Previous status.
        from: TaskStatus,
        /// New status.
        to: TaskStatus,
        /// ISO-8601 timestamp.
        at: String,
    },
    /// A review rejected the work with `reason`.
    ReviewRejected {
        /// Rejection reason.
        reason: String,
        /// ISO-8601 timestamp.
        at: String,
    },
    /// A review accepted the work, with an optional justification.
    ReviewAccepted {
        /// Optional justification.
        justification: Option<String>,
        /// ISO-8601 timestamp.
        at: String,
    },
    /// Workspace cleanup has been queued following acceptance.
    CleanupQueued {
        /// ISO-8601 timestamp.
        at: String,
    },
    /// The task was assigned to `assignee`.
    Assigned {
        /// New assignee.
        assignee: String,
        /// ISO-8601 timestamp.
        at: String,
    },
}

/// Unit of delegated work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Unique task id.
    pub id: String,
    /// Human-readable title.
    pub title: String,
    /// Current status.
    pub status: TaskStatus,
    /// Current assignee, if any.
    pub assignee: Option<String>,
    /// ISO-8601 creation timestamp.
    pub created_at: String,
    /// Optional priority.
    pub priority: Option<Priority>,
    /// Optional ISO-8601 due date.
    pub due_date: Option<String>,
    /// Arbitrary tags (e.g. `"blocked"`).
    pub tags: BTreeSet<String>,
    /// Append-only event log; the source of truth for analytics.
    pub events: Vec<TaskEvent>,
    /// Optional workspace this task is running in.
    pub workspace: Option<WorkspaceContext>,
}

impl Task {
    /// Returns the sort key `(priority-rank, created_at)` used to order the
    /// board: `P0 < P1 < P2`, with `P2` standing in for "no priority".
    #[must_use]
    pub fn priority_rank(&self) -> Priority {
        self.priority.unwrap_or(Priority::P2)
    }

    /// Returns the timestamp of the most recent `StatusChanged` event whose
    /// `to` matches `status`, falling back to `created_at`.
    #[must_use]
    pub fn entered_status_at(&self, status: TaskStatus) -> &str {
        for event in self.events.iter().rev() {
            if let TaskEvent::StatusChanged { to, at, .. } = event {
                if *to == status {
                    return at;
                }
            }
        }
        &self.created_at
    }
}
