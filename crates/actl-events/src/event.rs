//! The closed taxonomy of events that flow across hub subsystems.

use serde::{Deserialize, Serialize};

/// A single hub event, discriminated by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HubEvent {
    /// A task was added to the board.
    TaskCreated {
        /// Task id.
        task_id: String,
        /// Task title at creation time.
        title: String,
    },
    /// A task was assigned to an account.
    TaskAssigned {
        /// Task id.
        task_id: String,
        /// Assignee account name.
        assignee: String,
    },
    /// Work on a task began.
    TaskStarted {
        /// Task id.
        task_id: String,
    },
    /// A named milestone inside a task's work was reached.
    CheckpointReached {
        /// Task id.
        task_id: String,
        /// Checkpoint label.
        checkpoint: String,
    },
    /// A resource constraint (memory, disk, rate limit) is close to tripping.
    ResourceWarning {
        /// Task id, if the warning is task-scoped.
        task_id: Option<String>,
        /// Resource name.
        resource: String,
        /// Human-readable detail.
        detail: String,
    },
    /// A free-form progress note on a task.
    ProgressUpdate {
        /// Task id.
        task_id: String,
        /// Progress message.
        message: String,
    },
    /// A task is approaching its SLA threshold.
    SlaWarning {
        /// Task id.
        task_id: String,
        /// Minutes the task has been in its current status.
        elapsed_minutes: u64,
        /// Minutes allowed before breach.
        threshold_minutes: u64,
    },
    /// A task has exceeded its SLA threshold.
    SlaBreach {
        /// Task id.
        task_id: String,
        /// Minutes the task has been in its current status.
        elapsed_minutes: u64,
        /// Minutes allowed before breach.
        threshold_minutes: u64,
    },
    /// A task's work was completed and submitted for review.
    TaskCompleted {
        /// Task id.
        task_id: String,
    },
    /// A task's completed work was verified (accepted or rejected).
    TaskVerified {
        /// Task id.
        task_id: String,
        /// Whether verification accepted the work.
        accepted: bool,
    },
    /// A task was reassigned away from its previous assignee.
    Reassignment {
        /// Task id.
        task_id: String,
        /// Previous assignee, if any.
        from: Option<String>,
        /// New assignee.
        to: String,
        /// Reason for reassignment.
        reason: String,
    },
    /// A task was delegated through a chain of accounts.
    DelegationChain {
        /// Task id.
        task_id: String,
        /// Ordered chain of delegator account names.
        chain: Vec<String>,
    },
    /// An account's trust score changed.
    TrustUpdate {
        /// Account name.
        account: String,
        /// Signed delta applied.
        delta: i32,
        /// Resulting score.
        new_score: u32,
    },
    /// A test-driven-development cycle started for a task.
    TddCycleStart {
        /// Task id.
        task_id: String,
    },
    /// A test passed during a TDD cycle.
    TddTestPass {
        /// Task id.
        task_id: String,
        /// Test name.
        test_name: String,
    },
    /// A test failed during a TDD cycle.
    TddTestFail {
        /// Task id.
        task_id: String,
        /// Test name.
        test_name: String,
    },
    /// A refactor step ran during a TDD cycle.
    TddRefactor {
        /// Task id.
        task_id: String,
    },
}

impl HubEvent {
    /// Stable discriminant string, matching the `type` tag on the wire.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::TaskCreated { .. } => "TASK_CREATED",
            Self::TaskAssigned { .. } => "TASK_ASSIGNED",
            Self::TaskStarted { .. } => "TASK_STARTED",
            Self::CheckpointReached { .. } => "CHECKPOINT_REACHED",
            Self::ResourceWarning { .. } => "RESOURCE_WARNING",
            Self::ProgressUpdate { .. } => "PROGRESS_UPDATE",
            Self::SlaWarning { .. } => "SLA_WARNING",
            Self::SlaBreach { .. } => "SLA_BREACH",
            Self::TaskCompleted { .. } => "TASK_COMPLETED",
            Self::TaskVerified { .. } => "TASK_VERIFIED",
            Self::Reassignment { .. } => "REASSIGNMENT",
            Self::DelegationChain { .. } => "DELEGATION_CHAIN",
            Self::TrustUpdate { .. } => "TRUST_UPDATE",
            Self::TddCycleStart { .. } => "TDD_CYCLE_START",
            Self::TddTestPass { .. } => "TDD_TEST_PASS",
            Self::TddTestFail { .. } => "TDD_TEST_FAIL",
            Self::TddRefactor { .. } => "TDD_REFACTOR",
        }
    }

    /// The task id this event concerns, if any (`TrustUpdate` has none;
    /// `ResourceWarning` may have none).
    #[must_use]
    pub fn task_id(&self) -> Option<&str> {
        match self {
            Self::TaskCreated { task_id, .. }
            | Self::TaskAssigned { task_id, .. }
            | Self::TaskStarted { task_id }
            | Self::CheckpointReached { task_id, .. }
            | Self::ProgressUpdate { task_id, .. }
            | Self::SlaWarning { task_id, .. }
            | Self::SlaBreach { task_id, .. }
            | Self::TaskCompleted { task_id }
            | Self::TaskVerified { task_id, .. }
            | Self::Reassignment { task_id, .. }
            | Self::DelegationChain { task_id, .. }
            | Self::TddCycleStart { task_id }
            | Self::TddTestPass { task_id, .. }
            | Self::TddTestFail { task_id, .. }
            | Self::TddRefactor { task_id } => Some(task_id),
            Self::ResourceWarning { task_id, .. } => task_id.as_deref(),
            Self::TrustUpdate { .. } => None,
        }
    }
}

/// An event wrapped with the bus-assigned id and timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmittedEvent {
    /// Unique id assigned at emission time.
    pub id: String,
    /// ISO-8601 emission timestamp.
    pub at: String,
    /// The event payload.
    #[serde(flatten)]
    pub event: HubEvent,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_name_matches_wire_tag() {
        let event = HubEvent::TaskStarted {
            task_id: "t1".to_string(),
        };
        assert_eq!(event.type_name(), "TASK_STARTED");
    }

    #[test]
    fn task_id_absent_for_trust_update() {
        let event = HubEvent::TrustUpdate {
            account: "alice".to_string(),
            delta: 5,
            new_score: 55,
        };
        assert_eq!(event.task_id(), None);
    }

    #[test]
    fn task_id_present_for_task_scoped_events() {
        let event = HubEvent::CheckpointReached {
            task_id: "t1".to_string(),
            checkpoint: "tests-green".to_string(),
        };
        assert_eq!(event.task_id(), Some("t1"));
    }
}
