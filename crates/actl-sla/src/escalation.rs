//! Stale-task scanning: the fixed-cadence SLA sweep over the task board.

use actl_core::{Task, TaskStatus};
use chrono::{DateTime, Utc};

/// Action an escalation recommends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EscalationAction {
    /// Nudge the assignee; no state change.
    Ping,
    /// Suggest the task be reassigned; the caller decides whether to act.
    ReassignSuggestion,
    /// Raise the issue to a human operator immediately.
    Escalate,
}

impl EscalationAction {
    fn emoji(self) -> &'static str {
        match self {
            Self::Ping => "⏰",
            Self::ReassignSuggestion => "⚠️",
            Self::Escalate => "🚨",
        }
    }
}

/// One staleness finding for a task.
#[derive(Debug, Clone, PartialEq)]
pub struct Escalation {
    /// The stale task's id.
    pub task_id: String,
    /// Recommended action.
    pub action: EscalationAction,
    /// How long the task has sat in its current status, in minutes.
    pub staleness_minutes: f64,
    /// Whether the `blocked` tag drove this escalation.
    pub blocked: bool,
}

/// Thresholds (in minutes) driving the stale-task sweep. Defaults match the
/// documented cadence: 30 min for an in-progress ping, 60 for a reassign
/// suggestion, 15 for a blocked in-progress escalation, 10 for a
/// ready-for-review ping.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlaThresholds {
    /// Minutes an `in_progress` task may sit before a ping.
    pub in_progress_ping_minutes: f64,
    /// Minutes an `in_progress` task may sit before a reassign suggestion.
    pub in_progress_reassign_minutes: f64,
    /// Minutes a `blocked`-tagged `in_progress` task may sit before escalation.
    pub blocked_escalate_minutes: f64,
    /// Minutes a `ready_for_review` task may sit before a ping.
    pub ready_for_review_ping_minutes: f64,
}

impl Default for SlaThresholds {
    fn default() -> Self {
        Self {
            in_progress_ping_minutes: 30.0,
            in_progress_reassign_minutes: 60.0,
            blocked_escalate_minutes: 15.0,
            ready_for_review_ping_minutes: 10.0,
        }
    }
}

fn staleness_minutes(task: &Task, now: DateTime<Utc>) -> Option<f64> {
    let entered = task.entered_status_at(task.status);
    let entered_at = DateTime::parse_from_rfc3339(entered).ok()?.with_timezone(&Utc);
    Some((now - entered_at).num_seconds() as f64 / 60.0)
}

/// Scans `tasks` for staleness and returns one [`Escalation`] per offending
/// task. A `blocked`-tagged in-progress task past its escalate threshold
/// produces only the `Escalate` finding, not also a ping or reassign one.
#[must_use]
pub fn scan_for_escalations(
    tasks: &[Task],
    now: DateTime<Utc>,
    thresholds: &SlaThresholds,
) -> Vec<Escalation> {
    let mut escalations = Vec::new();
    for task in tasks {
        let Some(minutes) = staleness_minutes(task, now) else {
            continue;
        };
        match task.status {
            TaskStatus::InProgress => {
                let blocked = task.tags.contains("blocked");
                if blocked && minutes > thresholds.blocked_escalate_minutes {
                    escalations.push(Escalation {
                        task_id: task.id.clone(),
                        action: EscalationAction::Escalate,
                        staleness_minutes: minutes,
                        blocked: true,
                    });
                } else if minutes > thresholds.in_progress_reassign_minutes {
                    escalations.push(Escalation {
                        task_id: task.id.clone(),
                        action: EscalationAction::ReassignSuggestion,
                        staleness_minutes: minutes,
                        blocked,
                    });
                } else if minutes > thresholds.in_progress_ping_minutes {
                    escalations.push(Escalation {
                        task_id: task.id.clone(),
                        action: EscalationAction::Ping,
                        staleness_minutes: minutes,
                        blocked,
                    });
                }
            }
            TaskStatus::ReadyForReview => {
                if minutes > thresholds.ready_for_review_ping_minutes {
                    escalations.push(Escalation {
                        task_id: task.id.clone(),
                        action: EscalationAction::Ping,
                        staleness_minutes: minutes,
                        blocked: false,
                    });
                }
            }
            _ => {}
        }
    }
    escalations
}

/// Renders a human-readable line for an escalation, prefixed with an emoji
/// keyed to its action severity.
#[must_use]
pub fn format_escalation_message(escalation: &Escalation) -> String {
    format!(
        "{} task {} stale {:.0} min in current status{}",
        escalation.action.emoji(),
        escalation.task_id,
        escalation.staleness_minutes,
        if escalation.blocked { " (blocked)" } else { "" }
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn task_at(status: TaskStatus, minutes_ago: i64, tags: &[&str]) -> Task {
        let now = Utc::now();
        let entered = now - chrono::Duration::minutes(minutes_ago);
        Task {
            id: "t1".into(),
            title: "x".into(),
            status,
            assignee: Some("alice".into()),
            created_at: entered.to_rfc3339(),
            priority: None,
            due_date: None,
            tags: tags.iter().map(|s| s.to_string()).collect::<BTreeSet<_>>(),
            events: vec![actl_core::TaskEvent::StatusChanged {
                from: TaskStatus::Todo,
                to: status,
                at: entered.to_rfc3339(),
            }],
            workspace: None,
        }
    }

    #[test]
    fn in_progress_35_minutes_pings() {
        let task = task_at(TaskStatus::InProgress, 35, &[]);
        let escalations = scan_for_escalations(&[task], Utc::now(), &SlaThresholds::default());
        assert_eq!(escalations.len(), 1);
        assert_eq!(escalations[0].action, EscalationAction::Ping);
    }

    #[test]
    fn in_progress_65_minutes_suggests_reassign() {
        let task = task_at(TaskStatus::InProgress, 65, &[]);
        let escalations = scan_for_escalations(&[task], Utc::now(), &SlaThresholds::default());
        assert_eq!(escalations[0].action, EscalationAction::ReassignSuggestion);
    }

    #[test]
    fn blocked_in_progress_20_minutes_escalates() {
        let task = task_at(TaskStatus::InProgress, 20, &["blocked"]);
        let escalations = scan_for_escalations(&[task], Utc::now(), &SlaThresholds::default());
        assert_eq!(escalations[0].action, EscalationAction::Escalate);
        assert!(escalations[0].blocked);
    }

    #[test]
    fn ready_for_review_11_minutes_pings() {
        let task = task_at(TaskStatus::ReadyForReview, 11, &[]);
        let escalations = scan_for_escalations(&[task], Utc::now(), &SlaThresholds::default());
        assert_eq!(escalations[0].action, EscalationAction::Ping);
    }

    #[test]
    fn fresh_task_produces_nothing() {
        let task = task_at(TaskStatus::InProgress, 2, &[]);
        let escalations = scan_for_escalations(&[task], Utc::now(), &SlaThresholds::default());
        assert!(escalations.is_empty());
    }

    #[test]
    fn message_carries_emoji_prefix() {
        let escalation = Escalation {
            task_id: "t1".into(),
            action: EscalationAction::Escalate,
            staleness_minutes: 20.0,
            blocked: true,
        };
        let message = format_escalation_message(&escalation);
        assert!(message.starts_with("🚨"));
        assert!(message.contains("blocked"));
    }
}
