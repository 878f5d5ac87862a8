//! Adaptive SLA: reacts to external agent session pressure rather than raw
//! time-in-status. The cooldown map lives on the engine instance, never as
//! module-level state, so two engines (or two test cases) never interfere.

use std::collections::HashMap;

use actl_core::TaskStatus;
use chrono::{DateTime, Utc};

/// Observed phase of an external agent session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Actively producing work.
    Active,
    /// Active with at least one commit made.
    ActiveCommitted,
    /// No recent activity, session still open.
    Idle,
    /// Session has terminated.
    Ended,
}

/// Point-in-time metrics read from an injected session-metrics source.
#[derive(Debug, Clone, Copy)]
pub struct SessionMetrics {
    /// Current session phase.
    pub phase: SessionPhase,
    /// Current token burn rate (tokens/min).
    pub token_burn_rate: f64,
    /// Exponentially-tracked average burn rate for this task.
    pub task_avg_token_burn_rate: f64,
    /// Timestamp of the most recent checkpoint.
    pub last_checkpoint_at: DateTime<Utc>,
    /// Tokens consumed in the current context window.
    pub context_tokens: u64,
    /// Context window size for this agent type; `None` uses the engine default.
    pub context_window: Option<u64>,
    /// Minutes the agent has been unresponsive, if known.
    pub unresponsive_minutes: Option<f64>,
}

/// Task attributes the adaptive engine needs beyond status.
#[derive(Debug, Clone, Copy)]
pub struct TaskProfile {
    /// Business criticality.
    pub criticality: Criticality,
    /// Whether the task's effects cannot be undone once committed.
    pub irreversible: bool,
}

/// Task criticality tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Criticality {
    /// Routine work.
    Low,
    /// Default tier.
    Medium,
    /// Elevated stakes.
    High,
    /// Maximum stakes.
    Critical,
}

/// A detected pressure signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdaptiveTrigger {
    /// Burn rate more than double the task's tracked average.
    TokenBurnRate,
    /// No checkpoint within the configured window.
    NoCheckpoint,
    /// Context window usage above 80%.
    ContextSaturation,
    /// Session ended or went idle while the task is still in progress.
    SessionEndedIncomplete,
}

/// Coordinator action recommended for a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum AdaptiveAction {
    /// Nudge the agent.
    Ping,
    /// Suggest reassignment; a human or the caller decides.
    SuggestReassign,
    /// Reassign automatically without confirmation.
    AutoReassign,
    /// Page a human operator.
    EscalateHuman,
    /// Kill the agent's session.
    Terminate,
}

impl AdaptiveAction {
    fn is_reassignment(self) -> bool {
        matches!(self, Self::SuggestReassign | Self::AutoReassign)
    }
}

/// Outcome of evaluating one task against its current session metrics.
#[derive(Debug, Clone, PartialEq)]
pub struct AdaptiveDecision {
    /// The task this decision concerns.
    pub task_id: String,
    /// Triggers that fired, in detection order.
    pub triggers: Vec<AdaptiveTrigger>,
    /// Recommended action, or `None` if nothing fired or the task is in cooldown.
    pub action: Option<AdaptiveAction>,
}

/// Stateful adaptive SLA engine. Owns the per-task cooldown map so repeated
/// evaluation doesn't re-trigger a just-issued reassignment.
#[derive(Debug, Clone)]
pub struct AdaptiveSlaEngine {
    no_checkpoint_minutes: f64,
    cooldown_minutes: f64,
    default_context_window: u64,
    cooldowns: HashMap<String, DateTime<Utc>>,
}

impl Default for AdaptiveSlaEngine {
    fn default() -> Self {
        Self {
            no_checkpoint_minutes: 10.0,
            cooldown_minutes: 15.0,
            default_context_window: 200_000,
            cooldowns: HashMap::new(),
        }
    }
}

impl AdaptiveSlaEngine {
    /// Creates an engine with the documented defaults (10 min no-checkpoint
    /// window, 15 min cooldown, 200k default context window).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn detect_triggers(&self, metrics: &SessionMetrics, status: TaskStatus, now: DateTime<Utc>) -> Vec<AdaptiveTrigger> {
        let mut triggers = Vec::new();
        if metrics.task_avg_token_burn_rate > 0.0
            && metrics.token_burn_rate > 2.0 * metrics.task_avg_token_burn_rate
        {
            triggers.push(AdaptiveTrigger::TokenBurnRate);
        }
        let minutes_since_checkpoint =
            (now - metrics.last_checkpoint_at).num_seconds() as f64 / 60.0;
        if minutes_since_checkpoint > self.no_checkpoint_minutes {
            triggers.push(AdaptiveTrigger::NoCheckpoint);
        }
        let window = metrics.context_window.unwrap_or(self.default_context_window);
        if window > 0 && metrics.context_tokens as f64 / window as f64 > 0.80 {
            triggers.push(AdaptiveTrigger::ContextSaturation);
        }
        if matches!(metrics.phase, SessionPhase::Idle | SessionPhase::Ended)
            && status == TaskStatus::InProgress
        {
            triggers.push(AdaptiveTrigger::SessionEndedIncomplete);
        }
        triggers
    }

    fn base_action(trigger: AdaptiveTrigger, profile: &TaskProfile) -> AdaptiveAction {
        match trigger {
            AdaptiveTrigger::TokenBurnRate | AdaptiveTrigger::NoCheckpoint => AdaptiveAction::Ping,
            AdaptiveTrigger::ContextSaturation => {
                if profile.criticality >= Criticality::High {
                    AdaptiveAction::AutoReassign
                } else {
                    AdaptiveAction::SuggestReassign
                }
            }
            AdaptiveTrigger::SessionEndedIncomplete => {
                if profile.criticality == Criticality::Critical {
                    AdaptiveAction::AutoReassign
                } else {
                    AdaptiveAction::SuggestReassign
                }
            }
        }
    }

    /// Evaluates one task's session metrics and returns the recommended
    /// action, updating the engine's cooldown state as a side effect.
    pub fn evaluate(
        &mut self,
        task_id: &str,
        status: TaskStatus,
        profile: &TaskProfile,
        metrics: &SessionMetrics,
        now: DateTime<Utc>,
    ) -> AdaptiveDecision {
        let triggers = self.detect_triggers(metrics, status, now);
        if triggers.is_empty() {
            return AdaptiveDecision {
                task_id: task_id.to_string(),
                triggers,
                action: None,
            };
        }

        let mut action = triggers
            .iter()
            .map(|t| Self::base_action(*t, profile))
            .max()
            .expect("triggers is non-empty");

        if profile.irreversible && action < AdaptiveAction::EscalateHuman {
            action = AdaptiveAction::EscalateHuman;
        }

        if let Some(unresponsive) = metrics.unresponsive_minutes {
            if unresponsive > 2.0 * self.no_checkpoint_minutes {
                action = AdaptiveAction::Terminate;
            }
        }

        if action.is_reassignment() {
            if let Some(until) = self.cooldowns.get(task_id) {
                if now < *until {
                    return AdaptiveDecision {
                        task_id: task_id.to_string(),
                        triggers,
                        action: None,
                    };
                }
            }
            self.cooldowns.insert(
                task_id.to_string(),
                now + chrono::Duration::minutes(self.cooldown_minutes as i64),
            );
        }

        AdaptiveDecision {
            task_id: task_id.to_string(),
            triggers,
            action: Some(action),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics_with_checkpoint(now: DateTime<Utc>, minutes_ago: i64) -> SessionMetrics {
        SessionMetrics {
            phase: SessionPhase::Active,
            token_burn_rate: 0.0,
            task_avg_token_burn_rate: 0.0,
            last_checkpoint_at: now - chrono::Duration::minutes(minutes_ago),
            context_tokens: 0,
            context_window: None,
            unresponsive_minutes: None,
        }
    }

    fn profile(criticality: Criticality, irreversible: bool) -> TaskProfile {
        TaskProfile { criticality, irreversible }
    }

    #[test]
    fn no_checkpoint_past_window_pings() {
        let now = Utc::now();
        let mut engine = AdaptiveSlaEngine::new();
        let metrics = metrics_with_checkpoint(now, 11);
        let decision = engine.evaluate(
            "t1",
            TaskStatus::InProgress,
            &profile(Criticality::Medium, false),
            &metrics,
            now,
        );
        assert_eq!(decision.action, Some(AdaptiveAction::Ping));
    }

    #[test]
    fn context_saturation_auto_reassigns_when_high_criticality() {
        let now = Utc::now();
        let mut engine = AdaptiveSlaEngine::new();
        let mut metrics = metrics_with_checkpoint(now, 1);
        metrics.context_tokens = 180_000;
        let decision = engine.evaluate(
            "t1",
            TaskStatus::InProgress,
            &profile(Criticality::High, false),
            &metrics,
            now,
        );
        assert_eq!(decision.action, Some(AdaptiveAction::AutoReassign));
    }

    #[test]
    fn irreversible_task_always_escalates_to_human() {
        let now = Utc::now();
        let mut engine = AdaptiveSlaEngine::new();
        let metrics = metrics_with_checkpoint(now, 11);
        let decision = engine.evaluate(
            "t1",
            TaskStatus::InProgress,
            &profile(Criticality::Low, true),
            &metrics,
            now,
        );
        assert_eq!(decision.action, Some(AdaptiveAction::EscalateHuman));
    }

    #[test]
    fn unresponsive_agent_forces_terminate() {
        let now = Utc::now();
        let mut engine = AdaptiveSlaEngine::new();
        let mut metrics = metrics_with_checkpoint(now, 11);
        metrics.unresponsive_minutes = Some(25.0);
        let decision = engine.evaluate(
            "t1",
            TaskStatus::InProgress,
            &profile(Criticality::Low, false),
            &metrics,
            now,
        );
        assert_eq!(decision.action, Some(AdaptiveAction::Terminate));
    }

    #[test]
    fn reassignment_suppressed_during_cooldown() {
        let now = Utc::now();
        let mut engine = AdaptiveSlaEngine::new();
        let mut metrics = metrics_with_checkpoint(now, 1);
        metrics.context_tokens = 180_000;
        let first = engine.evaluate(
            "t1",
            TaskStatus::InProgress,
            &profile(Criticality::Low, false),
            &metrics,
            now,
        );
        assert_eq!(first.action, Some(AdaptiveAction::SuggestReassign));

        let second = engine.evaluate(
            "t1",
            TaskStatus::InProgress,
            &profile(Criticality::Low, false),
            &metrics,
            now + chrono::Duration::minutes(1),
        );
        assert_eq!(second.action, None);
    }

    #[test]
    fn session_ended_incomplete_only_fires_while_in_progress() {
        let now = Utc::now();
        let mut engine = AdaptiveSlaEngine::new();
        let mut metrics = metrics_with_checkpoint(now, 1);
        metrics.phase = SessionPhase::Ended;
        let decision = engine.evaluate(
            "t1",
            TaskStatus::Accepted,
            &profile(Criticality::Low, false),
            &metrics,
            now,
        );
        assert!(decision.triggers.is_empty());
    }
}
