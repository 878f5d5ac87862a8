//! The on-disk session-state shape and the pure transition-detection logic.
//! Kept separate from the `notify` wiring in [`crate::watcher`] so the
//! interesting behavior is testable without touching a real filesystem.

use std::collections::HashMap;

use actl_events::HubEvent;
use serde::Deserialize;

/// Observed phase of an external agent session, mirroring the phase set
/// the adaptive SLA engine reasons about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
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

/// External agent session state, as written to `<dir>/<session_id>.json`.
/// Every field but `session_id` and `phase` is optional so that a partial
/// or still-being-written file still parses — readers skip what they can't
/// make sense of rather than treating it as corrupt.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionFile {
    /// Stable session identifier, also the file's stem.
    pub session_id: String,
    /// Current lifecycle phase.
    pub phase: SessionPhase,
    /// Monotonic count of checkpoints reached so far.
    #[serde(default)]
    pub checkpoint_count: u64,
    /// Cumulative tokens consumed so far.
    #[serde(default)]
    pub tokens_total: u64,
    /// Files touched so far, in first-touched order.
    #[serde(default)]
    pub files_touched: Vec<String>,
    /// Tokens consumed in the current context window, if reported.
    #[serde(default)]
    pub context_tokens: Option<u64>,
    /// Context window size for this agent type, if reported.
    #[serde(default)]
    pub context_window: Option<u64>,
}

/// Correlation state the watcher keeps across file-change events.
#[derive(Debug, Default)]
pub struct Correlation {
    session_to_task: HashMap<String, String>,
    session_to_expected_files: HashMap<String, usize>,
}

impl Correlation {
    /// Records that `session_id` corresponds to `task_id` and is expected
    /// to touch `expected_files` files before completion.
    pub fn set(&mut self, session_id: &str, task_id: &str, expected_files: Option<usize>) {
        self.session_to_task
            .insert(session_id.to_string(), task_id.to_string());
        if let Some(n) = expected_files {
            self.session_to_expected_files.insert(session_id.to_string(), n);
        }
    }

    /// The task id for `session_id`, falling back to the session id itself
    /// when no correlation has been recorded.
    #[must_use]
    pub fn task_id_for(&self, session_id: &str) -> String {
        self.session_to_task
            .get(session_id)
            .cloned()
            .unwrap_or_else(|| session_id.to_string())
    }

    /// The expected file count for `session_id`, if known.
    #[must_use]
    pub fn expected_files_for(&self, session_id: &str) -> Option<usize> {
        self.session_to_expected_files.get(session_id).copied()
    }
}

fn is_active(phase: SessionPhase) -> bool {
    matches!(phase, SessionPhase::Active | SessionPhase::ActiveCommitted)
}

/// Computes the checkpoint percent for a transition: file-count based when
/// the expected total is known, otherwise a flat `15%` per checkpoint,
/// capped at 95 (100 is reserved for actual completion).
#[must_use]
pub fn checkpoint_percent(checkpoint_count: u64, files_touched: usize, expected_files: Option<usize>) -> u32 {
    let percent = match expected_files {
        Some(expected) if expected > 0 => {
            ((files_touched as f64 / expected as f64) * 100.0).round() as u32
        }
        _ => 15 * u32::try_from(checkpoint_count).unwrap_or(u32::MAX),
    };
    percent.min(95)
}

/// Diffs `previous` (if any baseline exists) against `current`, producing
/// the lifecycle events the transition implies. `correlation` supplies the
/// task id and resolves file-count-based checkpoint percentages.
#[must_use]
pub fn diff_session(
    previous: Option<&SessionFile>,
    current: &SessionFile,
    correlation: &Correlation,
) -> Vec<HubEvent> {
    let task_id = correlation.task_id_for(&current.session_id);
    let mut events = Vec::new();

    let was_active = previous.is_some_and(|p| is_active(p.phase));
    let now_active = is_active(current.phase);
    if !was_active && now_active {
        events.push(HubEvent::TaskStarted {
            task_id: task_id.clone(),
        });
    }

    let prev_checkpoints = previous.map_or(0, |p| p.checkpoint_count);
    if current.checkpoint_count > prev_checkpoints {
        let expected = correlation.expected_files_for(&current.session_id);
        let percent = checkpoint_percent(current.checkpoint_count, current.files_touched.len(), expected);
        events.push(HubEvent::CheckpointReached {
            task_id: task_id.clone(),
            checkpoint: format!("{percent}%"),
        });
    }

    let prev_tokens = previous.map_or(0, |p| p.tokens_total);
    if current.tokens_total > prev_tokens {
        let delta = current.tokens_total - prev_tokens;
        events.push(HubEvent::ProgressUpdate {
            task_id: task_id.clone(),
            message: format!("tokens: {}, burn rate: {delta}/tick", current.tokens_total),
        });
        if let (Some(tokens), Some(window)) = (current.context_tokens, current.context_window) {
            if window > 0 && tokens as f64 / window as f64 > 0.80 {
                events.push(HubEvent::ResourceWarning {
                    task_id: Some(task_id.clone()),
                    resource: "context_window".to_string(),
                    detail: format!("{tokens}/{window} tokens used"),
                });
            }
        }
    }

    let prev_files = previous.map_or(0, |p| p.files_touched.len());
    if current.files_touched.len() > prev_files {
        events.push(HubEvent::ProgressUpdate {
            task_id: task_id.clone(),
            message: format!("files touched: {}", current.files_touched.join(", ")),
        });
    }

    if was_active && !now_active {
        let success = current.phase == SessionPhase::Ended;
        events.push(HubEvent::TaskCompleted {
            task_id: task_id.clone(),
        });
        events.push(HubEvent::CheckpointReached {
            task_id,
            checkpoint: if success { "session_ended" } else { "session_idle" }.to_string(),
        });
    }

    events
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(phase: SessionPhase, checkpoints: u64, tokens: u64, files: &[&str]) -> SessionFile {
        SessionFile {
            session_id: "s1".to_string(),
            phase,
            checkpoint_count: checkpoints,
            tokens_total: tokens,
            files_touched: files.iter().map(|s| (*s).to_string()).collect(),
            context_tokens: None,
            context_window: None,
        }
    }

    #[test]
    fn idle_to_active_emits_task_started() {
        let prev = session(SessionPhase::Idle, 0, 0, &[]);
        let cur = session(SessionPhase::Active, 0, 0, &[]);
        let events = diff_session(Some(&prev), &cur, &Correlation::default());
        assert!(events
            .iter()
            .any(|e| matches!(e, HubEvent::TaskStarted { .. })));
    }

    #[test]
    fn no_baseline_and_active_emits_task_started() {
        let cur = session(SessionPhase::Active, 0, 0, &[]);
        let events = diff_session(None, &cur, &Correlation::default());
        assert!(events
            .iter()
            .any(|e| matches!(e, HubEvent::TaskStarted { .. })));
    }

    #[test]
    fn checkpoint_increase_emits_checkpoint_reached() {
        let prev = session(SessionPhase::Active, 1, 0, &[]);
        let cur = session(SessionPhase::Active, 2, 0, &[]);
        let events = diff_session(Some(&prev), &cur, &Correlation::default());
        assert!(events
            .iter()
            .any(|e| matches!(e, HubEvent::CheckpointReached { .. })));
    }

    #[test]
    fn token_increase_emits_progress_and_saturation_warning() {
        let mut prev = session(SessionPhase::Active, 0, 100, &[]);
        prev.context_tokens = Some(50_000);
        prev.context_window = Some(200_000);
        let mut cur = session(SessionPhase::Active, 0, 500, &[]);
        cur.context_tokens = Some(180_000);
        cur.context_window = Some(200_000);
        let events = diff_session(Some(&prev), &cur, &Correlation::default());
        assert!(events
            .iter()
            .any(|e| matches!(e, HubEvent::ProgressUpdate { .. })));
        assert!(events
            .iter()
            .any(|e| matches!(e, HubEvent::ResourceWarning { .. })));
    }

    #[test]
    fn active_to_ended_emits_task_completed() {
        let prev = session(SessionPhase::Active, 0, 0, &[]);
        let cur = session(SessionPhase::Ended, 0, 0, &[]);
        let events = diff_session(Some(&prev), &cur, &Correlation::default());
        assert!(events
            .iter()
            .any(|e| matches!(e, HubEvent::TaskCompleted { .. })));
    }

    #[test]
    fn checkpoint_percent_uses_file_ratio_when_expected_known() {
        assert_eq!(checkpoint_percent(1, 2, Some(4)), 50);
        assert_eq!(checkpoint_percent(1, 10, Some(4)), 95);
    }

    #[test]
    fn checkpoint_percent_falls_back_to_step_based_ratio() {
        assert_eq!(checkpoint_percent(3, 0, None), 45);
        assert_eq!(checkpoint_percent(20, 0, None), 95);
    }

    #[test]
    fn correlation_resolves_task_id_or_falls_back_to_session_id() {
        let mut correlation = Correlation::default();
        assert_eq!(correlation.task_id_for("s1"), "s1");
        correlation.set("s1", "t1", Some(3));
        assert_eq!(correlation.task_id_for("s1"), "t1");
        assert_eq!(correlation.expected_files_for("s1"), Some(3));
    }
}
