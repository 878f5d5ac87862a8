//! Per-agent failure tracking, quarantine, and the routing gate.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use actl_core::{Task, TaskStatus};
use actl_events::{EventBus, HubEvent};
use actl_tasks::TaskBoard;
use chrono::{DateTime, Utc};

use crate::error::BreakerError;

const CONSECUTIVE_FAILURE_LIMIT: u32 = 3;
const TRUST_WINDOW_HOURS: i64 = 24;
const TRUST_DROP_LIMIT: i64 = -20;
const NO_PROGRESS_MINUTES: f64 = 30.0;

/// Why an agent was quarantined, for the activity log.
#[derive(Debug, Clone, PartialEq)]
pub struct QuarantineRecord {
    /// Human-readable reason.
    pub reason: String,
    /// When the quarantine took effect.
    pub at: DateTime<Utc>,
}

/// Tracks per-agent failure signals and gates routing for quarantined agents.
#[derive(Debug)]
pub struct CircuitBreaker {
    bus: Arc<EventBus>,
    consecutive_failures: HashMap<String, u32>,
    trust_deltas: HashMap<String, Vec<(DateTime<Utc>, i64)>>,
    last_progress_at: HashMap<String, DateTime<Utc>>,
    quarantined: HashMap<String, QuarantineRecord>,
}

impl CircuitBreaker {
    /// Creates a breaker that emits `REASSIGNMENT` events on `bus`.
    #[must_use]
    pub fn new(bus: Arc<EventBus>) -> Self {
        Self {
            bus,
            consecutive_failures: HashMap::new(),
            trust_deltas: HashMap::new(),
            last_progress_at: HashMap::new(),
            quarantined: HashMap::new(),
        }
    }

    /// Records a task outcome for `agent`: increments the consecutive-failure
    /// counter on failure, resets it on success.
    pub fn record_completion(&mut self, agent: &str, success: bool) {
        if success {
            self.consecutive_failures.remove(agent);
        } else {
            *self.consecutive_failures.entry(agent.to_string()).or_insert(0) += 1;
        }
    }

    /// Records a trust-score delta for `agent`, pruning entries older than
    /// the 24-hour window as a side effect.
    pub fn record_trust_update(&mut self, agent: &str, delta: i64, now: DateTime<Utc>) {
        let history = self.trust_deltas.entry(agent.to_string()).or_default();
        history.push((now, delta));
        history.retain(|(at, _)| now - *at <= chrono::Duration::hours(TRUST_WINDOW_HOURS));
    }

    /// Records that `agent` reported progress, resetting its no-progress clock.
    pub fn record_progress(&mut self, agent: &str, now: DateTime<Utc>) {
        self.last_progress_at.insert(agent.to_string(), now);
    }

    fn trust_sum(&self, agent: &str, now: DateTime<Utc>) -> i64 {
        self.trust_deltas
            .get(agent)
            .into_iter()
            .flatten()
            .filter(|(at, _)| now - *at <= chrono::Duration::hours(TRUST_WINDOW_HOURS))
            .map(|(_, delta)| delta)
            .sum()
    }

    fn no_progress_minutes(&self, agent: &str, now: DateTime<Utc>) -> Option<f64> {
        self.last_progress_at
            .get(agent)
            .map(|at| (now - *at).num_seconds() as f64 / 60.0)
    }

    /// Returns a quarantine reason if `agent` has crossed any threshold and
    /// isn't already quarantined; `None` otherwise.
    #[must_use]
    pub fn should_quarantine(&self, agent: &str, now: DateTime<Utc>) -> Option<String> {
        if self.quarantined.contains_key(agent) {
            return None;
        }
        let failures = self.consecutive_failures.get(agent).copied().unwrap_or(0);
        if failures >= CONSECUTIVE_FAILURE_LIMIT {
            return Some(format!("{failures} consecutive task failures"));
        }
        let trust_sum = self.trust_sum(agent, now);
        if trust_sum <= TRUST_DROP_LIMIT {
            return Some(format!("trust dropped {trust_sum} over the last 24h"));
        }
        if let Some(minutes) = self.no_progress_minutes(agent, now) {
            if minutes > NO_PROGRESS_MINUTES {
                return Some(format!("no progress report for {minutes:.0} min"));
            }
        }
        None
    }

    /// Returns `true` when `agent` may be routed new work.
    #[must_use]
    pub fn check_agent(&self, agent: &str) -> bool {
        !self.quarantined.contains_key(agent)
    }

    /// Returns the quarantine record for `agent`, if any.
    #[must_use]
    pub fn quarantine_record(&self, agent: &str) -> Option<&QuarantineRecord> {
        self.quarantined.get(agent)
    }

    /// Quarantines `agent`: loads the task board from `tasks_path`, unassigns
    /// every `todo`/`in_progress` task owned by `agent`, emits `REASSIGNMENT`
    /// for each, and saves the board back. Returns the ids unassigned.
    pub fn quarantine_agent(
        &mut self,
        agent: &str,
        reason: impl Into<String>,
        tasks_path: &Path,
        now: DateTime<Utc>,
    ) -> Result<Vec<String>, BreakerError> {
        let reason = reason.into();
        let tasks: Vec<Task> = actl_filestore::atomic_read(tasks_path)?.unwrap_or_default();
        let mut board = TaskBoard::from_tasks(tasks);

        let owned: Vec<String> = board
            .tasks()
            .iter()
            .filter(|t| {
                t.assignee.as_deref() == Some(agent)
                    && matches!(t.status, TaskStatus::Todo | TaskStatus::InProgress)
            })
            .map(|t| t.id.clone())
            .collect();

        for task_id in &owned {
            board = actl_tasks::unassign_task(&board, task_id)?;
            self.bus.emit(HubEvent::Reassignment {
                task_id: task_id.clone(),
                from: Some(agent.to_string()),
                to: "unassigned".to_string(),
                reason: reason.clone(),
            });
        }

        actl_filestore::atomic_write(tasks_path, &board.tasks().to_vec())?;

        self.quarantined
            .insert(agent.to_string(), QuarantineRecord { reason, at: now });
        self.consecutive_failures.remove(agent);

        Ok(owned)
    }

    /// Removes `agent`'s quarantine and resets its failure counter.
    ///
    /// # Errors
    ///
    /// Returns [`BreakerError::NotQuarantined`] if `agent` wasn't quarantined.
    pub fn reinstate_agent(&mut self, agent: &str) -> Result<(), BreakerError> {
        if self.quarantined.remove(agent).is_none() {
            return Err(BreakerError::NotQuarantined(agent.to_string()));
        }
        self.consecutive_failures.remove(agent);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actl_core::{Priority, TaskEvent};
    use std::collections::BTreeSet;
    use tempfile::tempdir;

    fn task(id: &str, status: TaskStatus, assignee: Option<&str>) -> Task {
        Task {
            id: id.to_string(),
            title: "x".into(),
            status,
            assignee: assignee.map(str::to_string),
            created_at: Utc::now().to_rfc3339(),
            priority: Some(Priority::P1),
            due_date: None,
            tags: BTreeSet::new(),
            events: vec![TaskEvent::StatusChanged {
                from: TaskStatus::Todo,
                to: status,
                at: Utc::now().to_rfc3339(),
            }],
            workspace: None,
        }
    }

    #[test]
    fn three_consecutive_failures_trigger_quarantine_reason() {
        let bus = Arc::new(EventBus::new());
        let mut breaker = CircuitBreaker::new(bus);
        let now = Utc::now();
        breaker.record_completion("alice", false);
        breaker.record_completion("alice", false);
        assert!(breaker.should_quarantine("alice", now).is_none());
        breaker.record_completion("alice", false);
        assert!(breaker.should_quarantine("alice", now).is_some());
    }

    #[test]
    fn success_resets_failure_counter() {
        let bus = Arc::new(EventBus::new());
        let mut breaker = CircuitBreaker::new(bus);
        breaker.record_completion("alice", false);
        breaker.record_completion("alice", false);
        breaker.record_completion("alice", true);
        assert!(breaker.should_quarantine("alice", Utc::now()).is_none());
    }

    #[test]
    fn trust_drop_over_24h_triggers_quarantine() {
        let bus = Arc::new(EventBus::new());
        let mut breaker = CircuitBreaker::new(bus);
        let now = Utc::now();
        breaker.record_trust_update("bob", -10, now);
        breaker.record_trust_update("bob", -15, now);
        assert!(breaker.should_quarantine("bob", now).is_some());
    }

    #[test]
    fn stale_trust_deltas_fall_out_of_window() {
        let bus = Arc::new(EventBus::new());
        let mut breaker = CircuitBreaker::new(bus);
        let now = Utc::now();
        breaker.record_trust_update("bob", -30, now - chrono::Duration::hours(25));
        assert!(breaker.should_quarantine("bob", now).is_none());
    }

    #[test]
    fn no_progress_past_30_minutes_triggers_quarantine() {
        let bus = Arc::new(EventBus::new());
        let mut breaker = CircuitBreaker::new(bus);
        let now = Utc::now();
        breaker.record_progress("carol", now - chrono::Duration::minutes(31));
        assert!(breaker.should_quarantine("carol", now).is_some());
    }

    #[test]
    fn quarantine_unassigns_owned_tasks_and_emits_reassignment() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tasks.json");
        let tasks = vec![
            task("t1", TaskStatus::InProgress, Some("dan")),
            task("t2", TaskStatus::Todo, Some("dan")),
            task("t3", TaskStatus::InProgress, Some("erin")),
            task("t4", TaskStatus::Accepted, Some("dan")),
        ];
        actl_filestore::atomic_write(&path, &tasks).unwrap();

        let bus = Arc::new(EventBus::new());
        let mut breaker = CircuitBreaker::new(Arc::clone(&bus));
        let unassigned = breaker
            .quarantine_agent("dan", "3 consecutive failures", &path, Utc::now())
            .unwrap();

        assert_eq!(unassigned, vec!["t1".to_string(), "t2".to_string()]);
        assert!(!breaker.check_agent("dan"));
        assert!(breaker.check_agent("erin"));

        let saved: Vec<Task> = actl_filestore::atomic_read(&path).unwrap().unwrap();
        let t1 = saved.iter().find(|t| t.id == "t1").unwrap();
        assert_eq!(t1.assignee, None);
        let t4 = saved.iter().find(|t| t.id == "t4").unwrap();
        assert_eq!(t4.assignee, Some("dan".to_string()));

        let recent = bus.recent(Some("REASSIGNMENT"), Some(10));
        assert_eq!(recent.len(), 2);
    }

    #[test]
    fn reinstate_clears_quarantine_and_counter() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tasks.json");
        actl_filestore::atomic_write(&path, &Vec::<Task>::new()).unwrap();
        let bus = Arc::new(EventBus::new());
        let mut breaker = CircuitBreaker::new(bus);
        breaker
            .quarantine_agent("dan", "test", &path, Utc::now())
            .unwrap();
        assert!(!breaker.check_agent("dan"));
        breaker.reinstate_agent("dan").unwrap();
        assert!(breaker.check_agent("dan"));
    }

    #[test]
    fn reinstate_unknown_agent_errors() {
        let bus = Arc::new(EventBus::new());
        let mut breaker = CircuitBreaker::new(bus);
        assert!(breaker.reinstate_agent("ghost").is_err());
    }
}
