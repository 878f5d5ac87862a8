//! Independent interval loops: stale-task SLA sweeps, adaptive
//! session-pressure evaluation, and circuit-breaker maintenance. Each loop
//! catches and logs its own per-iteration failures rather than ever
//! crashing the process — a bad scan is a missed cycle, not an outage.

use std::collections::HashMap;
use std::sync::Arc;

use actl_events::HubEvent;
use actl_sla::{scan_for_escalations, Criticality, EscalationAction, SessionMetrics, SessionPhase, SlaThresholds, TaskProfile};
use chrono::Utc;

use crate::error::{filestore_error, task_error};
use crate::state::DaemonState;

/// Spawns every background loop, returning immediately; the loops run for
/// the lifetime of the process.
pub fn spawn_all(state: Arc<DaemonState>) {
    tokio::spawn(sla_scan_loop(Arc::clone(&state)));
    tokio::spawn(adaptive_sla_loop(Arc::clone(&state)));
    tokio::spawn(breaker_maintenance_loop(state));
}

async fn sla_scan_loop(state: Arc<DaemonState>) {
    let mut ticker = tokio::time::interval(state.intervals.sla_scan);
    let thresholds = SlaThresholds::default();
    loop {
        ticker.tick().await;
        let board = match state.board.load() {
            Ok(board) => board,
            Err(err) => {
                tracing::warn!(error = %filestore_error(err), "sla scan: failed to load board");
                continue;
            }
        };
        let now = Utc::now();
        for escalation in scan_for_escalations(board.tasks(), now, &thresholds) {
            let elapsed = escalation.staleness_minutes.round() as u64;
            tracing::info!(
                task_id = %escalation.task_id,
                action = ?escalation.action,
                minutes = elapsed,
                "stale task"
            );
            let event = match escalation.action {
                EscalationAction::Escalate => HubEvent::SlaBreach {
                    task_id: escalation.task_id,
                    elapsed_minutes: elapsed,
                    threshold_minutes: thresholds.blocked_escalate_minutes.round() as u64,
                },
                EscalationAction::Ping | EscalationAction::ReassignSuggestion => HubEvent::SlaWarning {
                    task_id: escalation.task_id,
                    elapsed_minutes: elapsed,
                    threshold_minutes: thresholds.in_progress_ping_minutes.round() as u64,
                },
            };
            state.bus.emit(event);
        }
    }
}

/// Per-session burn-rate tracking the adaptive loop needs between ticks;
/// session files on disk carry cumulative totals, not rates.
#[derive(Default)]
struct BurnRateTracker {
    last_tokens: HashMap<String, (u64, chrono::DateTime<Utc>)>,
}

impl BurnRateTracker {
    fn observe(&mut self, session_id: &str, tokens_total: u64, now: chrono::DateTime<Utc>) -> f64 {
        let rate = match self.last_tokens.get(session_id) {
            Some((prev_tokens, prev_at)) => {
                let minutes = (now - *prev_at).num_seconds() as f64 / 60.0;
                if minutes > 0.0 && tokens_total >= *prev_tokens {
                    (tokens_total - prev_tokens) as f64 / minutes
                } else {
                    0.0
                }
            }
            None => 0.0,
        };
        self.last_tokens.insert(session_id.to_string(), (tokens_total, now));
        rate
    }
}

fn criticality_for(task: &actl_core::Task) -> Criticality {
    match task.priority {
        Some(actl_core::Priority::P0) => Criticality::Critical,
        Some(actl_core::Priority::P1) => Criticality::High,
        _ => Criticality::Medium,
    }
}

async fn adaptive_sla_loop(state: Arc<DaemonState>) {
    let mut ticker = tokio::time::interval(state.intervals.adaptive_sla_scan);
    let mut burn_rates = BurnRateTracker::default();
    loop {
        ticker.tick().await;
        let sessions = match state.sessions.lock().list() {
            Ok(s) => s,
            Err(err) => {
                tracing::warn!(error = %err, "adaptive sla: failed to list sessions");
                continue;
            }
        };
        if sessions.is_empty() {
            continue;
        }
        let board = match state.board.load() {
            Ok(board) => board,
            Err(err) => {
                tracing::warn!(error = %filestore_error(err), "adaptive sla: failed to load board");
                continue;
            }
        };
        let now = Utc::now();
        for session in sessions {
            let Some(task) = board.find(&session.task_id) else {
                continue;
            };
            if task.status != actl_core::TaskStatus::InProgress {
                continue;
            }
            let session_path = state.paths.sessions_dir().join(format!("{}.json", session.session_id));
            let Ok(bytes) = std::fs::read(&session_path) else {
                continue;
            };
            let Ok(file) = serde_json::from_slice::<actl_watcher::SessionFile>(&bytes) else {
                continue;
            };

            let phase = match file.phase {
                actl_watcher::SessionPhase::Active => SessionPhase::Active,
                actl_watcher::SessionPhase::ActiveCommitted => SessionPhase::ActiveCommitted,
                actl_watcher::SessionPhase::Idle => SessionPhase::Idle,
                actl_watcher::SessionPhase::Ended => SessionPhase::Ended,
            };
            let rate = burn_rates.observe(&session.session_id, file.tokens_total, now);
            let metrics = SessionMetrics {
                phase,
                token_burn_rate: rate,
                task_avg_token_burn_rate: rate,
                last_checkpoint_at: now,
                context_tokens: file.context_tokens.unwrap_or(0),
                context_window: file.context_window,
                unresponsive_minutes: None,
            };
            let profile = TaskProfile {
                criticality: criticality_for(task),
                irreversible: task.tags.contains("irreversible"),
            };

            let decision = state.adaptive_sla.lock().evaluate(&task.id, task.status, &profile, &metrics, now);
            let Some(action) = decision.action else {
                continue;
            };
            tracing::info!(task_id = %task.id, ?action, triggers = ?decision.triggers, "adaptive sla decision");

            if matches!(action, actl_sla::AdaptiveAction::AutoReassign | actl_sla::AdaptiveAction::Terminate) {
                if let Some(assignee) = task.assignee.clone() {
                    match actl_tasks::unassign_task(&board, &task.id) {
                        Ok(updated) => {
                            if let Err(err) = state.board.save(&updated) {
                                tracing::warn!(error = %filestore_error(err), "adaptive sla: failed to save board");
                                continue;
                            }
                            state.bus.emit(HubEvent::Reassignment {
                                task_id: task.id.clone(),
                                from: Some(assignee),
                                to: "unassigned".to_string(),
                                reason: format!("{action:?}: {:?}", decision.triggers),
                            });
                        }
                        Err(err) => tracing::warn!(error = %task_error(err), "adaptive sla: failed to unassign"),
                    }
                }
            }
        }
    }
}

async fn breaker_maintenance_loop(state: Arc<DaemonState>) {
    let mut ticker = tokio::time::interval(state.intervals.adaptive_sla_scan);
    loop {
        ticker.tick().await;
        let records = match state.capabilities.lock().list() {
            Ok(r) => r,
            Err(err) => {
                tracing::warn!(error = %err, "breaker maintenance: failed to list capabilities");
                continue;
            }
        };
        let now = Utc::now();
        for record in records {
            let mut breaker = state.breaker.lock();
            let Some(reason) = breaker.should_quarantine(&record.account, now) else {
                continue;
            };
            match breaker.quarantine_agent(&record.account, reason.clone(), state.board.path(), now) {
                Ok(unassigned) => {
                    tracing::warn!(account = %record.account, reason = %reason, unassigned = ?unassigned, "agent quarantined");
                    let event = serde_json::json!({
                        "kind": "agent_quarantined",
                        "account": record.account,
                        "reason": reason,
                        "unassignedTasks": unassigned,
                        "at": now.to_rfc3339(),
                    })
                    .to_string();
                    if let Err(err) = state.activity_log.lock().append(&event) {
                        tracing::warn!(error = %err, account = %record.account, "failed to log quarantine activity");
                    }
                }
                Err(err) => {
                    tracing::warn!(error = %err, account = %record.account, "failed to quarantine agent");
                }
            }
        }
    }
}
