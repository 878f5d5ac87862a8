//! `get_analytics` / `get_review_bundle` / `generate_review_bundle`.
//!
//! Neither review-bundle RPC is backed by its own store: a bundle is a
//! point-in-time projection over the task board, the acceptance-runner's
//! verification log, and the knowledge index, so both handlers recompute
//! it fresh from those sources rather than caching it anywhere. The
//! "generate" / "get" split exists on the wire for symmetry with the rest
//! of the domain-operation RPCs, not because generation has a side effect.

use std::sync::Arc;

use actl_core::{ErrorCode, HubError, Task, TaskEvent, TaskStatus, VerificationReceipt};
use actl_protocol::result_reply;
use chrono::DateTime;
use serde_json::{json, Value};

use crate::dispatch::HandlerFuture;
use crate::error::filestore_error;
use crate::handlers::util::require_str;
use crate::state::DaemonState;

const VERIFICATION_LOG_SCAN_LIMIT: i64 = 10_000;

pub fn handle_get_analytics(
    state: Arc<DaemonState>,
    _account: String,
    request_id: Option<String>,
    _raw: Value,
) -> HandlerFuture {
    Box::pin(async move {
        match do_get_analytics(&state) {
            Ok(data) => result_reply(request_id.as_deref(), data),
            Err(err) => err.to_reply(request_id.as_deref()),
        }
    })
}

fn do_get_analytics(state: &DaemonState) -> Result<Value, HubError> {
    let board = state.board.load().map_err(filestore_error)?;
    let tasks = board.tasks();

    let mut by_status = serde_json::Map::new();
    for status in [
        TaskStatus::Todo,
        TaskStatus::InProgress,
        TaskStatus::ReadyForReview,
        TaskStatus::Accepted,
        TaskStatus::Rejected,
    ] {
        let count = tasks.iter().filter(|t| t.status == status).count();
        by_status.insert(format!("{status:?}").to_lowercase(), json!(count));
    }

    let cycle_times_minutes: Vec<f64> = tasks.iter().filter_map(cycle_time_minutes).collect();
    let avg_cycle_time_minutes = if cycle_times_minutes.is_empty() {
        None
    } else {
        Some(cycle_times_minutes.iter().sum::<f64>() / cycle_times_minutes.len() as f64)
    };

    let sla_event_count: usize = tasks.iter().map(|t| count_sla_events(t)).sum();

    Ok(json!({
        "totalTasks": tasks.len(),
        "byStatus": by_status,
        "avgCycleTimeMinutes": avg_cycle_time_minutes,
        "slaEventCount": sla_event_count,
    }))
}

/// Minutes between a task's creation and its terminal `accepted` transition.
/// `None` for tasks that haven't been accepted.
fn cycle_time_minutes(task: &Task) -> Option<f64> {
    if task.status != TaskStatus::Accepted {
        return None;
    }
    let created = DateTime::parse_from_rfc3339(&task.created_at).ok()?;
    let accepted_at = task.events.iter().find_map(|e| match e {
        TaskEvent::StatusChanged { to: TaskStatus::Accepted, at, .. } => DateTime::parse_from_rfc3339(at).ok(),
        _ => None,
    })?;
    Some((accepted_at - created).num_seconds() as f64 / 60.0)
}

/// Counts events whose serialized form contains the substring `"sla"`
/// case-insensitively. A heuristic inherited rather than designed: most
/// event variants never mention SLAs by name, so this undercounts on
/// purpose rather than guessing at which fields are SLA-related.
fn count_sla_events(task: &Task) -> usize {
    task.events
        .iter()
        .filter(|e| {
            serde_json::to_string(e)
                .map(|s| s.to_lowercase().contains("sla"))
                .unwrap_or(false)
        })
        .count()
}

pub fn handle_get_review_bundle(
    state: Arc<DaemonState>,
    _account: String,
    request_id: Option<String>,
    raw: Value,
) -> HandlerFuture {
    Box::pin(async move {
        match do_review_bundle(&state, &raw) {
            Ok(data) => result_reply(request_id.as_deref(), data),
            Err(err) => err.to_reply(request_id.as_deref()),
        }
    })
}

pub fn handle_generate_review_bundle(
    state: Arc<DaemonState>,
    _account: String,
    request_id: Option<String>,
    raw: Value,
) -> HandlerFuture {
    Box::pin(async move {
        match do_review_bundle(&state, &raw) {
            Ok(data) => result_reply(request_id.as_deref(), data),
            Err(err) => err.to_reply(request_id.as_deref()),
        }
    })
}

fn do_review_bundle(state: &DaemonState, raw: &Value) -> Result<Value, HubError> {
    let task_id = require_str(raw, "taskId")?;
    let board = state.board.load().map_err(filestore_error)?;
    let task = board
        .find(task_id)
        .cloned()
        .ok_or_else(|| HubError::new(ErrorCode::TaskNotFound, format!("task not found: {task_id}")))?;

    let receipts: Vec<VerificationReceipt> = state
        .verification_results_log
        .lock()
        .list(VERIFICATION_LOG_SCAN_LIMIT)?
        .into_iter()
        .filter_map(|entry| serde_json::from_str::<VerificationReceipt>(&entry.payload).ok())
        .filter(|r| r.task_id == task_id)
        .collect();

    let notes = state.knowledge.lock().get_task_links(task_id)?;
    let assignee_trust = match &task.assignee {
        Some(assignee) => state.trust.lock().get(assignee)?,
        None => None,
    };

    Ok(json!({
        "task": task,
        "receipts": receipts,
        "notes": notes.iter().map(|n| json!({
            "id": n.id,
            "title": n.title,
            "content": n.content,
            "createdAt": n.created_at,
        })).collect::<Vec<_>>(),
        "assigneeTrust": assignee_trust,
    }))
}
