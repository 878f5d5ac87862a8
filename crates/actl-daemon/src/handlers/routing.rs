//! `suggest_assignee`: ranks known accounts against a required skill set
//! using the capability scorer, enriched with live trust and workload
//! figures pulled from the other stores.

use std::sync::Arc;

use actl_core::{HubError, TaskStatus};
use actl_protocol::result_reply;
use actl_routing::{rank_accounts, Candidate, RankOptions, ScoringInput};
use chrono::{DateTime, Utc};
use serde_json::{json, Value};

use crate::dispatch::HandlerFuture;
use crate::error::filestore_error;
use crate::handlers::util::str_array;
use crate::state::DaemonState;

/// Window over which `recent_throughput` counts completed tasks.
const RECENT_THROUGHPUT_WINDOW_HOURS: i64 = 24;

/// Counts trust-history entries recorded as a completion (positive delta,
/// the only outcome kind that awards one) within the trailing window.
fn recent_throughput(history: &[actl_core::TrustHistoryEntry], now: DateTime<Utc>) -> u32 {
    history
        .iter()
        .filter(|entry| entry.delta > 0)
        .filter(|entry| {
            DateTime::parse_from_rfc3339(&entry.at)
                .map(|at| (now - at.with_timezone(&Utc)).num_hours() < RECENT_THROUGHPUT_WINDOW_HOURS)
                .unwrap_or(false)
        })
        .count() as u32
}

pub fn handle_suggest_assignee(
    state: Arc<DaemonState>,
    account: String,
    request_id: Option<String>,
    raw: Value,
) -> HandlerFuture {
    Box::pin(async move {
        match do_suggest(&state, &account, &raw) {
            Ok(data) => result_reply(request_id.as_deref(), data),
            Err(err) => err.to_reply(request_id.as_deref()),
        }
    })
}

fn do_suggest(state: &DaemonState, caller: &str, raw: &Value) -> Result<Value, HubError> {
    let skills = str_array(raw, "skills");
    let mut exclude_accounts = str_array(raw, "excludeAccounts");
    exclude_accounts.push(caller.to_string());

    let board = state.board.load().map_err(filestore_error)?;
    let now = Utc::now();
    let records = state.capabilities.lock().list()?;
    let breaker = state.breaker.lock();

    let mut candidates: Vec<Candidate> = Vec::new();
    for r in records.into_iter().filter(|r| breaker.check_agent(&r.account)) {
        let trust = state.trust.lock().get(&r.account)?;
        let wip = board
            .tasks()
            .iter()
            .filter(|t| t.assignee.as_deref() == Some(r.account.as_str()) && t.status == TaskStatus::InProgress)
            .count() as u32;
        let open = board
            .tasks()
            .iter()
            .filter(|t| t.assignee.as_deref() == Some(r.account.as_str()) && t.status == TaskStatus::Todo)
            .count() as u32;
        let minutes_since_active = DateTime::parse_from_rfc3339(&r.last_active_at)
            .ok()
            .map(|at| (now - at.with_timezone(&Utc)).num_seconds() as f64 / 60.0);
        let throughput = trust.as_ref().map_or(0, |t| recent_throughput(&t.history, now));
        candidates.push(Candidate {
            account: r.account.clone(),
            input: ScoringInput {
                skills: r.skills,
                provider_type: r.provider_type,
                total: r.total,
                accepted: r.accepted,
                avg_delivery_ms: r.avg_delivery_ms,
                trust_score: trust.map(|t| t.score),
                minutes_since_active,
                wip,
                open,
                recent_throughput: throughput,
            },
        });
    }

    let ranked = rank_accounts(&candidates, &skills, &RankOptions { exclude_accounts });
    let scores: Vec<Value> = ranked
        .iter()
        .map(|r| {
            json!({
                "account": r.account,
                "total": r.score.total,
                "components": r.score.components.iter().map(|c| json!({
                    "name": c.name,
                    "points": c.points,
                    "reason": c.reason,
                })).collect::<Vec<_>>(),
            })
        })
        .collect();
    Ok(json!({ "scores": scores }))
}
