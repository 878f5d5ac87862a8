//! `health_check`: a snapshot of daemon-wide and per-account health,
//! derived fresh on every call from connection state and capability
//! activity rather than tracked continuously (no persisted health map).

use std::sync::Arc;

use actl_core::{derive_health_status, AccountHealth, HubError};
use actl_protocol::result_reply;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};

use crate::dispatch::HandlerFuture;
use crate::state::DaemonState;

pub fn handle_health_check(
    state: Arc<DaemonState>,
    _account: String,
    request_id: Option<String>,
    _raw: Value,
) -> HandlerFuture {
    Box::pin(async move {
        match do_health_check(&state) {
            Ok(data) => result_reply(request_id.as_deref(), data),
            Err(err) => err.to_reply(request_id.as_deref()),
        }
    })
}

fn do_health_check(state: &DaemonState) -> Result<Value, HubError> {
    let now = Utc::now();
    let connected = state.connected.lock();
    let records = state.capabilities.lock().list()?;

    let mut accounts = serde_json::Map::new();
    for record in records {
        let is_connected = connected.is_connected(&record.account);
        let staleness = DateTime::parse_from_rfc3339(&record.last_active_at)
            .ok()
            .map_or(f64::MAX, |at| (now - at.with_timezone(&Utc)).num_seconds() as f64 / 60.0);
        let status = derive_health_status(is_connected, false, 0, 0, staleness);
        let health = AccountHealth {
            status,
            connected: is_connected,
            last_activity_at: record.last_active_at.clone(),
            error_count: 0,
            rate_limited: false,
            sla_violation_count: 0,
            last_updated_at: now.to_rfc3339(),
        };
        accounts.insert(record.account, json!(health));
    }

    Ok(json!({
        "status": "healthy",
        "connectedAccounts": connected.count(),
        "accounts": accounts,
        "timestamp": now.to_rfc3339(),
    }))
}
