//! Periodic health snapshot: the same projection [`crate::handlers::health`]
//! computes on demand, logged on a fixed cadence so a human tailing the
//! daemon log sees degraded accounts without having to poll the RPC.

use std::sync::Arc;

use actl_core::HealthStatus;

use crate::state::DaemonState;

/// Runs until the process exits, logging one health snapshot per tick.
pub async fn run(state: Arc<DaemonState>) {
    let mut ticker = tokio::time::interval(state.intervals.watchdog);
    loop {
        ticker.tick().await;
        let connected = state.connected.lock().count();
        let records = match state.capabilities.lock().list() {
            Ok(r) => r,
            Err(err) => {
                tracing::warn!(error = %err, "watchdog: failed to list capabilities");
                continue;
            }
        };

        let now = chrono::Utc::now();
        let mut degraded = Vec::new();
        for record in &records {
            let is_connected = state.connected.lock().is_connected(&record.account);
            let staleness = chrono::DateTime::parse_from_rfc3339(&record.last_active_at)
                .ok()
                .map_or(f64::MAX, |at| (now - at.with_timezone(&chrono::Utc)).num_seconds() as f64 / 60.0);
            let status = actl_core::derive_health_status(is_connected, false, 0, 0, staleness);
            if status != HealthStatus::Healthy {
                degraded.push((record.account.clone(), status));
            }
        }

        if degraded.is_empty() {
            tracing::debug!(connected, total_accounts = records.len(), "watchdog: all accounts healthy");
        } else {
            tracing::warn!(connected, ?degraded, "watchdog: degraded accounts");
        }
    }
}
