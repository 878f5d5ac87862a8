//! In-memory per-account health tracking.

use serde::{Deserialize, Serialize};

/// Derived health status for an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    /// No errors, connected, recently active.
    Healthy,
    /// Some errors or staleness, but not critical.
    Degraded,
    /// Disconnected, rate-limited, or too many errors.
    Critical,
}

/// In-memory per-account status snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountHealth {
    /// Derived status.
    pub status: HealthStatus,
    /// Whether the account currently has an open connection.
    pub connected: bool,
    /// ISO-8601 timestamp of last observed activity.
    pub last_activity_at: String,
    /// Running error counter.
    pub error_count: u32,
    /// Whether the account is currently rate-limited.
    pub rate_limited: bool,
    /// Running SLA-violation counter.
    pub sla_violation_count: u32,
    /// ISO-8601 timestamp this snapshot was last refreshed.
    pub last_updated_at: String,
}

/// Minutes since `last_activity_at`, supplied by the caller (this crate has
/// no clock dependency so staleness is computed by callers that do).
pub type StalenessMinutes = f64;

/// Derives [`HealthStatus`]:
/// `disconnected || rate_limited || error_count >= 5` => critical;
/// else `error_count > 0 || sla_violation_count > 0 || staleness > 10min`
/// => degraded; else healthy.
#[must_use]
pub fn derive_health_status(
    connected: bool,
    rate_limited: bool,
    error_count: u32,
    sla_violation_count: u32,
    staleness_minutes: StalenessMinutes,
) -> HealthStatus {
    if !connected || rate_limited || error_count >= 5 {
        HealthStatus::Critical
    } else if error_count > 0 || sla_violation_count > 0 || staleness_minutes > 10.0 {
        HealthStatus::Degraded
    } else {
        HealthStatus::Healthy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disconnected_is_critical() {
        assert_eq!(
            derive_health_status(false, false, 0, 0, 0.0),
            HealthStatus::Critical
        );
    }

    #[test]
    fn rate_limited_is_critical() {
        assert_eq!(
            derive_health_status(true, true, 0, 0, 0.0),
            HealthStatus::Critical
        );
    }

    #[test]
    fn five_errors_is_critical() {
        assert_eq!(
            derive_health_status(true, false, 5, 0, 0.0),
            HealthStatus::Critical
        );
    }

    #[test]
    fn one_error_is_degraded() {
        assert_eq!(
            derive_health_status(true, false, 1, 0, 0.0),
            HealthStatus::Degraded
        );
    }

    #[test]
    fn staleness_over_ten_is_degraded() {
        assert_eq!(
            derive_health_status(true, false, 0, 0, 10.1),
            HealthStatus::Degraded
        );
    }

    #[test]
    fn no_issues_is_healthy() {
        assert_eq!(
            derive_health_status(true, false, 0, 0, 1.0),
            HealthStatus::Healthy
        );
    }
}
