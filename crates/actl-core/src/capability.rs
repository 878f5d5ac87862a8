//! Per-account capability record, shared by the store and the routing crate.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Declared provider type, enriched onto a capability record at query time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderType {
    /// Strong at large-context reasoning and planning.
    Reasoning,
    /// Strong at fast, high-throughput completions.
    Throughput,
    /// Strong at tool-use / agentic workflows.
    Agentic,
}

/// Per-account capability record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapabilityRecord {
    /// Account name.
    pub account: String,
    /// Declared skills (e.g. `"typescript"`, `"testing"`).
    pub skills: BTreeSet<String>,
    /// Total tasks delivered.
    pub total: u32,
    /// Total tasks accepted.
    pub accepted: u32,
    /// Running average delivery time in milliseconds.
    pub avg_delivery_ms: f64,
    /// ISO-8601 timestamp of last activity.
    pub last_active_at: String,
    /// Optional provider type classification.
    pub provider_type: Option<ProviderType>,
    /// Trust score enriched at query time, `[0, 100]`.
    pub trust_score: Option<u32>,
}

impl CapabilityRecord {
    /// A fresh record for a newly seen account.
    #[must_use]
    pub fn new(account: impl Into<String>) -> Self {
        Self {
            account: account.into(),
            skills: BTreeSet::new(),
            total: 0,
            accepted: 0,
            avg_delivery_ms: 0.0,
            last_active_at: String::new(),
            provider_type: None,
            trust_score: None,
        }
    }

    /// Records a task completion, updating totals and the running mean
    /// `avg' = (avg * n + d) / (n + 1)`.
    pub fn record_completion(&mut self, accepted: bool, delivery_ms: f64, now: &str) {
        let n = f64::from(self.total);
        self.avg_delivery_ms = (self.avg_delivery_ms * n + delivery_ms) / (n + 1.0);
        self.total += 1;
        if accepted {
            self.accepted += 1;
        }
        self.last_active_at = now.to_string();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn running_mean_matches_formula() {
        let mut c = CapabilityRecord::new("alice");
        c.record_completion(true, 100.0, "t1");
        assert_eq!(c.total, 1);
        assert_eq!(c.accepted, 1);
        assert!((c.avg_delivery_ms - 100.0).abs() < f64::EPSILON);

        c.record_completion(false, 300.0, "t2");
        assert_eq!(c.total, 2);
        assert_eq!(c.accepted, 1);
        assert!((c.avg_delivery_ms - 200.0).abs() < f64::EPSILON);
    }
}
