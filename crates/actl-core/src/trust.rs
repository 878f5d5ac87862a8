//! Per-account trust reputation.

use serde::{Deserialize, Serialize};

/// Outcome kind recorded against an account's trust score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrustOutcomeKind {
    /// A task was accepted.
    Completed,
    /// A task was rejected in review.
    Rejected,
    /// A task failed outright (e.g. circuit-breaker trip).
    Failed,
}

/// A single trust-score history entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrustHistoryEntry {
    /// ISO-8601 timestamp.
    pub at: String,
    /// Signed delta applied.
    pub delta: i32,
    /// Human-readable reason.
    pub reason: String,
    /// Score before the delta.
    pub old_score: u32,
    /// Score after the delta, clamped to `[0, 100]`.
    pub new_score: u32,
}

/// Per-account trust reputation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrustReputation {
    /// Account name.
    pub account: String,
    /// Current trust score, `[0, 100]`.
    pub score: u32,
    /// Total tasks completed (accepted).
    pub completed: u32,
    /// Total tasks rejected.
    pub rejected: u32,
    /// Total tasks failed.
    pub failed: u32,
    /// Running average completion time in minutes.
    pub avg_completion_minutes: f64,
    /// History of score changes, oldest first.
    pub history: Vec<TrustHistoryEntry>,
}

impl TrustReputation {
    /// A fresh reputation record for an unseen account: score 50, no history.
    #[must_use]
    pub fn new(account: impl Into<String>) -> Self {
        Self {
            account: account.into(),
            score: 50,
            completed: 0,
            rejected: 0,
            failed: 0,
            avg_completion_minutes: 0.0,
            history: Vec::new(),
        }
    }

    /// Delta applied for a given outcome kind, before clamping.
    #[must_use]
    pub fn delta_for(kind: TrustOutcomeKind) -> i32 {
        match kind {
            TrustOutcomeKind::Completed => 5,
            TrustOutcomeKind::Rejected => -8,
            TrustOutcomeKind::Failed => -15,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_reputation_defaults() {
        let t = TrustReputation::new("alice");
        assert_eq!(t.score, 50);
        assert!(t.history.is_empty());
    }

    #[test]
    fn deltas_match_outcome() {
        assert_eq!(TrustReputation::delta_for(TrustOutcomeKind::Completed), 5);
        assert_eq!(TrustReputation::delta_for(TrustOutcomeKind::Rejected), -8);
        assert_eq!(TrustReputation::delta_for(TrustOutcomeKind::Failed), -15);
    }
}
