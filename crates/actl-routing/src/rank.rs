//! Ranking candidates for a task by their scoring breakdown.

use crate::score::{score_candidate, ScoreResult, ScoringInput};

/// A candidate account paired with its scoring input.
#[derive(Debug, Clone)]
pub struct Candidate {
    /// Account identifier.
    pub account: String,
    /// Scoring inputs gathered for this account.
    pub input: ScoringInput,
}

/// One ranked candidate in the final ordering.
#[derive(Debug, Clone)]
pub struct RankedAccount {
    /// Account identifier.
    pub account: String,
    /// Scoring breakdown.
    pub score: ScoreResult,
}

/// Options controlling which accounts are considered.
#[derive(Debug, Clone, Default)]
pub struct RankOptions {
    /// Accounts to exclude from consideration (e.g. quarantined or the requester).
    pub exclude_accounts: Vec<String>,
}

/// Scores and ranks `candidates` against `required_skills`, descending by score.
/// Accounts named in `opts.exclude_accounts` are dropped before scoring. Ties
/// keep the relative order `candidates` were given in (stable sort).
#[must_use]
pub fn rank_accounts(
    candidates: &[Candidate],
    required_skills: &[String],
    opts: &RankOptions,
) -> Vec<RankedAccount> {
    let mut ranked: Vec<RankedAccount> = candidates
        .iter()
        .filter(|c| !opts.exclude_accounts.iter().any(|excluded| excluded == &c.account))
        .map(|c| RankedAccount {
            account: c.account.clone(),
            score: score_candidate(&c.input, required_skills),
        })
        .collect();
    ranked.sort_by(|a, b| b.score.total.cmp(&a.score.total));
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn candidate(account: &str, wip: u32) -> Candidate {
        Candidate {
            account: account.to_string(),
            input: ScoringInput {
                skills: BTreeSet::new(),
                provider_type: None,
                total: 0,
                accepted: 0,
                avg_delivery_ms: 0.0,
                trust_score: None,
                minutes_since_active: None,
                wip,
                open: 0,
                recent_throughput: 0,
            },
        }
    }

    #[test]
    fn ranks_descending_by_score() {
        let candidates = vec![candidate("busy", 10), candidate("idle", 0)];
        let ranked = rank_accounts(&candidates, &[], &RankOptions::default());
        assert_eq!(ranked[0].account, "idle");
        assert_eq!(ranked[1].account, "busy");
    }

    #[test]
    fn excluded_accounts_are_dropped() {
        let candidates = vec![candidate("a", 0), candidate("b", 0)];
        let opts = RankOptions {
            exclude_accounts: vec!["a".to_string()],
        };
        let ranked = rank_accounts(&candidates, &[], &opts);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].account, "b");
    }
}
