//! Council result types.

use serde::{Deserialize, Serialize};

/// Final synthesized verdict. Unknown strings encountered while parsing a
/// member or chair response normalize to [`Verdict::Reject`], the safe
/// default when signals conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    /// The work is accepted outright.
    Accept,
    /// The work is rejected.
    Reject,
    /// Accepted, but the chair attached notes worth surfacing.
    AcceptWithNotes,
}

impl Verdict {
    /// Parses a verdict string leniently; anything unrecognized is
    /// [`Verdict::Reject`].
    #[must_use]
    pub fn parse_lenient(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "ACCEPT" => Self::Accept,
            "ACCEPT_WITH_NOTES" | "ACCEPT-WITH-NOTES" => Self::AcceptWithNotes,
            _ => Self::Reject,
        }
    }
}

/// One member's stage-1 analysis or verification output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberOutput {
    /// Account that produced this output.
    pub account: String,
    /// The member's own verdict.
    pub verdict: Verdict,
    /// Self-reported confidence in `[0.0, 1.0]`.
    pub confidence: f64,
    /// Free-form reasoning or notes.
    pub notes: String,
}

/// A single member's ranking of the anonymized stage-1 outputs, best first,
/// expressed as 0-based indices into the original (non-anonymized) output
/// list.
#[derive(Debug, Clone)]
pub struct Ranking {
    /// Account that produced this ranking.
    pub reviewer: String,
    /// Indices into the stage-1 output list, best to worst.
    pub order: Vec<usize>,
}

/// Aggregate ranking position for one candidate, averaged across reviewers
/// and converted to a 1-based position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateRank {
    /// Account being ranked.
    pub account: String,
    /// Mean 1-based position across all reviewers who ranked it.
    pub average_position: f64,
}

/// The fully synthesized outcome of a council run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouncilResult {
    /// Final verdict from the chairman, or the degraded default.
    pub verdict: Verdict,
    /// Chair's confidence, or 0 when degraded.
    pub confidence: f64,
    /// Chair's notes, or an explanation of the degraded path.
    pub notes: String,
    /// Members whose stage-1 call succeeded and were carried forward.
    pub participating_members: Vec<String>,
    /// Aggregate peer-review rankings, empty when degraded.
    pub rankings: Vec<AggregateRank>,
    /// `true` when every member failed stage 1 and this is the fallback
    /// result rather than a real synthesis.
    pub degraded: bool,
}

impl CouncilResult {
    /// The fallback result used when every member fails to produce a
    /// usable stage-1 response.
    #[must_use]
    pub fn degraded() -> Self {
        Self {
            verdict: Verdict::Reject,
            confidence: 0.0,
            notes: "no council member produced a usable response".to_string(),
            participating_members: Vec::new(),
            rankings: Vec::new(),
            degraded: true,
        }
    }
}
