//! Verification receipt data shape. Hashing and HMAC signing live in
//! `actl-receipt`; this crate only owns the struct so stores and the
//! protocol layer can reference it without depending on the signing crate.

use serde::{Deserialize, Serialize};

/// Receipt verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// Work was accepted.
    Accepted,
    /// Work was rejected.
    Rejected,
}

/// How the verdict was reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VerificationMethod {
    /// An automated test/acceptance suite ran.
    AutoTest,
    /// A human reviewed the work.
    HumanReview,
    /// The multi-reviewer council ran.
    CouncilReview,
}

/// Outer resolution method for the receipt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResolutionMethod {
    /// Resolved by the acceptance runner with no human in the loop.
    AutoAcceptance,
    /// Resolved by a human reviewer.
    HumanReview,
}

/// Non-repudiable attestation that a specific version of a task was
/// accepted or rejected by a specific verifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationReceipt {
    /// Unique receipt id.
    pub id: String,
    /// Task id this receipt covers.
    pub task_id: String,
    /// Handoff id this receipt covers.
    pub handoff_id: String,
    /// Account that delegated the work.
    pub delegator: String,
    /// Account that performed the work.
    pub delegatee: String,
    /// SHA-256 hex of the canonical JSON of `{goal, acceptance_criteria}`.
    pub spec_hash: String,
    /// Accept/reject verdict.
    pub verdict: Verdict,
    /// Resolution method (auto-acceptance vs human review).
    pub method: ResolutionMethod,
    /// How verification was actually carried out.
    pub verification_method: VerificationMethod,
    /// Evidence artifact identifiers (log paths, diff ids, etc.).
    pub artifacts: Vec<String>,
    /// ISO-8601 timestamp.
    pub timestamp: String,
    /// Hex-encoded HMAC-SHA256 signature over the stable field ordering.
    pub signature: String,
}
