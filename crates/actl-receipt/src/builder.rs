//! Fluent setter-chain builder for [`VerificationReceipt`].

use actl_core::{ResolutionMethod, Verdict, VerificationMethod, VerificationReceipt};
use chrono::Utc;
use uuid::Uuid;

use crate::error::ReceiptError;
use crate::hash::compute_spec_hash;
use crate::sign::sign_receipt;

/// Builds a [`VerificationReceipt`] field by field, signing it on [`build`](Self::build).
#[derive(Debug)]
pub struct ReceiptBuilder {
    task_id: String,
    handoff_id: String,
    delegator: String,
    delegatee: String,
    goal: String,
    acceptance_criteria: Vec<String>,
    verdict: Verdict,
    method: ResolutionMethod,
    verification_method: VerificationMethod,
    artifacts: Vec<String>,
}

impl ReceiptBuilder {
    /// Starts a builder for a receipt covering `task_id`/`handoff_id`,
    /// delegated from `delegator` to `delegatee`.
    #[must_use]
    pub fn new(
        task_id: impl Into<String>,
        handoff_id: impl Into<String>,
        delegator: impl Into<String>,
        delegatee: impl Into<String>,
    ) -> Self {
        Self {
            task_id: task_id.into(),
            handoff_id: handoff_id.into(),
            delegator: delegator.into(),
            delegatee: delegatee.into(),
            goal: String::new(),
            acceptance_criteria: Vec::new(),
            verdict: Verdict::Rejected,
            method: ResolutionMethod::AutoAcceptance,
            verification_method: VerificationMethod::AutoTest,
            artifacts: Vec::new(),
        }
    }

    /// Sets the spec fields the hash is computed over.
    #[must_use]
    pub fn spec(mut self, goal: impl Into<String>, acceptance_criteria: Vec<String>) -> Self {
        self.goal = goal.into();
        self.acceptance_criteria = acceptance_criteria;
        self
    }

    /// Sets the verdict.
    #[must_use]
    pub fn verdict(mut self, verdict: Verdict) -> Self {
        self.verdict = verdict;
        self
    }

    /// Sets the resolution method.
    #[must_use]
    pub fn method(mut self, method: ResolutionMethod) -> Self {
        self.method = method;
        self
    }

    /// Sets how verification was actually carried out.
    #[must_use]
    pub fn verification_method(mut self, method: VerificationMethod) -> Self {
        self.verification_method = method;
        self
    }

    /// Appends an evidence artifact identifier.
    #[must_use]
    pub fn add_artifact(mut self, artifact: impl Into<String>) -> Self {
        self.artifacts.push(artifact.into());
        self
    }

    /// Consumes the builder, computing the spec hash and HMAC signature
    /// with `key`.
    ///
    /// # Errors
    ///
    /// Returns [`ReceiptError::Serialize`] if the spec fields or the
    /// receipt's signed fields cannot be serialized.
    pub fn build(self, key: &[u8]) -> Result<VerificationReceipt, ReceiptError> {
        let spec_hash = compute_spec_hash(&self.goal, &self.acceptance_criteria)?;
        let mut receipt = VerificationReceipt {
            id: Uuid::new_v4().to_string(),
            task_id: self.task_id,
            handoff_id: self.handoff_id,
            delegator: self.delegator,
            delegatee: self.delegatee,
            spec_hash,
            verdict: self.verdict,
            method: self.method,
            verification_method: self.verification_method,
            artifacts: self.artifacts,
            timestamp: Utc::now().to_rfc3339(),
            signature: String::new(),
        };
        receipt.signature = sign_receipt(&receipt, key)?;
        Ok(receipt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_produces_a_verifiable_receipt() {
        let key = b"key";
        let receipt = ReceiptBuilder::new("t1", "h1", "alice", "bob")
            .spec("ship it", vec!["tests pass".to_string()])
            .verdict(Verdict::Accepted)
            .verification_method(VerificationMethod::AutoTest)
            .add_artifact("log://run-1")
            .build(key)
            .unwrap();
        assert_eq!(receipt.verdict, Verdict::Accepted);
        assert_eq!(receipt.spec_hash.len(), 64);
        assert!(crate::sign::verify_receipt(&receipt, key));
    }
}
