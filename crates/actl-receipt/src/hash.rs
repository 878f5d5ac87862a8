//! Deterministic spec hashing: a `canonicalize`/`compute_hash` pair that
//! serializes with sorted object keys and SHA-256s the resulting bytes.

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::error::ReceiptError;

/// Serializes `value` to JSON with sorted object keys. `serde_json`'s
/// default `Map` is already key-sorted (the `preserve_order` feature isn't
/// enabled anywhere in this workspace), so a plain `to_string` is already
/// canonical.
///
/// # Errors
///
/// Returns [`ReceiptError::Serialize`] if `value` cannot be serialized.
pub fn canonicalize<T: Serialize>(value: &T) -> Result<String, ReceiptError> {
    Ok(serde_json::to_string(&serde_json::to_value(value)?)?)
}

/// Hex-encoded SHA-256 of the canonical JSON form of `value`.
///
/// # Errors
///
/// Returns [`ReceiptError::Serialize`] if `value` cannot be serialized.
pub fn compute_hash<T: Serialize>(value: &T) -> Result<String, ReceiptError> {
    let json = canonicalize(value)?;
    let mut hasher = Sha256::new();
    hasher.update(json.as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}

/// A handoff spec shape: the part of a task's handoff payload that defines
/// "what done looks like", hashed to pin a receipt to a specific version of
/// the ask.
#[derive(Debug, Clone, Serialize)]
pub struct SpecFields<'a> {
    /// The goal of the delegated work.
    pub goal: &'a str,
    /// Acceptance criteria the work must satisfy.
    pub acceptance_criteria: &'a [String],
}

/// SHA-256 hex of the canonical JSON of `{goal, acceptance_criteria}`.
///
/// # Errors
///
/// Returns [`ReceiptError::Serialize`] if the fields cannot be serialized.
pub fn compute_spec_hash(goal: &str, acceptance_criteria: &[String]) -> Result<String, ReceiptError> {
    compute_hash(&SpecFields {
        goal,
        acceptance_criteria,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spec_hash_is_stable_across_calls() {
        let criteria = vec!["tests pass".to_string()];
        let a = compute_spec_hash("ship it", &criteria).unwrap();
        let b = compute_spec_hash("ship it", &criteria).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn spec_hash_changes_with_content() {
        let a = compute_spec_hash("ship it", &[]).unwrap();
        let b = compute_spec_hash("ship it differently", &[]).unwrap();
        assert_ne!(a, b);
    }
}
