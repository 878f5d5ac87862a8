//! HMAC-SHA256 signing and constant-time verification over a receipt's
//! stable field set.

use actl_core::VerificationReceipt;
use hmac::{Hmac, Mac};
use serde_json::json;
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::error::ReceiptError;

type HmacSha256 = Hmac<Sha256>;

/// The canonical, sorted-key JSON of the fields a receipt's signature
/// covers. `artifacts` is omitted entirely when empty, matching the
/// "artifacts excluded from signature when empty" rule.
fn signing_payload(r: &VerificationReceipt) -> Result<String, ReceiptError> {
    let mut fields = json!({
        "id": r.id,
        "task_id": r.task_id,
        "handoff_id": r.handoff_id,
        "delegator": r.delegator,
        "delegatee": r.delegatee,
        "spec_hash": r.spec_hash,
        "verdict": r.verdict,
        "method": r.method,
        "verification_method": r.verification_method,
        "timestamp": r.timestamp,
    });
    if !r.artifacts.is_empty() {
        fields["artifacts"] = json!(r.artifacts);
    }
    Ok(serde_json::to_string(&fields)?)
}

/// Computes the hex-encoded HMAC-SHA256 signature over `r`'s stable field
/// set, using `key`.
///
/// # Errors
///
/// Returns [`ReceiptError::Serialize`] if the fields cannot be serialized.
pub fn sign_receipt(r: &VerificationReceipt, key: &[u8]) -> Result<String, ReceiptError> {
    let payload = signing_payload(r)?;
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC accepts any key length");
    mac.update(payload.as_bytes());
    Ok(hex_encode(&mac.finalize().into_bytes()))
}

/// Recomputes `r`'s signature and compares it to `r.signature` in constant
/// time. Never panics; a malformed signature or serialization failure is
/// simply a mismatch.
#[must_use]
pub fn verify_receipt(r: &VerificationReceipt, key: &[u8]) -> bool {
    let Ok(expected) = sign_receipt(r, key) else {
        return false;
    };
    let expected = expected.as_bytes();
    let actual = r.signature.as_bytes();
    expected.len() == actual.len() && bool::from(expected.ct_eq(actual))
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use actl_core::{ResolutionMethod, Verdict, VerificationMethod};

    fn receipt(signature: &str) -> VerificationReceipt {
        VerificationReceipt {
            id: "r1".to_string(),
            task_id: "t1".to_string(),
            handoff_id: "h1".to_string(),
            delegator: "alice".to_string(),
            delegatee: "bob".to_string(),
            spec_hash: "abc123".to_string(),
            verdict: Verdict::Accepted,
            method: ResolutionMethod::AutoAcceptance,
            verification_method: VerificationMethod::AutoTest,
            artifacts: vec![],
            timestamp: "2026-01-01T00:00:00Z".to_string(),
            signature: signature.to_string(),
        }
    }

    #[test]
    fn sign_then_verify_round_trips() {
        let key = b"test-key";
        let mut r = receipt("");
        r.signature = sign_receipt(&r, key).unwrap();
        assert!(verify_receipt(&r, key));
    }

    #[test]
    fn tampering_any_signed_field_flips_verification() {
        let key = b"test-key";
        let mut r = receipt("");
        r.signature = sign_receipt(&r, key).unwrap();
        r.spec_hash = "tampered".to_string();
        assert!(!verify_receipt(&r, key));
    }

    #[test]
    fn wrong_key_fails_verification() {
        let mut r = receipt("");
        r.signature = sign_receipt(&r, b"key-a").unwrap();
        assert!(!verify_receipt(&r, b"key-b"));
    }

    #[test]
    fn empty_artifacts_are_excluded_from_signature() {
        let key = b"test-key";
        let mut with_empty = receipt("");
        with_empty.signature = sign_receipt(&with_empty, key).unwrap();
        let mut with_none = with_empty.clone();
        with_none.artifacts = vec![];
        assert_eq!(with_empty.signature, sign_receipt(&with_none, key).unwrap());
    }
}
