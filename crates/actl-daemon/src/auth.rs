//! Per-connection authentication: token issuance, constant-time
//! verification, and the in-memory connected-accounts map.

use std::collections::HashMap;
use std::path::Path;

use actl_core::validate_account_name;
use rand::RngCore;
use subtle::ConstantTimeEq;

const TOKEN_BYTES: usize = 32;

/// Generates a fresh random token for `account` at `token_path`, if one
/// doesn't already exist, with owner-only permissions.
///
/// # Errors
///
/// Returns an I/O error if the token file cannot be created.
pub fn load_or_create_token(token_path: &Path) -> std::io::Result<String> {
    if let Ok(existing) = std::fs::read_to_string(token_path) {
        let trimmed = existing.trim();
        if !trimmed.is_empty() {
            return Ok(trimmed.to_string());
        }
    }
    if let Some(parent) = token_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    let token = hex_encode(&bytes);
    std::fs::write(token_path, &token)?;
    set_owner_only(token_path)?;
    Ok(token)
}

#[cfg(unix)]
fn set_owner_only(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn set_owner_only(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Verifies `candidate` against the token stored at `token_path` in
/// constant time. A missing or unreadable token file, or an invalid
/// account name, both verify as `false` rather than erroring — the caller
/// has no finer-grained failure to report back across the wire anyway.
#[must_use]
pub fn verify_token(account: &str, candidate: &str, token_path: &Path) -> bool {
    if !validate_account_name(account) {
        return false;
    }
    let Ok(expected) = std::fs::read_to_string(token_path) else {
        return false;
    };
    let expected = expected.trim().as_bytes();
    let candidate = candidate.trim().as_bytes();
    if expected.len() != candidate.len() {
        return false;
    }
    expected.ct_eq(candidate).into()
}

/// Tracks which accounts currently hold an open, authenticated connection
/// and the token they authenticated with (for session-scoped re-checks).
#[derive(Debug, Default)]
pub struct ConnectedAccounts {
    sessions: HashMap<String, String>,
}

impl ConnectedAccounts {
    /// Marks `account` connected with `token`.
    pub fn mark_connected(&mut self, account: &str, token: &str) {
        self.sessions.insert(account.to_string(), token.to_string());
    }

    /// Clears `account`'s connection, e.g. on disconnect.
    pub fn mark_disconnected(&mut self, account: &str) {
        self.sessions.remove(account);
    }

    /// Whether `account` currently has an open session.
    #[must_use]
    pub fn is_connected(&self, account: &str) -> bool {
        self.sessions.contains_key(account)
    }

    /// Number of currently connected accounts.
    #[must_use]
    pub fn count(&self) -> usize {
        self.sessions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_or_create_token_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tokens/alice.token");
        let first = load_or_create_token(&path).unwrap();
        let second = load_or_create_token(&path).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), TOKEN_BYTES * 2);
    }

    #[test]
    fn verify_token_accepts_matching_and_rejects_mismatched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("alice.token");
        let token = load_or_create_token(&path).unwrap();
        assert!(verify_token("alice", &token, &path));
        assert!(!verify_token("alice", "wrong", &path));
    }

    #[test]
    fn verify_token_rejects_invalid_account_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.token");
        load_or_create_token(&path).unwrap();
        assert!(!verify_token("-bad", "anything", &path));
    }

    #[test]
    fn connected_accounts_tracks_sessions() {
        let mut connected = ConnectedAccounts::default();
        assert!(!connected.is_connected("alice"));
        connected.mark_connected("alice", "tok");
        assert!(connected.is_connected("alice"));
        connected.mark_disconnected("alice");
        assert!(!connected.is_connected("alice"));
    }
}
