//! Signing-key lifecycle: `<hub>/receipt.key`, created with owner-only
//! permissions on first use.

use std::path::Path;

use rand::RngCore;

use crate::error::ReceiptError;

const KEY_BYTES: usize = 32;

/// Reads the signing key at `path`, generating and persisting a fresh
/// 32-byte key with mode `0600` if the file doesn't exist yet.
///
/// # Errors
///
/// Returns [`ReceiptError::KeyIo`] if the file cannot be read, written, or
/// have its permissions set.
pub fn load_or_create_signing_key(path: &Path) -> Result<Vec<u8>, ReceiptError> {
    match std::fs::read(path) {
        Ok(bytes) if !bytes.is_empty() => Ok(bytes),
        Ok(_) | Err(_) => create_signing_key(path),
    }
}

fn create_signing_key(path: &Path) -> Result<Vec<u8>, ReceiptError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .map_err(|e| key_io(parent.display().to_string(), e))?;
        }
    }
    let mut key = vec![0u8; KEY_BYTES];
    rand::thread_rng().fill_bytes(&mut key);
    std::fs::write(path, &key).map_err(|e| key_io(path.display().to_string(), e))?;
    set_owner_only(path)?;
    Ok(key)
}

#[cfg(unix)]
fn set_owner_only(path: &Path) -> Result<(), ReceiptError> {
    use std::os::unix::fs::PermissionsExt;
    let perms = std::fs::Permissions::from_mode(0o600);
    std::fs::set_permissions(path, perms).map_err(|e| key_io(path.display().to_string(), e))
}

#[cfg(not(unix))]
fn set_owner_only(_path: &Path) -> Result<(), ReceiptError> {
    Ok(())
}

fn key_io(path: String, source: std::io::Error) -> ReceiptError {
    ReceiptError::KeyIo { path, source }
}
