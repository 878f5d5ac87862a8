//! Atomic JSON file I/O: write-to-temp-then-rename under an advisory lock,
//! best-effort read that treats absence/corruption as "no value" rather
//! than an error, versioned backups, and temp-file cleanup.

use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{io_err, FileStoreError};
use crate::lock::{acquire_lock, LockOptions};

/// Serializes `value` to pretty JSON and writes it to `path` atomically:
/// acquire the advisory lock, write to a unique `<path>.tmp.<pid>.<nanos>`
/// sibling, rename over `path`, release the lock. Creates parent
/// directories on demand.
///
/// # Errors
///
/// Returns [`FileStoreError`] if the lock cannot be acquired, the value
/// cannot be serialized, or any filesystem operation fails.
pub fn atomic_write<T: Serialize>(path: &Path, value: &T) -> Result<(), FileStoreError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| io_err(parent.display().to_string(), e))?;
        }
    }
    let mut guard = acquire_lock(path, LockOptions::default())?;
    let json = serde_json::to_vec_pretty(value)?;
    let tmp_path = temp_sibling(path, "tmp");
    let result = std::fs::write(&tmp_path, &json)
        .map_err(|e| io_err(tmp_path.display().to_string(), e))
        .and_then(|()| {
            std::fs::rename(&tmp_path, path).map_err(|e| io_err(path.display().to_string(), e))
        });
    guard.release();
    result
}

/// Reads and deserializes `path`. Returns `Ok(None)` for a missing file, an
/// empty file, or a file that fails to parse — callers treat all three as
/// "no value yet", never as an error.
///
/// # Errors
///
/// Returns [`FileStoreError::Io`] only for I/O failures other than the file
/// not existing (e.g. permission denied).
pub fn atomic_read<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, FileStoreError> {
    let bytes = match std::fs::read(path) {
        Ok(b) => b,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(io_err(path.display().to_string(), e)),
    };
    if bytes.is_empty() {
        return Ok(None);
    }
    Ok(serde_json::from_slice(&bytes).ok())
}

/// Copies `path` to `<path>.backup.v<version>.<nanos>` and returns the new
/// path.
///
/// # Errors
///
/// Returns [`FileStoreError::Io`] if the copy fails.
pub fn backup_file(path: &Path, version: u32) -> Result<std::path::PathBuf, FileStoreError> {
    let nanos = now_nanos();
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(format!(".backup.v{version}.{nanos}"));
    let backup_path = path.with_file_name(name);
    std::fs::copy(path, &backup_path).map_err(|e| io_err(path.display().to_string(), e))?;
    Ok(backup_path)
}

/// Removes every entry directly under `dir` whose file name contains
/// `.tmp.`, returning the count removed. Missing `dir` counts as zero, not
/// an error.
///
/// # Errors
///
/// Returns [`FileStoreError::Io`] if `dir` exists but cannot be read, or an
/// entry matching the pattern cannot be removed.
pub fn clean_temp_files(dir: &Path) -> Result<usize, FileStoreError> {
    let entries = match std::fs::read_dir(dir) {
        Ok(e) => e,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(io_err(dir.display().to_string(), e)),
    };
    let mut count = 0;
    for entry in entries {
        let entry = entry.map_err(|e| io_err(dir.display().to_string(), e))?;
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name.contains(".tmp.") {
            let path = entry.path();
            std::fs::remove_file(&path).map_err(|e| io_err(path.display().to_string(), e))?;
            count += 1;
        }
    }
    Ok(count)
}

fn temp_sibling(path: &Path, marker: &str) -> std::path::PathBuf {
    let nanos = now_nanos();
    let pid = std::process::id();
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(format!(".{marker}.{pid}.{nanos}"));
    path.with_file_name(name)
}

fn now_nanos() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::sync::Arc;
    use std::thread;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Board {
        tasks: Vec<String>,
    }

    #[test]
    fn write_then_read_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("board.json");
        let board = Board {
            tasks: vec!["t1".to_string()],
        };
        atomic_write(&path, &board).unwrap();
        let read: Option<Board> = atomic_read(&path).unwrap();
        assert_eq!(read, Some(board));
    }

    #[test]
    fn read_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.json");
        let read: Option<Board> = atomic_read(&path).unwrap();
        assert_eq!(read, None);
    }

    #[test]
    fn read_empty_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.json");
        std::fs::write(&path, b"").unwrap();
        let read: Option<Board> = atomic_read(&path).unwrap();
        assert_eq!(read, None);
    }

    #[test]
    fn read_corrupt_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corrupt.json");
        std::fs::write(&path, b"{not json").unwrap();
        let read: Option<Board> = atomic_read(&path).unwrap();
        assert_eq!(read, None);
    }

    #[test]
    fn backup_file_copies_with_version_suffix() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("board.json");
        atomic_write(&path, &Board { tasks: vec![] }).unwrap();
        let backup = backup_file(&path, 3).unwrap();
        assert!(backup.file_name().unwrap().to_string_lossy().contains(".backup.v3."));
        assert!(backup.exists());
    }

    #[test]
    fn clean_temp_files_removes_only_tmp_markers() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("board.json.tmp.123.456"), b"x").unwrap();
        std::fs::write(dir.path().join("board.json"), b"{}").unwrap();
        let count = clean_temp_files(dir.path()).unwrap();
        assert_eq!(count, 1);
        assert!(dir.path().join("board.json").exists());
    }

    #[test]
    fn clean_temp_files_on_missing_dir_is_zero() {
        let count = clean_temp_files(Path::new("/nonexistent/path/for/test")).unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn parallel_writers_leave_no_tmp_residue_and_one_winner() {
        let dir = tempfile::tempdir().unwrap();
        let path = Arc::new(dir.path().join("board.json"));
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let path = Arc::clone(&path);
                thread::spawn(move || {
                    atomic_write(
                        &path,
                        &Board {
                            tasks: vec![format!("writer-{i}")],
                        },
                    )
                    .unwrap();
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        let final_board: Board = atomic_read(&path).unwrap().unwrap();
        assert_eq!(final_board.tasks.len(), 1);
        let residue = clean_temp_files(dir.path()).unwrap();
        assert_eq!(residue, 0);
    }
}
