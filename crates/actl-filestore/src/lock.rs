//! Directory-based advisory locking with TTL reclamation.
//!
//! A lock is a directory created atomically via [`std::fs::create_dir`]
//! next to the path it protects, at `<path>.lock`. Creation either
//! succeeds (we hold the lock) or fails with `AlreadyExists` (someone else
//! does). A lock older than its TTL is presumed abandoned by a crashed
//! holder and is reclaimed. A bare lock *file* (rather than a directory) is
//! treated the same way, for compatibility with an older on-disk layout.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime};

use rand::Rng;

use crate::error::{io_err, FileStoreError};

/// Tunables for [`acquire_lock`].
#[derive(Debug, Clone, Copy)]
pub struct LockOptions {
    /// How long a lock may be held before it's considered abandoned.
    pub ttl: Duration,
    /// Total time to keep retrying before giving up.
    pub retry_ceiling: Duration,
    /// Base backoff between retries; actual sleep is jittered up to 2x this.
    pub backoff_base: Duration,
}

impl Default for LockOptions {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(10),
            retry_ceiling: Duration::from_secs(5),
            backoff_base: Duration::from_millis(20),
        }
    }
}

/// A held lock. Release is idempotent: calling [`LockGuard::release`]
/// twice, or dropping after an explicit release, does nothing on the
/// second occasion.
pub struct LockGuard {
    path: PathBuf,
    released: bool,
}

impl LockGuard {
    /// Releases the lock. Safe to call more than once.
    pub fn release(&mut self) {
        if self.released {
            return;
        }
        let _ = std::fs::remove_dir_all(&self.path);
        self.released = true;
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        self.release();
    }
}

/// Acquires an advisory lock for `path` (stored at `<path>.lock`),
/// retrying with jittered backoff until `opts.retry_ceiling` elapses.
/// A lock whose age exceeds `opts.ttl` is reclaimed from its previous
/// holder before the retry is attempted again.
///
/// # Errors
///
/// Returns [`FileStoreError::LockContention`] if the ceiling is reached
/// without acquiring the lock, or [`FileStoreError::Io`] if filesystem
/// operations other than the expected `AlreadyExists` fail.
pub fn acquire_lock(path: &Path, opts: LockOptions) -> Result<LockGuard, FileStoreError> {
    let lock_path = lock_path_for(path);
    let deadline = Instant::now() + opts.retry_ceiling;

    loop {
        match std::fs::create_dir(&lock_path) {
            Ok(()) => {
                return Ok(LockGuard {
                    path: lock_path,
                    released: false,
                });
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                reclaim_if_stale(&lock_path, opts.ttl);
            }
            Err(e) => return Err(io_err(lock_path.display().to_string(), e)),
        }

        if Instant::now() >= deadline {
            return Err(FileStoreError::LockContention(
                lock_path.display().to_string(),
            ));
        }
        let jitter = rand::thread_rng().gen_range(0..=opts.backoff_base.as_millis() as u64);
        std::thread::sleep(opts.backoff_base + Duration::from_millis(jitter));
    }
}

fn lock_path_for(path: &Path) -> PathBuf {
    let mut s = path.as_os_str().to_os_string();
    s.push(".lock");
    PathBuf::from(s)
}

/// Removes `lock_path` if its age (directory or legacy file) exceeds `ttl`.
fn reclaim_if_stale(lock_path: &Path, ttl: Duration) {
    let Ok(meta) = std::fs::symlink_metadata(lock_path) else {
        return;
    };
    let Ok(modified) = meta.modified() else {
        return;
    };
    let Ok(age) = SystemTime::now().duration_since(modified) else {
        return;
    };
    if age <= ttl {
        return;
    }
    if meta.is_dir() {
        let _ = std::fs::remove_dir_all(lock_path);
    } else {
        let _ = std::fs::remove_file(lock_path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acquire_then_release_allows_reacquire() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("board.json");
        let mut guard = acquire_lock(&target, LockOptions::default()).unwrap();
        guard.release();
        let _second = acquire_lock(&target, LockOptions::default()).unwrap();
    }

    #[test]
    fn contended_lock_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("board.json");
        let _held = acquire_lock(&target, LockOptions::default()).unwrap();
        let opts = LockOptions {
            ttl: Duration::from_secs(600),
            retry_ceiling: Duration::from_millis(50),
            backoff_base: Duration::from_millis(5),
        };
        let result = acquire_lock(&target, opts);
        assert!(matches!(result, Err(FileStoreError::LockContention(_))));
    }

    #[test]
    fn stale_lock_is_reclaimed() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("board.json");
        let lock_path = lock_path_for(&target);
        std::fs::create_dir(&lock_path).unwrap();
        std::thread::sleep(Duration::from_millis(30));

        let opts = LockOptions {
            ttl: Duration::from_millis(10),
            retry_ceiling: Duration::from_secs(2),
            backoff_base: Duration::from_millis(5),
        };
        let _guard = acquire_lock(&target, opts).unwrap();
    }

    #[test]
    fn legacy_lock_file_is_also_reclaimable() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("board.json");
        let lock_path = lock_path_for(&target);
        std::fs::write(&lock_path, b"legacy").unwrap();
        std::thread::sleep(Duration::from_millis(30));

        let opts = LockOptions {
            ttl: Duration::from_millis(10),
            retry_ceiling: Duration::from_secs(2),
            backoff_base: Duration::from_millis(5),
        };
        let _guard = acquire_lock(&target, opts).unwrap();
    }
}
