//! Atomic JSON file I/O and directory-based advisory locking, used by the
//! task board, prompt library, analysis caches, and configuration loading.
#![deny(unsafe_code)]
#![warn(missing_docs)]

mod atomic;
mod error;
mod lock;

pub use atomic::{atomic_read, atomic_write, backup_file, clean_temp_files};
pub use error::FileStoreError;
pub use lock::{acquire_lock, LockGuard, LockOptions};
