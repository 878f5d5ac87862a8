//! Loads and saves the JSON task board, the daemon's single source of truth
//! for task state. Every handler that mutates tasks follows the same
//! load-mutate-atomic-save shape the circuit breaker's quarantine path uses.

use std::path::{Path, PathBuf};

use actl_core::Task;
use actl_tasks::TaskBoard;

/// Owns the task-board file path and the load/save round trip.
pub struct BoardStore {
    path: PathBuf,
}

impl BoardStore {
    /// Builds a store over `path`. The file is created on first write if
    /// absent.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Loads the current board, or an empty one if the file doesn't exist
    /// yet.
    ///
    /// # Errors
    ///
    /// Returns [`actl_filestore::FileStoreError`] on I/O or parse failure
    /// other than a missing file.
    pub fn load(&self) -> Result<TaskBoard, actl_filestore::FileStoreError> {
        let tasks: Vec<Task> = actl_filestore::atomic_read(&self.path)?.unwrap_or_default();
        Ok(TaskBoard::from_tasks(tasks))
    }

    /// Atomically persists `board`.
    ///
    /// # Errors
    ///
    /// Returns [`actl_filestore::FileStoreError`] on lock contention or I/O
    /// failure.
    pub fn save(&self, board: &TaskBoard) -> Result<(), actl_filestore::FileStoreError> {
        actl_filestore::atomic_write(&self.path, &board.tasks().to_vec())
    }

    /// The underlying file path, for components (the circuit breaker) that
    /// need to load and save the board themselves.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}
