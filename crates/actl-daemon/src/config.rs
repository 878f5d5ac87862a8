//! Hub directory layout and daemon-wide configuration.

use std::path::{Path, PathBuf};

/// Resolved filesystem layout under the hub directory
/// (`$AGENTCTL_DIR`, defaulting to `$HOME/.agentctl`).
#[derive(Debug, Clone)]
pub struct HubPaths {
    root: PathBuf,
}

impl HubPaths {
    /// Resolves the hub root from `AGENTCTL_DIR`, falling back to
    /// `$HOME/.agentctl`.
    ///
    /// # Panics
    ///
    /// Panics if neither `AGENTCTL_DIR` nor `HOME` is set, matching the
    /// environment contract: one of the two must be present.
    #[must_use]
    pub fn resolve() -> Self {
        let root = std::env::var_os("AGENTCTL_DIR").map_or_else(
            || {
                let home = std::env::var_os("HOME").expect("HOME must be set when AGENTCTL_DIR is not");
                PathBuf::from(home).join(".agentctl")
            },
            PathBuf::from,
        );
        Self::at(root)
    }

    /// Builds a layout rooted at an explicit directory (used by tests).
    #[must_use]
    pub fn at(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The hub root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Unix stream socket path.
    #[must_use]
    pub fn socket(&self) -> PathBuf {
        self.root.join("hub.sock")
    }

    /// Daemon PID file path.
    #[must_use]
    pub fn pid_file(&self) -> PathBuf {
        self.root.join("daemon.pid")
    }

    /// Directory holding one token file per account.
    #[must_use]
    pub fn tokens_dir(&self) -> PathBuf {
        self.root.join("tokens")
    }

    /// Token file path for `account`.
    #[must_use]
    pub fn token_file(&self, account: &str) -> PathBuf {
        self.tokens_dir().join(format!("{account}.token"))
    }

    /// HMAC signing key path for verification receipts.
    #[must_use]
    pub fn receipt_key(&self) -> PathBuf {
        self.root.join("receipt.key")
    }

    /// Daemon log file path.
    #[must_use]
    pub fn log_file(&self) -> PathBuf {
        self.root.join("daemon.log")
    }

    /// JSON task-board file path.
    #[must_use]
    pub fn tasks_file(&self) -> PathBuf {
        self.root.join("tasks.json")
    }

    /// Directory external agent sessions write `<session_id>.json` state
    /// files into, watched by the session watcher.
    #[must_use]
    pub fn sessions_dir(&self) -> PathBuf {
        self.root.join("sessions")
    }

    /// SQLite database path for `name` (without extension).
    #[must_use]
    pub fn db(&self, name: &str) -> PathBuf {
        self.root.join(format!("{name}.db"))
    }

    /// Renders a path as a string for store/file-store APIs that take `&str`.
    #[must_use]
    pub fn db_str(&self, name: &str) -> String {
        self.db(name).to_string_lossy().into_owned()
    }
}

/// Tunable intervals for the daemon's background loops.
#[derive(Debug, Clone, Copy)]
pub struct Intervals {
    /// Stale-task SLA sweep cadence.
    pub sla_scan: std::time::Duration,
    /// Adaptive SLA sweep cadence.
    pub adaptive_sla_scan: std::time::Duration,
    /// Watchdog health-probe cadence.
    pub watchdog: std::time::Duration,
}

impl Default for Intervals {
    fn default() -> Self {
        Self {
            sla_scan: std::time::Duration::from_secs(60),
            adaptive_sla_scan: std::time::Duration::from_secs(30),
            watchdog: std::time::Duration::from_secs(30),
        }
    }
}
