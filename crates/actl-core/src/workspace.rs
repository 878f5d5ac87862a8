//! Managed git worktree data model: status, events, branch validation, and
//! the deterministic worktree-path derivation.

use serde::{Deserialize, Serialize};

/// Workspace lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkspaceStatus {
    /// `git worktree add` has been invoked but not yet confirmed.
    Preparing,
    /// Worktree exists and is usable.
    Ready,
    /// Worktree creation or removal failed.
    Failed,
    /// Worktree removal is in progress.
    Cleaning,
}

impl WorkspaceStatus {
    /// Whether this status counts toward the at-most-one-active-per-key
    /// invariant (`preparing`, `ready`, `cleaning`).
    #[must_use]
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Preparing | Self::Ready | Self::Cleaning)
    }
}

/// A single entry in a workspace's append-only event log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WorkspaceEvent {
    /// Worktree creation has started.
    Preparing {
        /// ISO-8601 timestamp.
        at: String,
    },
    /// Worktree is ready for use.
    Ready {
        /// Captured `git worktree add` stdout.
        git_output: String,
        /// ISO-8601 timestamp.
        at: String,
    },
    /// Worktree creation failed.
    Failed {
        /// Captured stderr.
        stderr: String,
        /// ISO-8601 timestamp.
        at: String,
    },
    /// A `preparing` row was force-recovered to `failed` at daemon startup.
    RecoveredStale {
        /// ISO-8601 timestamp.
        at: String,
    },
}

/// Managed git worktree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workspace {
    /// Unique workspace id.
    pub id: String,
    /// Owning account name.
    pub owner: String,
    /// Repository path.
    pub repo_path: String,
    /// Branch name.
    pub branch: String,
    /// Derived worktree path.
    pub worktree_path: String,
    /// Current status.
    pub status: WorkspaceStatus,
    /// ISO-8601 creation timestamp.
    pub created_at: String,
    /// ISO-8601 last-update timestamp.
    pub updated_at: String,
    /// Append-only event log.
    pub events: Vec<WorkspaceEvent>,
    /// Id of the handoff that originated this workspace, if any.
    pub handoff_id: Option<String>,
}

/// Validates a branch name: non-empty, `<= 200` chars, no segment starts
/// with `-` or `.`, no `..` segment, no empty segments, no leading `/`.
#[must_use]
pub fn validate_branch(branch: &str) -> bool {
    if branch.is_empty() || branch.len() > 200 {
        return false;
    }
    if branch.starts_with('/') {
        return false;
    }
    let segments: Vec<&str> = branch.split('/').collect();
    for seg in &segments {
        if seg.is_empty() {
            return false;
        }
        if *seg == ".." {
            return false;
        }
        if seg.starts_with('-') || seg.starts_with('.') {
            return false;
        }
    }
    true
}

/// Derives the deterministic worktree path `<repo>/.worktrees/<sanitized>`,
/// replacing every `/` in `branch` with `-`.
#[must_use]
pub fn derive_worktree_path(repo_path: &str, branch: &str) -> String {
    let sanitized = branch.replace('/', "-");
    format!("{}/.worktrees/{}", repo_path.trim_end_matches('/'), sanitized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn branch_validator_accepts() {
        assert!(validate_branch("main"));
        assert!(validate_branch("feature/x"));
    }

    #[test]
    fn branch_validator_rejects() {
        assert!(!validate_branch("../etc/passwd"));
        assert!(!validate_branch("/absolute"));
        assert!(!validate_branch("-flag"));
        assert!(!validate_branch(".hidden"));
        assert!(!validate_branch(""));
        assert!(!validate_branch(&"a".repeat(201)));
        assert!(!validate_branch("feature//branch"));
    }

    #[test]
    fn worktree_path_sanitizes_slashes() {
        assert_eq!(
            derive_worktree_path("/tmp/r", "feature/x"),
            "/tmp/r/.worktrees/feature-x"
        );
    }

    #[test]
    fn active_statuses() {
        assert!(WorkspaceStatus::Preparing.is_active());
        assert!(WorkspaceStatus::Ready.is_active());
        assert!(WorkspaceStatus::Cleaning.is_active());
        assert!(!WorkspaceStatus::Failed.is_active());
    }
}
