//! Injected git execution, so the manager is testable without a real
//! repository. The production implementation shells out directly: spawn,
//! wait, inspect the exit status.

use std::process::Command;

/// Runs the `git worktree` subcommands the workspace manager needs.
pub trait GitExecutor: Send + Sync {
    /// Runs `git worktree add <worktree_path> <branch>` in `repo_path`.
    /// Returns captured stdout on success, captured stderr on failure.
    fn worktree_add(&self, repo_path: &str, worktree_path: &str, branch: &str) -> Result<String, String>;

    /// Runs `git worktree remove <worktree_path> --force` in `repo_path`.
    /// Returns captured stdout on success, captured stderr on failure.
    fn worktree_remove(&self, repo_path: &str, worktree_path: &str) -> Result<String, String>;
}

/// Shells out to the system `git` binary.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemGitExecutor;

impl GitExecutor for SystemGitExecutor {
    fn worktree_add(&self, repo_path: &str, worktree_path: &str, branch: &str) -> Result<String, String> {
        run_git(repo_path, &["worktree", "add", worktree_path, branch])
    }

    fn worktree_remove(&self, repo_path: &str, worktree_path: &str) -> Result<String, String> {
        run_git(repo_path, &["worktree", "remove", worktree_path, "--force"])
    }
}

fn run_git(repo_path: &str, args: &[&str]) -> Result<String, String> {
    let output = Command::new("git")
        .args(args)
        .current_dir(repo_path)
        .output()
        .map_err(|e| format!("failed to spawn git: {e}"))?;
    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    } else {
        Err(String::from_utf8_lossy(&output.stderr).to_string())
    }
}
