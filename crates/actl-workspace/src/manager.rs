//! The workspace manager: prepares and tears down managed git worktrees,
//! enforcing at-most-one-active-per-(repo,branch) and startup recovery.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use actl_core::{derive_worktree_path, validate_branch, Workspace, WorkspaceEvent, WorkspaceStatus};
use actl_events::{EventBus, HubEvent};
use actl_store::WorkspaceStore;
use chrono::Utc;
use uuid::Uuid;

use crate::error::WorkspaceManagerError;
use crate::git::GitExecutor;

/// Inputs for [`WorkspaceManager::prepare_worktree`].
#[derive(Debug, Clone)]
pub struct PrepareWorktreeRequest {
    /// Owning account name.
    pub owner: String,
    /// Repository path.
    pub repo_path: String,
    /// Branch name; validated against [`validate_branch`].
    pub branch: String,
    /// Id of the handoff that originated this workspace, if any.
    pub handoff_id: Option<String>,
}

/// Prepares, inspects, and tears down git-worktree-backed workspaces.
pub struct WorkspaceManager {
    store: WorkspaceStore,
    bus: Arc<EventBus>,
    git: Box<dyn GitExecutor>,
    recovered: AtomicBool,
}

impl WorkspaceManager {
    /// Builds a manager over `store`, publishing lifecycle events to `bus`
    /// and running worktree commands through `git`.
    pub fn new(store: WorkspaceStore, bus: Arc<EventBus>, git: Box<dyn GitExecutor>) -> Self {
        Self {
            store,
            bus,
            git,
            recovered: AtomicBool::new(false),
        }
    }

    /// Validates the request, returns the existing active workspace for
    /// `(repo_path, branch)` unchanged if one exists, or creates and
    /// attempts to provision a new one.
    ///
    /// # Errors
    ///
    /// Returns [`WorkspaceManagerError::InvalidRequest`] or
    /// [`WorkspaceManagerError::InvalidBranch`] on bad input,
    /// [`WorkspaceManagerError::PrepareFailed`] if `git worktree add` fails
    /// (the returned error carries the now-`failed` workspace), or a
    /// [`WorkspaceManagerError::Store`] on persistence failure.
    pub fn prepare_worktree(&self, req: PrepareWorktreeRequest) -> Result<Workspace, WorkspaceManagerError> {
        if req.owner.trim().is_empty() || req.repo_path.trim().is_empty() {
            return Err(WorkspaceManagerError::InvalidRequest(
                "owner and repo_path are required".to_string(),
            ));
        }
        if !validate_branch(&req.branch) {
            return Err(WorkspaceManagerError::InvalidBranch(req.branch));
        }

        if let Some(existing) = self.store.get_active_by_key(&req.repo_path, &req.branch)? {
            return Ok(existing);
        }

        let worktree_path = derive_worktree_path(&req.repo_path, &req.branch);
        let now = Utc::now().to_rfc3339();
        let workspace = Workspace {
            id: Uuid::new_v4().to_string(),
            owner: req.owner,
            repo_path: req.repo_path.clone(),
            branch: req.branch.clone(),
            worktree_path: worktree_path.clone(),
            status: WorkspaceStatus::Preparing,
            created_at: now.clone(),
            updated_at: now.clone(),
            events: vec![WorkspaceEvent::Preparing { at: now }],
            handoff_id: req.handoff_id,
        };
        self.store.create(&workspace)?;
        self.bus.emit(HubEvent::CheckpointReached {
            task_id: workspace.id.clone(),
            checkpoint: "workspace_preparing".to_string(),
        });

        match self.git.worktree_add(&req.repo_path, &worktree_path, &req.branch) {
            Ok(stdout) => {
                self.store.update_status(&workspace.id, WorkspaceStatus::Ready)?;
                let at = Utc::now().to_rfc3339();
                self.store
                    .add_event(&workspace.id, &WorkspaceEvent::Ready { git_output: stdout, at })?;
                let ready = self
                    .store
                    .get_by_id(&workspace.id)?
                    .ok_or_else(|| WorkspaceManagerError::NotFound(workspace.id.clone()))?;
                self.bus.emit(HubEvent::CheckpointReached {
                    task_id: ready.id.clone(),
                    checkpoint: "workspace_ready".to_string(),
                });
                Ok(ready)
            }
            Err(stderr) => {
                self.store.update_status(&workspace.id, WorkspaceStatus::Failed)?;
                let at = Utc::now().to_rfc3339();
                self.store
                    .add_event(&workspace.id, &WorkspaceEvent::Failed { stderr: stderr.clone(), at })?;
                let failed = self
                    .store
                    .get_by_id(&workspace.id)?
                    .ok_or_else(|| WorkspaceManagerError::NotFound(workspace.id.clone()))?;
                self.bus.emit(HubEvent::CheckpointReached {
                    task_id: failed.id.clone(),
                    checkpoint: "workspace_failed".to_string(),
                });
                Err(WorkspaceManagerError::PrepareFailed {
                    stderr,
                    workspace: Box::new(failed),
                })
            }
        }
    }

    /// Transitions `id` to `cleaning`, runs `git worktree remove`, and on
    /// success deletes the row and its events. On git failure the row is
    /// left `failed` and an error is returned.
    ///
    /// # Errors
    ///
    /// Returns [`WorkspaceManagerError::NotFound`], a
    /// [`WorkspaceManagerError::CleanupFailed`] carrying the failed
    /// workspace, or a [`WorkspaceManagerError::Store`].
    pub fn cleanup_workspace(&self, id: &str) -> Result<(), WorkspaceManagerError> {
        let workspace = self
            .store
            .get_by_id(id)?
            .ok_or_else(|| WorkspaceManagerError::NotFound(id.to_string()))?;
        self.store.update_status(id, WorkspaceStatus::Cleaning)?;

        match self.git.worktree_remove(&workspace.repo_path, &workspace.worktree_path) {
            Ok(_) => {
                self.store.delete(id)?;
                Ok(())
            }
            Err(stderr) => {
                self.store.update_status(id, WorkspaceStatus::Failed)?;
                let at = Utc::now().to_rfc3339();
                self.store
                    .add_event(id, &WorkspaceEvent::Failed { stderr: stderr.clone(), at })?;
                let failed = self
                    .store
                    .get_by_id(id)?
                    .ok_or_else(|| WorkspaceManagerError::NotFound(id.to_string()))?;
                Err(WorkspaceManagerError::CleanupFailed {
                    stderr,
                    workspace: Box::new(failed),
                })
            }
        }
    }

    /// Fetches a workspace by id.
    ///
    /// # Errors
    ///
    /// Returns [`WorkspaceManagerError::Store`] on persistence failure.
    pub fn get_workspace(&self, id: &str) -> Result<Option<Workspace>, WorkspaceManagerError> {
        Ok(self.store.get_by_id(id)?)
    }

    /// Fetches the active workspace for `(repo_path, branch)`, if any.
    ///
    /// # Errors
    ///
    /// Returns [`WorkspaceManagerError::Store`] on persistence failure.
    pub fn get_workspace_by_key(&self, repo_path: &str, branch: &str) -> Result<Option<Workspace>, WorkspaceManagerError> {
        Ok(self.store.get_active_by_key(repo_path, branch)?)
    }

    /// Forces every `preparing` row to `failed`, noting the recovery in its
    /// event log. Runs at most once per manager lifetime; later calls are a
    /// no-op, matching "runs exactly once per daemon lifetime".
    ///
    /// # Errors
    ///
    /// Returns [`WorkspaceManagerError::Store`] on persistence failure.
    pub fn recover_stale_workspaces(&self) -> Result<usize, WorkspaceManagerError> {
        if self.recovered.swap(true, Ordering::SeqCst) {
            return Ok(0);
        }
        let stale = self.store.get_by_status(WorkspaceStatus::Preparing)?;
        for workspace in &stale {
            self.store.update_status(&workspace.id, WorkspaceStatus::Failed)?;
            self.store.add_event(
                &workspace.id,
                &WorkspaceEvent::RecoveredStale {
                    at: Utc::now().to_rfc3339(),
                },
            )?;
        }
        Ok(stale.len())
    }
}
