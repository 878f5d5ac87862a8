//! Workspace (managed git worktree) persistence.

use actl_core::{Workspace, WorkspaceEvent, WorkspaceStatus};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};

use crate::db;
use crate::StoreError;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS workspaces (
    id TEXT PRIMARY KEY,
    owner TEXT NOT NULL,
    repo_path TEXT NOT NULL,
    branch TEXT NOT NULL,
    worktree_path TEXT NOT NULL,
    status TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    handoff_id TEXT
);
CREATE TABLE IF NOT EXISTS workspace_events (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    workspace_id TEXT NOT NULL REFERENCES workspaces(id),
    payload TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_workspace_events_workspace ON workspace_events(workspace_id);
CREATE INDEX IF NOT EXISTS idx_workspaces_repo_branch ON workspaces(repo_path, branch);
";

/// SQLite-backed store for managed git worktrees and their event logs.
pub struct WorkspaceStore {
    conn: Connection,
}

impl WorkspaceStore {
    /// Opens (or creates) the workspace database at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the connection or schema setup fails.
    pub fn open(path: &str) -> Result<Self, StoreError> {
        Ok(Self {
            conn: db::open(path, SCHEMA)?,
        })
    }

    /// Inserts a new workspace row with an empty event log.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the insert fails.
    pub fn create(&self, workspace: &Workspace) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO workspaces
                (id, owner, repo_path, branch, worktree_path, status, created_at, updated_at, handoff_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                workspace.id,
                workspace.owner,
                workspace.repo_path,
                workspace.branch,
                workspace.worktree_path,
                status_str(workspace.status),
                workspace.created_at,
                workspace.updated_at,
                workspace.handoff_id,
            ],
        )?;
        for event in &workspace.events {
            self.append_event_row(&workspace.id, event)?;
        }
        Ok(())
    }

    /// Updates `id`'s status and bumps `updated_at` to now.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the update fails, or [`StoreError::NotFound`]
    /// if no row matched.
    pub fn update_status(&self, id: &str, status: WorkspaceStatus) -> Result<(), StoreError> {
        let affected = self.conn.execute(
            "UPDATE workspaces SET status = ?1, updated_at = ?2 WHERE id = ?3",
            params![status_str(status), Utc::now().to_rfc3339(), id],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound(id.to_string()));
        }
        Ok(())
    }

    /// Appends an event to `id`'s event log.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the insert fails.
    pub fn add_event(&self, id: &str, event: &WorkspaceEvent) -> Result<(), StoreError> {
        self.append_event_row(id, event)
    }

    fn append_event_row(&self, workspace_id: &str, event: &WorkspaceEvent) -> Result<(), StoreError> {
        let payload = serde_json::to_string(event)?;
        self.conn.execute(
            "INSERT INTO workspace_events (workspace_id, payload) VALUES (?1, ?2)",
            params![workspace_id, payload],
        )?;
        Ok(())
    }

    /// Fetches a workspace by id, including its full event log in insertion
    /// order. Returns `Ok(None)` if no row matches.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the query or row decoding fails.
    pub fn get_by_id(&self, id: &str) -> Result<Option<Workspace>, StoreError> {
        let row = self
            .conn
            .query_row(
                "SELECT id, owner, repo_path, branch, worktree_path, status, created_at, updated_at, handoff_id
                 FROM workspaces WHERE id = ?1",
                params![id],
                row_to_workspace_shell,
            )
            .optional()?;
        let Some(mut workspace) = row else {
            return Ok(None);
        };
        workspace.events = self.load_events(id)?;
        Ok(Some(workspace))
    }

    /// Returns the single active workspace (status in `preparing`, `ready`,
    /// `cleaning`) for `(repo_path, branch)`, if any. Callers rely on this
    /// to enforce at-most-one-active-per-key.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the query or row decoding fails.
    pub fn get_active_by_key(
        &self,
        repo_path: &str,
        branch: &str,
    ) -> Result<Option<Workspace>, StoreError> {
        let row = self
            .conn
            .query_row(
                "SELECT id, owner, repo_path, branch, worktree_path, status, created_at, updated_at, handoff_id
                 FROM workspaces
                 WHERE repo_path = ?1 AND branch = ?2
                   AND status IN ('preparing', 'ready', 'cleaning')
                 LIMIT 1",
                params![repo_path, branch],
                row_to_workspace_shell,
            )
            .optional()?;
        let Some(mut workspace) = row else {
            return Ok(None);
        };
        workspace.events = self.load_events(&workspace.id)?;
        Ok(Some(workspace))
    }

    /// Returns every workspace with the given status.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the query or row decoding fails.
    pub fn get_by_status(&self, status: WorkspaceStatus) -> Result<Vec<Workspace>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, owner, repo_path, branch, worktree_path, status, created_at, updated_at, handoff_id
             FROM workspaces WHERE status = ?1",
        )?;
        let shells: Vec<Workspace> = stmt
            .query_map(params![status_str(status)], row_to_workspace_shell)?
            .collect::<Result<Vec<_>, _>>()?;
        let mut out = Vec::with_capacity(shells.len());
        for mut workspace in shells {
            workspace.events = self.load_events(&workspace.id)?;
            out.push(workspace);
        }
        Ok(out)
    }

    /// Deletes a workspace's events, then the workspace row itself.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if either delete fails.
    pub fn delete(&self, id: &str) -> Result<(), StoreError> {
        self.conn.execute(
            "DELETE FROM workspace_events WHERE workspace_id = ?1",
            params![id],
        )?;
        self.conn
            .execute("DELETE FROM workspaces WHERE id = ?1", params![id])?;
        Ok(())
    }

    /// Closes the underlying connection.
    pub fn close(self) {
        drop(self.conn);
    }

    fn load_events(&self, workspace_id: &str) -> Result<Vec<WorkspaceEvent>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT payload FROM workspace_events WHERE workspace_id = ?1 ORDER BY id ASC")?;
        let rows = stmt.query_map(params![workspace_id], |row| row.get::<_, String>(0))?;
        let mut events = Vec::new();
        for payload in rows {
            events.push(serde_json::from_str(&payload?)?);
        }
        Ok(events)
    }
}

fn status_str(status: WorkspaceStatus) -> &'static str {
    match status {
        WorkspaceStatus::Preparing => "preparing",
        WorkspaceStatus::Ready => "ready",
        WorkspaceStatus::Failed => "failed",
        WorkspaceStatus::Cleaning => "cleaning",
    }
}

fn parse_status(raw: &str) -> WorkspaceStatus {
    match raw {
        "ready" => WorkspaceStatus::Ready,
        "failed" => WorkspaceStatus::Failed,
        "cleaning" => WorkspaceStatus::Cleaning,
        _ => WorkspaceStatus::Preparing,
    }
}

fn row_to_workspace_shell(row: &rusqlite::Row<'_>) -> rusqlite::Result<Workspace> {
    let status_raw: String = row.get(5)?;
    Ok(Workspace {
        id: row.get(0)?,
        owner: row.get(1)?,
        repo_path: row.get(2)?,
        branch: row.get(3)?,
        worktree_path: row.get(4)?,
        status: parse_status(&status_raw),
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
        events: Vec::new(),
        handoff_id: row.get(8)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(id: &str, branch: &str, status: WorkspaceStatus) -> Workspace {
        let now = Utc::now().to_rfc3339();
        Workspace {
            id: id.to_string(),
            owner: "alice".to_string(),
            repo_path: "/repo".to_string(),
            branch: branch.to_string(),
            worktree_path: format!("/repo/.worktrees/{branch}"),
            status,
            created_at: now.clone(),
            updated_at: now.clone(),
            events: vec![WorkspaceEvent::Preparing { at: now }],
            handoff_id: None,
        }
    }

    #[test]
    fn create_and_get_by_id_roundtrips_events() {
        let store = WorkspaceStore::open(":memory:").unwrap();
        let ws = sample("w1", "feature/x", WorkspaceStatus::Preparing);
        store.create(&ws).unwrap();
        let fetched = store.get_by_id("w1").unwrap().unwrap();
        assert_eq!(fetched.events.len(), 1);
        assert_eq!(fetched.branch, "feature/x");
    }

    #[test]
    fn update_status_bumps_updated_at() {
        let store = WorkspaceStore::open(":memory:").unwrap();
        let ws = sample("w1", "main", WorkspaceStatus::Preparing);
        store.create(&ws).unwrap();
        store.update_status("w1", WorkspaceStatus::Ready).unwrap();
        let fetched = store.get_by_id("w1").unwrap().unwrap();
        assert_eq!(fetched.status, WorkspaceStatus::Ready);
    }

    #[test]
    fn get_active_by_key_excludes_failed() {
        let store = WorkspaceStore::open(":memory:").unwrap();
        store
            .create(&sample("w1", "main", WorkspaceStatus::Failed))
            .unwrap();
        assert!(store.get_active_by_key("/repo", "main").unwrap().is_none());
        store
            .create(&sample("w2", "main", WorkspaceStatus::Ready))
            .unwrap();
        let active = store.get_active_by_key("/repo", "main").unwrap().unwrap();
        assert_eq!(active.id, "w2");
    }

    #[test]
    fn delete_removes_events_then_row() {
        let store = WorkspaceStore::open(":memory:").unwrap();
        store
            .create(&sample("w1", "main", WorkspaceStatus::Ready))
            .unwrap();
        store.delete("w1").unwrap();
        assert!(store.get_by_id("w1").unwrap().is_none());
    }
}
