//! Thin supplemental stores: a note index for the knowledge RPCs, a
//! session↔task correlation table for crash-restart durability, and a
//! generic append-only log shared by the workflow engine, retro engine, and
//! circuit breaker activity sinks. None of these need more than
//! insert-and-list; there is no workflow/retro DSL here, only a durable
//! record of the events those subsystems reference.

use chrono::Utc;
use rusqlite::{params, Connection};

use crate::db;
use crate::StoreError;

const KNOWLEDGE_SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS notes (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    content TEXT NOT NULL,
    created_at TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS task_links (
    task_id TEXT NOT NULL,
    note_id TEXT NOT NULL REFERENCES notes(id),
    PRIMARY KEY (task_id, note_id)
);
";

/// A single indexed note.
#[derive(Debug, Clone, PartialEq)]
pub struct Note {
    /// Unique note id.
    pub id: String,
    /// Short title.
    pub title: String,
    /// Full note body.
    pub content: String,
    /// ISO-8601 creation timestamp.
    pub created_at: String,
}

/// Note index backing `search_knowledge` / `index_note` / `link_task` /
/// `get_task_links`.
pub struct KnowledgeStore {
    conn: Connection,
}

impl KnowledgeStore {
    /// Opens (or creates) the knowledge database at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the connection or schema setup fails.
    pub fn open(path: &str) -> Result<Self, StoreError> {
        Ok(Self {
            conn: db::open(path, KNOWLEDGE_SCHEMA)?,
        })
    }

    /// Indexes a note under `id`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the insert fails.
    pub fn index_note(&self, id: &str, title: &str, content: &str) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO notes (id, title, content, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![id, title, content, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    /// Case-insensitive substring search over title and content.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the query or row decoding fails.
    pub fn search_knowledge(&self, query: &str) -> Result<Vec<Note>, StoreError> {
        let pattern = format!("%{}%", query.replace('%', "\\%"));
        let mut stmt = self.conn.prepare(
            "SELECT id, title, content, created_at FROM notes
             WHERE title LIKE ?1 ESCAPE '\\' OR content LIKE ?1 ESCAPE '\\'
             ORDER BY created_at DESC",
        )?;
        let rows = stmt.query_map(params![pattern], |row| {
            Ok(Note {
                id: row.get(0)?,
                title: row.get(1)?,
                content: row.get(2)?,
                created_at: row.get(3)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(StoreError::from)
    }

    /// Links `note_id` to `task_id`. Idempotent: linking twice is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the insert fails.
    pub fn link_task(&self, task_id: &str, note_id: &str) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT OR IGNORE INTO task_links (task_id, note_id) VALUES (?1, ?2)",
            params![task_id, note_id],
        )?;
        Ok(())
    }

    /// Returns every note linked to `task_id`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the query or row decoding fails.
    pub fn get_task_links(&self, task_id: &str) -> Result<Vec<Note>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT n.id, n.title, n.content, n.created_at FROM notes n
             JOIN task_links tl ON tl.note_id = n.id
             WHERE tl.task_id = ?1
             ORDER BY n.created_at ASC",
        )?;
        let rows = stmt.query_map(params![task_id], |row| {
            Ok(Note {
                id: row.get(0)?,
                title: row.get(1)?,
                content: row.get(2)?,
                created_at: row.get(3)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(StoreError::from)
    }

    /// Closes the underlying connection.
    pub fn close(self) {
        drop(self.conn);
    }
}

const SESSIONS_SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS sessions (
    session_id TEXT PRIMARY KEY,
    task_id TEXT NOT NULL,
    expected_files TEXT NOT NULL DEFAULT '[]',
    created_at TEXT NOT NULL
);
";

/// A durable session↔task↔expected-files correlation row, surviving
/// daemon restarts even though the live watcher keeps its own in-memory copy.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionRecord {
    /// Session id (matches the watcher's session directory name).
    pub session_id: String,
    /// Task this session is bound to.
    pub task_id: String,
    /// File paths (relative to the session directory) expected to appear.
    pub expected_files: Vec<String>,
    /// ISO-8601 creation timestamp.
    pub created_at: String,
}

/// Durable record of session↔task correlations for crash-restart recovery.
pub struct SessionStore {
    conn: Connection,
}

impl SessionStore {
    /// Opens (or creates) the session database at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the connection or schema setup fails.
    pub fn open(path: &str) -> Result<Self, StoreError> {
        Ok(Self {
            conn: db::open(path, SESSIONS_SCHEMA)?,
        })
    }

    /// Records a new session↔task correlation.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the insert fails.
    pub fn record(&self, session_id: &str, task_id: &str, expected_files: &[String]) -> Result<(), StoreError> {
        let files = serde_json::to_string(expected_files)?;
        self.conn.execute(
            "INSERT OR REPLACE INTO sessions (session_id, task_id, expected_files, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![session_id, task_id, files, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    /// Returns every recorded session, for daemon-startup recovery.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the query or row decoding fails.
    pub fn list(&self) -> Result<Vec<SessionRecord>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT session_id, task_id, expected_files, created_at FROM sessions")?;
        let rows = stmt.query_map([], |row| {
            let files_raw: String = row.get(2)?;
            Ok((
                SessionRecord {
                    session_id: row.get(0)?,
                    task_id: row.get(1)?,
                    expected_files: Vec::new(),
                    created_at: row.get(3)?,
                },
                files_raw,
            ))
        })?;
        let mut out = Vec::new();
        for row in rows {
            let (mut record, files_raw) = row?;
            record.expected_files = serde_json::from_str(&files_raw)?;
            out.push(record);
        }
        Ok(out)
    }

    /// Removes a session's correlation row once the watcher retires it.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the delete fails.
    pub fn remove(&self, session_id: &str) -> Result<(), StoreError> {
        self.conn
            .execute("DELETE FROM sessions WHERE session_id = ?1", params![session_id])?;
        Ok(())
    }

    /// Closes the underlying connection.
    pub fn close(self) {
        drop(self.conn);
    }
}

/// An append-only event log shared by the workflow engine, retro engine,
/// and circuit breaker activity sinks. Each exposes only `append`/`list`:
/// none of these subsystems need a query language, only a durable trail.
pub struct AppendLogStore {
    conn: Connection,
    table: &'static str,
}

/// A single logged event.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    /// Monotonically increasing row id.
    pub id: i64,
    /// Free-form JSON payload, shape owned by the caller.
    pub payload: String,
    /// ISO-8601 timestamp.
    pub at: String,
}

impl AppendLogStore {
    /// Opens (or creates) an append-only log database at `path`, backed by
    /// a table named `table`. `table` must be a compile-time identifier
    /// (one of `workflow_events`, `retro_events`, `activity_events`) since
    /// it is interpolated directly into DDL/DML, never sourced from
    /// untrusted input.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the connection or schema setup fails.
    pub fn open(path: &str, table: &'static str) -> Result<Self, StoreError> {
        let schema = format!(
            "CREATE TABLE IF NOT EXISTS {table} (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                payload TEXT NOT NULL,
                at TEXT NOT NULL
            );"
        );
        Ok(Self {
            conn: db::open(path, &schema)?,
            table,
        })
    }

    /// Appends `payload` with the current timestamp.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the insert fails.
    pub fn append(&self, payload: &str) -> Result<i64, StoreError> {
        self.conn.execute(
            &format!("INSERT INTO {} (payload, at) VALUES (?1, ?2)", self.table),
            params![payload, Utc::now().to_rfc3339()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Returns the most recent `limit` entries, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the query or row decoding fails.
    pub fn list(&self, limit: i64) -> Result<Vec<LogEntry>, StoreError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT id, payload, at FROM (
                SELECT id, payload, at FROM {} ORDER BY id DESC LIMIT ?1
             ) ORDER BY id ASC",
            self.table
        ))?;
        let rows = stmt.query_map(params![limit], |row| {
            Ok(LogEntry {
                id: row.get(0)?,
                payload: row.get(1)?,
                at: row.get(2)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(StoreError::from)
    }

    /// Closes the underlying connection.
    pub fn close(self) {
        drop(self.conn);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn knowledge_search_matches_title_and_content() {
        let store = KnowledgeStore::open(":memory:").unwrap();
        store.index_note("n1", "Deploy runbook", "use the release script").unwrap();
        store.index_note("n2", "Unrelated", "nothing here").unwrap();
        let hits = store.search_knowledge("deploy").unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "n1");
    }

    #[test]
    fn task_links_roundtrip() {
        let store = KnowledgeStore::open(":memory:").unwrap();
        store.index_note("n1", "t", "c").unwrap();
        store.link_task("task-1", "n1").unwrap();
        store.link_task("task-1", "n1").unwrap();
        let links = store.get_task_links("task-1").unwrap();
        assert_eq!(links.len(), 1);
    }

    #[test]
    fn session_store_roundtrips_expected_files() {
        let store = SessionStore::open(":memory:").unwrap();
        store
            .record("sess-1", "task-1", &["out.json".to_string()])
            .unwrap();
        let sessions = store.list().unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].expected_files, vec!["out.json".to_string()]);
        store.remove("sess-1").unwrap();
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn append_log_is_append_only_and_ordered() {
        let store = AppendLogStore::open(":memory:", "activity_events").unwrap();
        store.append("{\"event\":\"a\"}").unwrap();
        store.append("{\"event\":\"b\"}").unwrap();
        let entries = store.list(10).unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries[0].id < entries[1].id);
    }
}
