//! Per-account trust reputation store.

use actl_core::{TrustHistoryEntry, TrustOutcomeKind, TrustReputation};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};

use crate::db;
use crate::StoreError;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS trust_reputations (
    account TEXT PRIMARY KEY,
    score INTEGER NOT NULL DEFAULT 50,
    completed INTEGER NOT NULL DEFAULT 0,
    rejected INTEGER NOT NULL DEFAULT 0,
    failed INTEGER NOT NULL DEFAULT 0,
    avg_completion_minutes REAL NOT NULL DEFAULT 0
);
CREATE TABLE IF NOT EXISTS trust_history (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    account TEXT NOT NULL,
    at TEXT NOT NULL,
    delta INTEGER NOT NULL,
    reason TEXT NOT NULL,
    old_score INTEGER NOT NULL,
    new_score INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_trust_history_account ON trust_history(account, id);
";

/// SQLite-backed store for per-account trust reputations.
pub struct TrustStore {
    conn: Connection,
}

impl TrustStore {
    /// Opens (or creates) the trust database at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the connection or schema setup fails.
    pub fn open(path: &str) -> Result<Self, StoreError> {
        Ok(Self {
            conn: db::open(path, SCHEMA)?,
        })
    }

    /// Records an outcome for `account`: computes the delta for `kind`,
    /// clamps the resulting score to `[0, 100]`, updates the running
    /// completion-time mean when `duration_minutes` is given, and appends a
    /// history row. Returns the updated reputation.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the read or write fails.
    pub fn record_outcome(
        &self,
        account: &str,
        kind: TrustOutcomeKind,
        duration_minutes: Option<f64>,
    ) -> Result<TrustReputation, StoreError> {
        let mut rep = self.get(account)?.unwrap_or_else(|| TrustReputation::new(account));
        let delta = TrustReputation::delta_for(kind);
        let old_score = rep.score;
        let new_score = (i64::from(old_score) + i64::from(delta)).clamp(0, 100) as u32;

        match kind {
            TrustOutcomeKind::Completed => {
                if let Some(minutes) = duration_minutes {
                    let n = f64::from(rep.completed);
                    rep.avg_completion_minutes = (rep.avg_completion_minutes * n + minutes) / (n + 1.0);
                }
                rep.completed += 1;
            }
            TrustOutcomeKind::Rejected => rep.rejected += 1,
            TrustOutcomeKind::Failed => rep.failed += 1,
        }
        rep.score = new_score;

        let at = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO trust_reputations (account, score, completed, rejected, failed, avg_completion_minutes)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(account) DO UPDATE SET
                score = excluded.score,
                completed = excluded.completed,
                rejected = excluded.rejected,
                failed = excluded.failed,
                avg_completion_minutes = excluded.avg_completion_minutes",
            params![
                rep.account,
                rep.score,
                rep.completed,
                rep.rejected,
                rep.failed,
                rep.avg_completion_minutes,
            ],
        )?;
        self.conn.execute(
            "INSERT INTO trust_history (account, at, delta, reason, old_score, new_score)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![rep.account, at, delta, reason_for(kind), old_score, new_score],
        )?;
        rep.history.push(TrustHistoryEntry {
            at,
            delta,
            reason: reason_for(kind).to_string(),
            old_score,
            new_score,
        });
        Ok(rep)
    }

    /// Fetches `account`'s reputation, including full history. Returns
    /// `Ok(None)` if the account has no recorded outcomes.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the query or row decoding fails.
    pub fn get(&self, account: &str) -> Result<Option<TrustReputation>, StoreError> {
        let row = self
            .conn
            .query_row(
                "SELECT account, score, completed, rejected, failed, avg_completion_minutes
                 FROM trust_reputations WHERE account = ?1",
                params![account],
                row_to_reputation,
            )
            .optional()?;
        let Some(mut rep) = row else {
            return Ok(None);
        };
        rep.history = self.get_history(account, None)?;
        Ok(Some(rep))
    }

    /// Returns every account's reputation (without history, for efficiency).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the query or row decoding fails.
    pub fn get_all(&self) -> Result<Vec<TrustReputation>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT account, score, completed, rejected, failed, avg_completion_minutes
             FROM trust_reputations",
        )?;
        let rows = stmt.query_map([], row_to_reputation)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(StoreError::from)
    }

    /// Returns `account`'s history, oldest first, optionally capped at
    /// `limit` most recent entries.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the query or row decoding fails.
    pub fn get_history(
        &self,
        account: &str,
        limit: Option<i64>,
    ) -> Result<Vec<TrustHistoryEntry>, StoreError> {
        let cap = limit.unwrap_or(i64::MAX);
        let mut stmt = self.conn.prepare(
            "SELECT at, delta, reason, old_score, new_score FROM (
                SELECT at, delta, reason, old_score, new_score, id
                FROM trust_history WHERE account = ?1
                ORDER BY id DESC LIMIT ?2
             ) ORDER BY id ASC",
        )?;
        let rows = stmt.query_map(params![account, cap], |row| {
            Ok(TrustHistoryEntry {
                at: row.get(0)?,
                delta: row.get(1)?,
                reason: row.get(2)?,
                old_score: row.get(3)?,
                new_score: row.get(4)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(StoreError::from)
    }

    /// Closes the underlying connection.
    pub fn close(self) {
        drop(self.conn);
    }
}

fn reason_for(kind: TrustOutcomeKind) -> &'static str {
    match kind {
        TrustOutcomeKind::Completed => "task completed",
        TrustOutcomeKind::Rejected => "task rejected in review",
        TrustOutcomeKind::Failed => "task failed",
    }
}

fn row_to_reputation(row: &rusqlite::Row<'_>) -> rusqlite::Result<TrustReputation> {
    Ok(TrustReputation {
        account: row.get(0)?,
        score: row.get(1)?,
        completed: row.get(2)?,
        rejected: row.get(3)?,
        failed: row.get(4)?,
        avg_completion_minutes: row.get(5)?,
        history: Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_clamps_at_zero() {
        let store = TrustStore::open(":memory:").unwrap();
        for _ in 0..10 {
            store
                .record_outcome("alice", TrustOutcomeKind::Failed, None)
                .unwrap();
        }
        let rep = store.get("alice").unwrap().unwrap();
        assert_eq!(rep.score, 0);
        assert_eq!(rep.failed, 10);
    }

    #[test]
    fn score_clamps_at_hundred() {
        let store = TrustStore::open(":memory:").unwrap();
        for _ in 0..20 {
            store
                .record_outcome("alice", TrustOutcomeKind::Completed, None)
                .unwrap();
        }
        let rep = store.get("alice").unwrap().unwrap();
        assert_eq!(rep.score, 100);
    }

    #[test]
    fn history_records_each_outcome() {
        let store = TrustStore::open(":memory:").unwrap();
        store
            .record_outcome("alice", TrustOutcomeKind::Completed, Some(10.0))
            .unwrap();
        store
            .record_outcome("alice", TrustOutcomeKind::Rejected, None)
            .unwrap();
        let history = store.get_history("alice", None).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].delta, 5);
        assert_eq!(history[1].delta, -8);
    }

    #[test]
    fn unseen_account_is_none() {
        let store = TrustStore::open(":memory:").unwrap();
        assert!(store.get("ghost").unwrap().is_none());
    }
}
