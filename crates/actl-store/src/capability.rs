//! Per-account capability record store.

use std::collections::BTreeSet;

use actl_core::{CapabilityRecord, ProviderType};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};

use crate::db;
use crate::StoreError;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS capabilities (
    account TEXT PRIMARY KEY,
    skills TEXT NOT NULL DEFAULT '[]',
    total INTEGER NOT NULL DEFAULT 0,
    accepted INTEGER NOT NULL DEFAULT 0,
    avg_delivery_ms REAL NOT NULL DEFAULT 0,
    last_active_at TEXT NOT NULL DEFAULT '',
    provider_type TEXT
);
";

/// SQLite-backed store for per-account capability records.
pub struct CapabilityStore {
    conn: Connection,
}

impl CapabilityStore {
    /// Opens (or creates) the capability database at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the connection or schema setup fails.
    pub fn open(path: &str) -> Result<Self, StoreError> {
        Ok(Self {
            conn: db::open(path, SCHEMA)?,
        })
    }

    /// Returns `account`'s record, creating a fresh default one if absent.
    /// The fresh record is not persisted until the next mutating call.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the query or row decoding fails.
    pub fn get_or_default(&self, account: &str) -> Result<CapabilityRecord, StoreError> {
        let row = self
            .conn
            .query_row(
                "SELECT account, skills, total, accepted, avg_delivery_ms, last_active_at, provider_type
                 FROM capabilities WHERE account = ?1",
                params![account],
                row_to_record,
            )
            .optional()?;
        match row {
            Some(record) => record,
            None => Ok(CapabilityRecord::new(account)),
        }
    }

    /// Inserts or fully replaces `account`'s record (upsert-by-name).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the write fails.
    pub fn upsert(&self, record: &CapabilityRecord) -> Result<(), StoreError> {
        let skills = serde_json::to_string(&record.skills)?;
        let provider_type = record.provider_type.map(provider_str);
        self.conn.execute(
            "INSERT INTO capabilities (account, skills, total, accepted, avg_delivery_ms, last_active_at, provider_type)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(account) DO UPDATE SET
                skills = excluded.skills,
                total = excluded.total,
                accepted = excluded.accepted,
                avg_delivery_ms = excluded.avg_delivery_ms,
                last_active_at = excluded.last_active_at,
                provider_type = excluded.provider_type",
            params![
                record.account,
                skills,
                record.total,
                record.accepted,
                record.avg_delivery_ms,
                record.last_active_at,
                provider_type,
            ],
        )?;
        Ok(())
    }

    /// Records a task completion for `account`: loads or defaults the
    /// record, applies the running-mean update, and upserts it back.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the read or write fails.
    pub fn record_task_completion(
        &self,
        account: &str,
        accepted: bool,
        delivery_ms: f64,
    ) -> Result<CapabilityRecord, StoreError> {
        let mut record = self.get_or_default(account)?;
        record.record_completion(accepted, delivery_ms, &Utc::now().to_rfc3339());
        self.upsert(&record)?;
        Ok(record)
    }

    /// Replaces `account`'s skill set.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the read or write fails.
    pub fn update_skills(&self, account: &str, skills: BTreeSet<String>) -> Result<(), StoreError> {
        let mut record = self.get_or_default(account)?;
        record.skills = skills;
        self.upsert(&record)
    }

    /// Bumps `account`'s `last_active_at` to now without touching totals.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the read or write fails.
    pub fn touch_active(&self, account: &str) -> Result<(), StoreError> {
        let mut record = self.get_or_default(account)?;
        record.last_active_at = Utc::now().to_rfc3339();
        self.upsert(&record)
    }

    /// Returns every stored capability record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the query or row decoding fails.
    pub fn list(&self) -> Result<Vec<CapabilityRecord>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT account, skills, total, accepted, avg_delivery_ms, last_active_at, provider_type
             FROM capabilities",
        )?;
        let rows = stmt.query_map([], row_to_record)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row??);
        }
        Ok(out)
    }

    /// Closes the underlying connection.
    pub fn close(self) {
        drop(self.conn);
    }
}

fn provider_str(p: ProviderType) -> &'static str {
    match p {
        ProviderType::Reasoning => "reasoning",
        ProviderType::Throughput => "throughput",
        ProviderType::Agentic => "agentic",
    }
}

fn parse_provider(raw: &str) -> Option<ProviderType> {
    match raw {
        "reasoning" => Some(ProviderType::Reasoning),
        "throughput" => Some(ProviderType::Throughput),
        "agentic" => Some(ProviderType::Agentic),
        _ => None,
    }
}

fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<Result<CapabilityRecord, StoreError>> {
    let skills_raw: String = row.get(1)?;
    let skills: BTreeSet<String> = match serde_json::from_str(&skills_raw) {
        Ok(s) => s,
        Err(e) => return Ok(Err(StoreError::CorruptJson(e))),
    };
    let provider_raw: Option<String> = row.get(6)?;
    Ok(Ok(CapabilityRecord {
        account: row.get(0)?,
        skills,
        total: row.get(2)?,
        accepted: row.get(3)?,
        avg_delivery_ms: row.get(4)?,
        last_active_at: row.get(5)?,
        provider_type: provider_raw.as_deref().and_then(parse_provider),
        trust_score: None,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_task_completion_persists_running_mean() {
        let store = CapabilityStore::open(":memory:").unwrap();
        store.record_task_completion("alice", true, 100.0).unwrap();
        let record = store.record_task_completion("alice", false, 300.0).unwrap();
        assert_eq!(record.total, 2);
        assert_eq!(record.accepted, 1);
        assert!((record.avg_delivery_ms - 200.0).abs() < f64::EPSILON);
    }

    #[test]
    fn get_or_default_does_not_persist() {
        let store = CapabilityStore::open(":memory:").unwrap();
        let _ = store.get_or_default("ghost").unwrap();
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn update_skills_roundtrips() {
        let store = CapabilityStore::open(":memory:").unwrap();
        let skills: BTreeSet<String> = ["rust".to_string(), "testing".to_string()].into();
        store.update_skills("alice", skills.clone()).unwrap();
        let record = store.get_or_default("alice").unwrap();
        assert_eq!(record.skills, skills);
    }
}
