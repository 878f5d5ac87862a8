//! Durable inter-account message store.

use std::collections::HashMap;

use actl_core::{HandoffPayload, Message, MessageType};
use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, Connection};

use crate::db;
use crate::StoreError;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS messages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    sender TEXT NOT NULL,
    recipient TEXT NOT NULL,
    kind TEXT NOT NULL,
    content TEXT NOT NULL,
    timestamp TEXT NOT NULL,
    read INTEGER NOT NULL DEFAULT 0,
    context TEXT
);
CREATE INDEX IF NOT EXISTS idx_messages_recipient ON messages(recipient);
CREATE INDEX IF NOT EXISTS idx_messages_recipient_read ON messages(recipient, read);
";

/// Fields needed to persist a new message; `id`, `timestamp`, and `read` are
/// assigned by the store.
#[derive(Debug, Clone)]
pub struct NewMessage {
    /// Sending account name.
    pub from: String,
    /// Receiving account name.
    pub to: String,
    /// Message kind.
    pub kind: MessageType,
    /// Message body.
    pub content: String,
    /// Optional free-form string context.
    pub context: Option<HashMap<String, String>>,
}

/// Pagination window for [`MessageStore::get_messages`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Page {
    /// Maximum rows to return.
    pub limit: Option<i64>,
    /// Rows to skip before the window starts.
    pub offset: Option<i64>,
}

/// SQLite-backed store for inter-account messages and handoffs.
pub struct MessageStore {
    conn: Connection,
}

impl MessageStore {
    /// Opens (or creates) the message database at `path`. Pass `:memory:`
    /// for an ephemeral, test-only database.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the connection or schema setup fails.
    pub fn open(path: &str) -> Result<Self, StoreError> {
        Ok(Self {
            conn: db::open(path, SCHEMA)?,
        })
    }

    /// Persists `msg` with a server-assigned id and current timestamp.
    /// Returns the new row id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the insert fails.
    pub fn add_message(&self, msg: &NewMessage) -> Result<i64, StoreError> {
        let kind = kind_str(msg.kind);
        let context = match &msg.context {
            Some(map) => Some(serde_json::to_string(map)?),
            None => None,
        };
        let timestamp = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO messages (sender, recipient, kind, content, timestamp, read, context)
             VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6)",
            params![msg.from, msg.to, kind, msg.content, timestamp, context],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Returns messages addressed to `to`, newest first, honoring `page`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the query or row decoding fails.
    pub fn get_messages(&self, to: &str, page: Page) -> Result<Vec<Message>, StoreError> {
        let limit = page.limit.unwrap_or(i64::MAX);
        let offset = page.offset.unwrap_or(0);
        let mut stmt = self.conn.prepare(
            "SELECT id, sender, recipient, kind, content, timestamp, read, context
             FROM messages WHERE recipient = ?1
             ORDER BY id DESC LIMIT ?2 OFFSET ?3",
        )?;
        let rows = stmt.query_map(params![to, limit, offset], row_to_message)?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(StoreError::from)?
            .into_iter()
            .collect::<Result<Vec<_>, _>>()
    }

    /// Returns all unread messages addressed to `to`, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the query or row decoding fails.
    pub fn get_unread_messages(&self, to: &str) -> Result<Vec<Message>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, sender, recipient, kind, content, timestamp, read, context
             FROM messages WHERE recipient = ?1 AND read = 0
             ORDER BY id DESC",
        )?;
        let rows = stmt.query_map(params![to], row_to_message)?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(StoreError::from)?
            .into_iter()
            .collect::<Result<Vec<_>, _>>()
    }

    /// Counts unread messages addressed to `to`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the query fails.
    pub fn count_unread(&self, to: &str) -> Result<i64, StoreError> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM messages WHERE recipient = ?1 AND read = 0",
            params![to],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Marks a single message as read. A no-op, not an error, if the
    /// message doesn't belong to `to` or doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the update fails.
    pub fn mark_read(&self, to: &str, id: i64) -> Result<(), StoreError> {
        self.conn.execute(
            "UPDATE messages SET read = 1 WHERE id = ?1 AND recipient = ?2",
            params![id, to],
        )?;
        Ok(())
    }

    /// Marks every message addressed to `to` as read. Idempotent: calling
    /// this twice in a row has the same effect as once.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the update fails.
    pub fn mark_all_read(&self, to: &str) -> Result<(), StoreError> {
        self.conn.execute(
            "UPDATE messages SET read = 1 WHERE recipient = ?1 AND read = 0",
            params![to],
        )?;
        Ok(())
    }

    /// Returns messages of kind `handoff` addressed to `to`, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the query or row decoding fails.
    pub fn get_handoffs(&self, to: &str) -> Result<Vec<Message>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, sender, recipient, kind, content, timestamp, read, context
             FROM messages WHERE recipient = ?1 AND kind = 'handoff'
             ORDER BY id DESC",
        )?;
        let rows = stmt.query_map(params![to], row_to_message)?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(StoreError::from)?
            .into_iter()
            .collect::<Result<Vec<_>, _>>()
    }

    /// Deletes every already-read message older than `days` days. Unread
    /// messages are never deleted regardless of age. Returns the number of
    /// rows removed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the delete fails.
    pub fn archive_old(&self, days: i64) -> Result<usize, StoreError> {
        let cutoff: DateTime<Utc> = Utc::now() - Duration::days(days);
        let affected = self.conn.execute(
            "DELETE FROM messages WHERE read = 1 AND timestamp < ?1",
            params![cutoff.to_rfc3339()],
        )?;
        Ok(affected)
    }

    /// Closes the underlying connection. Safe to call once; a second call
    /// is a compile error since this consumes `self`.
    pub fn close(self) {
        drop(self.conn);
    }
}

fn kind_str(kind: MessageType) -> &'static str {
    match kind {
        MessageType::Message => "message",
        MessageType::Handoff => "handoff",
    }
}

fn row_to_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<Result<Message, StoreError>> {
    let kind_raw: String = row.get(3)?;
    let kind = match kind_raw.as_str() {
        "handoff" => MessageType::Handoff,
        _ => MessageType::Message,
    };
    let context_raw: Option<String> = row.get(7)?;
    let context = match context_raw {
        Some(raw) => match serde_json::from_str::<HashMap<String, String>>(&raw) {
            Ok(map) => Some(map),
            Err(e) => return Ok(Err(StoreError::CorruptJson(e))),
        },
        None => None,
    };
    Ok(Ok(Message {
        id: row.get(0)?,
        from: row.get(1)?,
        to: row.get(2)?,
        kind,
        content: row.get(4)?,
        timestamp: row.get(5)?,
        read: row.get::<_, i64>(6)? != 0,
        context,
    }))
}

/// Decodes a handoff payload out of a message's plain-text content, used by
/// callers that stored the JSON-encoded [`HandoffPayload`] as the message
/// body rather than in `context`.
///
/// # Errors
///
/// Returns [`StoreError::CorruptJson`] if `content` is not a valid payload.
pub fn decode_handoff_payload(content: &str) -> Result<HandoffPayload, StoreError> {
    Ok(serde_json::from_str(content)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> MessageStore {
        MessageStore::open(":memory:").unwrap()
    }

    fn new_msg(from: &str, to: &str, content: &str) -> NewMessage {
        NewMessage {
            from: from.to_string(),
            to: to.to_string(),
            kind: MessageType::Message,
            content: content.to_string(),
            context: None,
        }
    }

    #[test]
    fn add_and_fetch_unread() {
        let s = store();
        s.add_message(&new_msg("alice", "bob", "hi")).unwrap();
        assert_eq!(s.count_unread("bob").unwrap(), 1);
        let msgs = s.get_unread_messages("bob").unwrap();
        assert_eq!(msgs.len(), 1);
        assert_eq!(msgs[0].content, "hi");
    }

    #[test]
    fn mark_all_read_is_idempotent() {
        let s = store();
        s.add_message(&new_msg("alice", "bob", "hi")).unwrap();
        s.mark_all_read("bob").unwrap();
        assert_eq!(s.count_unread("bob").unwrap(), 0);
        s.mark_all_read("bob").unwrap();
        assert_eq!(s.count_unread("bob").unwrap(), 0);
    }

    #[test]
    fn get_messages_is_newest_first_and_paginated() {
        let s = store();
        for i in 0..3 {
            s.add_message(&new_msg("alice", "bob", &format!("m{i}")))
                .unwrap();
        }
        let page = s
            .get_messages("bob", Page { limit: Some(2), offset: Some(0) })
            .unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].content, "m2");
        assert_eq!(page[1].content, "m1");
    }

    #[test]
    fn handoffs_filter_by_kind() {
        let s = store();
        s.add_message(&new_msg("alice", "bob", "plain")).unwrap();
        s.add_message(&NewMessage {
            kind: MessageType::Handoff,
            ..new_msg("alice", "bob", "{}")
        })
        .unwrap();
        let handoffs = s.get_handoffs("bob").unwrap();
        assert_eq!(handoffs.len(), 1);
        assert_eq!(handoffs[0].kind, MessageType::Handoff);
    }

    #[test]
    fn missing_context_reads_back_as_none() {
        let s = store();
        s.add_message(&new_msg("alice", "bob", "hi")).unwrap();
        let msgs = s.get_unread_messages("bob").unwrap();
        assert!(msgs[0].context.is_none());
    }

    #[test]
    fn archive_old_only_removes_read_messages() {
        let s = store();
        let id = s.add_message(&new_msg("alice", "bob", "old")).unwrap();
        s.add_message(&new_msg("alice", "bob", "fresh")).unwrap();
        s.mark_read("bob", id).unwrap();
        s.conn
            .execute(
                "UPDATE messages SET timestamp = ?1 WHERE id = ?2",
                params!["2000-01-01T00:00:00+00:00", id],
            )
            .unwrap();
        let removed = s.archive_old(30).unwrap();
        assert_eq!(removed, 1);
        assert_eq!(s.get_messages("bob", Page::default()).unwrap().len(), 1);
    }
}
