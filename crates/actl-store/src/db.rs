//! Shared connection-opening contract: every store opens its own SQLite
//! file (or `:memory:`), turns on write-ahead logging, and creates its
//! tables idempotently. `close()` is exposed by each store rather than
//! here, since `rusqlite::Connection::close` takes the connection by value
//! and each store wraps it differently.

use std::path::Path;

use rusqlite::Connection;

use crate::StoreError;

/// Opens `path` (or an in-memory database for `:memory:`), enables WAL
/// journaling, and runs `schema` to create tables if they don't exist yet.
///
/// # Errors
///
/// Returns [`StoreError`] if the connection cannot be opened, WAL mode
/// cannot be set, or the schema statements fail.
pub fn open(path: &str, schema: &str) -> Result<Connection, StoreError> {
    let conn = if path == ":memory:" {
        Connection::open_in_memory()?
    } else {
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Connection::open(path)?
    };
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.execute_batch(schema)?;
    Ok(conn)
}
