//! `send_message` / `count_unread` / `read_messages` / `archive_messages`.

use std::sync::Arc;

use actl_core::{HubError, MessageType};
use actl_protocol::result_reply;
use actl_store::{NewMessage, Page};
use serde_json::{json, Value};

use crate::dispatch::HandlerFuture;
use crate::handlers::util::{opt_i64, require_str};
use crate::state::DaemonState;

/// Delivers a plain message to `to`, queuing it durably regardless of
/// whether the recipient is currently connected.
pub fn handle_send_message(
    state: Arc<DaemonState>,
    _account: String,
    request_id: Option<String>,
    raw: Value,
) -> HandlerFuture {
    Box::pin(async move {
        match do_send_message(&state, &_account, &raw) {
            Ok(data) => result_reply(request_id.as_deref(), data),
            Err(err) => err.to_reply(request_id.as_deref()),
        }
    })
}

fn do_send_message(state: &DaemonState, from: &str, raw: &Value) -> Result<Value, HubError> {
    let to = require_str(raw, "to")?;
    let content = require_str(raw, "content")?;
    state.messages.lock().add_message(&NewMessage {
        from: from.to_string(),
        to: to.to_string(),
        kind: MessageType::Message,
        content: content.to_string(),
        context: None,
    })?;
    let delivered = state.connected.lock().is_connected(to);
    Ok(json!({ "delivered": delivered, "queued": !delivered }))
}

/// Returns the caller's unread message count.
pub fn handle_count_unread(
    state: Arc<DaemonState>,
    account: String,
    request_id: Option<String>,
    _raw: Value,
) -> HandlerFuture {
    Box::pin(async move {
        match state.messages.lock().count_unread(&account) {
            Ok(count) => result_reply(request_id.as_deref(), json!({ "count": count })),
            Err(err) => HubError::from(err).to_reply(request_id.as_deref()),
        }
    })
}

/// Returns the caller's messages. Marks every message read when called
/// without pagination (matching the bulk-inbox-drain reading pattern); a
/// paginated call leaves read state untouched so a client can page through
/// without losing unread counts mid-scroll.
pub fn handle_read_messages(
    state: Arc<DaemonState>,
    account: String,
    request_id: Option<String>,
    raw: Value,
) -> HandlerFuture {
    Box::pin(async move {
        match do_read_messages(&state, &account, &raw) {
            Ok(data) => result_reply(request_id.as_deref(), data),
            Err(err) => err.to_reply(request_id.as_deref()),
        }
    })
}

fn do_read_messages(state: &DaemonState, account: &str, raw: &Value) -> Result<Value, HubError> {
    let limit = opt_i64(raw, "limit");
    let offset = opt_i64(raw, "offset");
    let paginated = limit.is_some() || offset.is_some();
    let messages = state.messages.lock().get_messages(account, Page { limit, offset })?;
    if !paginated {
        state.messages.lock().mark_all_read(account)?;
    }
    Ok(json!({ "messages": messages }))
}

/// Deletes the caller's already-read messages older than `days` (default
/// 30).
pub fn handle_archive_messages(
    state: Arc<DaemonState>,
    _account: String,
    request_id: Option<String>,
    raw: Value,
) -> HandlerFuture {
    Box::pin(async move {
        let days = opt_i64(&raw, "days").unwrap_or(30);
        match state.messages.lock().archive_old(days) {
            Ok(archived) => result_reply(request_id.as_deref(), json!({ "archived": archived })),
            Err(err) => HubError::from(err).to_reply(request_id.as_deref()),
        }
    })
}
