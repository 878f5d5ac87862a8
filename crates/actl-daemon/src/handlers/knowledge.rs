//! `search_knowledge` / `index_note` / `link_task` / `get_task_links`: thin
//! wrappers over the note index.

use std::sync::Arc;

use actl_core::HubError;
use actl_protocol::result_reply;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::dispatch::HandlerFuture;
use crate::handlers::util::require_str;
use crate::state::DaemonState;

pub fn handle_search_knowledge(
    state: Arc<DaemonState>,
    _account: String,
    request_id: Option<String>,
    raw: Value,
) -> HandlerFuture {
    Box::pin(async move {
        match do_search(&state, &raw) {
            Ok(data) => result_reply(request_id.as_deref(), data),
            Err(err) => err.to_reply(request_id.as_deref()),
        }
    })
}

fn do_search(state: &DaemonState, raw: &Value) -> Result<Value, HubError> {
    let query = require_str(raw, "query")?;
    let notes = state.knowledge.lock().search_knowledge(query)?;
    Ok(json!({ "notes": notes.iter().map(note_json).collect::<Vec<_>>() }))
}

pub fn handle_index_note(
    state: Arc<DaemonState>,
    _account: String,
    request_id: Option<String>,
    raw: Value,
) -> HandlerFuture {
    Box::pin(async move {
        match do_index_note(&state, &raw) {
            Ok(data) => result_reply(request_id.as_deref(), data),
            Err(err) => err.to_reply(request_id.as_deref()),
        }
    })
}

fn do_index_note(state: &DaemonState, raw: &Value) -> Result<Value, HubError> {
    let title = require_str(raw, "title")?;
    let content = require_str(raw, "content")?;
    let id = raw
        .get("id")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    state.knowledge.lock().index_note(&id, title, content)?;
    Ok(json!({ "id": id }))
}

pub fn handle_link_task(
    state: Arc<DaemonState>,
    _account: String,
    request_id: Option<String>,
    raw: Value,
) -> HandlerFuture {
    Box::pin(async move {
        match do_link_task(&state, &raw) {
            Ok(()) => result_reply(request_id.as_deref(), json!({ "ok": true })),
            Err(err) => err.to_reply(request_id.as_deref()),
        }
    })
}

fn do_link_task(state: &DaemonState, raw: &Value) -> Result<(), HubError> {
    let task_id = require_str(raw, "taskId")?;
    let note_id = require_str(raw, "noteId")?;
    state.knowledge.lock().link_task(task_id, note_id)?;
    Ok(())
}

pub fn handle_get_task_links(
    state: Arc<DaemonState>,
    _account: String,
    request_id: Option<String>,
    raw: Value,
) -> HandlerFuture {
    Box::pin(async move {
        match do_get_links(&state, &raw) {
            Ok(data) => result_reply(request_id.as_deref(), data),
            Err(err) => err.to_reply(request_id.as_deref()),
        }
    })
}

fn do_get_links(state: &DaemonState, raw: &Value) -> Result<Value, HubError> {
    let task_id = require_str(raw, "taskId")?;
    let notes = state.knowledge.lock().get_task_links(task_id)?;
    Ok(json!({ "notes": notes.iter().map(note_json).collect::<Vec<_>>() }))
}

fn note_json(note: &actl_store::Note) -> Value {
    json!({
        "id": note.id,
        "title": note.title,
        "content": note.content,
        "createdAt": note.created_at,
    })
}

