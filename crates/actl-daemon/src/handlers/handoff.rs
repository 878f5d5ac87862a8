//! `handoff_task` / `handoff_accept`: structured delegation between
//! accounts, distinct from a plain `send_message` in that the body is a
//! machine-readable [`HandoffPayload`] rather than free text.

use std::collections::HashMap;
use std::sync::Arc;

use actl_core::{ErrorCode, HubError, MessageType};
use actl_protocol::result_reply;
use actl_store::{decode_handoff_payload, NewMessage};
use actl_tasks::AddTaskOptions;
use serde_json::{json, Value};

use crate::dispatch::HandlerFuture;
use crate::error::{filestore_error, workspace_error};
use crate::handlers::util::{opt_str, require_str};
use crate::state::DaemonState;

/// Delivers a structured handoff to `to`, storing the payload as a
/// `handoff`-kind message body.
pub fn handle_handoff_task(
    state: Arc<DaemonState>,
    account: String,
    request_id: Option<String>,
    raw: Value,
) -> HandlerFuture {
    Box::pin(async move {
        match do_handoff_task(&state, &account, &raw) {
            Ok(data) => result_reply(request_id.as_deref(), data),
            Err(err) => err.to_reply(request_id.as_deref()),
        }
    })
}

fn do_handoff_task(state: &DaemonState, from: &str, raw: &Value) -> Result<Value, HubError> {
    let to = require_str(raw, "to")?;
    let payload_raw = raw
        .get("payload")
        .ok_or_else(|| HubError::new(ErrorCode::InvalidRequest, "payload is required"))?;
    let payload: actl_core::HandoffPayload = serde_json::from_value(payload_raw.clone())
        .map_err(|e| HubError::new(ErrorCode::InvalidRequest, format!("invalid payload: {e}")))?;
    let context: Option<HashMap<String, String>> = raw
        .get("context")
        .map(|v| serde_json::from_value(v.clone()))
        .transpose()
        .map_err(|e| HubError::new(ErrorCode::InvalidRequest, format!("invalid context: {e}")))?;

    let content = serde_json::to_string(&payload).map_err(|e| HubError::new(ErrorCode::Internal, e.to_string()))?;
    let id = state.messages.lock().add_message(&NewMessage {
        from: from.to_string(),
        to: to.to_string(),
        kind: MessageType::Handoff,
        content,
        context,
    })?;
    let delivered = state.connected.lock().is_connected(to);
    Ok(json!({
        "delivered": delivered,
        "queued": !delivered,
        "handoffId": id.to_string(),
    }))
}

/// Resolves a pending handoff addressed to the caller: creates a task from
/// its payload and, if `repoPath`/`branch` are given, prepares the
/// delegatee's workspace in the same call.
pub fn handle_handoff_accept(
    state: Arc<DaemonState>,
    account: String,
    request_id: Option<String>,
    raw: Value,
) -> HandlerFuture {
    Box::pin(async move {
        match do_handoff_accept(&state, &account, &raw) {
            Ok(data) => result_reply(request_id.as_deref(), data),
            Err(err) => err.to_reply(request_id.as_deref()),
        }
    })
}

fn do_handoff_accept(state: &DaemonState, account: &str, raw: &Value) -> Result<Value, HubError> {
    let handoff_id = require_str(raw, "handoffId")?;
    let id: i64 = handoff_id
        .parse()
        .map_err(|_| HubError::new(ErrorCode::InvalidRequest, "handoffId must be numeric"))?;

    let handoffs = state.messages.lock().get_handoffs(account)?;
    let message = handoffs
        .into_iter()
        .find(|m| m.id == id)
        .ok_or_else(|| HubError::new(ErrorCode::InvalidRequest, format!("no handoff {handoff_id} for {account}")))?;
    let payload = decode_handoff_payload(&message.content)?;

    let board = state.board.load().map_err(filestore_error)?;
    let board = actl_tasks::add_task(&board, payload.goal.clone(), Some(account.to_string()), AddTaskOptions::default());
    let task = board.find(board.tasks().last().map(|t| t.id.as_str()).unwrap_or_default());
    let task_id = task.map(|t| t.id.clone()).unwrap_or_default();
    state.board.save(&board).map_err(filestore_error)?;
    state.messages.lock().mark_read(account, id)?;

    let repo_path = opt_str(raw, "repoPath");
    let branch = opt_str(raw, "branch");
    let workspace = match (repo_path, branch) {
        (Some(repo_path), Some(branch)) => {
            let ws = state
                .workspaces
                .lock()
                .prepare_worktree(actl_workspace::PrepareWorktreeRequest {
                    owner: account.to_string(),
                    repo_path: repo_path.to_string(),
                    branch: branch.to_string(),
                    handoff_id: Some(handoff_id.to_string()),
                })
                .map_err(workspace_error)?;
            Some(json!(ws))
        }
        _ => None,
    };

    Ok(json!({
        "handoff": {
            "id": message.id,
            "from": message.from,
            "to": message.to,
            "payload": payload,
            "taskId": task_id,
        },
        "workspace": workspace,
    }))
}
