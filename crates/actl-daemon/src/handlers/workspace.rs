//! `prepare_worktree_for_handoff` / `get_workspace_status` /
//! `cleanup_workspace`: the workspace-manager RPCs.
//!
//! `prepare_worktree_for_handoff` never surfaces a `git worktree add`
//! failure as a protocol-level `error` envelope; per the wire table it
//! always replies `result {ok, data|error_code, message}` so a caller can
//! retry against the same repo/branch without losing the request id.

use std::sync::Arc;

use actl_core::HubError;
use actl_protocol::result_reply;
use actl_workspace::PrepareWorktreeRequest;
use serde_json::{json, Value};

use crate::dispatch::HandlerFuture;
use crate::error::workspace_error;
use crate::handlers::util::require_str;
use crate::state::DaemonState;

pub fn handle_prepare_worktree(
    state: Arc<DaemonState>,
    account: String,
    request_id: Option<String>,
    raw: Value,
) -> HandlerFuture {
    Box::pin(async move {
        let data = match do_prepare(&state, &account, &raw) {
            Ok(ws) => json!({ "ok": true, "data": { "workspace": ws }, "message": "ready" }),
            Err(err) => json!({
                "ok": false,
                "error_code": err.code.as_str(),
                "message": err.message,
            }),
        };
        result_reply(request_id.as_deref(), data)
    })
}

fn do_prepare(state: &DaemonState, account: &str, raw: &Value) -> Result<Value, HubError> {
    let repo_path = require_str(raw, "repoPath")?;
    let branch = require_str(raw, "branch")?;
    let handoff_id = raw.get("handoffId").and_then(Value::as_str).map(str::to_string);
    let ws = state
        .workspaces
        .lock()
        .prepare_worktree(PrepareWorktreeRequest {
            owner: account.to_string(),
            repo_path: repo_path.to_string(),
            branch: branch.to_string(),
            handoff_id,
        })
        .map_err(workspace_error)?;
    Ok(json!(ws))
}

pub fn handle_get_workspace_status(
    state: Arc<DaemonState>,
    _account: String,
    request_id: Option<String>,
    raw: Value,
) -> HandlerFuture {
    Box::pin(async move {
        match do_get_status(&state, &raw) {
            Ok(data) => result_reply(request_id.as_deref(), data),
            Err(err) => err.to_reply(request_id.as_deref()),
        }
    })
}

fn do_get_status(state: &DaemonState, raw: &Value) -> Result<Value, HubError> {
    let workspace = if let Some(id) = raw.get("id").and_then(Value::as_str) {
        state.workspaces.lock().get_workspace(id).map_err(workspace_error)?
    } else {
        let repo_path = require_str(raw, "repoPath")?;
        let branch = require_str(raw, "branch")?;
        state
            .workspaces
            .lock()
            .get_workspace_by_key(repo_path, branch)
            .map_err(workspace_error)?
    };
    Ok(json!({ "workspace": workspace }))
}

pub fn handle_cleanup_workspace(
    state: Arc<DaemonState>,
    _account: String,
    request_id: Option<String>,
    raw: Value,
) -> HandlerFuture {
    Box::pin(async move {
        match do_cleanup(&state, &raw) {
            Ok(()) => result_reply(request_id.as_deref(), json!({ "ok": true })),
            Err(err) => err.to_reply(request_id.as_deref()),
        }
    })
}

fn do_cleanup(state: &DaemonState, raw: &Value) -> Result<(), HubError> {
    let id = require_str(raw, "id")?;
    state.workspaces.lock().cleanup_workspace(id).map_err(workspace_error)
}
