//! `update_task_status`: the single entry point for every task transition,
//! including the review-time acceptance run.
//!
//! The wire protocol only names one task-mutating RPC for status changes,
//! so this handler dispatches onto the right pure mutator based on the
//! target status: a bare transition for `todo`/`in_progress`, the compound
//! accept/reject sequence for a `ready_for_review` resolution, and
//! `submit_for_review` to get there. A review submission that carries
//! `runCommands` runs them through the acceptance runner immediately and
//! resolves the task's fate in the same call, matching the
//! propose-then-verify rhythm the handoff scenario exercises; callers
//! wanting a purely human review can submit without `runCommands` and
//! settle the task later.

use std::sync::Arc;
use std::time::Duration;

use actl_acceptance::run_suite;
use actl_core::{ErrorCode, HubError, ResolutionMethod, Task, TaskStatus, Verdict, VerificationMethod, WorkspaceContext};
use actl_protocol::result_reply;
use actl_receipt::{load_or_create_signing_key, ReceiptBuilder};
use actl_tasks::TaskBoard;
use serde_json::{json, Value};

use crate::dispatch::HandlerFuture;
use crate::error::{filestore_error, task_error};
use crate::handlers::util::{opt_str, require_str, str_array};
use crate::state::DaemonState;

const ACCEPTANCE_TIMEOUT: Duration = Duration::from_secs(30);

fn parse_status(raw: &str) -> Option<TaskStatus> {
    match raw {
        "todo" => Some(TaskStatus::Todo),
        "in_progress" => Some(TaskStatus::InProgress),
        "ready_for_review" => Some(TaskStatus::ReadyForReview),
        "accepted" => Some(TaskStatus::Accepted),
        "rejected" => Some(TaskStatus::Rejected),
        _ => None,
    }
}

/// Dispatches a task status change, running acceptance commands and
/// issuing a verification receipt when the request carries them.
pub fn handle_update_task_status(
    state: Arc<DaemonState>,
    account: String,
    request_id: Option<String>,
    raw: Value,
) -> HandlerFuture {
    Box::pin(async move {
        match do_update(&state, &account, &raw).await {
            Ok(data) => result_reply(request_id.as_deref(), data),
            Err(err) => err.to_reply(request_id.as_deref()),
        }
    })
}

async fn do_update(state: &DaemonState, account: &str, raw: &Value) -> Result<Value, HubError> {
    let task_id = require_str(raw, "taskId")?;
    let target_raw = require_str(raw, "status")?;
    let target = parse_status(target_raw)
        .ok_or_else(|| HubError::new(ErrorCode::InvalidRequest, format!("unknown status: {target_raw}")))?;
    let reason = opt_str(raw, "reason");

    let board = state.board.load().map_err(filestore_error)?;

    let board = match target {
        TaskStatus::ReadyForReview => {
            let workspace_ctx = workspace_context(raw);
            actl_tasks::submit_for_review(&board, task_id, workspace_ctx).map_err(task_error)?
        }
        TaskStatus::Accepted => actl_tasks::accept_task(&board, task_id, reason.map(str::to_string)).map_err(task_error)?,
        TaskStatus::Rejected => {
            let reason = reason.ok_or_else(|| HubError::new(ErrorCode::InvalidRequest, "reason is required to reject"))?;
            actl_tasks::reject_task(&board, task_id, reason).map_err(task_error)?
        }
        _ => actl_tasks::update_task_status(&board, task_id, target).map_err(task_error)?,
    };
    state.board.save(&board).map_err(filestore_error)?;

    let task = board.find(task_id).cloned().expect("just replaced in board");
    let mut response = json!({ "task": task });

    let run_commands = str_array(raw, "runCommands");
    if target == TaskStatus::ReadyForReview && !run_commands.is_empty() {
        let (board, acceptance) = run_acceptance(state, account, &board, &task, &run_commands).await?;
        state.board.save(&board).map_err(filestore_error)?;
        let task = board.find(task_id).cloned().expect("just replaced in board");
        response = json!({ "task": task, "acceptance": acceptance });
    }

    Ok(response)
}

fn workspace_context(raw: &Value) -> Option<WorkspaceContext> {
    let workspace_id = opt_str(raw, "workspaceId")?;
    let repo_path = opt_str(raw, "workspacePath").unwrap_or_default();
    let branch = opt_str(raw, "branch").unwrap_or_default();
    Some(WorkspaceContext {
        workspace_id: workspace_id.to_string(),
        repo_path: repo_path.to_string(),
        branch: branch.to_string(),
    })
}

async fn run_acceptance(
    state: &DaemonState,
    delegatee: &str,
    board: &TaskBoard,
    task: &Task,
    run_commands: &[String],
) -> Result<(TaskBoard, Value), HubError> {
    let Some(ctx) = &task.workspace else {
        return Err(HubError::new(
            ErrorCode::InvalidRequest,
            "runCommands requires a task with a workspace context",
        ));
    };

    let suite = run_suite(run_commands, &ctx.repo_path, ACCEPTANCE_TIMEOUT)
        .await
        .map_err(|e| HubError::new(ErrorCode::Internal, e.to_string()).with_source(e))?;

    let verdict = if suite.passed { Verdict::Accepted } else { Verdict::Rejected };
    let delegator = task.assignee.clone().unwrap_or_else(|| delegatee.to_string());
    let key = load_or_create_signing_key(&state.paths.receipt_key())
        .map_err(|e| HubError::new(ErrorCode::Internal, e.to_string()).with_source(e))?;
    let receipt = ReceiptBuilder::new(task.id.clone(), ctx.workspace_id.clone(), delegator, delegatee.to_string())
        .spec(task.title.clone(), run_commands.to_vec())
        .verdict(verdict)
        .method(ResolutionMethod::AutoAcceptance)
        .verification_method(VerificationMethod::AutoTest)
        .build(&key)
        .map_err(|e| HubError::new(ErrorCode::Internal, e.to_string()).with_source(e))?;

    let payload = serde_json::to_string(&receipt).unwrap_or_default();
    state.verification_results_log.lock().append(&payload)?;

    let (board, accepted) = if suite.passed {
        (actl_tasks::accept_task(board, &task.id, None).map_err(task_error)?, true)
    } else {
        let failure = suite
            .commands
            .iter()
            .find(|c| !c.passed())
            .map(|c| format!("`{}` exited {}", c.command, c.exit_code))
            .unwrap_or_else(|| "acceptance suite failed".to_string());
        (actl_tasks::reject_task(board, &task.id, &failure).map_err(task_error)?, false)
    };

    state.trust.lock().record_outcome(
        delegatee,
        if accepted {
            actl_core::TrustOutcomeKind::Completed
        } else {
            actl_core::TrustOutcomeKind::Rejected
        },
        None,
    )?;
    state.breaker.lock().record_completion(delegatee, accepted);
    state.capabilities.lock().record_task_completion(delegatee, accepted, 0.0)?;

    let acceptance = json!({
        "passed": suite.passed,
        "commands": suite.commands.iter().map(|c| json!({
            "command": c.command,
            "exitCode": c.exit_code,
            "stdout": c.stdout,
            "stderr": c.stderr,
        })).collect::<Vec<_>>(),
        "receiptId": receipt.id,
        "verdict": receipt.verdict,
    });
    Ok((board, acceptance))
}
