//! `request_council_analysis` / `request_council_verification`: runs the
//! configured council over a task's goal (pre-work) or completed work
//! (post-work), persisting the raw result and, for verification, a signed
//! receipt.

use std::sync::Arc;

use actl_core::{ErrorCode, HubError, ResolutionMethod, Verdict, VerificationMethod};
use actl_council::run_council;
use actl_protocol::result_reply;
use actl_receipt::{load_or_create_signing_key, ReceiptBuilder};
use serde_json::{json, Value};

use crate::dispatch::HandlerFuture;
use crate::error::task_error;
use crate::handlers::util::require_str;
use crate::state::DaemonState;

const ANALYSIS_SYSTEM_PROMPT: &str =
    "You are reviewing a proposed task before work begins. Reply with JSON: \
     {\"verdict\": \"ACCEPT\"|\"ACCEPT_WITH_NOTES\"|\"REJECT\", \"confidence\": 0-1, \"notes\": \"...\"}.";
const VERIFICATION_SYSTEM_PROMPT: &str =
    "You are verifying completed work against its goal. Reply with JSON: \
     {\"verdict\": \"ACCEPT\"|\"ACCEPT_WITH_NOTES\"|\"REJECT\", \"confidence\": 0-1, \"notes\": \"...\"}.";

fn council_not_configured() -> HubError {
    HubError::new(ErrorCode::InvalidRequest, "no council members are configured")
}

fn council_result_json(result: &actl_council::CouncilResult) -> Value {
    json!({
        "verdict": result.verdict,
        "confidence": result.confidence,
        "notes": result.notes,
        "participatingMembers": result.participating_members,
        "rankings": result.rankings,
        "degraded": result.degraded,
    })
}

/// Runs a pre-work council analysis over a task's title, returning and
/// logging the raw fan-out result without issuing a receipt.
pub fn handle_request_council_analysis(
    state: Arc<DaemonState>,
    _account: String,
    request_id: Option<String>,
    raw: Value,
) -> HandlerFuture {
    Box::pin(async move {
        match do_analysis(&state, &raw).await {
            Ok(data) => result_reply(request_id.as_deref(), data),
            Err(err) => err.to_reply(request_id.as_deref()),
        }
    })
}

async fn do_analysis(state: &DaemonState, raw: &Value) -> Result<Value, HubError> {
    if state.council.members.is_empty() {
        return Err(council_not_configured());
    }
    let chair = state
        .council
        .chair
        .clone()
        .unwrap_or_else(|| state.council.members[0].clone());
    let task_id = require_str(raw, "taskId")?.to_string();

    let board = state.board.load().map_err(crate::error::filestore_error)?;
    let task = board
        .find(&task_id)
        .cloned()
        .ok_or_else(|| task_error(actl_tasks::TaskError::NotFound(task_id.clone())))?;

    let result = run_council(
        state.council_caller.as_ref(),
        &state.council.members,
        &chair,
        ANALYSIS_SYSTEM_PROMPT,
        &task.title,
    )
    .await;

    let payload = json!({ "taskId": task_id, "result": council_result_json(&result) }).to_string();
    state.council_analyses_log.lock().append(&payload)?;

    Ok(council_result_json(&result))
}

/// Runs a post-work council verification over a task's goal, logs the raw
/// result, and issues a signed [`actl_core::VerificationReceipt`] recording
/// it as the resolution path.
pub fn handle_request_council_verification(
    state: Arc<DaemonState>,
    account: String,
    request_id: Option<String>,
    raw: Value,
) -> HandlerFuture {
    Box::pin(async move {
        match do_verification(&state, &account, &raw).await {
            Ok(data) => result_reply(request_id.as_deref(), data),
            Err(err) => err.to_reply(request_id.as_deref()),
        }
    })
}

async fn do_verification(state: &DaemonState, delegatee: &str, raw: &Value) -> Result<Value, HubError> {
    if state.council.members.is_empty() {
        return Err(council_not_configured());
    }
    let chair = state
        .council
        .chair
        .clone()
        .unwrap_or_else(|| state.council.members[0].clone());
    let task_id = require_str(raw, "taskId")?.to_string();
    let summary = require_str(raw, "summary")?.to_string();

    let board = state.board.load().map_err(crate::error::filestore_error)?;
    let task = board
        .find(&task_id)
        .cloned()
        .ok_or_else(|| task_error(actl_tasks::TaskError::NotFound(task_id.clone())))?;

    let user_prompt = format!("Goal: {}\n\nCompleted work summary:\n{summary}", task.title);
    let result = run_council(
        state.council_caller.as_ref(),
        &state.council.members,
        &chair,
        VERIFICATION_SYSTEM_PROMPT,
        &user_prompt,
    )
    .await;

    let payload = json!({ "taskId": task_id, "result": council_result_json(&result) }).to_string();
    state.council_verifications_log.lock().append(&payload)?;

    let verdict = match result.verdict {
        actl_council::Verdict::Accept | actl_council::Verdict::AcceptWithNotes => Verdict::Accepted,
        actl_council::Verdict::Reject => Verdict::Rejected,
    };
    let handoff_id = task
        .workspace
        .as_ref()
        .map_or_else(|| task_id.clone(), |ws| ws.workspace_id.clone());
    let delegator = task.assignee.clone().unwrap_or_else(|| delegatee.to_string());
    let key = load_or_create_signing_key(&state.paths.receipt_key())
        .map_err(|e| HubError::new(ErrorCode::Internal, e.to_string()).with_source(e))?;
    let receipt = ReceiptBuilder::new(task_id.clone(), handoff_id, delegator, delegatee.to_string())
        .spec(task.title.clone(), vec![summary])
        .verdict(verdict)
        .method(ResolutionMethod::HumanReview)
        .verification_method(VerificationMethod::CouncilReview)
        .build(&key)
        .map_err(|e| HubError::new(ErrorCode::Internal, e.to_string()).with_source(e))?;

    let receipt_payload = serde_json::to_string(&receipt).unwrap_or_default();
    state.verification_results_log.lock().append(&receipt_payload)?;

    Ok(json!({
        "council": council_result_json(&result),
        "receiptId": receipt.id,
        "verdict": receipt.verdict,
    }))
}
