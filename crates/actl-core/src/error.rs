//! Unified error taxonomy for the agentctl hub daemon.
//!
//! Every hub error carries a stable [`ErrorCode`], a human-readable message,
//! an optional source, and arbitrary key-value diagnostic context. RPC
//! handlers map a [`HubError`] onto the `{type: "error", error, details?}`
//! wire envelope.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Broad family an [`ErrorCode`] belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Request shape or field validation failures.
    Validation,
    /// Authentication failures on the socket.
    Auth,
    /// Entity lookup misses.
    NotFound,
    /// Task state machine transition failures.
    Transition,
    /// Wire-framing errors.
    Protocol,
    /// Persistent store errors.
    Store,
    /// Workspace / git worktree errors.
    Workspace,
    /// Capability routing errors.
    Routing,
    /// SLA / adaptive SLA engine errors.
    Sla,
    /// Circuit breaker errors.
    Breaker,
    /// Verification receipt integrity errors.
    Receipt,
    /// Council fan-out errors.
    Council,
    /// Configuration errors.
    Config,
    /// External collaborator errors (git, subprocess, LLM caller).
    External,
    /// Conflicting state (duplicate account, lock contention).
    Conflict,
    /// Operation timed out.
    Timeout,
    /// Catch-all for unexpected internal errors.
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Validation => "validation",
            Self::Auth => "auth",
            Self::NotFound => "not_found",
            Self::Transition => "transition",
            Self::Protocol => "protocol",
            Self::Store => "store",
            Self::Workspace => "workspace",
            Self::Routing => "routing",
            Self::Sla => "sla",
            Self::Breaker => "breaker",
            Self::Receipt => "receipt",
            Self::Council => "council",
            Self::Config => "config",
            Self::External => "external",
            Self::Conflict => "conflict",
            Self::Timeout => "timeout",
            Self::Internal => "internal",
        };
        f.write_str(s)
    }
}

/// Machine-readable, stable error code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Request body failed validation.
    InvalidRequest,
    /// Unknown request `type`.
    UnknownRequestType,
    /// Auth message missing or malformed.
    AuthMissing,
    /// Token did not match the stored account secret.
    AuthFailed,
    /// Account name failed the naming regex.
    InvalidAccountName,
    /// Referenced task does not exist.
    TaskNotFound,
    /// Referenced workspace does not exist.
    WorkspaceNotFound,
    /// Referenced account does not exist.
    AccountNotFound,
    /// Requested status transition is not in the admissible graph.
    InvalidTransition,
    /// Branch name failed validation.
    InvalidBranch,
    /// An active workspace already exists for this (repo, branch).
    WorkspaceConflict,
    /// Git executor reported a non-zero exit.
    GitFailed,
    /// A frame could not be parsed as JSON.
    FrameParseFailed,
    /// Store I/O failed.
    StoreIoFailed,
    /// File lock could not be acquired before the retry ceiling.
    LockContention,
    /// Receipt signature did not verify.
    ReceiptSignatureMismatch,
    /// Council could not reach any member.
    CouncilDegraded,
    /// Acceptance command rejected by the deny-list validator.
    AcceptanceCommandDenied,
    /// Acceptance command exceeded its timeout.
    AcceptanceTimeout,
    /// Catch-all for unexpected internal errors.
    Internal,
}

impl ErrorCode {
    /// Returns the broad [`ErrorCategory`] this code belongs to.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        use ErrorCode::*;
        match self {
            InvalidRequest | UnknownRequestType | InvalidAccountName | InvalidBranch => {
                ErrorCategory::Validation
            }
            AuthMissing | AuthFailed => ErrorCategory::Auth,
            TaskNotFound | WorkspaceNotFound | AccountNotFound => ErrorCategory::NotFound,
            InvalidTransition => ErrorCategory::Transition,
            FrameParseFailed => ErrorCategory::Protocol,
            StoreIoFailed => ErrorCategory::Store,
            WorkspaceConflict | GitFailed => ErrorCategory::Workspace,
            LockContention => ErrorCategory::Conflict,
            ReceiptSignatureMismatch => ErrorCategory::Receipt,
            CouncilDegraded => ErrorCategory::Council,
            AcceptanceCommandDenied => ErrorCategory::External,
            AcceptanceTimeout => ErrorCategory::Timeout,
            Internal => ErrorCategory::Internal,
        }
    }

    /// Stable `&'static str` representation (e.g. `"TASK_NOT_FOUND"`).
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        use ErrorCode::*;
        match self {
            InvalidRequest => "INVALID_REQUEST",
            UnknownRequestType => "UNKNOWN_REQUEST_TYPE",
            AuthMissing => "AUTH_MISSING",
            AuthFailed => "AUTH_FAILED",
            InvalidAccountName => "INVALID_ACCOUNT_NAME",
            TaskNotFound => "TASK_NOT_FOUND",
            WorkspaceNotFound => "WORKSPACE_NOT_FOUND",
            AccountNotFound => "ACCOUNT_NOT_FOUND",
            InvalidTransition => "INVALID_TRANSITION",
            InvalidBranch => "INVALID_BRANCH",
            WorkspaceConflict => "WORKSPACE_CONFLICT",
            GitFailed => "GIT_FAILED",
            FrameParseFailed => "FRAME_PARSE_FAILED",
            StoreIoFailed => "STORE_IO_FAILED",
            LockContention => "LOCK_CONTENTION",
            ReceiptSignatureMismatch => "RECEIPT_SIGNATURE_MISMATCH",
            CouncilDegraded => "COUNCIL_DEGRADED",
            AcceptanceCommandDenied => "ACCEPTANCE_COMMAND_DENIED",
            AcceptanceTimeout => "ACCEPTANCE_TIMEOUT",
            Internal => "INTERNAL",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unified hub error.
pub struct HubError {
    /// Machine-readable error code.
    pub code: ErrorCode,
    /// Human-readable description.
    pub message: String,
    /// Optional underlying cause.
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
    /// Arbitrary structured diagnostic context.
    pub context: BTreeMap<String, serde_json::Value>,
}

impl HubError {
    /// Create a new error with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
            context: BTreeMap::new(),
        }
    }

    /// Attach a key-value pair to the diagnostic context.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        if let Ok(v) = serde_json::to_value(value) {
            self.context.insert(key.into(), v);
        }
        self
    }

    /// Attach an underlying cause.
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Shorthand for `self.code.category()`.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        self.code.category()
    }

    /// Render as the `{type: "error", error, details?}` wire reply.
    #[must_use]
    pub fn to_reply(&self, request_id: Option<&str>) -> serde_json::Value {
        let mut obj = serde_json::json!({
            "type": "error",
            "error": self.message,
            "code": self.code.as_str(),
        });
        if !self.context.is_empty() {
            obj["details"] = serde_json::to_value(&self.context).unwrap_or_default();
        }
        if let Some(id) = request_id {
            obj["requestId"] = serde_json::Value::String(id.to_string());
        }
        obj
    }
}

impl fmt::Debug for HubError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut d = f.debug_struct("HubError");
        d.field("code", &self.code);
        d.field("message", &self.message);
        if let Some(ref src) = self.source {
            d.field("source", &src.to_string());
        }
        if !self.context.is_empty() {
            d.field("context", &self.context);
        }
        d.finish()
    }
}

impl fmt::Display for HubError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code.as_str(), self.message)
    }
}

impl std::error::Error for HubError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Convenience alias for fallible hub operations.
pub type HubResult<T> = Result<T, HubError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_without_context() {
        let err = HubError::new(ErrorCode::TaskNotFound, "no such task");
        assert_eq!(err.to_string(), "[TASK_NOT_FOUND] no such task");
    }

    #[test]
    fn category_mapping() {
        assert_eq!(ErrorCode::AuthFailed.category(), ErrorCategory::Auth);
        assert_eq!(
            ErrorCode::InvalidTransition.category(),
            ErrorCategory::Transition
        );
    }

    #[test]
    fn to_reply_includes_context_and_request_id() {
        let err = HubError::new(ErrorCode::InvalidBranch, "bad branch")
            .with_context("branch", "../etc");
        let reply = err.to_reply(Some("req-1"));
        assert_eq!(reply["type"], "error");
        assert_eq!(reply["code"], "INVALID_BRANCH");
        assert_eq!(reply["requestId"], "req-1");
        assert_eq!(reply["details"]["branch"], "../etc");
    }

    #[test]
    fn to_reply_omits_details_when_empty() {
        let err = HubError::new(ErrorCode::Internal, "boom");
        let reply = err.to_reply(None);
        assert!(reply.get("details").is_none());
        assert!(reply.get("requestId").is_none());
    }
}
