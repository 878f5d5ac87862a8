//! Request/reply envelope shapes.
//!
//! Per design note "dynamic dispatch via handler map": the dispatcher keeps
//! a `String -> handler` map rather than an exhaustive match, so each
//! handler owns extracting its own fields from the raw parsed value. This
//! module only models the parts every request/reply shares: the `type` tag
//! and the optional `requestId` correlation field.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A parsed incoming request: the `type` tag, the optional `requestId`, and
/// the raw JSON object for the handler to extract its own fields from.
#[derive(Debug, Clone)]
pub struct RequestEnvelope {
    /// The `type` field, lower-cased as received.
    pub kind: String,
    /// Optional client-supplied correlation id, echoed in the reply.
    pub request_id: Option<String>,
    /// The full raw request object.
    pub raw: Value,
}

impl RequestEnvelope {
    /// Parses a raw JSON value into an envelope. Returns `None` if `type` is
    /// missing or not a string.
    #[must_use]
    pub fn parse(raw: Value) -> Option<Self> {
        let kind = raw.get("type")?.as_str()?.to_string();
        let request_id = raw
            .get("requestId")
            .and_then(Value::as_str)
            .map(str::to_string);
        Some(Self {
            kind,
            request_id,
            raw,
        })
    }
}

/// Top-level discriminant for outgoing replies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyKind {
    /// Health-probe response.
    Pong,
    /// Successful authentication.
    AuthOk,
    /// Failed authentication.
    AuthFail,
    /// A successful handler result.
    Result,
    /// A handler error.
    Error,
}

/// Builds a `result` reply envelope, echoing `request_id` if present.
#[must_use]
pub fn result_reply(request_id: Option<&str>, data: Value) -> Value {
    let mut obj = data;
    if !obj.is_object() {
        obj = serde_json::json!({ "value": obj });
    }
    obj["type"] = Value::String("result".to_string());
    if let Some(id) = request_id {
        obj["requestId"] = Value::String(id.to_string());
    }
    obj
}

/// Builds a bare `{type}` reply (used for `pong`, `auth_ok`), echoing
/// `request_id` if present.
#[must_use]
pub fn bare_reply(kind: ReplyKind, request_id: Option<&str>) -> Value {
    let mut obj = serde_json::json!({ "type": kind });
    if let Some(id) = request_id {
        obj["requestId"] = Value::String(id.to_string());
    }
    obj
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_type_and_request_id() {
        let env = RequestEnvelope::parse(json!({"type": "ping", "requestId": "r1"})).unwrap();
        assert_eq!(env.kind, "ping");
        assert_eq!(env.request_id.as_deref(), Some("r1"));
    }

    #[test]
    fn missing_type_is_none() {
        assert!(RequestEnvelope::parse(json!({"requestId": "r1"})).is_none());
    }

    #[test]
    fn result_reply_echoes_request_id() {
        let reply = result_reply(Some("r9"), json!({"count": 3}));
        assert_eq!(reply["type"], "result");
        assert_eq!(reply["requestId"], "r9");
        assert_eq!(reply["count"], 3);
    }

    #[test]
    fn bare_reply_without_request_id() {
        let reply = bare_reply(ReplyKind::Pong, None);
        assert_eq!(reply["type"], "pong");
        assert!(reply.get("requestId").is_none());
    }
}
