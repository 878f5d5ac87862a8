//! Durable inter-account message records.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Kind of a durable message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    /// A plain inter-account note.
    Message,
    /// A structured handoff carrying a [`HandoffPayload`].
    Handoff,
}

/// A structured `type=handoff` payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandoffPayload {
    /// The goal of the delegated work.
    pub goal: String,
    /// Acceptance criteria the work must satisfy.
    pub acceptance_criteria: Vec<String>,
    /// Shell commands that verify acceptance.
    pub run_commands: Vec<String>,
    /// Ids of tasks this handoff is blocked on.
    pub blocked_by: Vec<String>,
}

/// Durable record of an inter-account delivery.
///
/// Invariant: once persisted, `(from, to, timestamp, content)` is immutable;
/// only `read` mutates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Server-assigned id.
    pub id: i64,
    /// Sending account name.
    pub from: String,
    /// Receiving account name.
    pub to: String,
    /// Message kind.
    #[serde(rename = "type")]
    pub kind: MessageType,
    /// Message body.
    pub content: String,
    /// ISO-8601 creation timestamp.
    pub timestamp: String,
    /// Whether the recipient has read this message.
    pub read: bool,
    /// Optional free-form string context.
    pub context: Option<HashMap<String, String>>,
}
