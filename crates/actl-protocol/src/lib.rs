//! Wire-level framing and envelope shapes for the agentctl hub socket
//! protocol: newline-delimited JSON in, newline-delimited JSON out.
#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod codec;
pub mod envelope;

pub use codec::{encode_line, Framer};
pub use envelope::{bare_reply, result_reply, ReplyKind, RequestEnvelope};
