//! Newline-delimited JSON framing.
//!
//! [`Framer`] turns a continuous byte stream into a sequence of parsed JSON
//! objects separated by `\n`. Parse failures are logged once and skipped;
//! they never abort the stream.

use serde_json::Value;
use tracing::warn;

/// Parses `\n`-delimited JSON objects out of a rolling byte buffer.
///
/// Callers feed raw bytes via [`Framer::feed`] and receive each parsed
/// object through the supplied closure. An optional cumulative-bytes guard
/// can be read via [`Framer::bytes_since_dispatch`] and is reset on every
/// successful parse, so a quiet connection that nonetheless has mid-line
/// partial frames sitting in the buffer never trips a caller's guard.
#[derive(Debug, Default)]
pub struct Framer {
    buffer: Vec<u8>,
    bytes_since_dispatch: usize,
}

impl Framer {
    /// Creates an empty framer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `bytes` to the rolling buffer and invokes `on_message` for
    /// every complete, non-empty, successfully parsed JSON line found.
    pub fn feed(&mut self, bytes: &[u8], mut on_message: impl FnMut(Value)) {
        self.buffer.extend_from_slice(bytes);
        self.bytes_since_dispatch += bytes.len();

        loop {
            let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') else {
                break;
            };
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            // Drop the trailing newline before trimming whitespace.
            let line = &line[..line.len() - 1];
            let text = String::from_utf8_lossy(line);
            let trimmed = text.trim();
            if trimmed.is_empty() {
                continue;
            }
            match serde_json::from_str::<Value>(trimmed) {
                Ok(value) => {
                    self.bytes_since_dispatch = 0;
                    on_message(value);
                }
                Err(err) => {
                    warn!(error = %err, "failed to parse framed JSON line, skipping");
                }
            }
        }
    }

    /// Bytes fed since the last successfully parsed message. Callers may use
    /// this as a cumulative payload guard; it resets to zero on every
    /// successful dispatch, so it is safe to compare against a ceiling
    /// without tripping on a merely-quiet connection.
    #[must_use]
    pub fn bytes_since_dispatch(&self) -> usize {
        self.bytes_since_dispatch
    }
}

/// Serializes `value` as a single compact JSON line terminated by `\n`.
/// Embedded newlines in string content are escaped by `serde_json` and
/// never appear raw in the output.
///
/// # Errors
///
/// Returns the serialization error if `value` cannot be encoded as JSON.
pub fn encode_line(value: &Value) -> serde_json::Result<Vec<u8>> {
    let mut out = serde_json::to_vec(value)?;
    out.push(b'\n');
    Ok(out)
}
