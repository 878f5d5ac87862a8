//! Field extraction helpers shared by every handler: each handler owns
//! pulling its fields out of the raw request value, so these are small and
//! deliberately don't attempt generic deserialization.

use actl_core::{ErrorCode, HubError};
use serde_json::Value;

/// Reads a required string field.
pub fn require_str<'a>(raw: &'a Value, field: &str) -> Result<&'a str, HubError> {
    raw.get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| HubError::new(ErrorCode::InvalidRequest, format!("{field} is required")))
}

/// Reads an optional string field.
pub fn opt_str<'a>(raw: &'a Value, field: &str) -> Option<&'a str> {
    raw.get(field).and_then(Value::as_str)
}

/// Reads an optional i64 field.
pub fn opt_i64(raw: &Value, field: &str) -> Option<i64> {
    raw.get(field).and_then(Value::as_i64)
}

/// Reads an optional array-of-strings field, defaulting to empty.
pub fn str_array(raw: &Value, field: &str) -> Vec<String> {
    raw.get(field)
        .and_then(Value::as_array)
        .map(|arr| arr.iter().filter_map(|v| v.as_str()).map(str::to_string).collect())
        .unwrap_or_default()
}
