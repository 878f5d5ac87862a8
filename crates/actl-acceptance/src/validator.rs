//! Deny-list validation for acceptance commands: narrows a trusted,
//! argument-vector `Command` spawn into a guard over arbitrary shell
//! strings.

/// Maximum command length in bytes before it's rejected outright.
pub const MAX_COMMAND_BYTES: usize = 1000;

const DENIED_CONSTRUCTS: &[&str] = &[";", "|", "`", "$(", "${", ">", "<", "&&", "||", "\n"];

/// Why a command was rejected by the deny-list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DenyReason(pub String);

/// Validates `command` against the deny-list and the byte-length cap.
///
/// # Errors
///
/// Returns `Err(DenyReason)` citing the offending construct or the
/// length violation; the caller reports this as exit code `-2`.
pub fn validate_command(command: &str) -> Result<(), DenyReason> {
    if command.len() > MAX_COMMAND_BYTES {
        return Err(DenyReason(format!(
            "command exceeds {MAX_COMMAND_BYTES} bytes"
        )));
    }
    for construct in DENIED_CONSTRUCTS {
        if command.contains(construct) {
            return Err(DenyReason(format!("command contains denied construct {construct:?}")));
        }
    }
    Ok(())
}
