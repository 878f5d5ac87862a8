//! Command execution: each validated command is spawned through a shell
//! with a per-command timeout, generalizing a captured-output
//! `std::process::Command` idiom to an async, kill-on-timeout
//! `tokio::process::Command`.

use std::time::Duration;

use tokio::process::Command;
use tokio::time::timeout;

use crate::error::AcceptanceError;
use crate::validator::validate_command;

/// Output is truncated past this many bytes, per stream.
pub const OUTPUT_TRUNCATION_BYTES: usize = 8192;

/// Exit code recorded when a command is killed for exceeding its timeout.
pub const TIMEOUT_EXIT_CODE: i32 = -1;
/// Exit code recorded when a command is rejected by the deny-list.
pub const DENIED_EXIT_CODE: i32 = -2;

/// Result of running a single command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutcome {
    /// The command as given.
    pub command: String,
    /// Process exit code, or [`TIMEOUT_EXIT_CODE`]/[`DENIED_EXIT_CODE`].
    pub exit_code: i32,
    /// Captured, possibly truncated stdout.
    pub stdout: String,
    /// Captured, possibly truncated stderr.
    pub stderr: String,
}

impl CommandOutcome {
    /// Whether this command's outcome counts as passing (`exit_code == 0`).
    #[must_use]
    pub fn passed(&self) -> bool {
        self.exit_code == 0
    }
}

/// Outcome of running a whole suite of commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuiteResult {
    /// `true` only if every command returned exit code 0 (an empty list is
    /// a vacuous pass).
    pub passed: bool,
    /// Per-command outcomes, in execution order.
    pub commands: Vec<CommandOutcome>,
}

/// Runs `commands` in `working_dir`, one at a time, each bounded by
/// `per_command_timeout`. A command rejected by the deny-list never spawns.
///
/// # Errors
///
/// Returns [`AcceptanceError::Spawn`] only if the shell itself fails to
/// spawn (distinct from a non-zero exit, which is captured in the result).
pub async fn run_suite(
    commands: &[String],
    working_dir: &str,
    per_command_timeout: Duration,
) -> Result<SuiteResult, AcceptanceError> {
    let mut outcomes = Vec::with_capacity(commands.len());
    for command in commands {
        outcomes.push(run_one(command, working_dir, per_command_timeout).await?);
    }
    let passed = outcomes.iter().all(CommandOutcome::passed);
    Ok(SuiteResult {
        passed,
        commands: outcomes,
    })
}

async fn run_one(
    command: &str,
    working_dir: &str,
    per_command_timeout: Duration,
) -> Result<CommandOutcome, AcceptanceError> {
    if let Err(reason) = validate_command(command) {
        return Ok(CommandOutcome {
            command: command.to_string(),
            exit_code: DENIED_EXIT_CODE,
            stdout: String::new(),
            stderr: reason.0,
        });
    }

    let mut child = Command::new("sh")
        .arg("-c")
        .arg(command)
        .current_dir(working_dir)
        .kill_on_drop(true)
        .stdout(std::process::Stdio::piped())
        .stderr(std::process::Stdio::piped())
        .spawn()?;

    match timeout(per_command_timeout, child.wait_with_output()).await {
        Ok(Ok(output)) => Ok(CommandOutcome {
            command: command.to_string(),
            exit_code: output.status.code().unwrap_or(DENIED_EXIT_CODE),
            stdout: truncate(&output.stdout),
            stderr: truncate(&output.stderr),
        }),
        Ok(Err(err)) => Err(AcceptanceError::Spawn(err)),
        Err(_elapsed) => {
            tracing::warn!(command, "acceptance command timed out");
            Ok(CommandOutcome {
                command: command.to_string(),
                exit_code: TIMEOUT_EXIT_CODE,
                stdout: String::new(),
                stderr: format!("command timed out after {per_command_timeout:?}"),
            })
        }
    }
}

fn truncate(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    if text.len() > OUTPUT_TRUNCATION_BYTES {
        let cut = text
            .char_indices()
            .map(|(i, c)| i + c.len_utf8())
            .take_while(|&end| end <= OUTPUT_TRUNCATION_BYTES)
            .last()
            .unwrap_or(0);
        format!("{}...[truncated]", &text[..cut])
    } else {
        text.into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn denied_command_returns_negative_two_without_spawning() {
        let result = run_suite(&["echo `whoami`".to_string()], ".", Duration::from_secs(1))
            .await
            .unwrap();
        assert!(!result.passed);
        assert_eq!(result.commands[0].exit_code, DENIED_EXIT_CODE);
    }

    #[tokio::test]
    async fn passing_command_returns_zero() {
        let result = run_suite(&["echo hi".to_string()], ".", Duration::from_secs(5))
            .await
            .unwrap();
        assert!(result.passed);
        assert_eq!(result.commands[0].exit_code, 0);
        assert!(result.commands[0].stdout.contains("hi"));
    }

    #[tokio::test]
    async fn slow_command_is_killed_on_timeout() {
        let result = run_suite(&["sleep 10".to_string()], ".", Duration::from_millis(100))
            .await
            .unwrap();
        assert!(!result.passed);
        assert_eq!(result.commands[0].exit_code, TIMEOUT_EXIT_CODE);
        assert!(result.commands[0].stderr.contains("timed out"));
    }

    #[tokio::test]
    async fn empty_command_list_is_a_vacuous_pass() {
        let result = run_suite(&[], ".", Duration::from_secs(1)).await.unwrap();
        assert!(result.passed);
        assert!(result.commands.is_empty());
    }

    #[tokio::test]
    async fn mixed_suite_fails_if_any_command_fails() {
        let result = run_suite(
            &["echo ok".to_string(), "exit 1".to_string()],
            ".",
            Duration::from_secs(5),
        )
        .await
        .unwrap();
        assert!(!result.passed);
    }
}
