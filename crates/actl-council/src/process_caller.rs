//! A concrete [`LlmCaller`] for accounts backed by a local CLI model
//! runner, generalizing the same spawn/pipe/timeout shape
//! `actl-acceptance::runner` uses for acceptance commands.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::time::timeout;

use crate::caller::LlmCaller;

/// Invokes `<command> <account>`, writing `{"system":...,"user":...}` to
/// its stdin and reading the trimmed stdout as the model's raw response.
/// One process per call; nothing is kept running between calls.
pub struct ProcessLlmCaller {
    command: String,
    per_call_timeout: Duration,
}

impl ProcessLlmCaller {
    /// Creates a caller that spawns `command` for every `call`, killing it
    /// if it runs past `per_call_timeout`.
    #[must_use]
    pub fn new(command: impl Into<String>, per_call_timeout: Duration) -> Self {
        Self {
            command: command.into(),
            per_call_timeout,
        }
    }
}

#[async_trait]
impl LlmCaller for ProcessLlmCaller {
    async fn call(&self, account: &str, system_prompt: &str, user_prompt: &str) -> Result<String, String> {
        let request = serde_json::json!({ "system": system_prompt, "user": user_prompt }).to_string();

        let mut child = Command::new(&self.command)
            .arg(account)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| format!("failed to spawn {}: {e}", self.command))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| format!("{} gave no stdin handle", self.command))?;
        stdin.write_all(request.as_bytes()).await.map_err(|e| e.to_string())?;
        drop(stdin);

        let output = match timeout(self.per_call_timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(err)) => return Err(err.to_string()),
            Err(_elapsed) => return Err(format!("{account} timed out after {:?}", self.per_call_timeout)),
        };

        if !output.status.success() {
            return Err(String::from_utf8_lossy(&output.stderr).into_owned());
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    /// Writes an executable shell script that echoes its stdin to stdout,
    /// ignoring whatever argument it's called with (the account name).
    fn cat_script(dir: &std::path::Path, name: &str, body: &str) -> String {
        let path = dir.join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path.to_string_lossy().into_owned()
    }

    #[tokio::test]
    async fn successful_command_returns_trimmed_stdout() {
        let dir = tempfile::tempdir().unwrap();
        let script = cat_script(dir.path(), "echoer.sh", "cat");
        let caller = ProcessLlmCaller::new(script, Duration::from_secs(5));
        let response = caller.call("alice", "sys", "hello").await.unwrap();
        assert!(response.contains("hello"));
    }

    #[tokio::test]
    async fn nonzero_exit_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let script = cat_script(dir.path(), "failer.sh", "cat >/dev/null; exit 1");
        let caller = ProcessLlmCaller::new(script, Duration::from_secs(5));
        assert!(caller.call("alice", "sys", "hello").await.is_err());
    }

    #[tokio::test]
    async fn missing_command_is_an_error() {
        let caller = ProcessLlmCaller::new("definitely-not-a-real-binary", Duration::from_secs(5));
        assert!(caller.call("alice", "sys", "hello").await.is_err());
    }
}
