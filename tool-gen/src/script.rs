//! Script-backed tool handlers.
//!
//! A script receives its arguments twice: as a JSON object on stdin and as
//! `TOOL_ARG_<NAME>` environment variables. Trimmed stdout becomes the
//! tool output; a non-zero exit becomes an error output carrying stderr.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use crate::error::{Result, ToolError};
use crate::handler::{Args, ToolHandler, ToolOutput, arg_text};
use crate::spec::InputSchema;

/// Interpreters a synthesized script may name.
pub const ALLOWED_INTERPRETERS: &[&str] = &["sh", "bash", "python3"];

/// Runs `interpreter -c source`.
pub struct ScriptHandler {
    interpreter: String,
    source: String,
    timeout: Duration,
}

impl ScriptHandler {
    /// Create a handler for the given interpreter and source.
    pub fn new(interpreter: impl Into<String>, source: impl Into<String>, timeout: Duration) -> Self {
        Self {
            interpreter: interpreter.into(),
            source: source.into(),
            timeout,
        }
    }
}

#[async_trait]
impl ToolHandler for ScriptHandler {
    async fn call(&self, args: &Args) -> Result<ToolOutput> {
        let mut command = Command::new(&self.interpreter);
        command
            .arg("-c")
            .arg(&self.source)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        for name in args.keys() {
            let value = arg_text(args, name).unwrap_or_default();
            command.env(format!("TOOL_ARG_{}", name.to_uppercase()), value);
        }

        let mut child = command.spawn().map_err(|e| {
            ToolError::ExecutionFailed(format!("failed to start {}: {e}", self.interpreter))
        })?;

        if let Some(mut stdin) = child.stdin.take() {
            let payload = serde_json::to_vec(args)?;
            // A script that never reads stdin closes the pipe early.
            if let Err(e) = stdin.write_all(&payload).await {
                debug!("Script did not consume stdin: {e}");
            }
        }

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| {
                ToolError::ExecutionFailed(format!(
                    "script timed out after {}ms",
                    self.timeout.as_millis()
                ))
            })??;

        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if output.status.success() {
            Ok(ToolOutput::success(stdout))
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let message = if stderr.is_empty() {
                format!("script exited with {}", output.status)
            } else {
                stderr
            };
            Ok(ToolOutput::error(message))
        }
    }

    fn check_schema(&self, _schema: &InputSchema) -> std::result::Result<(), String> {
        if !ALLOWED_INTERPRETERS.contains(&self.interpreter.as_str()) {
            return Err(format!(
                "interpreter '{}' is not one of {}",
                self.interpreter,
                ALLOWED_INTERPRETERS.join(", ")
            ));
        }
        if self.source.trim().is_empty() {
            return Err("script source is empty".to_string());
        }
        Ok(())
    }
}
