//! Invocable tool handlers.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Result;
use crate::spec::InputSchema;

/// Arguments passed to a handler, already checked against the tool's schema.
pub type Args = Map<String, Value>;

/// Outcome status of an invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolStatus {
    Success,
    Error,
}

/// Result of invoking a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolOutput {
    /// Whether the tool succeeded.
    pub status: ToolStatus,

    /// Output text, or the error message.
    pub content: String,
}

impl ToolOutput {
    /// Create a successful output.
    pub fn success(content: impl Into<String>) -> Self {
        Self {
            status: ToolStatus::Success,
            content: content.into(),
        }
    }

    /// Create a failed output.
    pub fn error(content: impl Into<String>) -> Self {
        Self {
            status: ToolStatus::Error,
            content: content.into(),
        }
    }

    /// Whether the invocation succeeded.
    pub fn is_success(&self) -> bool {
        self.status == ToolStatus::Success
    }
}

/// Something that can be invoked as a tool.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Run the tool.
    async fn call(&self, args: &Args) -> Result<ToolOutput>;

    /// Reject schemas this handler cannot serve.
    ///
    /// Called once at registration time.
    fn check_schema(&self, _schema: &InputSchema) -> std::result::Result<(), String> {
        Ok(())
    }
}

/// Handler backed by a synchronous closure.
pub struct FnHandler<F> {
    f: F,
}

#[async_trait]
impl<F> ToolHandler for FnHandler<F>
where
    F: Fn(&Args) -> Result<ToolOutput> + Send + Sync,
{
    async fn call(&self, args: &Args) -> Result<ToolOutput> {
        (self.f)(args)
    }
}

/// Wrap a closure as a shareable handler.
pub fn handler_fn<F>(f: F) -> Arc<dyn ToolHandler>
where
    F: Fn(&Args) -> Result<ToolOutput> + Send + Sync + 'static,
{
    Arc::new(FnHandler { f })
}

/// Read an argument as text: strings verbatim, everything else as JSON.
pub fn arg_text(args: &Args, name: &str) -> Option<String> {
    args.get(name).map(|value| match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_fn_handler() {
        let handler = handler_fn(|args| {
            let name = arg_text(args, "name").unwrap_or_default();
            Ok(ToolOutput::success(format!("hello {name}")))
        });

        let mut args = Args::new();
        args.insert("name".to_string(), Value::from("ada"));

        let output = handler.call(&args).await.unwrap();
        assert_eq!(output, ToolOutput::success("hello ada"));
        assert!(output.is_success());
    }

    #[test]
    fn test_arg_text_renders_non_strings_as_json() {
        let mut args = Args::new();
        args.insert("n".to_string(), serde_json::json!(4));
        args.insert("s".to_string(), serde_json::json!("four"));

        assert_eq!(arg_text(&args, "n").as_deref(), Some("4"));
        assert_eq!(arg_text(&args, "s").as_deref(), Some("four"));
        assert_eq!(arg_text(&args, "missing"), None);
    }
}
