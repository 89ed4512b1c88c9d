//! Tools that ship with the registry.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::error::{Result, ToolError};
use crate::handler::{Args, ToolHandler, ToolOutput, arg_text};
use crate::math;
use crate::registry::ToolRegistry;
use crate::spec::{DataType, ToolSpec};

/// Default cap on the body returned by `http_get`.
const DEFAULT_MAX_BYTES: usize = 4000;

/// Evaluates arithmetic expressions.
pub struct Calculator;

impl Calculator {
    pub const NAME: &'static str = "calculator";

    pub fn spec() -> ToolSpec {
        ToolSpec::new(
            Self::NAME,
            "Evaluate an arithmetic expression such as 12 * (3 + 4) or 2^10.",
        )
        .with_required("expression", DataType::String, "The expression to evaluate")
    }
}

#[async_trait]
impl ToolHandler for Calculator {
    async fn call(&self, args: &Args) -> Result<ToolOutput> {
        let expression = arg_text(args, "expression").unwrap_or_default();
        let value = math::evaluate(&expression)
            .map_err(|e| ToolError::ExecutionFailed(format!("cannot evaluate '{expression}': {e}")))?;
        Ok(ToolOutput::success(math::format_number(value)))
    }
}

/// Solves linear and quadratic equations in one variable.
pub struct EquationSolver;

impl EquationSolver {
    pub const NAME: &'static str = "solve_equation";

    pub fn spec() -> ToolSpec {
        ToolSpec::new(
            Self::NAME,
            "Solve a linear or quadratic equation in one variable, such as x^2 + 5x + 6 = 0.",
        )
        .with_required("equation", DataType::String, "The equation to solve")
    }
}

#[async_trait]
impl ToolHandler for EquationSolver {
    async fn call(&self, args: &Args) -> Result<ToolOutput> {
        let equation = arg_text(args, "equation").unwrap_or_default();
        let solution = math::solve(&equation)
            .map_err(|e| ToolError::ExecutionFailed(format!("cannot solve '{equation}': {e}")))?;
        Ok(ToolOutput::success(solution.to_string()))
    }
}

/// Fetches a URL and returns the start of its body.
pub struct HttpGet {
    client: reqwest::Client,
}

impl HttpGet {
    pub const NAME: &'static str = "http_get";

    pub fn new() -> Self {
        Self::with_client(
            reqwest::Client::builder()
                .timeout(Duration::from_secs(15))
                .build()
                .unwrap_or_default(),
        )
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    pub fn spec() -> ToolSpec {
        ToolSpec::new(Self::NAME, "Fetch a web page over HTTP GET and return its text.")
            .with_required("url", DataType::String, "Absolute http or https URL")
            .with_optional(
                "max_bytes",
                DataType::Integer,
                "Truncate the body to this many bytes",
            )
    }
}

impl Default for HttpGet {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ToolHandler for HttpGet {
    async fn call(&self, args: &Args) -> Result<ToolOutput> {
        let url = arg_text(args, "url").unwrap_or_default();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Ok(ToolOutput::error(format!("unsupported URL: {url}")));
        }
        let max_bytes = args
            .get("max_bytes")
            .and_then(serde_json::Value::as_u64)
            .map_or(DEFAULT_MAX_BYTES, |n| n as usize);

        debug!("Fetching {url}");
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ToolError::ExecutionFailed(format!("request to {url} failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ToolError::ExecutionFailed(format!("reading {url} failed: {e}")))?;

        if !status.is_success() {
            return Ok(ToolOutput::error(format!("HTTP {status}")));
        }
        Ok(ToolOutput::success(truncate_at_char_boundary(&body, max_bytes)))
    }
}

fn truncate_at_char_boundary(text: &str, max_bytes: usize) -> String {
    if text.len() <= max_bytes {
        return text.to_string();
    }
    let mut end = max_bytes;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    text[..end].to_string()
}

/// Register the builtin tools.
pub async fn register_builtin_tools(registry: &ToolRegistry) -> Result<()> {
    registry
        .register(Calculator::spec(), Arc::new(Calculator))
        .await?;
    registry
        .register(EquationSolver::spec(), Arc::new(EquationSolver))
        .await?;
    registry
        .register(HttpGet::spec(), Arc::new(HttpGet::new()))
        .await?;
    Ok(())
}
