//! The math provider.
//!
//! Math found in the request is handed to the `calculator` or
//! `solve_equation` tool, and the model only explains the computed result.
//! Requests with nothing to compute fall back to a plain generation call.

use std::sync::Arc;

use async_trait::async_trait;
use conductor_generation::{GenerationRequest, Generator};
use conductor_tool_gen::math::{ProblemKind, find_problem};
use conductor_tool_gen::{Calculator, EquationSolver, ToolRegistry};
use serde_json::json;
use tracing::{debug, warn};

use crate::error::Result;
use crate::label::Domain;
use crate::provider::{CapabilityProvider, InvocationContext, ProviderDescriptor, Request};

pub const MATH_DIRECTIVE: &str = "You are a math specialist. Work through the problem step by \
step and state the final answer clearly on its own line.";

const EXPLAIN_DIRECTIVE: &str = "A tool has already computed the answer to the user's math \
problem; it is given in the context. Explain briefly how the answer is obtained. Do not \
recompute it or contradict it.";

/// Solves math by calling the calculator and equation solver tools, then
/// asking for a short explanation of the computed result.
pub struct MathProvider {
    descriptor: ProviderDescriptor,
    registry: Arc<ToolRegistry>,
    generator: Arc<dyn Generator>,
    model: Option<String>,
}

impl MathProvider {
    pub fn new(registry: Arc<ToolRegistry>, generator: Arc<dyn Generator>) -> Self {
        Self {
            descriptor: ProviderDescriptor::new(Domain::Math, MATH_DIRECTIVE)
                .with_tools(&[Calculator::NAME, EquationSolver::NAME]),
            registry,
            generator,
            model: None,
        }
    }

    pub fn with_model(mut self, model: Option<String>) -> Self {
        self.model = model;
        self
    }

    /// Run the matching tool over the math found in `text`.
    async fn compute(&self, text: &str, ctx: &InvocationContext) -> Option<(&'static str, String)> {
        let problem = find_problem(text)?;
        let (tool, args) = match problem.kind {
            ProblemKind::Expression => (Calculator::NAME, json!({ "expression": problem.source })),
            ProblemKind::Equation => (EquationSolver::NAME, json!({ "equation": problem.source })),
        };

        ctx.tool_invoked(tool);
        match self.registry.invoke(tool, args).await {
            Ok(output) if output.is_success() => {
                ctx.tool_completed(tool, true);
                Some((tool, output.content))
            }
            Ok(output) => {
                ctx.tool_completed(tool, false);
                warn!("{tool} failed: {}", output.content);
                None
            }
            Err(e) => {
                ctx.tool_completed(tool, false);
                warn!("{tool} could not be invoked: {e}");
                None
            }
        }
    }

    fn request(&self, directive: &str, request: &Request) -> GenerationRequest {
        let generation = GenerationRequest::new(directive, request.text.as_str())
            .with_history(request.history.clone());
        match &self.model {
            Some(model) => generation.with_model(model),
            None => generation,
        }
    }
}

#[async_trait]
impl CapabilityProvider for MathProvider {
    fn descriptor(&self) -> &ProviderDescriptor {
        &self.descriptor
    }

    async fn invoke(&self, request: &Request, ctx: &InvocationContext) -> Result<String> {
        let Some((tool, computed)) = self.compute(&request.text, ctx).await else {
            debug!("No computable math found, reasoning with the model");
            let generation = self.request(&self.descriptor.directive, request);
            return Ok(self.generator.generate(generation).await?);
        };

        let result = format!("**Result:** {computed}");
        let explanation = self
            .request(EXPLAIN_DIRECTIVE, request)
            .with_context(format!("{tool} returned: {computed}"));

        match self.generator.generate(explanation).await {
            Ok(text) if !text.trim().is_empty() => Ok(format!("{result}\n\n{}", text.trim())),
            Ok(_) => Ok(result),
            Err(e) => {
                warn!("Explanation failed, returning the bare result: {e}");
                Ok(result)
            }
        }
    }
}
