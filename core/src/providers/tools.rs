//! The tools provider finds or creates a tool for the request, then runs
//! it with arguments extracted by the model.

use std::sync::Arc;

use async_trait::async_trait;
use conductor_generation::{GenerationRequest, Generator};
use serde_json::Value;
use tracing::{debug, info};

use crate::error::{OrchestratorError, Result};
use crate::label::Domain;
use crate::provider::{CapabilityProvider, InvocationContext, ProviderDescriptor, Request};
use crate::toolsmith::ToolBuilder;

const TOOLS_DIRECTIVE: &str = "Find or create a tool for the request, then run it.";

/// Routes tool requests through the find-or-create entry point and runs the
/// tool it settles on.
pub struct ToolsProvider {
    descriptor: ProviderDescriptor,
    builder: Arc<ToolBuilder>,
    generator: Arc<dyn Generator>,
    model: Option<String>,
}

impl ToolsProvider {
    pub fn new(builder: Arc<ToolBuilder>, generator: Arc<dyn Generator>) -> Self {
        Self {
            descriptor: ProviderDescriptor::new(Domain::Tools, TOOLS_DIRECTIVE),
            builder,
            generator,
            model: None,
        }
    }

    pub fn with_model(mut self, model: Option<String>) -> Self {
        self.model = model;
        self
    }

    /// Ask the model for arguments matching the tool's schema, then invoke it.
    async fn run(&self, name: &str, request: &Request, ctx: &InvocationContext) -> Result<String> {
        let registry = self.builder.registry();
        let spec = registry
            .spec(name)
            .await
            .ok_or_else(|| conductor_tool_gen::ToolError::NotFound(name.to_string()))?;

        let mut generation = GenerationRequest::new(
            arguments_directive(&spec.name, &spec.to_json_schema()),
            request.text.as_str(),
        )
        .with_temperature(0.0);
        if let Some(model) = &self.model {
            generation = generation.with_model(model);
        }
        let reply = self.generator.generate(generation).await?;
        let args = json_object(&reply).ok_or_else(|| {
            OrchestratorError::provider(
                Domain::Tools.as_str(),
                format!("could not read arguments for {name} from {reply:?}"),
            )
        })?;
        debug!("Invoking {name} with {args}");

        ctx.tool_invoked(name);
        let output = match registry.invoke(name, args).await {
            Ok(output) => output,
            Err(e) => {
                ctx.tool_completed(name, false);
                return Err(e.into());
            }
        };
        ctx.tool_completed(name, output.is_success());

        if output.is_success() {
            Ok(output.content)
        } else {
            Err(OrchestratorError::provider(
                Domain::Tools.as_str(),
                format!("{name} reported an error: {}", output.content),
            ))
        }
    }
}

#[async_trait]
impl CapabilityProvider for ToolsProvider {
    fn descriptor(&self) -> &ProviderDescriptor {
        &self.descriptor
    }

    async fn invoke(&self, request: &Request, ctx: &InvocationContext) -> Result<String> {
        let outcome = self.builder.request_tool(&request.text).await?;
        if outcome.created {
            info!("{}", outcome.summary);
            return Ok(outcome.summary);
        }

        self.run(&outcome.tool_name, request, ctx).await
    }
}

fn arguments_directive(tool: &str, schema: &Value) -> String {
    format!(
        "Extract the arguments for the tool `{tool}` from the user's request.\n\n\
         Input schema:\n{schema}\n\n\
         Respond with only a JSON object of arguments, nothing else."
    )
}

/// The JSON object in `reply`, ignoring any text around it.
fn json_object(reply: &str) -> Option<Value> {
    let start = reply.find('{')?;
    let end = reply.rfind('}')?;
    if end < start {
        return None;
    }
    serde_json::from_str::<Value>(&reply[start..=end])
        .ok()
        .filter(Value::is_object)
}
