//! Capability providers wrapped as registry tools.

use std::sync::Arc;

use async_trait::async_trait;
use conductor_tool_gen::handler::arg_text;
use conductor_tool_gen::{Args, DataType, ToolHandler, ToolOutput, ToolSpec};

use crate::label::Domain;
use crate::provider::{CapabilityProvider, InvocationContext, Request};

/// Exposes a capability provider as a registry tool named `ask_<label>`.
///
/// The provider runs with a silent context, so only its final text comes
/// back through the tool output.
pub struct ProviderTool {
    provider: Arc<dyn CapabilityProvider>,
}

impl ProviderTool {
    pub fn new(provider: Arc<dyn CapabilityProvider>) -> Self {
        Self { provider }
    }

    /// Tool name for a domain.
    pub fn tool_name(domain: Domain) -> String {
        format!("ask_{domain}")
    }

    /// Whether a domain's provider may be offered as a tool.
    ///
    /// Memory needs the caller's owner, which a tool call does not carry,
    /// and the tools provider would be offered to itself.
    pub fn exposes(domain: Domain) -> bool {
        !matches!(domain, Domain::Memory | Domain::Tools) && !domain.is_fallback()
    }

    pub fn spec(&self) -> ToolSpec {
        let domain = self.provider.domain();
        ToolSpec::new(
            Self::tool_name(domain),
            format!("Ask the {domain} specialist ({}).", domain.description()),
        )
        .with_required("request", DataType::String, "The request to hand over")
    }
}

#[async_trait]
impl ToolHandler for ProviderTool {
    async fn call(&self, args: &Args) -> conductor_tool_gen::Result<ToolOutput> {
        let text = arg_text(args, "request").unwrap_or_default();
        match self
            .provider
            .invoke(&Request::new(text), &InvocationContext::silent())
            .await
        {
            Ok(text) => Ok(ToolOutput::success(text)),
            Err(e) => Ok(ToolOutput::error(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::DirectiveProvider;
    use conductor_generation::mock::ScriptedGenerator;
    use conductor_tool_gen::ToolRegistry;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[tokio::test]
    async fn test_provider_is_invocable_as_tool() {
        let generator = ScriptedGenerator::new()
            .with_response("Bonjour")
            .with_error("offline");
        let tool = ProviderTool::new(Arc::new(DirectiveProvider::language(Arc::new(generator))));
        let registry = ToolRegistry::new();
        registry.register(tool.spec(), Arc::new(tool)).await.unwrap();

        let ok = registry
            .invoke("ask_language", json!({"request": "Hello in French"}))
            .await
            .unwrap();
        assert_eq!(ok.content, "Bonjour");

        let failed = registry
            .invoke("ask_language", json!({"request": "again"}))
            .await
            .unwrap();
        assert!(!failed.is_success());
    }

    #[test]
    fn test_only_stateless_specialists_are_exposed() {
        let exposed: Vec<Domain> = Domain::ALL
            .into_iter()
            .filter(|d| ProviderTool::exposes(*d))
            .collect();
        assert_eq!(exposed, vec![Domain::Math, Domain::Language, Domain::Code]);
    }
}
