//! The capability provider interface.

use std::sync::Arc;

use async_trait::async_trait;
use conductor_generation::Turn;
use uuid::Uuid;

use crate::error::Result;
use crate::events::{EventSink, NoopSink, TraceEvent};
use crate::label::Domain;

/// An inbound request.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Request {
    /// What the user asked.
    pub text: String,

    /// Prior turns, oldest first.
    pub history: Vec<Turn>,

    /// Whose memories the request may read or write.
    pub owner_id: Option<String>,
}

impl Request {
    /// Create a request with no history.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    /// Attach prior turns.
    pub fn with_history(mut self, history: Vec<Turn>) -> Self {
        self.history = history;
        self
    }

    /// Scope memory operations to an owner.
    pub fn with_owner(mut self, owner_id: impl Into<String>) -> Self {
        self.owner_id = Some(owner_id.into());
        self
    }
}

/// Static description of a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderDescriptor {
    /// The domain this provider serves.
    pub domain: Domain,

    /// System directive for the provider's generation calls.
    pub directive: String,

    /// Tools the provider may call.
    pub tools: Vec<String>,
}

impl ProviderDescriptor {
    pub fn new(domain: Domain, directive: impl Into<String>) -> Self {
        Self {
            domain,
            directive: directive.into(),
            tools: Vec::new(),
        }
    }

    pub fn with_tools(mut self, tools: &[&str]) -> Self {
        self.tools = tools.iter().map(|t| (*t).to_string()).collect();
        self
    }
}

/// Per-invocation state handed to a provider.
#[derive(Clone)]
pub struct InvocationContext {
    cycle_id: Uuid,
    sink: Arc<dyn EventSink>,
}

impl InvocationContext {
    /// Context for a top-level cycle.
    pub fn new(cycle_id: Uuid, sink: Arc<dyn EventSink>) -> Self {
        Self { cycle_id, sink }
    }

    /// Context for a call made outside any cycle, such as a provider
    /// invoked as a tool. Nothing it emits is observed.
    pub fn silent() -> Self {
        Self::new(Uuid::new_v4(), Arc::new(NoopSink))
    }

    pub fn cycle_id(&self) -> Uuid {
        self.cycle_id
    }

    pub fn emit(&self, event: TraceEvent) {
        self.sink.emit(event);
    }

    pub(crate) fn tool_invoked(&self, tool: &str) {
        self.emit(TraceEvent::ToolInvoked {
            cycle_id: self.cycle_id,
            tool: tool.to_string(),
        });
    }

    pub(crate) fn tool_completed(&self, tool: &str, success: bool) {
        self.emit(TraceEvent::ToolCompleted {
            cycle_id: self.cycle_id,
            tool: tool.to_string(),
            success,
        });
    }
}

/// A specialized handler for one request domain.
#[async_trait]
pub trait CapabilityProvider: Send + Sync {
    /// Static description of this provider.
    fn descriptor(&self) -> &ProviderDescriptor;

    /// Handle a request and return the final text.
    async fn invoke(&self, request: &Request, ctx: &InvocationContext) -> Result<String>;

    /// The domain this provider serves.
    fn domain(&self) -> Domain {
        self.descriptor().domain
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::CollectingSink;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_tool_events_carry_the_cycle_id() {
        let collected = CollectingSink::new();
        let cycle_id = Uuid::new_v4();
        let ctx = InvocationContext::new(cycle_id, Arc::new(collected.clone()));

        ctx.tool_invoked("calculator");
        ctx.tool_completed("calculator", true);
        InvocationContext::silent().tool_invoked("calculator");

        assert_eq!(
            collected.events(),
            vec![
                TraceEvent::ToolInvoked {
                    cycle_id,
                    tool: "calculator".to_string(),
                },
                TraceEvent::ToolCompleted {
                    cycle_id,
                    tool: "calculator".to_string(),
                    success: true,
                },
            ]
        );
    }
}
