//! Providers that answer with a single directed generation call.

use std::sync::Arc;

use async_trait::async_trait;
use conductor_generation::{GenerationRequest, Generator};

use crate::error::Result;
use crate::label::Domain;
use crate::provider::{CapabilityProvider, InvocationContext, ProviderDescriptor, Request};

pub const LANGUAGE_DIRECTIVE: &str = "You are a language specialist. Translate, rewrite, \
summarize, or correct text as asked. When translating, give the translation first, in quotes, \
followed by at most one short note on usage.";

pub const CODE_DIRECTIVE: &str = "You are a programming assistant. Answer with working code \
in fenced blocks and keep explanations short. Say which language you used when it was not \
specified.";

pub const GENERAL_DIRECTIVE: &str = "You are a helpful assistant. Answer the request directly \
and concisely. If you do not know something, say so.";

/// A provider whose whole behavior is one generation call under a fixed
/// directive.
pub struct DirectiveProvider {
    descriptor: ProviderDescriptor,
    generator: Arc<dyn Generator>,
    model: Option<String>,
}

impl DirectiveProvider {
    pub fn new(descriptor: ProviderDescriptor, generator: Arc<dyn Generator>) -> Self {
        Self {
            descriptor,
            generator,
            model: None,
        }
    }

    pub fn language(generator: Arc<dyn Generator>) -> Self {
        Self::new(
            ProviderDescriptor::new(Domain::Language, LANGUAGE_DIRECTIVE),
            generator,
        )
    }

    pub fn code(generator: Arc<dyn Generator>) -> Self {
        Self::new(ProviderDescriptor::new(Domain::Code, CODE_DIRECTIVE), generator)
    }

    pub fn general(generator: Arc<dyn Generator>) -> Self {
        Self::new(
            ProviderDescriptor::new(Domain::General, GENERAL_DIRECTIVE),
            generator,
        )
    }

    pub fn with_model(mut self, model: Option<String>) -> Self {
        self.model = model;
        self
    }
}

#[async_trait]
impl CapabilityProvider for DirectiveProvider {
    fn descriptor(&self) -> &ProviderDescriptor {
        &self.descriptor
    }

    async fn invoke(&self, request: &Request, _ctx: &InvocationContext) -> Result<String> {
        let mut generation =
            GenerationRequest::new(self.descriptor.directive.as_str(), request.text.as_str())
                .with_history(request.history.clone());
        if let Some(model) = &self.model {
            generation = generation.with_model(model);
        }

        Ok(self.generator.generate(generation).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conductor_generation::Turn;
    use conductor_generation::mock::ScriptedGenerator;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_directive_and_history_are_forwarded() {
        let generator = ScriptedGenerator::new().with_response("\"Hola\"");
        let provider = DirectiveProvider::language(Arc::new(generator.clone()))
            .with_model(Some("gpt-4o".to_string()));

        let request = Request::new("Translate 'Hello' to Spanish")
            .with_history(vec![Turn::user("hi"), Turn::assistant("hello")]);
        let text = provider
            .invoke(&request, &InvocationContext::silent())
            .await
            .unwrap();

        assert_eq!(text, "\"Hola\"");
        let sent = &generator.requests()[0];
        assert_eq!(sent.directive, LANGUAGE_DIRECTIVE);
        assert_eq!(sent.history.len(), 2);
        assert_eq!(sent.model.as_deref(), Some("gpt-4o"));
        assert_eq!(provider.domain(), Domain::Language);
    }
}
