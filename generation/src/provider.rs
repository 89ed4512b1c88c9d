//! Generation providers.
//!
//! The orchestration core is agnostic to which model answers; anything that
//! implements [`Generator`] can be plugged in.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{GenerationError, Result};
use crate::request::GenerationRequest;

/// Trait for generation providers.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Get the name of this provider.
    fn name(&self) -> &str;

    /// Get the default model for this provider.
    fn default_model(&self) -> &str;

    /// Produce text for the given request.
    async fn generate(&self, request: GenerationRequest) -> Result<String>;

    /// Check if the provider is available (API key set, etc.).
    fn is_available(&self) -> bool {
        true
    }
}

/// OpenAI-compatible chat completion provider.
pub struct OpenAIGenerator {
    /// API key.
    api_key: Option<String>,

    /// API base URL.
    base_url: String,

    /// HTTP client.
    client: reqwest::Client,

    /// Default model.
    default_model: String,
}

impl OpenAIGenerator {
    /// Create a new OpenAI generator, reading the key from `OPENAI_API_KEY`.
    pub fn new() -> Self {
        Self {
            api_key: std::env::var("OPENAI_API_KEY").ok(),
            base_url: "https://api.openai.com/v1".to_string(),
            client: reqwest::Client::new(),
            default_model: "gpt-4o-mini".to_string(),
        }
    }

    /// Set the API key.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Set the base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the default model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }

    fn build_body(&self, request: &GenerationRequest) -> serde_json::Value {
        let model = request
            .model
            .clone()
            .unwrap_or_else(|| self.default_model.clone());

        let mut messages = Vec::with_capacity(request.history.len() + 2);
        if !request.directive.is_empty() {
            messages.push(serde_json::json!({
                "role": "system",
                "content": request.directive
            }));
        }
        for turn in &request.history {
            messages.push(serde_json::json!({
                "role": turn.role.as_str(),
                "content": turn.text
            }));
        }
        messages.push(serde_json::json!({
            "role": "user",
            "content": request.user_message()
        }));

        let mut body = serde_json::json!({
            "model": model,
            "messages": messages
        });

        if let Some(temperature) = request.temperature {
            body["temperature"] = serde_json::json!(temperature);
        }
        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }

        body
    }
}

impl Default for OpenAIGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Generator for OpenAIGenerator {
    fn name(&self) -> &str {
        "openai"
    }

    fn default_model(&self) -> &str {
        &self.default_model
    }

    async fn generate(&self, request: GenerationRequest) -> Result<String> {
        let api_key = self
            .api_key
            .as_ref()
            .ok_or(GenerationError::ProviderNotConfigured)?;

        let body = self.build_body(&request);
        debug!("Requesting chat completion with model: {}", body["model"]);

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {api_key}"))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(60);

            return Err(GenerationError::RateLimited {
                retry_after_secs: retry_after,
            });
        }

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(GenerationError::ApiRequest(format!(
                "API error ({status}): {error_text}"
            )));
        }

        let result: ChatCompletionResponse = response.json().await?;

        let content = result
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| GenerationError::InvalidResponse("No choices in response".to_string()))?;

        if let Some(usage) = result.usage {
            info!(
                "Chat completion from {} used {} tokens",
                result.model, usage.total_tokens
            );
        }

        Ok(content)
    }

    fn is_available(&self) -> bool {
        self.api_key.is_some()
    }
}

/// OpenAI chat completion response format.
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
    #[serde(default)]
    model: String,
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    total_tokens: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::Turn;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_body_orders_directive_history_prompt() {
        let generator = OpenAIGenerator::new().with_model("test-model");
        let request = GenerationRequest::new("only answer with a label", "2 + 2")
            .with_history(vec![Turn::user("hi"), Turn::assistant("hello")])
            .with_temperature(0.0);

        let body = generator.build_body(&request);
        let roles: Vec<&str> = body["messages"]
            .as_array()
            .map(|m| m.iter().filter_map(|m| m["role"].as_str()).collect())
            .unwrap_or_default();

        assert_eq!(roles, vec!["system", "user", "assistant", "user"]);
        assert_eq!(body["model"], "test-model");
        assert_eq!(body["temperature"], 0.0);
    }

    #[test]
    fn test_request_model_overrides_default() {
        let generator = OpenAIGenerator::new().with_model("default-model");
        let request = GenerationRequest::new("", "hi").with_model("override");

        let body = generator.build_body(&request);
        assert_eq!(body["model"], "override");
        assert_eq!(body["messages"].as_array().map(Vec::len), Some(1));
    }
}
