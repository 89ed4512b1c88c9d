//! Generation request types.

use serde::{Deserialize, Serialize};

/// Who produced a turn in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    /// Role name as used by chat completion APIs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// One prior turn of a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub text: String,
}

impl Turn {
    /// Create a user turn.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    /// Create an assistant turn.
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
        }
    }
}

/// A single call to the generation capability.
///
/// The `directive` steers the model (it becomes the system message), the
/// `prompt` is the text to act on, and `context` carries supporting material
/// such as retrieved facts or tool results.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Instruction governing how the model should answer.
    pub directive: String,

    /// The text the model should respond to.
    pub prompt: String,

    /// Supporting material appended after the prompt.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,

    /// Prior conversation turns, oldest first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub history: Vec<Turn>,

    /// Model to use (provider default when unset).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Sampling temperature.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Upper bound on generated tokens.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl GenerationRequest {
    /// Create a new request.
    pub fn new(directive: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            directive: directive.into(),
            prompt: prompt.into(),
            ..Default::default()
        }
    }

    /// Attach supporting context.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Replay prior turns before the prompt.
    pub fn with_history(mut self, history: Vec<Turn>) -> Self {
        self.history = history;
        self
    }

    /// Set the model to use.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set the token limit.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// The final user message: the prompt, followed by the context block if any.
    pub fn user_message(&self) -> String {
        match &self.context {
            Some(context) => format!("{}\n\n<context>\n{context}\n</context>", self.prompt),
            None => self.prompt.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_user_message_without_context() {
        let request = GenerationRequest::new("be brief", "hello");
        assert_eq!(request.user_message(), "hello");
    }

    #[test]
    fn test_user_message_with_context() {
        let request = GenerationRequest::new("be brief", "what is my name?")
            .with_context("- name: J");

        assert_eq!(
            request.user_message(),
            "what is my name?\n\n<context>\n- name: J\n</context>"
        );
    }
}
