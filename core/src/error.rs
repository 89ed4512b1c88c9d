//! Error types for the orchestration core.

use thiserror::Error;

/// Result type alias for orchestration operations.
pub type Result<T> = std::result::Result<T, OrchestratorError>;

/// Errors that can occur while configuring or running the orchestrator.
#[derive(Error, Debug)]
pub enum OrchestratorError {
    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// No capability providers are enabled.
    #[error("no capability providers are enabled")]
    NoProviders,

    /// A label that names no known provider.
    #[error("unknown provider label: {0}")]
    UnknownLabel(String),

    /// A provider failed to produce a result.
    #[error("{provider} provider failed: {message}")]
    Provider { provider: String, message: String },

    /// The cycle was cancelled by the caller.
    #[error("request cancelled")]
    Cancelled,

    /// Generation capability error.
    #[error(transparent)]
    Generation(#[from] conductor_generation::GenerationError),

    /// Retrieval or store capability error.
    #[error(transparent)]
    Retrieval(#[from] conductor_retrieval::RetrievalError),

    /// Tool registry or synthesis error.
    #[error(transparent)]
    Tool(#[from] conductor_tool_gen::ToolError),

    /// Configuration file could not be parsed.
    #[error("invalid configuration file: {0}")]
    Toml(#[from] toml::de::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl OrchestratorError {
    /// Build a provider failure.
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Whether the error is a startup-time configuration problem.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Config(_) | Self::NoProviders | Self::UnknownLabel(_) | Self::Toml(_)
        )
    }
}
