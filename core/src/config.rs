//! Orchestrator configuration.
//!
//! Every tunable the core uses is a named field here; nothing is read from
//! module-level defaults at call time.
//!
//! ```toml
//! generation_model = "gpt-4o-mini"
//! classification_timeout_ms = 10000
//! enabled_providers = ["math", "language", "memory", "general"]
//! match_mode = "token"
//!
//! [retrieval]
//! min_relevance = 0.4
//! max_results = 3
//! ```

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use conductor_retrieval::RetrievalConfig;
use serde::{Deserialize, Serialize};

use crate::classifier::MatchMode;
use crate::error::{OrchestratorError, Result};
use crate::label::Domain;

/// Configuration for the orchestrator and its providers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Model for classification calls (provider default when unset).
    pub classification_model: Option<String>,

    /// Model for answer-generating calls (provider default when unset).
    pub generation_model: Option<String>,

    /// Timeout for one classification call.
    pub classification_timeout_ms: u64,

    /// Timeout for one generation call.
    pub generation_timeout_ms: u64,

    /// Timeout for one tool invocation.
    pub tool_timeout_ms: u64,

    /// Labels of the providers to enable. The fallback is always enabled.
    pub enabled_providers: Vec<String>,

    /// How classifier replies are matched against labels.
    pub match_mode: MatchMode,

    /// Where synthesized tool artifacts are stored.
    pub artifact_dir: PathBuf,

    /// Register every enabled specialist provider as an `ask_<label>` tool.
    pub expose_providers_as_tools: bool,

    /// Retrieval threshold and cap.
    pub retrieval: RetrievalConfig,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            classification_model: None,
            generation_model: None,
            classification_timeout_ms: 15_000,
            generation_timeout_ms: 60_000,
            tool_timeout_ms: 30_000,
            enabled_providers: Domain::ALL.iter().map(|d| d.as_str().to_string()).collect(),
            match_mode: MatchMode::default(),
            artifact_dir: default_artifact_dir(),
            expose_providers_as_tools: false,
            retrieval: RetrievalConfig::default(),
        }
    }
}

impl OrchestratorConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    /// Check the configuration for startup errors.
    pub fn validate(&self) -> Result<()> {
        self.enabled_domains()?;

        for (name, ms) in [
            ("classification_timeout_ms", self.classification_timeout_ms),
            ("generation_timeout_ms", self.generation_timeout_ms),
            ("tool_timeout_ms", self.tool_timeout_ms),
        ] {
            if ms == 0 {
                return Err(OrchestratorError::Config(format!("{name} must be positive")));
            }
        }

        if !(0.0..=1.0).contains(&self.retrieval.min_relevance) {
            return Err(OrchestratorError::Config(
                "retrieval.min_relevance must be between 0 and 1".to_string(),
            ));
        }

        Ok(())
    }

    /// Enabled domains, including the fallback.
    ///
    /// An empty list means no providers at all and is rejected.
    pub fn enabled_domains(&self) -> Result<BTreeSet<Domain>> {
        if self.enabled_providers.is_empty() {
            return Err(OrchestratorError::NoProviders);
        }

        let mut domains = self
            .enabled_providers
            .iter()
            .map(|label| label.parse::<Domain>())
            .collect::<Result<BTreeSet<_>>>()?;
        domains.insert(Domain::FALLBACK);
        Ok(domains)
    }

    /// Set the generation model.
    pub fn with_generation_model(mut self, model: impl Into<String>) -> Self {
        self.generation_model = Some(model.into());
        self
    }

    /// Set the classification model.
    pub fn with_classification_model(mut self, model: impl Into<String>) -> Self {
        self.classification_model = Some(model.into());
        self
    }

    /// Enable exactly these providers (plus the fallback).
    pub fn with_enabled(mut self, domains: impl IntoIterator<Item = Domain>) -> Self {
        self.enabled_providers = domains.into_iter().map(|d| d.as_str().to_string()).collect();
        self
    }

    /// Set the label match mode.
    pub fn with_match_mode(mut self, match_mode: MatchMode) -> Self {
        self.match_mode = match_mode;
        self
    }

    /// Set the artifact directory.
    pub fn with_artifact_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.artifact_dir = dir.into();
        self
    }

    /// Expose providers as tools.
    pub fn with_providers_as_tools(mut self, expose: bool) -> Self {
        self.expose_providers_as_tools = expose;
        self
    }

    /// Set retrieval tunables.
    pub fn with_retrieval(mut self, retrieval: RetrievalConfig) -> Self {
        self.retrieval = retrieval;
        self
    }

    /// Set the classification timeout.
    pub fn with_classification_timeout(mut self, timeout: Duration) -> Self {
        self.classification_timeout_ms = duration_ms(timeout);
        self
    }

    /// Set the generation timeout.
    pub fn with_generation_timeout(mut self, timeout: Duration) -> Self {
        self.generation_timeout_ms = duration_ms(timeout);
        self
    }

    /// Set the tool invocation timeout.
    pub fn with_tool_timeout(mut self, timeout: Duration) -> Self {
        self.tool_timeout_ms = duration_ms(timeout);
        self
    }

    pub fn classification_timeout(&self) -> Duration {
        Duration::from_millis(self.classification_timeout_ms)
    }

    pub fn generation_timeout(&self) -> Duration {
        Duration::from_millis(self.generation_timeout_ms)
    }

    pub fn tool_timeout(&self) -> Duration {
        Duration::from_millis(self.tool_timeout_ms)
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// `<data dir>/conductor/tools`, or `.conductor/tools` when no data
/// directory is known.
pub fn default_artifact_dir() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join("conductor"))
        .unwrap_or_else(|| PathBuf::from(".conductor"))
        .join("tools")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults_enable_everything() {
        let config = OrchestratorConfig::default();
        config.validate().unwrap();
        assert_eq!(config.enabled_domains().unwrap().len(), Domain::ALL.len());
        assert_eq!(config.match_mode, MatchMode::Token);
        assert!(config.artifact_dir.ends_with("tools"));
    }

    #[test]
    fn test_from_toml() {
        let config = OrchestratorConfig::from_toml_str(
            r#"
            generation_model = "gpt-4o"
            classification_timeout_ms = 500
            enabled_providers = ["math", "memory"]
            match_mode = "substring"

            [retrieval]
            max_results = 2
            "#,
        )
        .unwrap();

        assert_eq!(config.generation_model.as_deref(), Some("gpt-4o"));
        assert_eq!(config.classification_timeout(), Duration::from_millis(500));
        assert_eq!(config.match_mode, MatchMode::Substring);
        assert_eq!(config.retrieval.max_results, 2);
        assert_eq!(config.retrieval.min_relevance, 0.3);
        assert_eq!(
            config.enabled_domains().unwrap(),
            BTreeSet::from([Domain::Math, Domain::Memory, Domain::General])
        );
    }

    #[test]
    fn test_unknown_label_is_rejected() {
        let err = OrchestratorConfig::from_toml_str(r#"enabled_providers = ["weather"]"#)
            .unwrap_err();
        assert!(matches!(err, OrchestratorError::UnknownLabel(label) if label == "weather"));
    }

    #[test]
    fn test_no_providers_is_fatal() {
        let err = OrchestratorConfig::from_toml_str("enabled_providers = []").unwrap_err();
        assert!(matches!(err, OrchestratorError::NoProviders));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_zero_timeout_is_rejected() {
        let err = OrchestratorConfig::from_toml_str("tool_timeout_ms = 0").unwrap_err();
        assert!(matches!(err, OrchestratorError::Config(_)));
    }

    #[test]
    fn test_load_from_file() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("conductor.toml");
        std::fs::write(&path, "expose_providers_as_tools = true\n").unwrap();

        let config = OrchestratorConfig::load(&path).unwrap();
        assert!(config.expose_providers_as_tools);
    }
}
