//! Configuration for retrieval calls.

use serde::{Deserialize, Serialize};

/// Tunables for the retrieve path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Minimum relevance score (0.0 to 1.0).
    pub min_relevance: f32,

    /// Maximum number of results to return.
    pub max_results: usize,
}

impl RetrievalConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the relevance threshold.
    pub fn with_min_relevance(mut self, min_relevance: f32) -> Self {
        self.min_relevance = min_relevance.clamp(0.0, 1.0);
        self
    }

    /// Set the result cap.
    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            min_relevance: 0.3,
            max_results: 5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_threshold_is_clamped() {
        let config = RetrievalConfig::new().with_min_relevance(1.7);
        assert_eq!(config.min_relevance, 1.0);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: RetrievalConfig = serde_json::from_str(r#"{"max_results": 2}"#).unwrap();
        assert_eq!(config.max_results, 2);
        assert_eq!(config.min_relevance, 0.3);
    }
}
