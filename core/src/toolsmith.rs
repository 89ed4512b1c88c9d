//! The tool request entry point.
//!
//! Before drafting anything, `ToolBuilder` checks whether a registered tool
//! already does what was asked:
//!
//! 1. a tool whose description matches exactly (after normalization)
//! 2. otherwise, a classification over the registered tool names with
//!    `create_new` as the fallback
//!
//! Only when both say no is a new tool synthesized.

use std::sync::Arc;

use conductor_tool_gen::{ToolRegistry, ToolSpec, ToolSynthesizer};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::classifier::Classifier;
use crate::error::{OrchestratorError, Result};
use crate::label::LabelSet;

/// Fallback label meaning "no existing tool fits".
pub const CREATE_NEW: &str = "create_new";

/// Result of a tool request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolRequestOutcome {
    /// Whether a new tool was synthesized.
    pub created: bool,

    /// The tool that satisfies the request.
    pub tool_name: String,

    /// One line describing what happened.
    pub summary: String,
}

/// Finds or creates a tool for a description.
pub struct ToolBuilder {
    synthesizer: Arc<ToolSynthesizer>,
    classifier: Arc<Classifier>,
}

impl ToolBuilder {
    pub fn new(synthesizer: Arc<ToolSynthesizer>, classifier: Arc<Classifier>) -> Self {
        Self {
            synthesizer,
            classifier,
        }
    }

    /// The registry tools are looked up in and published to.
    pub fn registry(&self) -> &Arc<ToolRegistry> {
        self.synthesizer.registry()
    }

    /// Find an existing tool for `description`, without synthesizing.
    pub async fn find_existing(&self, description: &str) -> Result<Option<ToolSpec>> {
        let registry = self.registry();

        if let Some(spec) = registry.find_by_description(description).await {
            return Ok(Some(spec));
        }

        let tools = registry.list().await;
        if tools.is_empty() {
            return Ok(None);
        }

        let labels = tools.iter().fold(
            LabelSet::new(CREATE_NEW, "no listed tool fits; a new tool is needed"),
            |set, spec| set.with_label(&spec.name, &spec.description),
        );
        let classification = self.classifier.classify(description, &labels).await?;
        if classification.label == CREATE_NEW {
            return Ok(None);
        }

        Ok(tools.into_iter().find(|s| s.name == classification.label))
    }

    /// Return an existing tool for `description`, or synthesize one.
    pub async fn request_tool(&self, description: &str) -> Result<ToolRequestOutcome> {
        let description = description.trim();
        if description.is_empty() {
            return Err(OrchestratorError::Config(
                "tool description must not be empty".to_string(),
            ));
        }

        if let Some(spec) = self.find_existing(description).await? {
            info!("Reusing tool {} for {description:?}", spec.name);
            return Ok(ToolRequestOutcome {
                created: false,
                summary: format!("Using existing tool {}: {}", spec.name, spec.description),
                tool_name: spec.name,
            });
        }

        let tool = self.synthesizer.synthesize(description).await?;
        let summary = match &tool.renamed_from {
            Some(drafted) => format!(
                "Created tool {} (renamed from {drafted}): {}",
                tool.spec.name, tool.spec.description
            ),
            None => format!("Created tool {}: {}", tool.spec.name, tool.spec.description),
        };

        Ok(ToolRequestOutcome {
            created: true,
            tool_name: tool.spec.name,
            summary,
        })
    }
}
