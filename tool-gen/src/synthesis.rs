//! Runtime tool synthesis.
//!
//! A natural-language description goes in; a validated, persisted, and
//! registered tool comes out. Each attempt walks a small state machine:
//!
//! ```text
//! Idle ──► Drafting ──► Validating ──► Registering ──► Available
//!              │             │               │
//!              └─────────────┴───────────────┴──────► Rejected
//! ```
//!
//! Nothing reaches the registry unless it passed validation, and the
//! registering step is serialized so two concurrent drafts never claim the
//! same name.

use std::sync::Arc;
use std::time::Duration;

use conductor_generation::{GenerationRequest, Generator};
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::artifact::{ToolArtifact, TextOp};
use crate::error::{Result, ToolError};
use crate::registry::{RegisterMode, ToolOrigin, ToolRegistry};
use crate::script::ALLOWED_INTERPRETERS;
use crate::spec::ToolSpec;
use crate::storage::{ArtifactRef, ArtifactStore};

/// Default limit for script handlers built from artifacts.
pub const DEFAULT_SCRIPT_TIMEOUT: Duration = Duration::from_secs(10);

/// Highest numeric suffix tried when a drafted name is taken.
const MAX_NAME_SUFFIX: u32 = 50;

/// Stage of a synthesis attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SynthesisState {
    Idle,
    Drafting,
    Validating,
    Registering,
    Available,
    Rejected,
}

impl SynthesisState {
    /// Whether `next` may follow this state.
    pub fn can_advance_to(self, next: SynthesisState) -> bool {
        use SynthesisState::*;
        matches!(
            (self, next),
            (Idle, Drafting)
                | (Drafting, Validating)
                | (Drafting, Rejected)
                | (Validating, Registering)
                | (Validating, Rejected)
                | (Registering, Available)
                | (Registering, Rejected)
        )
    }

    /// Move to `next`, refusing illegal transitions.
    pub fn advance(self, next: SynthesisState) -> Result<SynthesisState> {
        if self.can_advance_to(next) {
            Ok(next)
        } else {
            Err(ToolError::InvalidInput(format!(
                "illegal synthesis transition {self:?} -> {next:?}"
            )))
        }
    }

    /// Whether the attempt has finished.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Available | Self::Rejected)
    }
}

/// A tool that made it through synthesis.
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesizedTool {
    /// The registered contract.
    pub spec: ToolSpec,

    /// Where the artifact was persisted.
    pub artifact: ArtifactRef,

    /// The drafted name, when it had to be changed to stay unique.
    pub renamed_from: Option<String>,
}

/// Turns descriptions into registered tools.
pub struct ToolSynthesizer {
    generator: Arc<dyn Generator>,
    registry: Arc<ToolRegistry>,
    store: ArtifactStore,
    writer: Mutex<()>,
    script_timeout: Duration,
    model: Option<String>,
}

impl ToolSynthesizer {
    /// Create a synthesizer.
    pub fn new(
        generator: Arc<dyn Generator>,
        registry: Arc<ToolRegistry>,
        store: ArtifactStore,
    ) -> Self {
        Self {
            generator,
            registry,
            store,
            writer: Mutex::new(()),
            script_timeout: DEFAULT_SCRIPT_TIMEOUT,
            model: None,
        }
    }

    /// Set the timeout for script handlers.
    pub fn with_script_timeout(mut self, timeout: Duration) -> Self {
        self.script_timeout = timeout;
        self
    }

    /// Use a specific model for drafting.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// The registry tools are published to.
    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    /// The artifact store.
    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    /// Draft, validate, persist, and register a tool for `description`.
    pub async fn synthesize(&self, description: &str) -> Result<SynthesizedTool> {
        let description = description.trim();
        if description.is_empty() {
            return Err(ToolError::InvalidInput(
                "tool description is empty".to_string(),
            ));
        }

        let mut state = SynthesisState::Idle.advance(SynthesisState::Drafting)?;
        debug!("Synthesis {state:?}: {description}");

        let existing = self.registry.names().await;
        let mut request = GenerationRequest::new(drafting_directive(&existing), description)
            .with_temperature(0.0);
        if let Some(model) = &self.model {
            request = request.with_model(model);
        }

        let draft = match self.generator.generate(request).await {
            Ok(draft) => draft,
            Err(e) => {
                state = state.advance(SynthesisState::Rejected)?;
                warn!("Synthesis {state:?}: drafting failed: {e}");
                return Err(e.into());
            }
        };

        state = state.advance(SynthesisState::Validating)?;
        debug!("Synthesis {state:?}");
        let mut artifact = match ToolArtifact::parse(&draft).and_then(|a| a.validate().map(|()| a)) {
            Ok(artifact) => artifact,
            Err(e) => {
                state = state.advance(SynthesisState::Rejected)?;
                warn!("Synthesis {state:?}: {e}");
                return Err(ToolError::SynthesisRejected {
                    reason: e.to_string(),
                });
            }
        };

        state = state.advance(SynthesisState::Registering)?;
        let _writer = self.writer.lock().await;

        let drafted_name = artifact.name.clone();
        artifact.name = self.unique_name(&drafted_name).await?;
        let renamed_from = (artifact.name != drafted_name).then_some(drafted_name);

        let registered = async {
            let artifact_ref = self.store.persist(&artifact).await?;
            self.registry
                .register_with(
                    artifact.spec(),
                    artifact.build_handler(self.script_timeout),
                    RegisterMode::CreateOnly,
                    ToolOrigin::Synthesized {
                        version: artifact_ref.version,
                        digest: artifact_ref.digest.clone(),
                    },
                )
                .await?;
            Ok::<_, ToolError>(artifact_ref)
        }
        .await;

        match registered {
            Ok(artifact_ref) => {
                state = state.advance(SynthesisState::Available)?;
                info!(
                    "Synthesis {state:?}: {} v{}",
                    artifact.name, artifact_ref.version
                );
                Ok(SynthesizedTool {
                    spec: artifact.spec(),
                    artifact: artifact_ref,
                    renamed_from,
                })
            }
            Err(e) => {
                state = state.advance(SynthesisState::Rejected)?;
                warn!("Synthesis {state:?}: {e}");
                Err(e)
            }
        }
    }

    async fn unique_name(&self, name: &str) -> Result<String> {
        if !self.registry.contains(name).await {
            return Ok(name.to_string());
        }

        for n in 2..=MAX_NAME_SUFFIX {
            let candidate = format!("{name}_{n}");
            if !self.registry.contains(&candidate).await {
                return Ok(candidate);
            }
        }

        Err(ToolError::AlreadyExists(name.to_string()))
    }

    /// Register the latest valid version of every stored artifact.
    ///
    /// Invalid or corrupt artifacts are skipped with a warning.
    pub async fn load_persisted(&self) -> Result<Vec<String>> {
        let _writer = self.writer.lock().await;
        let mut loaded = Vec::new();

        for name in self.store.names().await? {
            match self.register_stored(&name).await {
                Ok(_) => loaded.push(name),
                Err(e) => warn!("Skipping stored tool {name}: {e}"),
            }
        }

        info!("Loaded {} persisted tools", loaded.len());
        Ok(loaded)
    }

    /// Re-register the latest stored version of one tool.
    pub async fn reload(&self, name: &str) -> Result<ToolSpec> {
        let _writer = self.writer.lock().await;
        self.register_stored(name).await
    }

    async fn register_stored(&self, name: &str) -> Result<ToolSpec> {
        let (artifact_ref, artifact) = self.store.load_latest(name).await?;
        artifact.validate()?;

        let spec = artifact.spec();
        self.registry
            .register_with(
                spec.clone(),
                artifact.build_handler(self.script_timeout),
                RegisterMode::ConfirmSchemaChange,
                ToolOrigin::Synthesized {
                    version: artifact_ref.version,
                    digest: artifact_ref.digest,
                },
            )
            .await?;
        Ok(spec)
    }
}

/// Instructions for the drafting step.
pub fn drafting_directive(existing_tools: &[String]) -> String {
    let ops = [
        TextOp::CharCount,
        TextOp::WordCount,
        TextOp::LineCount,
        TextOp::Uppercase,
        TextOp::Lowercase,
        TextOp::Reverse,
    ]
    .iter()
    .filter_map(|op| serde_json::to_value(op).ok())
    .filter_map(|v| v.as_str().map(str::to_string))
    .collect::<Vec<_>>()
    .join(", ");

    let taken = if existing_tools.is_empty() {
        "none".to_string()
    } else {
        existing_tools.join(", ")
    };

    format!(
        r#"You design small tools. Reply with a single JSON object and nothing else:

{{
  "name": "snake_case_name",
  "description": "One sentence saying what the tool does.",
  "input_schema": {{
    "properties": {{"param": {{"type": "string", "description": "..."}}}},
    "required": ["param"]
  }},
  "handler": <handler>
}}

<handler> is one of:
  {{"kind": "transform", "op": "<op>", "input": "<string param>"}}  where <op> is one of: {ops}
  {{"kind": "template", "template": "text with {{{{param}}}} placeholders"}}
  {{"kind": "script", "interpreter": "<interpreter>", "source": "..."}}  where <interpreter> is one of: {interpreters}

Rules:
- name is lowercase snake_case, 3 to 48 characters.
- Every required parameter is declared in properties.
- Prefer transform, then template. Use script only when neither fits.
- Scripts read arguments as JSON on stdin or from TOOL_ARG_<NAME> environment variables and print the result.
- Existing tool names (do not reuse): {taken}"#,
        interpreters = ALLOWED_INTERPRETERS.join(", "),
    )
}
