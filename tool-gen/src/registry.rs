//! Tool registry for runtime tool management.
//!
//! The `ToolRegistry` is the single shared catalog of invocable tools. It
//! maps each unique name to a spec and a handler, validates arguments
//! before dispatch, and never holds its lock while a handler runs.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::error::{Result, ToolError};
use crate::handler::{ToolHandler, ToolOutput};
use crate::spec::ToolSpec;

/// Default limit on a single invocation.
pub const DEFAULT_INVOKE_TIMEOUT: Duration = Duration::from_secs(30);

/// How to treat a name that is already registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RegisterMode {
    /// Replace the handler, keeping the input schema unchanged.
    #[default]
    Upsert,

    /// Fail if the name is taken.
    CreateOnly,

    /// Replace the entry even if the input schema changes.
    ConfirmSchemaChange,
}

/// Where a registered tool came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ToolOrigin {
    /// Compiled into the program.
    Builtin,

    /// Produced by the synthesis pipeline.
    Synthesized { version: u32, digest: String },

    /// A capability provider exposed as a tool.
    Provider,
}

struct RegisteredTool {
    spec: ToolSpec,
    handler: Arc<dyn ToolHandler>,
    origin: ToolOrigin,
    revision: u64,
    registered_at: DateTime<Utc>,
    usage_count: AtomicU64,
}

/// Snapshot of a registry entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInfo {
    /// The advertised contract.
    pub spec: ToolSpec,

    /// Where the tool came from.
    pub origin: ToolOrigin,

    /// Incremented on each re-registration under the same name.
    pub revision: u64,

    /// When the current revision was registered.
    pub registered_at: DateTime<Utc>,

    /// Number of dispatched invocations.
    pub usage_count: u64,
}

/// Runtime registry for available tools.
pub struct ToolRegistry {
    tools: RwLock<HashMap<String, Arc<RegisteredTool>>>,
    invoke_timeout: Duration,
}

impl ToolRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            tools: RwLock::new(HashMap::new()),
            invoke_timeout: DEFAULT_INVOKE_TIMEOUT,
        }
    }

    /// Set the per-invocation timeout.
    pub fn with_invoke_timeout(mut self, timeout: Duration) -> Self {
        self.invoke_timeout = timeout;
        self
    }

    /// Register a builtin tool, replacing any same-schema entry.
    pub async fn register(&self, spec: ToolSpec, handler: Arc<dyn ToolHandler>) -> Result<u64> {
        self.register_with(spec, handler, RegisterMode::Upsert, ToolOrigin::Builtin)
            .await
    }

    /// Register a tool, returning its revision.
    pub async fn register_with(
        &self,
        spec: ToolSpec,
        handler: Arc<dyn ToolHandler>,
        mode: RegisterMode,
        origin: ToolOrigin,
    ) -> Result<u64> {
        spec.validate()?;
        handler
            .check_schema(&spec.input_schema)
            .map_err(|reason| {
                ToolError::InvalidDefinition(format!(
                    "handler for {} does not fit its schema: {reason}",
                    spec.name
                ))
            })?;

        let name = spec.name.clone();
        let mut tools = self.tools.write().await;

        let revision = match (tools.get(&name), mode) {
            (Some(_), RegisterMode::CreateOnly) => {
                return Err(ToolError::AlreadyExists(name));
            }
            (Some(existing), RegisterMode::Upsert)
                if !existing.spec.input_schema.same_contract(&spec.input_schema) =>
            {
                return Err(ToolError::SchemaDrift { name });
            }
            (Some(existing), _) => existing.revision + 1,
            (None, _) => 1,
        };

        tools.insert(
            name.clone(),
            Arc::new(RegisteredTool {
                spec,
                handler,
                origin,
                revision,
                registered_at: Utc::now(),
                usage_count: AtomicU64::new(0),
            }),
        );

        info!("Registered tool: {name} (revision {revision})");
        Ok(revision)
    }

    /// Remove a tool, returning its spec.
    pub async fn unregister(&self, name: &str) -> Result<ToolSpec> {
        let removed = self
            .tools
            .write()
            .await
            .remove(name)
            .ok_or_else(|| ToolError::NotFound(name.to_string()))?;

        debug!("Unregistered tool: {name}");
        Ok(removed.spec.clone())
    }

    /// Get a tool's handler.
    pub async fn get(&self, name: &str) -> Option<Arc<dyn ToolHandler>> {
        self.tools
            .read()
            .await
            .get(name)
            .map(|t| Arc::clone(&t.handler))
    }

    /// Get a tool's spec.
    pub async fn spec(&self, name: &str) -> Option<ToolSpec> {
        self.tools.read().await.get(name).map(|t| t.spec.clone())
    }

    /// Get a snapshot of a tool's entry.
    pub async fn info(&self, name: &str) -> Option<ToolInfo> {
        self.tools.read().await.get(name).map(|t| snapshot(t))
    }

    /// Whether a tool with this name is registered.
    pub async fn contains(&self, name: &str) -> bool {
        self.tools.read().await.contains_key(name)
    }

    /// All specs, ordered by name.
    pub async fn list(&self) -> Vec<ToolSpec> {
        let mut specs: Vec<ToolSpec> = self
            .tools
            .read()
            .await
            .values()
            .map(|t| t.spec.clone())
            .collect();
        specs.sort_by(|a, b| a.name.cmp(&b.name));
        specs
    }

    /// All entry snapshots, ordered by name.
    pub async fn list_info(&self) -> Vec<ToolInfo> {
        let mut infos: Vec<ToolInfo> = self.tools.read().await.values().map(|t| snapshot(t)).collect();
        infos.sort_by(|a, b| a.spec.name.cmp(&b.spec.name));
        infos
    }

    /// All registered names, ordered.
    pub async fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.read().await.keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of registered tools.
    pub async fn len(&self) -> usize {
        self.tools.read().await.len()
    }

    /// Whether no tools are registered.
    pub async fn is_empty(&self) -> bool {
        self.tools.read().await.is_empty()
    }

    /// Find a tool whose description matches `description` after
    /// normalizing case, whitespace, and trailing punctuation.
    pub async fn find_by_description(&self, description: &str) -> Option<ToolSpec> {
        let wanted = normalize_description(description);
        if wanted.is_empty() {
            return None;
        }

        let tools = self.tools.read().await;
        let mut matches: Vec<&ToolSpec> = tools
            .values()
            .map(|t| &t.spec)
            .filter(|s| normalize_description(&s.description) == wanted)
            .collect();
        matches.sort_by(|a, b| a.name.cmp(&b.name));
        matches.first().map(|s| (*s).clone())
    }

    /// Search tools by name or description.
    pub async fn search(&self, query: &str) -> Vec<ToolSpec> {
        let query = query.to_lowercase();
        let mut found: Vec<ToolSpec> = self
            .tools
            .read()
            .await
            .values()
            .filter(|t| {
                t.spec.name.to_lowercase().contains(&query)
                    || t.spec.description.to_lowercase().contains(&query)
            })
            .map(|t| t.spec.clone())
            .collect();
        found.sort_by(|a, b| a.name.cmp(&b.name));
        found
    }

    /// Validate arguments and run a tool.
    ///
    /// Unknown tools and invalid arguments are errors. Failures inside the
    /// handler, including timeouts, come back as an error-status output.
    pub async fn invoke(&self, name: &str, args: Value) -> Result<ToolOutput> {
        let tool = self
            .tools
            .read()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| ToolError::NotFound(name.to_string()))?;

        let args = match args {
            Value::Object(map) => map,
            Value::Null => serde_json::Map::new(),
            _ => {
                return Err(ToolError::InvalidInput(
                    "tool arguments must be a JSON object".to_string(),
                ));
            }
        };
        tool.spec.validate_args(&args)?;

        tool.usage_count.fetch_add(1, Ordering::Relaxed);
        debug!("Invoking tool: {name}");

        match tokio::time::timeout(self.invoke_timeout, tool.handler.call(&args)).await {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(e)) => {
                warn!("Tool {name} failed: {e}");
                Ok(ToolOutput::error(e.to_string()))
            }
            Err(_) => {
                let ms = self.invoke_timeout.as_millis();
                warn!("Tool {name} timed out after {ms}ms");
                Ok(ToolOutput::error(format!("tool {name} timed out after {ms}ms")))
            }
        }
    }

    /// Get statistics about the registry.
    pub async fn stats(&self) -> RegistryStats {
        let tools = self.tools.read().await;
        let mut stats = RegistryStats {
            total_tools: tools.len(),
            ..Default::default()
        };

        for tool in tools.values() {
            match tool.origin {
                ToolOrigin::Builtin => stats.builtin += 1,
                ToolOrigin::Synthesized { .. } => stats.synthesized += 1,
                ToolOrigin::Provider => stats.providers += 1,
            }
            stats.total_invocations += tool.usage_count.load(Ordering::Relaxed);
        }

        stats
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Statistics about the tool registry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RegistryStats {
    /// Total number of tools.
    pub total_tools: usize,

    /// Builtin tools.
    pub builtin: usize,

    /// Synthesized tools.
    pub synthesized: usize,

    /// Providers exposed as tools.
    pub providers: usize,

    /// Invocations dispatched across all tools.
    pub total_invocations: u64,
}

fn snapshot(tool: &RegisteredTool) -> ToolInfo {
    ToolInfo {
        spec: tool.spec.clone(),
        origin: tool.origin.clone(),
        revision: tool.revision,
        registered_at: tool.registered_at,
        usage_count: tool.usage_count.load(Ordering::Relaxed),
    }
}

/// Lowercase, collapse whitespace, and drop trailing punctuation.
pub fn normalize_description(description: &str) -> String {
    description
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim_end_matches(|c: char| c.is_ascii_punctuation())
        .to_lowercase()
}
