//! The orchestrator: classify, dispatch, and return text.
//!
//! One dispatch cycle runs its steps in order:
//!
//! ```text
//! snapshot table ─► classify(text, table.labels) ─► table.resolve(label)
//!                                                          │
//!                       text ◄── provider.invoke(request) ◄┘
//! ```
//!
//! Cycles for independent requests may run concurrently. Toggling a provider
//! swaps in a new dispatch table; a cycle keeps the table it started with.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, RwLock};

use conductor_generation::{Generator, TimedGenerator, Turn};
use conductor_retrieval::{InMemoryStore, MemoryStore};
use conductor_tool_gen::{
    ArtifactStore, RegisterMode, ToolOrigin, ToolRegistry, ToolSynthesizer,
    register_builtin_tools,
};
use serde::Serialize;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::chain::RetrievalChain;
use crate::classifier::Classifier;
use crate::config::OrchestratorConfig;
use crate::dispatch::DispatchTable;
use crate::error::{OrchestratorError, Result};
use crate::events::{EventSink, TerminalSink, TraceEvent, TracingSink};
use crate::label::Domain;
use crate::provider::{CapabilityProvider, InvocationContext, Request};
use crate::providers::{
    DirectiveProvider, MathProvider, MemoryProvider, ProviderTool, ToolsProvider,
};
use crate::toolsmith::{ToolBuilder, ToolRequestOutcome};

/// Result of one dispatch cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DispatchOutcome {
    /// The cycle's identifier, shared by all its trace events.
    pub cycle_id: Uuid,

    /// The domain whose provider answered.
    pub label: Domain,

    /// False when the classifier's reply matched no label.
    pub matched: bool,

    /// The provider's final text.
    pub text: String,
}

/// Routes requests to capability providers.
pub struct Orchestrator {
    config: OrchestratorConfig,
    classifier: Arc<Classifier>,
    available: BTreeMap<Domain, Arc<dyn CapabilityProvider>>,
    table: RwLock<Arc<DispatchTable>>,
    toggle: Mutex<()>,
    registry: Arc<ToolRegistry>,
    tool_builder: Arc<ToolBuilder>,
    sink: Arc<dyn EventSink>,
}

impl Orchestrator {
    /// Start building an orchestrator.
    pub fn builder(config: OrchestratorConfig, generator: Arc<dyn Generator>) -> OrchestratorBuilder {
        OrchestratorBuilder::new(config, generator)
    }

    /// The configuration this orchestrator was built with.
    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// The shared tool registry.
    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    /// The tool request entry point.
    pub fn tool_builder(&self) -> &Arc<ToolBuilder> {
        &self.tool_builder
    }

    /// Currently enabled domains in priority order.
    pub fn enabled_labels(&self) -> Vec<Domain> {
        self.table().domains()
    }

    fn table(&self) -> Arc<DispatchTable> {
        Arc::clone(&self.table.read().unwrap_or_else(|e| e.into_inner()))
    }

    /// Answer `text`, never failing; errors become a readable reply.
    pub async fn handle(&self, text: &str, history: Vec<Turn>) -> String {
        self.handle_request(Request::new(text).with_history(history))
            .await
    }

    /// Answer a request, never failing.
    pub async fn handle_request(&self, request: Request) -> String {
        self.handle_with_cancel(request, CancellationToken::new())
            .await
    }

    /// Answer a request unless `cancel` fires first.
    ///
    /// Cancellation drops the in-flight cycle, which aborts any pending
    /// generation call, HTTP request, or script process.
    pub async fn handle_with_cancel(&self, request: Request, cancel: CancellationToken) -> String {
        let cycle_id = Uuid::new_v4();
        let sink: Arc<dyn EventSink> = Arc::new(TerminalSink::new(Arc::clone(&self.sink)));

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                sink.emit(TraceEvent::Failed {
                    cycle_id,
                    label: None,
                    error: OrchestratorError::Cancelled.to_string(),
                });
                Err(OrchestratorError::Cancelled)
            }
            result = self.run_cycle(cycle_id, &request, Arc::clone(&sink)) => result,
        };

        match result {
            Ok(outcome) => outcome.text,
            Err(e) => {
                warn!("Cycle {cycle_id} failed: {e}");
                error_reply(&e)
            }
        }
    }

    /// Run one cycle, reporting every step to `sink`.
    pub async fn dispatch(
        &self,
        request: &Request,
        sink: Arc<dyn EventSink>,
    ) -> Result<DispatchOutcome> {
        self.run_cycle(Uuid::new_v4(), request, sink).await
    }

    async fn run_cycle(
        &self,
        cycle_id: Uuid,
        request: &Request,
        sink: Arc<dyn EventSink>,
    ) -> Result<DispatchOutcome> {
        let table = self.table();
        let ctx = InvocationContext::new(cycle_id, sink);
        ctx.emit(TraceEvent::CycleStarted {
            cycle_id,
            text: request.text.clone(),
        });

        let classification = match self.classifier.classify(&request.text, table.labels()).await {
            Ok(classification) => classification,
            Err(e) => {
                ctx.emit(TraceEvent::Failed {
                    cycle_id,
                    label: None,
                    error: e.to_string(),
                });
                return Err(e.into());
            }
        };
        ctx.emit(TraceEvent::Classified {
            cycle_id,
            label: classification.label.clone(),
            matched: classification.matched,
        });

        let (label, provider) = table.resolve(&classification.label);
        debug!("Cycle {cycle_id} dispatched to {label}");
        ctx.emit(TraceEvent::ProviderStarted {
            cycle_id,
            label: label.to_string(),
        });

        match provider.invoke(request, &ctx).await {
            Ok(text) => {
                ctx.emit(TraceEvent::Completed {
                    cycle_id,
                    label: label.to_string(),
                    text: text.clone(),
                });
                Ok(DispatchOutcome {
                    cycle_id,
                    label,
                    matched: classification.matched,
                    text,
                })
            }
            Err(e) => {
                ctx.emit(TraceEvent::Failed {
                    cycle_id,
                    label: Some(label.to_string()),
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }

    /// Find or create a tool for `description`.
    pub async fn request_tool(&self, description: &str) -> Result<ToolRequestOutcome> {
        self.tool_builder.request_tool(description).await
    }

    /// Enable or disable a provider.
    ///
    /// The new table is swapped in whole; the fallback cannot be disabled.
    pub async fn set_enabled(&self, domain: Domain, enabled: bool) -> Result<()> {
        if domain.is_fallback() && !enabled {
            return Err(OrchestratorError::Config(format!(
                "the fallback provider {domain} cannot be disabled"
            )));
        }
        if !self.available.contains_key(&domain) {
            return Err(OrchestratorError::Config(format!(
                "no provider is available for {domain}"
            )));
        }

        let _toggle = self.toggle.lock().await;
        let mut domains: BTreeSet<Domain> = self.table().domains().into_iter().collect();
        if enabled {
            domains.insert(domain);
        } else {
            domains.remove(&domain);
        }

        let table = Arc::new(DispatchTable::build(&self.available, &domains)?);
        *self.table.write().unwrap_or_else(|e| e.into_inner()) = Arc::clone(&table);
        info!(
            "Provider {domain} {}",
            if enabled { "enabled" } else { "disabled" }
        );

        if self.config.expose_providers_as_tools {
            sync_provider_tools(&self.registry, &self.available, &table).await?;
        }
        Ok(())
    }
}

/// Register an `ask_<label>` tool for every enabled specialist that can be
/// exposed and remove those of disabled ones.
async fn sync_provider_tools(
    registry: &ToolRegistry,
    available: &BTreeMap<Domain, Arc<dyn CapabilityProvider>>,
    table: &DispatchTable,
) -> Result<()> {
    for (domain, provider) in available {
        if !ProviderTool::exposes(*domain) {
            continue;
        }

        let name = ProviderTool::tool_name(*domain);
        let registered = registry.contains(&name).await;
        if table.contains(*domain) && !registered {
            let tool = ProviderTool::new(Arc::clone(provider));
            registry
                .register_with(
                    tool.spec(),
                    Arc::new(tool),
                    RegisterMode::Upsert,
                    ToolOrigin::Provider,
                )
                .await?;
        } else if !table.contains(*domain) && registered {
            registry.unregister(&name).await?;
        }
    }
    Ok(())
}

fn error_reply(error: &OrchestratorError) -> String {
    match error {
        OrchestratorError::Cancelled => "The request was cancelled.".to_string(),
        other => format!("Sorry, I couldn't complete that request: {other}"),
    }
}

/// Builder for [`Orchestrator`].
pub struct OrchestratorBuilder {
    config: OrchestratorConfig,
    generator: Arc<dyn Generator>,
    store: Option<Arc<dyn MemoryStore>>,
    registry: Option<Arc<ToolRegistry>>,
    sink: Arc<dyn EventSink>,
    providers: Vec<Arc<dyn CapabilityProvider>>,
}

impl OrchestratorBuilder {
    pub fn new(config: OrchestratorConfig, generator: Arc<dyn Generator>) -> Self {
        Self {
            config,
            generator,
            store: None,
            registry: None,
            sink: Arc::new(TracingSink),
            providers: Vec::new(),
        }
    }

    /// Use an external memory store instead of an in-process one.
    pub fn with_store(mut self, store: Arc<dyn MemoryStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Share an existing tool registry.
    pub fn with_registry(mut self, registry: Arc<ToolRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Where terminal events of `handle` calls are reported.
    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Replace the builtin provider for the provider's domain.
    pub fn with_provider(mut self, provider: Arc<dyn CapabilityProvider>) -> Self {
        self.providers.push(provider);
        self
    }

    /// Build the orchestrator, loading persisted tools.
    pub async fn build(self) -> Result<Orchestrator> {
        let config = self.config;
        config.validate()?;

        let generator: Arc<dyn Generator> =
            Arc::new(TimedGenerator::new(self.generator, config.generation_timeout()));
        let classifier = Arc::new(
            Classifier::new(Arc::clone(&generator))
                .with_model(config.classification_model.clone())
                .with_timeout(config.classification_timeout())
                .with_match_mode(config.match_mode),
        );

        let registry = self.registry.unwrap_or_else(|| {
            Arc::new(ToolRegistry::new().with_invoke_timeout(config.tool_timeout()))
        });
        register_builtin_tools(&registry).await?;

        let artifacts = ArtifactStore::new(&config.artifact_dir).await?;
        let mut synthesizer =
            ToolSynthesizer::new(Arc::clone(&generator), Arc::clone(&registry), artifacts);
        if let Some(model) = &config.generation_model {
            synthesizer = synthesizer.with_model(model);
        }
        if let Err(e) = synthesizer.load_persisted().await {
            warn!("Could not load persisted tools: {e}");
        }
        let tool_builder = Arc::new(ToolBuilder::new(
            Arc::new(synthesizer),
            Arc::clone(&classifier),
        ));

        let store = self
            .store
            .unwrap_or_else(|| Arc::new(InMemoryStore::new()));
        let model = config.generation_model.clone();
        let chain = RetrievalChain::new(
            Arc::clone(&store),
            Arc::clone(&generator),
            config.retrieval.clone(),
        )
        .with_model(model.clone());

        let builtin: [Arc<dyn CapabilityProvider>; 6] = [
            Arc::new(
                MathProvider::new(Arc::clone(&registry), Arc::clone(&generator))
                    .with_model(model.clone()),
            ),
            Arc::new(DirectiveProvider::language(Arc::clone(&generator)).with_model(model.clone())),
            Arc::new(DirectiveProvider::code(Arc::clone(&generator)).with_model(model.clone())),
            Arc::new(MemoryProvider::new(Arc::clone(&classifier), store, chain)),
            Arc::new(
                ToolsProvider::new(Arc::clone(&tool_builder), Arc::clone(&generator))
                    .with_model(model.clone()),
            ),
            Arc::new(DirectiveProvider::general(Arc::clone(&generator)).with_model(model)),
        ];
        let available: BTreeMap<Domain, Arc<dyn CapabilityProvider>> = builtin
            .into_iter()
            .chain(self.providers)
            .map(|provider| (provider.domain(), provider))
            .collect();

        let table = Arc::new(DispatchTable::build(&available, &config.enabled_domains()?)?);
        if config.expose_providers_as_tools {
            sync_provider_tools(&registry, &available, &table).await?;
        }
        info!(
            "Orchestrator ready with providers: {}",
            table
                .domains()
                .iter()
                .map(|d| d.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );

        Ok(Orchestrator {
            config,
            classifier,
            available,
            table: RwLock::new(table),
            toggle: Mutex::new(()),
            registry,
            tool_builder,
            sink: self.sink,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::CollectingSink;
    use conductor_generation::mock::ScriptedGenerator;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn config(temp_dir: &TempDir) -> OrchestratorConfig {
        OrchestratorConfig::default().with_artifact_dir(temp_dir.path())
    }

    #[tokio::test]
    async fn test_dispatch_reports_every_step() {
        let temp_dir = TempDir::new().unwrap();
        let generator = ScriptedGenerator::new()
            .with_response("language")
            .with_response("Hola");
        let orchestrator = Orchestrator::builder(config(&temp_dir), Arc::new(generator))
            .build()
            .await
            .unwrap();
        let sink = CollectingSink::new();

        let outcome = orchestrator
            .dispatch(&Request::new("Translate 'Hello' to Spanish"), Arc::new(sink.clone()))
            .await
            .unwrap();

        assert_eq!(outcome.label, Domain::Language);
        assert!(outcome.matched);
        let kinds: Vec<&str> = sink
            .events()
            .iter()
            .map(|e| match e {
                TraceEvent::CycleStarted { .. } => "started",
                TraceEvent::Classified { .. } => "classified",
                TraceEvent::ProviderStarted { .. } => "provider",
                TraceEvent::Completed { .. } => "completed",
                _ => "other",
            })
            .collect();
        assert_eq!(kinds, vec!["started", "classified", "provider", "completed"]);
        assert!(sink.events().iter().all(|e| e.cycle_id() == outcome.cycle_id));
    }

    #[tokio::test]
    async fn test_handle_sink_sees_only_terminal_events() {
        let temp_dir = TempDir::new().unwrap();
        let generator = ScriptedGenerator::new()
            .with_response("general")
            .with_response("Hi there.");
        let sink = CollectingSink::new();
        let orchestrator = Orchestrator::builder(config(&temp_dir), Arc::new(generator))
            .with_sink(Arc::new(sink.clone()))
            .build()
            .await
            .unwrap();

        let text = orchestrator.handle("hello", Vec::new()).await;
        assert_eq!(text, "Hi there.");
        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], TraceEvent::Completed { label, .. } if label == "general"));
    }

    #[tokio::test]
    async fn test_classification_failure_becomes_reply() {
        let temp_dir = TempDir::new().unwrap();
        let generator = ScriptedGenerator::new().with_error("rate limited");
        let orchestrator = Orchestrator::builder(config(&temp_dir), Arc::new(generator))
            .build()
            .await
            .unwrap();

        let text = orchestrator.handle("hello", Vec::new()).await;
        assert!(text.starts_with("Sorry, I couldn't complete that request"));
    }

    #[tokio::test]
    async fn test_fallback_cannot_be_disabled() {
        let temp_dir = TempDir::new().unwrap();
        let orchestrator =
            Orchestrator::builder(config(&temp_dir), Arc::new(ScriptedGenerator::new()))
                .build()
                .await
                .unwrap();

        let result = orchestrator.set_enabled(Domain::General, false).await;
        assert!(matches!(result, Err(OrchestratorError::Config(_))));
        assert_eq!(orchestrator.enabled_labels().len(), Domain::ALL.len());
    }

    #[tokio::test]
    async fn test_toggle_updates_provider_tools() {
        let temp_dir = TempDir::new().unwrap();
        let orchestrator = Orchestrator::builder(
            config(&temp_dir).with_providers_as_tools(true),
            Arc::new(ScriptedGenerator::new()),
        )
        .build()
        .await
        .unwrap();
        let registry = orchestrator.registry();
        assert!(registry.contains("ask_math").await);
        assert!(registry.contains("ask_language").await);
        assert!(!registry.contains("ask_general").await);
        assert!(!registry.contains("ask_memory").await);
        assert!(!registry.contains("ask_tools").await);

        orchestrator.set_enabled(Domain::Memory, false).await.unwrap();
        orchestrator.set_enabled(Domain::Memory, true).await.unwrap();
        assert!(!registry.contains("ask_memory").await);

        orchestrator.set_enabled(Domain::Math, false).await.unwrap();
        assert!(!registry.contains("ask_math").await);
        assert!(!orchestrator.enabled_labels().contains(&Domain::Math));

        orchestrator.set_enabled(Domain::Math, true).await.unwrap();
        assert!(registry.contains("ask_math").await);
    }

    #[tokio::test]
    async fn test_cancelled_request_returns_notice() {
        let temp_dir = TempDir::new().unwrap();
        let generator = ScriptedGenerator::new()
            .with_delay(std::time::Duration::from_secs(30))
            .with_default_response("general");
        let orchestrator = Orchestrator::builder(config(&temp_dir), Arc::new(generator))
            .build()
            .await
            .unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let text = orchestrator
            .handle_with_cancel(Request::new("hello"), cancel)
            .await;
        assert_eq!(text, "The request was cancelled.");
    }

    #[tokio::test]
    async fn test_no_providers_is_rejected_at_build() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = config(&temp_dir);
        config.enabled_providers.clear();

        let result = Orchestrator::builder(config, Arc::new(ScriptedGenerator::new()))
            .build()
            .await;
        assert!(matches!(result, Err(OrchestratorError::NoProviders)));
    }
}
