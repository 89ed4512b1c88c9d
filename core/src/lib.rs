//! # Orchestration Core
//!
//! Classifies a natural-language request, dispatches it to exactly one
//! capability provider, and returns the provider's text. Providers may
//! call registry tools, chain a retrieval step before generation, or
//! synthesize new tools at runtime.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        Orchestrator                             │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  Request ──► Classifier ──► DispatchTable ──► CapabilityProvider│
//! │                                                    │            │
//! │        ┌──────────────┬──────────────┬─────────────┤            │
//! │        ▼              ▼              ▼             ▼            │
//! │   ToolRegistry  RetrievalChain  ToolBuilder    Generator        │
//! │                                                                 │
//! │  EventSink ◄── CycleStarted … Completed / Failed                │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod chain;
pub mod classifier;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod events;
pub mod label;
pub mod orchestrator;
pub mod provider;
pub mod providers;
pub mod toolsmith;

pub use chain::{NO_MATCH_CONTEXT, NOT_FOUND_ANSWER, RetrievalChain};
pub use classifier::{Classification, Classifier, MatchMode};
pub use config::OrchestratorConfig;
pub use dispatch::DispatchTable;
pub use error::{OrchestratorError, Result};
pub use events::{CollectingSink, EventSink, NoopSink, TerminalSink, TraceEvent, TracingSink};
pub use label::{Domain, LabelEntry, LabelSet};
pub use orchestrator::{DispatchOutcome, Orchestrator, OrchestratorBuilder};
pub use provider::{CapabilityProvider, InvocationContext, ProviderDescriptor, Request};
pub use toolsmith::{CREATE_NEW, ToolBuilder, ToolRequestOutcome};
