//! # Tool Registry and Synthesis
//!
//! This crate owns every invocable tool in the system. It provides:
//!
//! - **Registry**: one shared catalog mapping unique names to specs and handlers
//! - **Builtins**: calculator, equation solver, and HTTP fetch
//! - **Synthesis**: turn a description into a validated, registered tool
//! - **Artifacts**: versioned on-disk storage for synthesized tools
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      Tool Subsystem                             │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  description ──► ToolSynthesizer ──► ToolArtifact              │
//! │                        │                  │                     │
//! │                        ▼                  ▼                     │
//! │                  ToolRegistry ◄──── ArtifactStore               │
//! │                        │                                        │
//! │                        ▼                                        │
//! │                invoke(name, args) ──► ToolOutput                │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod artifact;
pub mod builtins;
pub mod error;
pub mod handler;
pub mod math;
pub mod registry;
pub mod script;
pub mod spec;
pub mod storage;
pub mod synthesis;

pub use artifact::{HandlerBody, TextOp, ToolArtifact};
pub use builtins::{Calculator, EquationSolver, HttpGet, register_builtin_tools};
pub use error::{Result, StorageError, ToolError};
pub use handler::{Args, ToolHandler, ToolOutput, ToolStatus, handler_fn};
pub use registry::{RegisterMode, RegistryStats, ToolInfo, ToolOrigin, ToolRegistry};
pub use spec::{DataType, InputSchema, ParameterSpec, ToolSpec};
pub use storage::{ArtifactRef, ArtifactStore};
pub use synthesis::{SynthesisState, SynthesizedTool, ToolSynthesizer};
