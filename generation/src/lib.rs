//! # Generation
//!
//! This crate is the boundary between the orchestration core and whatever
//! model answers its prompts. The core only ever asks for one thing:
//!
//! ```text
//! generate(directive, prompt, context?) -> text
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Generation Capability                        │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  GenerationRequest ──► Generator ──► String                     │
//! │                           │                                     │
//! │                           ▼                                     │
//! │      OpenAIGenerator / TimedGenerator / ScriptedGenerator       │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod error;
pub mod mock;
pub mod provider;
pub mod request;
pub mod timeout;

pub use error::{GenerationError, Result};
pub use provider::{Generator, OpenAIGenerator};
pub use request::{GenerationRequest, Role, Turn};
pub use timeout::TimedGenerator;
