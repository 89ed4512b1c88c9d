//! Builtin capability providers, one per domain.

mod delegate;
mod directive;
mod math;
mod memory;
mod tools;

pub use delegate::ProviderTool;
pub use directive::{CODE_DIRECTIVE, DirectiveProvider, GENERAL_DIRECTIVE, LANGUAGE_DIRECTIVE};
pub use math::{MATH_DIRECTIVE, MathProvider};
pub use memory::{MemoryProvider, RETRIEVE, STORE, STORED_REPLY, action_labels};
pub use tools::ToolsProvider;
