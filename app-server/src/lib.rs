//! Stdio host for the orchestrator.
//!
//! Reads one JSON request per line and writes one JSON response per line.
//! Methods: `handle`, `request_tool`, `set_provider`, `list_tools`, `reset`.

pub mod handler;
pub mod message;
pub mod processor;

pub use handler::ConversationHandler;
pub use message::{ClientRequest, ErrorBody, ErrorCode, ServerResponse};
pub use processor::MessageProcessor;
