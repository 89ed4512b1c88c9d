//! # Retrieval
//!
//! This crate defines the memory capabilities the orchestration core calls
//! through but does not own:
//!
//! - **Retrieval**: semantic search over stored records
//! - **Store**: persist a fact for later retrieval
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Memory Capabilities                          │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  SearchQuery ──► MemoryStore::search ──► Vec<MemoryRecord>      │
//! │  content     ──► MemoryStore::store  ──► StoreAck               │
//! │                         │                                       │
//! │                         ▼                                       │
//! │                  InMemoryStore (reference, optional file)       │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use conductor_retrieval::{InMemoryStore, MemoryStore, SearchQuery};
//!
//! let store = InMemoryStore::new();
//! store.store("My name is J", Some("user-1"), None).await?;
//!
//! let hits = store
//!     .search(&SearchQuery::new("what is my name").with_owner("user-1"))
//!     .await?;
//! ```

pub mod config;
pub mod error;
pub mod memory;
pub mod record;
pub mod store;

pub use config::RetrievalConfig;
pub use error::{Result, RetrievalError};
pub use memory::InMemoryStore;
pub use record::{MemoryRecord, Metadata, StoreAck};
pub use store::{MemoryStore, SearchQuery};
