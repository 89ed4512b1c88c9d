//! The memory capability trait.

use async_trait::async_trait;

use crate::config::RetrievalConfig;
use crate::error::Result;
use crate::record::{MemoryRecord, Metadata, StoreAck};

/// Parameters of a retrieval call.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery {
    /// Natural-language query.
    pub query: String,

    /// Restrict results to one owner.
    pub owner_id: Option<String>,

    /// Drop results scoring below this.
    pub min_relevance: f32,

    /// Return at most this many results.
    pub max_results: usize,
}

impl SearchQuery {
    /// Create a query with the default threshold and cap.
    pub fn new(query: impl Into<String>) -> Self {
        let defaults = RetrievalConfig::default();
        Self {
            query: query.into(),
            owner_id: None,
            min_relevance: defaults.min_relevance,
            max_results: defaults.max_results,
        }
    }

    /// Restrict to one owner.
    pub fn with_owner(mut self, owner_id: impl Into<String>) -> Self {
        self.owner_id = Some(owner_id.into());
        self
    }

    /// Apply a threshold and cap from configuration.
    pub fn with_config(mut self, config: &RetrievalConfig) -> Self {
        self.min_relevance = config.min_relevance;
        self.max_results = config.max_results;
        self
    }
}

/// External retrieval and store capability.
///
/// Implementations return records sorted by descending relevance, all at or
/// above `min_relevance`, and never more than `max_results`.
#[async_trait]
pub trait MemoryStore: Send + Sync {
    /// Search stored records.
    async fn search(&self, query: &SearchQuery) -> Result<Vec<MemoryRecord>>;

    /// Store a new record.
    async fn store(
        &self,
        content: &str,
        owner_id: Option<&str>,
        metadata: Option<Metadata>,
    ) -> Result<StoreAck>;
}
