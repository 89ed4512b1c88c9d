//! Retrieval-then-generation chain.
//!
//! ```text
//! request ──► search(query, owner, min_relevance, max_results)
//!                  │
//!                  ▼
//!          facts (possibly none) ──► generate(answer directive, request, facts)
//! ```
//!
//! Retrieval must finish before generation starts. An unreachable store or
//! an empty result set still yields an answer.

use std::sync::Arc;

use conductor_generation::{GenerationRequest, Generator};
use conductor_retrieval::{MemoryRecord, MemoryStore, RetrievalConfig, SearchQuery};
use tracing::{debug, warn};

use crate::error::Result;
use crate::events::TraceEvent;
use crate::provider::{InvocationContext, Request};

/// Context line passed to the answer step when nothing was found.
pub const NO_MATCH_CONTEXT: &str = "No matching information found.";

/// Answer returned when nothing was found and the answer step failed.
pub const NOT_FOUND_ANSWER: &str = "I couldn't find any matching information about that.";

const ANSWER_DIRECTIVE: &str = "Answer the user's question using only the facts provided in \
the context. If the context says no matching information was found, or the facts do not \
answer the question, say plainly that you don't have that information. Do not guess.";

/// Searches stored records and answers from what it finds.
pub struct RetrievalChain {
    store: Arc<dyn MemoryStore>,
    generator: Arc<dyn Generator>,
    config: RetrievalConfig,
    model: Option<String>,
}

impl RetrievalChain {
    pub fn new(
        store: Arc<dyn MemoryStore>,
        generator: Arc<dyn Generator>,
        config: RetrievalConfig,
    ) -> Self {
        Self {
            store,
            generator,
            config,
            model: None,
        }
    }

    pub fn with_model(mut self, model: Option<String>) -> Self {
        self.model = model;
        self
    }

    /// Run both steps for `request`.
    pub async fn answer(&self, request: &Request, ctx: &InvocationContext) -> Result<String> {
        let mut query = SearchQuery::new(&request.text).with_config(&self.config);
        if let Some(owner) = &request.owner_id {
            query = query.with_owner(owner);
        }

        let records = match self.store.search(&query).await {
            Ok(records) => records,
            Err(e) => {
                warn!("Retrieval failed, answering without facts: {e}");
                Vec::new()
            }
        };
        debug!("Retrieved {} records", records.len());
        ctx.emit(TraceEvent::RetrievalCompleted {
            cycle_id: ctx.cycle_id(),
            results: records.len(),
        });

        let mut generation =
            GenerationRequest::new(ANSWER_DIRECTIVE, &request.text).with_context(facts(&records));
        if let Some(model) = &self.model {
            generation = generation.with_model(model);
        }

        match self.generator.generate(generation).await {
            Ok(text) => Ok(text),
            Err(e) if records.is_empty() => {
                warn!("Answer step failed with no facts to report: {e}");
                Ok(NOT_FOUND_ANSWER.to_string())
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Render records as the answer step's context.
fn facts(records: &[MemoryRecord]) -> String {
    if records.is_empty() {
        return NO_MATCH_CONTEXT.to_string();
    }

    records
        .iter()
        .map(|r| format!("- {} (relevance {:.2})", r.content, r.relevance))
        .collect::<Vec<_>>()
        .join("\n")
}
