//! The memory provider: store a fact, or answer from stored facts.

use std::sync::Arc;

use async_trait::async_trait;
use conductor_retrieval::{MemoryStore, Metadata};
use serde_json::Value;
use tracing::{debug, info};

use crate::chain::RetrievalChain;
use crate::classifier::Classifier;
use crate::error::Result;
use crate::label::{Domain, LabelSet};
use crate::provider::{CapabilityProvider, InvocationContext, ProviderDescriptor, Request};

pub const STORE: &str = "store";
pub const RETRIEVE: &str = "retrieve";

/// Reply sent once a fact has been stored.
pub const STORED_REPLY: &str = "Got it, I'll remember that.";

const MEMORY_DIRECTIVE: &str = "Remember facts the user shares and answer questions about \
them from stored memories only.";

/// Decides between storing and recalling, then runs the matching chain.
pub struct MemoryProvider {
    descriptor: ProviderDescriptor,
    classifier: Arc<Classifier>,
    store: Arc<dyn MemoryStore>,
    chain: RetrievalChain,
    actions: LabelSet,
}

impl MemoryProvider {
    pub fn new(
        classifier: Arc<Classifier>,
        store: Arc<dyn MemoryStore>,
        chain: RetrievalChain,
    ) -> Self {
        Self {
            descriptor: ProviderDescriptor::new(Domain::Memory, MEMORY_DIRECTIVE),
            classifier,
            store,
            chain,
            actions: action_labels(),
        }
    }
}

/// `store` and `retrieve`; an unclear reply reads rather than writes.
pub fn action_labels() -> LabelSet {
    LabelSet::new(
        RETRIEVE,
        "the user asks about something previously remembered",
    )
    .with_label(STORE, "the user shares a fact or preference to remember")
}

#[async_trait]
impl CapabilityProvider for MemoryProvider {
    fn descriptor(&self) -> &ProviderDescriptor {
        &self.descriptor
    }

    async fn invoke(&self, request: &Request, ctx: &InvocationContext) -> Result<String> {
        let action = self.classifier.classify(&request.text, &self.actions).await?;
        debug!("Memory action: {}", action.label);

        if action.label != STORE {
            return self.chain.answer(request, ctx).await;
        }

        let mut metadata = Metadata::new();
        metadata.insert("source".to_string(), Value::from("conversation"));
        let ack = self
            .store
            .store(&request.text, request.owner_id.as_deref(), Some(metadata))
            .await?;
        info!("Stored memory {}", ack.id);
        Ok(STORED_REPLY.to_string())
    }
}
