//! Reference memory store.
//!
//! `InMemoryStore` keeps records in memory and, when opened with a path,
//! mirrors them to a JSON file. Relevance is the share of the query's
//! content words found in a record; it stands in for the semantic search a
//! real memory service performs.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::Result;
use crate::record::{MemoryRecord, Metadata, StoreAck};
use crate::store::{MemoryStore, SearchQuery};

const STOPWORDS: &[&str] = &[
    "a", "about", "am", "an", "and", "are", "at", "be", "can", "could", "did", "do", "does",
    "for", "had", "has", "have", "how", "i", "in", "is", "it", "its", "know", "me", "mine",
    "my", "of", "on", "or", "please", "remember", "should", "tell", "that", "the", "their",
    "there", "this", "to", "was", "were", "what", "when", "where", "which", "who", "whom",
    "why", "will", "with", "would", "you", "your",
];

/// Memory store backed by a vector of records.
pub struct InMemoryStore {
    records: RwLock<Vec<MemoryRecord>>,
    path: Option<PathBuf>,
}

impl InMemoryStore {
    /// Create an empty, volatile store.
    pub fn new() -> Self {
        Self {
            records: RwLock::new(Vec::new()),
            path: None,
        }
    }

    /// Open a store mirrored to `path`, loading any records already there.
    pub async fn persistent(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let records = if fs::try_exists(&path).await? {
            let content = fs::read_to_string(&path).await?;
            let records: Vec<MemoryRecord> = serde_json::from_str(&content)?;
            info!("Loaded {} memory records from {}", records.len(), path.display());
            records
        } else {
            Vec::new()
        };

        Ok(Self {
            records: RwLock::new(records),
            path: Some(path),
        })
    }

    /// Number of stored records.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Whether the store is empty.
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    async fn save(&self, records: &[MemoryRecord]) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        // Write atomically
        let temp_path = path.with_extension("json.tmp");
        fs::write(&temp_path, serde_json::to_string_pretty(records)?).await?;
        fs::rename(&temp_path, path).await?;

        debug!("Saved {} memory records", records.len());
        Ok(())
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MemoryStore for InMemoryStore {
    async fn search(&self, query: &SearchQuery) -> Result<Vec<MemoryRecord>> {
        let query_terms = content_terms(&query.query);
        if query_terms.is_empty() || query.max_results == 0 {
            return Ok(Vec::new());
        }

        let records = self.records.read().await;
        let mut hits: Vec<MemoryRecord> = records
            .iter()
            .filter(|r| match &query.owner_id {
                Some(owner) => r.owner_id.as_deref() == Some(owner.as_str()),
                None => true,
            })
            .filter_map(|r| {
                let record_terms = content_terms(&r.content);
                let shared = query_terms.intersection(&record_terms).count();
                let relevance = shared as f32 / query_terms.len() as f32;
                (relevance > 0.0 && relevance >= query.min_relevance).then(|| {
                    let mut hit = r.clone();
                    hit.relevance = relevance;
                    hit
                })
            })
            .collect();

        hits.sort_by(|a, b| {
            b.relevance
                .partial_cmp(&a.relevance)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.created_at.cmp(&a.created_at))
        });
        hits.truncate(query.max_results);

        debug!("Search '{}' matched {} records", query.query, hits.len());
        Ok(hits)
    }

    async fn store(
        &self,
        content: &str,
        owner_id: Option<&str>,
        metadata: Option<Metadata>,
    ) -> Result<StoreAck> {
        let record = MemoryRecord {
            id: Uuid::new_v4().to_string(),
            content: content.to_string(),
            owner_id: owner_id.map(str::to_string),
            metadata: metadata.unwrap_or_default(),
            relevance: 0.0,
            created_at: Utc::now(),
        };
        let ack = StoreAck {
            id: record.id.clone(),
            created_at: record.created_at,
        };

        let mut records = self.records.write().await;
        records.push(record);
        if let Err(e) = self.save(&records).await {
            records.pop();
            return Err(e);
        }

        debug!("Stored memory record {}", ack.id);
        Ok(ack)
    }
}

/// Lowercased content words with stopwords and plural `s` removed.
fn content_terms(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .filter(|t| !STOPWORDS.contains(&t.as_str()))
        .map(|t| {
            if t.len() > 3 && t.ends_with('s') && !t.ends_with("ss") {
                t[..t.len() - 1].to_string()
            } else {
                t
            }
        })
        .collect()
}
