//! Records exchanged with the memory service.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Free-form metadata attached to a stored record.
pub type Metadata = BTreeMap<String, serde_json::Value>;

/// A stored fact as returned by a search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryRecord {
    /// Identifier assigned by the store.
    pub id: String,

    /// The remembered text.
    pub content: String,

    /// Whose memory this is.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,

    /// Metadata supplied at store time.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: Metadata,

    /// Relevance to the query that returned it (0.0 to 1.0).
    #[serde(default)]
    pub relevance: f32,

    /// When the record was stored.
    pub created_at: DateTime<Utc>,
}

/// Acknowledgement of a successful store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreAck {
    /// Identifier assigned to the new record.
    pub id: String,

    /// When the record was stored.
    pub created_at: DateTime<Utc>,
}
