//! KnowledgeStore trait: similarity search over the FAQ and knowledge partitions.
//!
//! The store is a black box to the router: given free text it returns ranked
//! candidates with a similarity score in [0, 1]. How candidates are indexed
//! and embedded is the implementation's business.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::KnowledgeError;

/// Which collection a query or record targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Partition {
    /// Curated question/answer pairs, trusted verbatim
    Faq,
    /// Reference documents injected as generation context
    Knowledge,
    /// Past queries and answers, kept for analytics and future FAQ curation
    QueryLog,
}

impl Partition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Partition::Faq => "faq",
            Partition::Knowledge => "knowledge",
            Partition::QueryLog => "query_log",
        }
    }
}

/// One ranked candidate returned by [`KnowledgeStore::search`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    /// The indexed text (FAQ question, or "title\ncontent" for knowledge)
    pub document: String,

    /// Partition-specific fields (answer, title, content, category, ...)
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,

    /// Similarity in [0, 1]
    pub score: f32,
}

impl SearchHit {
    fn meta_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(|v| v.as_str())
    }
}

/// Convert a distance into a similarity score: `1 - distance` when the
/// distance is at most 1, otherwise 0.
pub fn score_from_distance(distance: f32) -> f32 {
    if distance <= 1.0 {
        (1.0 - distance).clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// A retrieval candidate as the router consumes it. Read-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalMatch {
    /// FAQ question, or knowledge title
    pub source_text: String,
    /// FAQ answer, or knowledge content
    pub answer_or_content: String,
    pub category: String,
    pub score: f32,
}

impl RetrievalMatch {
    /// Interpret a FAQ-partition hit. Hits without an `answer` are unusable.
    pub fn from_faq_hit(hit: &SearchHit) -> Option<Self> {
        let answer = hit.meta_str("answer")?;
        Some(Self {
            source_text: hit.document.clone(),
            answer_or_content: answer.to_string(),
            category: hit.meta_str("category").unwrap_or("general").to_string(),
            score: hit.score,
        })
    }

    /// Interpret a knowledge-partition hit. Missing title/content fall back
    /// to "Unknown" and the indexed document respectively.
    pub fn from_knowledge_hit(hit: &SearchHit) -> Self {
        Self {
            source_text: hit.meta_str("title").unwrap_or("Unknown").to_string(),
            answer_or_content: hit
                .meta_str("content")
                .map(str::to_string)
                .unwrap_or_else(|| hit.document.clone()),
            category: hit.meta_str("category").unwrap_or("general").to_string(),
            score: hit.score,
        }
    }
}

/// A record to insert into a partition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeRecord {
    /// Text that is embedded and searched
    pub document: String,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

/// A record as held by the store, with its assigned ID.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredRecord {
    pub id: String,
    pub partition: Partition,
    pub document: String,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl StoredRecord {
    /// String metadata field, if present.
    pub fn meta_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(|v| v.as_str())
    }
}

/// The core KnowledgeStore trait.
///
/// `search` must return candidates ordered best-first; ties keep the store's
/// own order, which the router relies on for tie-breaking.
#[async_trait]
pub trait KnowledgeStore: Send + Sync {
    /// The backend name (e.g., "in_memory").
    fn name(&self) -> &str;

    /// Return up to `top_k` candidates from `partition`, best first.
    async fn search(
        &self,
        text: &str,
        top_k: usize,
        partition: Partition,
    ) -> Result<Vec<SearchHit>, KnowledgeError>;

    /// Insert a record, returning its ID.
    async fn add(
        &self,
        partition: Partition,
        record: KnowledgeRecord,
    ) -> Result<String, KnowledgeError>;

    /// All records of a partition, in insertion order.
    async fn list(&self, partition: Partition) -> Result<Vec<StoredRecord>, KnowledgeError>;

    /// Remove records by ID, returning how many were removed.
    async fn delete(&self, partition: Partition, ids: &[String]) -> Result<usize, KnowledgeError>;

    /// Number of records in a partition.
    async fn count(&self, partition: Partition) -> Result<usize, KnowledgeError>;
}
