//! In-memory knowledge store with optional JSON-lines persistence.
//!
//! Records are held in a single `Vec` in insertion order, tagged with their
//! partition. When a persistence path is set, the whole set is flushed to
//! disk after every mutation, one JSON object per line. This gives fast
//! reads with durable writes.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use studentdesk_core::error::KnowledgeError;
use studentdesk_core::knowledge::{
    KnowledgeRecord, KnowledgeStore, Partition, SearchHit, StoredRecord,
};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::embedder::Embedder;
use crate::vector;

/// One persisted line.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct IndexedRecord {
    id: String,
    partition: Partition,
    document: String,
    #[serde(default)]
    metadata: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    embedding: Vec<f32>,
    /// Which embedder produced `embedding`
    #[serde(default)]
    embedder: String,
}

impl IndexedRecord {
    fn to_stored(&self) -> StoredRecord {
        StoredRecord {
            id: self.id.clone(),
            partition: self.partition,
            document: self.document.clone(),
            metadata: self.metadata.clone(),
        }
    }
}

pub struct InMemoryKnowledgeStore {
    embedder: Arc<dyn Embedder>,
    records: Arc<RwLock<Vec<IndexedRecord>>>,
    path: Option<PathBuf>,
}

impl InMemoryKnowledgeStore {
    /// A volatile store.
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder,
            records: Arc::new(RwLock::new(Vec::new())),
            path: None,
        }
    }

    /// A store backed by a JSONL file.
    ///
    /// Existing records are loaded; corrupted lines are skipped. Records
    /// embedded by a different embedder are re-embedded before use.
    pub async fn open(embedder: Arc<dyn Embedder>, path: PathBuf) -> Result<Self, KnowledgeError> {
        let mut records = load_from_disk(&path);

        let stale: Vec<usize> = records
            .iter()
            .enumerate()
            .filter(|(_, r)| r.embedder != embedder.name() || r.embedding.is_empty())
            .map(|(i, _)| i)
            .collect();

        if !stale.is_empty() {
            info!(count = stale.len(), embedder = embedder.name(), "Re-embedding knowledge records");
            let texts: Vec<String> = stale.iter().map(|&i| records[i].document.clone()).collect();
            let vectors = embedder.embed(&texts).await?;
            for (&i, v) in stale.iter().zip(vectors) {
                records[i].embedding = v;
                records[i].embedder = embedder.name().to_string();
            }
        }

        debug!(path = %path.display(), count = records.len(), "Knowledge store loaded");

        let store = Self {
            embedder,
            records: Arc::new(RwLock::new(records)),
            path: Some(path),
        };
        if !stale.is_empty() {
            store.flush().await?;
        }
        Ok(store)
    }

    /// Flush all records to disk as JSONL. No-op for volatile stores.
    async fn flush(&self) -> Result<(), KnowledgeError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let records = self.records.read().await;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                KnowledgeError::Storage(format!("Failed to create knowledge directory: {e}"))
            })?;
        }

        let mut content = String::new();
        for record in records.iter() {
            let line = serde_json::to_string(record).map_err(|e| {
                KnowledgeError::Storage(format!("Failed to serialize knowledge record: {e}"))
            })?;
            content.push_str(&line);
            content.push('\n');
        }

        std::fs::write(path, &content)
            .map_err(|e| KnowledgeError::Storage(format!("Failed to write knowledge file: {e}")))?;

        Ok(())
    }
}

/// Load records from a JSONL file. A missing file means an empty store.
fn load_from_disk(path: &Path) -> Vec<IndexedRecord> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(_) => return Vec::new(),
    };

    content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| match serde_json::from_str::<IndexedRecord>(line) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(error = %e, "Skipping corrupted knowledge record");
                None
            }
        })
        .collect()
}

#[async_trait]
impl KnowledgeStore for InMemoryKnowledgeStore {
    fn name(&self) -> &str {
        if self.path.is_some() { "jsonl" } else { "in_memory" }
    }

    async fn search(
        &self,
        text: &str,
        top_k: usize,
        partition: Partition,
    ) -> Result<Vec<SearchHit>, KnowledgeError> {
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let query = self
            .embedder
            .embed(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| KnowledgeError::EmbeddingFailed("no query embedding returned".into()))?;

        let records = self.records.read().await;
        let candidates = records
            .iter()
            .enumerate()
            .filter(|(_, r)| r.partition == partition)
            .map(|(i, r)| (i, r.embedding.as_slice()));

        let hits = vector::rank(&query, candidates, top_k)
            .into_iter()
            .map(|(i, score)| SearchHit {
                document: records[i].document.clone(),
                metadata: records[i].metadata.clone(),
                score,
            })
            .collect::<Vec<_>>();

        debug!(partition = partition.as_str(), hits = hits.len(), "Knowledge search");
        Ok(hits)
    }

    async fn add(
        &self,
        partition: Partition,
        record: KnowledgeRecord,
    ) -> Result<String, KnowledgeError> {
        let embedding = self
            .embedder
            .embed(std::slice::from_ref(&record.document))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| KnowledgeError::EmbeddingFailed("no embedding returned".into()))?;

        let id = Uuid::new_v4().to_string();
        self.records.write().await.push(IndexedRecord {
            id: id.clone(),
            partition,
            document: record.document,
            metadata: record.metadata,
            embedding,
            embedder: self.embedder.name().to_string(),
        });
        self.flush().await?;
        Ok(id)
    }

    async fn list(&self, partition: Partition) -> Result<Vec<StoredRecord>, KnowledgeError> {
        let records = self.records.read().await;
        Ok(records
            .iter()
            .filter(|r| r.partition == partition)
            .map(IndexedRecord::to_stored)
            .collect())
    }

    async fn delete(&self, partition: Partition, ids: &[String]) -> Result<usize, KnowledgeError> {
        let mut records = self.records.write().await;
        let len_before = records.len();
        records.retain(|r| !(r.partition == partition && ids.contains(&r.id)));
        let removed = len_before - records.len();
        drop(records);
        if removed > 0 {
            self.flush().await?;
        }
        Ok(removed)
    }

    async fn count(&self, partition: Partition) -> Result<usize, KnowledgeError> {
        Ok(self
            .records
            .read()
            .await
            .iter()
            .filter(|r| r.partition == partition)
            .count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedder::HashingEmbedder;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn embedder() -> Arc<dyn Embedder> {
        Arc::new(HashingEmbedder::new(128))
    }

    fn faq(question: &str, answer: &str) -> KnowledgeRecord {
        let mut metadata = serde_json::Map::new();
        metadata.insert("answer".into(), answer.into());
        metadata.insert("category".into(), "services".into());
        KnowledgeRecord {
            document: question.into(),
            metadata,
        }
    }

    #[tokio::test]
    async fn exact_question_scores_one() {
        let store = InMemoryKnowledgeStore::new(embedder());
        store
            .add(Partition::Faq, faq("What time does the library open?", "7:00-22:00"))
            .await
            .unwrap();
        store
            .add(Partition::Faq, faq("How much is tuition per credit?", "1,500,000 VND"))
            .await
            .unwrap();

        let hits = store
            .search("What time does the library open?", 2, Partition::Faq)
            .await
            .unwrap();
        assert_eq!(hits.len(), 2);
        assert!((hits[0].score - 1.0).abs() < 1e-5);
        assert_eq!(hits[0].metadata["answer"], "7:00-22:00");
        assert!(hits[1].score < hits[0].score);
    }

    #[tokio::test]
    async fn partitions_are_isolated() {
        let store = InMemoryKnowledgeStore::new(embedder());
        store.add(Partition::Faq, faq("library hours", "7-22")).await.unwrap();

        let hits = store.search("library hours", 3, Partition::Knowledge).await.unwrap();
        assert!(hits.is_empty());
        assert_eq!(store.count(Partition::Faq).await.unwrap(), 1);
        assert_eq!(store.count(Partition::QueryLog).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn search_respects_top_k() {
        let store = InMemoryKnowledgeStore::new(embedder());
        for i in 0..5 {
            store.add(Partition::Knowledge, faq(&format!("doc {i}"), "x")).await.unwrap();
        }
        let hits = store.search("doc", 3, Partition::Knowledge).await.unwrap();
        assert_eq!(hits.len(), 3);
        assert!(store.search("doc", 0, Partition::Knowledge).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_only_touches_partition() {
        let store = InMemoryKnowledgeStore::new(embedder());
        let id = store.add(Partition::Faq, faq("q", "a")).await.unwrap();

        assert_eq!(store.delete(Partition::Knowledge, &[id.clone()]).await.unwrap(), 0);
        assert_eq!(store.delete(Partition::Faq, &[id]).await.unwrap(), 1);
        assert_eq!(store.count(Partition::Faq).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn persists_and_reloads() {
        let tmp = NamedTempFile::new().unwrap();
        let path = tmp.path().to_path_buf();
        drop(tmp);

        let store = InMemoryKnowledgeStore::open(embedder(), path.clone()).await.unwrap();
        store.add(Partition::Faq, faq("library hours", "7-22")).await.unwrap();
        assert!(std::fs::read_to_string(&path).unwrap().contains("library hours"));

        let reloaded = InMemoryKnowledgeStore::open(embedder(), path).await.unwrap();
        let listed = reloaded.list(Partition::Faq).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].meta_str("answer"), Some("7-22"));
    }

    #[tokio::test]
    async fn reembeds_when_embedder_changes() {
        let tmp = NamedTempFile::new().unwrap();
        let path = tmp.path().to_path_buf();
        drop(tmp);

        let store = InMemoryKnowledgeStore::open(Arc::new(HashingEmbedder::new(16)), path.clone())
            .await
            .unwrap();
        store.add(Partition::Faq, faq("library hours", "7-22")).await.unwrap();

        let reloaded = InMemoryKnowledgeStore::open(embedder(), path).await.unwrap();
        let hits = reloaded.search("library hours", 1, Partition::Faq).await.unwrap();
        assert!((hits[0].score - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn handles_corrupted_lines() {
        let mut tmp = NamedTempFile::new().unwrap();
        writeln!(tmp, r#"{{"id":"1","partition":"faq","document":"valid","metadata":{{"answer":"a"}}}}"#).unwrap();
        writeln!(tmp, "this is not json").unwrap();
        let path = tmp.path().to_path_buf();

        let store = InMemoryKnowledgeStore::open(embedder(), path).await.unwrap();
        assert_eq!(store.count(Partition::Faq).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn missing_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = InMemoryKnowledgeStore::open(embedder(), dir.path().join("kb.jsonl"))
            .await
            .unwrap();
        assert_eq!(store.count(Partition::Faq).await.unwrap(), 0);
        assert_eq!(store.name(), "jsonl");
    }
}
