//! Document ingestion and FAQ management over a [`KnowledgeStore`].

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use studentdesk_core::error::KnowledgeError;
use studentdesk_core::knowledge::{KnowledgeRecord, KnowledgeStore, Partition};
use tracing::info;

use crate::chunk::chunk_text;
use crate::seed::default_faqs;

/// A FAQ as stored and exported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaqEntry {
    pub question: String,
    pub answer: String,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default)]
    pub created_at: String,
}

fn default_category() -> String {
    "general".into()
}

/// A knowledge document, with its chunks grouped under the original title.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentSummary {
    pub title: String,
    pub category: String,
    pub created_at: String,
    pub chunks: usize,
}

/// Record counts per partition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeStats {
    pub faqs: usize,
    pub knowledge: usize,
    pub queries: usize,
}

pub struct KnowledgeBase {
    store: Arc<dyn KnowledgeStore>,
    chunk_size: usize,
    chunk_overlap: usize,
}

impl KnowledgeBase {
    pub fn new(store: Arc<dyn KnowledgeStore>, chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            store,
            chunk_size,
            chunk_overlap,
        }
    }

    /// The underlying store, for handing to the router.
    pub fn store(&self) -> Arc<dyn KnowledgeStore> {
        Arc::clone(&self.store)
    }

    pub async fn add_faq(
        &self,
        question: &str,
        answer: &str,
        category: &str,
    ) -> Result<String, KnowledgeError> {
        let mut metadata = serde_json::Map::new();
        metadata.insert("answer".into(), answer.into());
        metadata.insert("category".into(), category.into());
        metadata.insert("created_at".into(), Utc::now().to_rfc3339().into());

        let id = self
            .store
            .add(
                Partition::Faq,
                KnowledgeRecord {
                    document: question.into(),
                    metadata,
                },
            )
            .await?;
        info!(category, "Added FAQ");
        Ok(id)
    }

    /// Add a document, splitting it into overlapping chunks when it is
    /// longer than the chunk size. Returns the chunk IDs in order.
    pub async fn add_document_from_text(
        &self,
        title: &str,
        content: &str,
        category: &str,
    ) -> Result<Vec<String>, KnowledgeError> {
        let chunks = chunk_text(content, self.chunk_size, self.chunk_overlap);
        let total = chunks.len();
        let created_at = Utc::now().to_rfc3339();
        let mut ids = Vec::with_capacity(total);

        for (i, chunk) in chunks.into_iter().enumerate() {
            let chunk_title = if total > 1 {
                format!("{title} (Part {}/{total})", i + 1)
            } else {
                title.to_string()
            };

            let mut metadata = serde_json::Map::new();
            metadata.insert("title".into(), chunk_title.clone().into());
            metadata.insert("content".into(), chunk.clone().into());
            metadata.insert("original_title".into(), title.into());
            metadata.insert("category".into(), category.into());
            metadata.insert("chunk_index".into(), i.into());
            metadata.insert("total_chunks".into(), total.into());
            metadata.insert("created_at".into(), created_at.clone().into());

            let id = self
                .store
                .add(
                    Partition::Knowledge,
                    KnowledgeRecord {
                        document: format!("{chunk_title}\n{chunk}"),
                        metadata,
                    },
                )
                .await?;
            ids.push(id);
        }

        info!(title, chunks = total, "Added document to knowledge base");
        Ok(ids)
    }

    /// Documents grouped by original title, in first-seen order.
    pub async fn list_documents(&self) -> Result<Vec<DocumentSummary>, KnowledgeError> {
        let records = self.store.list(Partition::Knowledge).await?;
        let mut order: Vec<String> = Vec::new();
        let mut grouped: HashMap<String, DocumentSummary> = HashMap::new();

        for record in &records {
            let title = original_title(record.meta_str("original_title"), record.meta_str("title"));
            match grouped.get_mut(&title) {
                Some(summary) => summary.chunks += 1,
                None => {
                    order.push(title.clone());
                    grouped.insert(
                        title.clone(),
                        DocumentSummary {
                            title,
                            category: record.meta_str("category").unwrap_or("general").into(),
                            created_at: record.meta_str("created_at").unwrap_or_default().into(),
                            chunks: 1,
                        },
                    );
                }
            }
        }

        Ok(order.into_iter().filter_map(|t| grouped.remove(&t)).collect())
    }

    /// Delete every chunk of a document. Returns the number of chunks removed.
    pub async fn delete_document(&self, title: &str) -> Result<usize, KnowledgeError> {
        let ids: Vec<String> = self
            .store
            .list(Partition::Knowledge)
            .await?
            .into_iter()
            .filter(|r| original_title(r.meta_str("original_title"), r.meta_str("title")) == title)
            .map(|r| r.id)
            .collect();

        if ids.is_empty() {
            return Ok(0);
        }
        let removed = self.store.delete(Partition::Knowledge, &ids).await?;
        info!(title, chunks = removed, "Deleted document");
        Ok(removed)
    }

    pub async fn export_faqs(&self) -> Result<Vec<FaqEntry>, KnowledgeError> {
        Ok(self
            .store
            .list(Partition::Faq)
            .await?
            .into_iter()
            .filter_map(|r| {
                Some(FaqEntry {
                    answer: r.meta_str("answer")?.to_string(),
                    category: r.meta_str("category").unwrap_or("general").to_string(),
                    created_at: r.meta_str("created_at").unwrap_or_default().to_string(),
                    question: r.document,
                })
            })
            .collect())
    }

    /// Install the default FAQs when the FAQ partition is empty.
    /// Returns how many were added.
    pub async fn seed_default_faqs(&self, locale: &str) -> Result<usize, KnowledgeError> {
        let existing = self.store.count(Partition::Faq).await?;
        if existing > 0 {
            info!(existing, "FAQ partition already populated");
            return Ok(0);
        }

        let faqs = default_faqs(locale);
        for faq in &faqs {
            self.add_faq(&faq.question, &faq.answer, &faq.category).await?;
        }
        info!(count = faqs.len(), "Added default FAQs");
        Ok(faqs.len())
    }

    pub async fn stats(&self) -> Result<KnowledgeStats, KnowledgeError> {
        Ok(KnowledgeStats {
            faqs: self.store.count(Partition::Faq).await?,
            knowledge: self.store.count(Partition::Knowledge).await?,
            queries: self.store.count(Partition::QueryLog).await?,
        })
    }
}

fn original_title(original: Option<&str>, title: Option<&str>) -> String {
    original.or(title).unwrap_or("Unknown").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedder::HashingEmbedder;
    use crate::store::InMemoryKnowledgeStore;

    fn kb(chunk_size: usize, overlap: usize) -> KnowledgeBase {
        let store = InMemoryKnowledgeStore::new(Arc::new(HashingEmbedder::default()));
        KnowledgeBase::new(Arc::new(store), chunk_size, overlap)
    }

    #[tokio::test]
    async fn short_document_keeps_title() {
        let kb = kb(1000, 200);
        let ids = kb
            .add_document_from_text("Library Rules", "Quiet please.", "services")
            .await
            .unwrap();
        assert_eq!(ids.len(), 1);

        let records = kb.store().list(Partition::Knowledge).await.unwrap();
        assert_eq!(records[0].meta_str("title"), Some("Library Rules"));
        assert_eq!(records[0].document, "Library Rules\nQuiet please.");
    }

    #[tokio::test]
    async fn long_document_is_chunked_with_part_titles() {
        let kb = kb(100, 20);
        let content = "word ".repeat(60);
        let ids = kb
            .add_document_from_text("Handbook", &content, "general")
            .await
            .unwrap();
        assert!(ids.len() > 1);

        let records = kb.store().list(Partition::Knowledge).await.unwrap();
        let total = ids.len();
        assert_eq!(records[0].meta_str("title"), Some(format!("Handbook (Part 1/{total})").as_str()));
        assert_eq!(records[0].meta_str("original_title"), Some("Handbook"));
        assert_eq!(records[0].metadata["total_chunks"], total);

        let docs = kb.list_documents().await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].title, "Handbook");
        assert_eq!(docs[0].chunks, total);
    }

    #[tokio::test]
    async fn delete_removes_all_chunks() {
        let kb = kb(100, 20);
        kb.add_document_from_text("Handbook", &"word ".repeat(60), "general")
            .await
            .unwrap();
        kb.add_document_from_text("Other", "short", "general").await.unwrap();

        let removed = kb.delete_document("Handbook").await.unwrap();
        assert!(removed > 1);
        assert_eq!(kb.delete_document("Handbook").await.unwrap(), 0);

        let docs = kb.list_documents().await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].title, "Other");
    }

    #[tokio::test]
    async fn seed_only_when_empty() {
        let kb = kb(1000, 200);
        assert_eq!(kb.seed_default_faqs("en").await.unwrap(), 5);
        assert_eq!(kb.seed_default_faqs("en").await.unwrap(), 0);

        let faqs = kb.export_faqs().await.unwrap();
        assert_eq!(faqs.len(), 5);
        assert!(faqs.iter().any(|f| f.answer.contains("7:00-22:00")));
        assert!(faqs.iter().all(|f| !f.created_at.is_empty()));
    }

    #[tokio::test]
    async fn stats_count_partitions() {
        let kb = kb(1000, 200);
        kb.add_faq("q", "a", "general").await.unwrap();
        kb.add_document_from_text("t", "c", "general").await.unwrap();
        let stats = kb.stats().await.unwrap();
        assert_eq!(
            stats,
            KnowledgeStats {
                faqs: 1,
                knowledge: 1,
                queries: 0
            }
        );
    }
}
