//! Knowledge store implementations for studentdesk.
//!
//! The store keeps three partitions (FAQ, knowledge, query log) in memory,
//! ranks candidates by cosine similarity over embeddings, and can persist
//! itself to a JSON-lines file. [`KnowledgeBase`] layers document
//! ingestion and FAQ management on top of any `KnowledgeStore`.

pub mod base;
pub mod chunk;
pub mod embedder;
pub mod seed;
pub mod store;
pub mod vector;

pub use base::{DocumentSummary, FaqEntry, KnowledgeBase, KnowledgeStats};
pub use chunk::chunk_text;
pub use embedder::{Embedder, HashingEmbedder, ProviderEmbedder};
pub use seed::default_faqs;
pub use store::InMemoryKnowledgeStore;
pub use vector::cosine_similarity;
