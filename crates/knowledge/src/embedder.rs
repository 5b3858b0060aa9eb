//! Text embedders.
//!
//! [`HashingEmbedder`] needs no network and is deterministic across runs,
//! which makes it the default. [`ProviderEmbedder`] delegates to the
//! generation backend's embeddings endpoint.

use std::sync::Arc;

use async_trait::async_trait;
use studentdesk_core::error::KnowledgeError;
use studentdesk_core::provider::{EmbeddingRequest, Provider};

/// Turns texts into fixed-length vectors.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Stable identifier; stored alongside persisted vectors so a change of
    /// embedder triggers re-indexing.
    fn name(&self) -> &str;

    /// Embed each text. The output has one vector per input, in order.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, KnowledgeError>;
}

/// Signed feature hashing over lowercase word unigrams and bigrams,
/// L2-normalized.
pub struct HashingEmbedder {
    dimensions: usize,
    name: String,
}

impl HashingEmbedder {
    pub fn new(dimensions: usize) -> Self {
        let dimensions = dimensions.max(1);
        Self {
            dimensions,
            name: format!("hashing-{dimensions}"),
        }
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Embed one text synchronously.
    pub fn embed_one(&self, text: &str) -> Vec<f32> {
        let tokens = tokenize(text);
        let mut vector = vec![0.0f32; self.dimensions];

        let mut add = |feature: &str| {
            let h = fnv1a(feature.as_bytes());
            let slot = (h % self.dimensions as u64) as usize;
            let sign = if (h >> 63) & 1 == 0 { 1.0 } else { -1.0 };
            vector[slot] += sign;
        };

        for token in &tokens {
            add(token);
        }
        for pair in tokens.windows(2) {
            add(&format!("{} {}", pair[0], pair[1]));
        }

        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut vector {
                *x /= norm;
            }
        }
        vector
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new(256)
    }
}

#[async_trait]
impl Embedder for HashingEmbedder {
    fn name(&self) -> &str {
        &self.name
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, KnowledgeError> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }
}

/// Lowercased alphanumeric runs. Unicode-aware, so Vietnamese diacritics
/// stay inside their words.
fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .collect()
}

/// 64-bit FNV-1a.
fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for b in bytes {
        hash ^= *b as u64;
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

/// Embeddings from the configured generation backend.
pub struct ProviderEmbedder {
    provider: Arc<dyn Provider>,
    model: String,
    name: String,
}

impl ProviderEmbedder {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        let model = model.into();
        let name = format!("{}:{}", provider.name(), model);
        Self {
            provider,
            model,
            name,
        }
    }
}

#[async_trait]
impl Embedder for ProviderEmbedder {
    fn name(&self) -> &str {
        &self.name
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, KnowledgeError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let response = self
            .provider
            .embed(EmbeddingRequest {
                model: self.model.clone(),
                inputs: texts.to_vec(),
            })
            .await
            .map_err(|e| KnowledgeError::EmbeddingFailed(e.to_string()))?;

        if response.embeddings.len() != texts.len() {
            return Err(KnowledgeError::EmbeddingFailed(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                response.embeddings.len()
            )));
        }

        Ok(response.embeddings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector::cosine_similarity;
    use studentdesk_core::error::ProviderError;
    use studentdesk_core::provider::{EmbeddingResponse, ProviderRequest, ProviderResponse};

    #[test]
    fn hashing_is_deterministic_and_normalized() {
        let e = HashingEmbedder::new(64);
        let a = e.embed_one("What time does the library open?");
        let b = e.embed_one("What time does the library open?");
        assert_eq!(a, b);
        let norm: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn hashing_ignores_case_and_punctuation() {
        let e = HashingEmbedder::default();
        let a = e.embed_one("Library hours?");
        let b = e.embed_one("library HOURS");
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn related_texts_score_higher_than_unrelated() {
        let e = HashingEmbedder::default();
        let q = e.embed_one("when does the library open");
        let related = e.embed_one("The library opens at 7:00 and closes at 22:00");
        let unrelated = e.embed_one("Tuition per credit is 1,500,000 VND");
        assert!(cosine_similarity(&q, &related) > cosine_similarity(&q, &unrelated));
    }

    #[test]
    fn empty_text_is_zero_vector() {
        let e = HashingEmbedder::new(8);
        assert!(e.embed_one("  ?! ").iter().all(|x| *x == 0.0));
    }

    #[test]
    fn tokenize_keeps_diacritics() {
        assert_eq!(tokenize("Học phí, bao nhiêu?"), vec!["học", "phí", "bao", "nhiêu"]);
    }

    struct FixedEmbeddings(usize);

    #[async_trait]
    impl Provider for FixedEmbeddings {
        fn name(&self) -> &str {
            "fixed"
        }
        async fn complete(&self, _: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
            Err(ProviderError::NotConfigured("no completions".into()))
        }
        async fn embed(&self, req: EmbeddingRequest) -> Result<EmbeddingResponse, ProviderError> {
            Ok(EmbeddingResponse {
                embeddings: (0..self.0).map(|_| vec![1.0, 0.0]).collect(),
                model: req.model,
            })
        }
    }

    #[tokio::test]
    async fn provider_embedder_checks_count() {
        let ok = ProviderEmbedder::new(Arc::new(FixedEmbeddings(2)), "m");
        assert_eq!(ok.name(), "fixed:m");
        let out = ok.embed(&["a".into(), "b".into()]).await.unwrap();
        assert_eq!(out.len(), 2);

        let short = ProviderEmbedder::new(Arc::new(FixedEmbeddings(1)), "m");
        let err = short.embed(&["a".into(), "b".into()]).await.unwrap_err();
        assert!(matches!(err, KnowledgeError::EmbeddingFailed(_)));
    }
}
