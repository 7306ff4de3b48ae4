//! Hash-based embedder that needs no embedding service.
//!
//! Words are hashed into a fixed-dimension space with several seeded hashes.
//! Texts sharing words get similar vectors, which is enough to run the whole
//! pipeline offline.

use crate::{Embedder, EmbeddingResult};
use async_trait::async_trait;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Simple hash-based embedder.
///
/// # Example
///
/// ```rust
/// use ragchat_embeddings::SimpleEmbedder;
///
/// let embedder = SimpleEmbedder::new(128);
/// assert_eq!(embedder.embed_text("hello world").len(), 128);
/// ```
#[derive(Debug, Clone)]
pub struct SimpleEmbedder {
    dimension: usize,
    num_hashes: u64,
}

impl SimpleEmbedder {
    /// Create a new simple embedder with specified dimension.
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
            num_hashes: 4,
        }
    }

    /// Embedding dimension.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
        text.split(|c: char| !c.is_alphanumeric())
            .filter(|s| s.chars().count() > 1)
            .map(|s| s.to_lowercase())
    }

    fn hash_with_seed(&self, word: &str, seed: u64) -> u64 {
        let mut hasher = DefaultHasher::new();
        seed.hash(&mut hasher);
        word.hash(&mut hasher);
        hasher.finish()
    }

    /// Embed one text synchronously. Text without usable words maps to the zero vector.
    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];

        for token in Self::tokenize(text) {
            for seed in 0..self.num_hashes {
                let idx = (self.hash_with_seed(&token, seed) % self.dimension as u64) as usize;
                let sign = if self.hash_with_seed(&token, seed + 1000) % 2 == 0 {
                    1.0
                } else {
                    -1.0
                };
                vector[idx] += sign;
            }
        }

        vector
    }
}

impl Default for SimpleEmbedder {
    fn default() -> Self {
        Self::new(256)
    }
}

#[async_trait]
impl Embedder for SimpleEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> EmbeddingResult<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }

    fn model_name(&self) -> &str {
        "simple-hash"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cosine_similarity;

    #[tokio::test]
    async fn test_one_vector_per_text() {
        let embedder = SimpleEmbedder::new(64);
        let texts = vec!["alpha beta".to_string(), "gamma".to_string(), "".to_string()];
        let vectors = embedder.embed_batch(&texts).await.unwrap();
        assert_eq!(vectors.len(), 3);
        assert!(vectors.iter().all(|v| v.len() == 64));
        assert!(vectors[2].iter().all(|x| *x == 0.0));
    }

    #[test]
    fn test_deterministic() {
        let embedder = SimpleEmbedder::new(128);
        assert_eq!(embedder.embed_text("hello world"), embedder.embed_text("hello world"));
        // Case and punctuation do not matter.
        assert_eq!(embedder.embed_text("Hello, World!"), embedder.embed_text("hello world"));
    }

    #[test]
    fn test_similar_texts() {
        let embedder = SimpleEmbedder::new(256);

        let v1 = embedder.embed_text("quick brown fox");
        let v2 = embedder.embed_text("the brown fox is quick");
        let v3 = embedder.embed_text("lazy sleeping dog");

        assert!(cosine_similarity(&v1, &v2) > cosine_similarity(&v1, &v3));
    }
}
