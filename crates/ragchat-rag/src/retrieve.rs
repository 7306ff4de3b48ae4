//! Cosine top-K retrieval over an [`Index`].

use crate::error::{RagError, RagResult};
use crate::index::{Chunk, Index};
use ragchat_embeddings::{dot_product, normalized, Embedder, EmbeddingError};
use serde::Serialize;
use tracing::debug;

/// One ranked result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievalHit {
    /// Cosine similarity between query and chunk, in `[-1, 1]`.
    pub score: f32,
    pub chunk: Chunk,
}

impl Index {
    /// Return the `k` chunks most similar to `query`, best first.
    ///
    /// An empty index or `k == 0` returns no hits without calling the
    /// embedder. Equal scores keep index order.
    pub async fn search(
        &self,
        embedder: &dyn Embedder,
        query: &str,
        k: usize,
    ) -> RagResult<Vec<RetrievalHit>> {
        if self.is_empty() || k == 0 {
            return Ok(Vec::new());
        }

        let query_vec = normalized(embedder.embed(query).await?);
        if query_vec.len() != self.dimension() {
            return Err(RagError::Embedding(EmbeddingError::DimensionMismatch {
                expected: self.dimension(),
                got: query_vec.len(),
            }));
        }

        let mut scored: Vec<(f32, usize)> = self
            .chunks()
            .iter()
            .enumerate()
            .map(|(i, c)| (dot_product(&query_vec, &c.vector), i))
            .collect();

        // sort_by is stable, so ties stay in insertion order
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));
        scored.truncate(k);

        let hits: Vec<RetrievalHit> = scored
            .into_iter()
            .map(|(score, i)| RetrievalHit {
                score,
                chunk: self.chunks()[i].chunk.clone(),
            })
            .collect();

        debug!(
            k,
            generation = self.generation(),
            top = ?hits
                .iter()
                .map(|h| (h.chunk.section.as_str(), h.chunk.chunk_id, h.score))
                .collect::<Vec<_>>(),
            "retrieved chunks"
        );

        Ok(hits)
    }
}
