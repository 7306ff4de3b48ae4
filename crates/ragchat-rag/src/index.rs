//! In-memory chunk index and its builder.
//!
//! An [`Index`] is one generation of the embedded corpus. It is built in full
//! by [`build_index`] and never mutated afterwards; a rebuild produces a new
//! value.

use crate::document::Document;
use crate::error::{RagError, RagResult};
use ragchat_embeddings::{normalized, Chunker, Embedder, EmbeddingError};
use serde::Serialize;
use tracing::{debug, info};

/// A retrieval unit: a window of one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Chunk {
    /// Name of the owning document.
    pub section: String,
    /// Position within the document, 0-based and gap-free.
    pub chunk_id: usize,
    /// Chunk text.
    pub text: String,
}

/// A chunk with its unit-length embedding.
#[derive(Debug, Clone)]
pub struct IndexedChunk {
    pub chunk: Chunk,
    pub vector: Vec<f32>,
}

/// One complete index generation.
#[derive(Debug, Clone, Default)]
pub struct Index {
    chunks: Vec<IndexedChunk>,
    dimension: usize,
    generation: u64,
}

impl Index {
    /// An index with no chunks.
    pub fn empty(generation: u64) -> Self {
        Self {
            chunks: Vec::new(),
            dimension: 0,
            generation,
        }
    }

    /// Chunks in insertion order.
    pub fn chunks(&self) -> &[IndexedChunk] {
        &self.chunks
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Vector dimension, 0 for an empty index.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Generation number assigned at build time.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Chunk every document, embed all chunks in one request, normalize.
///
/// No chunks means an empty index and no embedding call. Any embedding
/// failure is returned as [`RagError::IndexBuild`].
pub async fn build_index(
    documents: &[Document],
    chunker: &Chunker,
    embedder: &dyn Embedder,
    generation: u64,
) -> RagResult<Index> {
    let mut pending: Vec<Chunk> = Vec::new();
    for doc in documents {
        for piece in chunker.chunk(&doc.text) {
            pending.push(Chunk {
                section: doc.name.clone(),
                chunk_id: piece.index,
                text: piece.text,
            });
        }
    }

    if pending.is_empty() {
        info!(generation, "no chunks to index, built empty index");
        return Ok(Index::empty(generation));
    }

    let texts: Vec<String> = pending.iter().map(|c| c.text.clone()).collect();
    debug!(chunks = texts.len(), documents = documents.len(), "embedding corpus");

    let vectors = embedder
        .embed_batch(&texts)
        .await
        .map_err(RagError::IndexBuild)?;

    if vectors.len() != pending.len() {
        return Err(RagError::IndexBuild(EmbeddingError::CountMismatch {
            expected: pending.len(),
            got: vectors.len(),
        }));
    }

    let dimension = vectors[0].len();
    let mut chunks = Vec::with_capacity(pending.len());
    for (chunk, vector) in pending.into_iter().zip(vectors) {
        if vector.len() != dimension {
            return Err(RagError::IndexBuild(EmbeddingError::DimensionMismatch {
                expected: dimension,
                got: vector.len(),
            }));
        }
        chunks.push(IndexedChunk {
            chunk,
            vector: normalized(vector),
        });
    }

    Ok(Index {
        chunks,
        dimension,
        generation,
    })
}
