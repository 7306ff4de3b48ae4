//! Core embedder trait and types.

use async_trait::async_trait;
use thiserror::Error;

/// Embedding error types.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    /// The embedding service answered with a non-success status.
    #[error("Embedding service returned {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("Embedding service unreachable: {0}")]
    Transport(String),

    #[error("Embedding request timed out after {0} seconds")]
    Timeout(u64),

    /// The response had neither an `embeddings` nor an `embedding` field.
    #[error("Unexpected embedding response: {0}")]
    UnexpectedResponse(String),

    #[error("Expected {expected} embeddings, got {got}")]
    CountMismatch { expected: usize, got: usize },

    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl EmbeddingError {
    /// HTTP status reported by the upstream service, if any.
    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            Self::Upstream { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Result type for embedding operations.
pub type EmbeddingResult<T> = Result<T, EmbeddingError>;

/// Core trait for embedding providers.
///
/// Implementors turn text into dense vectors. `embed_batch` must return
/// exactly one vector per input text, in input order.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed multiple texts in one request.
    async fn embed_batch(&self, texts: &[String]) -> EmbeddingResult<Vec<Vec<f32>>>;

    /// Embed a single text string.
    async fn embed(&self, text: &str) -> EmbeddingResult<Vec<f32>> {
        let mut vectors = self.embed_batch(&[text.to_string()]).await?;
        if vectors.len() != 1 {
            return Err(EmbeddingError::CountMismatch {
                expected: 1,
                got: vectors.len(),
            });
        }
        Ok(vectors.remove(0))
    }

    /// Get the model name/identifier.
    fn model_name(&self) -> &str;
}
