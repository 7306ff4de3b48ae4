//! Error taxonomy of the retrieval engine.

use ragchat_embeddings::EmbeddingError;
use thiserror::Error;

/// Retrieval engine errors.
#[derive(Debug, Error)]
pub enum RagError {
    /// The embedding call for a query failed.
    #[error("Embedding service error: {0}")]
    Embedding(#[from] EmbeddingError),

    /// Building a new index generation failed; the previous one is still served.
    #[error("Index build failed: {0}")]
    IndexBuild(#[source] EmbeddingError),

    /// No index generation has been built yet.
    #[error("Retrieval unavailable: index not built")]
    RetrievalUnavailable,

    #[error("Query is empty")]
    EmptyQuery,

    #[error("Failed to read documents from {path}: {source}")]
    DocumentSource {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Result type for retrieval operations.
pub type RagResult<T> = Result<T, RagError>;
