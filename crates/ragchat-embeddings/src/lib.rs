//! # ragchat Embeddings
//!
//! Everything between raw document text and unit-length vectors:
//! - Character-window chunking with overlap
//! - L2 normalization and similarity helpers
//! - The [`Embedder`] trait and its backends
//!
//! ## Features
//!
//! - `ollama` (default): [`OllamaEmbedder`] talking to `/api/embeddings`
//!
//! ## Usage
//!
//! ```rust,ignore
//! use ragchat_embeddings::{ChunkConfig, Chunker, Embedder, SimpleEmbedder, normalized};
//!
//! let chunks = Chunker::new(ChunkConfig::new(900, 120)).chunk(&text);
//! let embedder = SimpleEmbedder::default();
//! let vector = normalized(embedder.embed("the quick brown fox").await?);
//! ```

mod chunker;
mod embedder;
mod normalize;
mod simple;

pub use chunker::{Chunk, ChunkConfig, Chunker};
pub use embedder::{Embedder, EmbeddingError, EmbeddingResult};
pub use normalize::{cosine_similarity, dot_product, l2_norm, normalize_l2, normalized};
pub use simple::SimpleEmbedder;

#[cfg(feature = "ollama")]
mod ollama;
#[cfg(feature = "ollama")]
pub use ollama::{OllamaEmbedConfig, OllamaEmbedder};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::{cosine_similarity, dot_product, normalize_l2, normalized};
    pub use crate::{ChunkConfig, Chunker, SimpleEmbedder};
    pub use crate::{Embedder, EmbeddingError, EmbeddingResult};

    #[cfg(feature = "ollama")]
    pub use crate::{OllamaEmbedConfig, OllamaEmbedder};
}
