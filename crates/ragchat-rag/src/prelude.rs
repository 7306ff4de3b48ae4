//! ragchat RAG prelude: convenient imports for common usage.
//!
//! ```rust
//! use ragchat_rag::prelude::*;
//! ```

// Documents and sources
pub use crate::document::{DirectorySource, Document, DocumentSource, StaticSource};

// Index lifecycle and retrieval
pub use crate::engine::{IndexStatus, RagEngine};
pub use crate::error::{RagError, RagResult};
pub use crate::index::{build_index, Index};
pub use crate::retrieve::RetrievalHit;

// Prompt assembly
pub use crate::prompt::{assemble, assemble_rag, user_message, PromptTemplate};

// Chunking and embedding
pub use ragchat_embeddings::{ChunkConfig, Chunker, Embedder};
