//! # ragchat RAG
//!
//! Document indexing and semantic retrieval.
//!
//! Documents are chunked, embedded in a single batch and normalized into an
//! immutable [`Index`]. The [`RagEngine`] owns the live generation and swaps
//! in a new one only when a rebuild succeeds. Retrieval is a linear cosine
//! scan; the prompt module turns documents or hits into a system prompt.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use ragchat_rag::prelude::*;
//!
//! let engine = RagEngine::new(embedder, Chunker::new(ChunkConfig::new(900, 120)));
//! engine.reload(Arc::new(DirectorySource::new("context"))).await?;
//! let hits = engine.search("what does he work on?", 4).await?;
//! let system = assemble_rag(persona, "what does he work on?", &hits);
//! ```

pub mod document;
pub mod engine;
pub mod error;
pub mod index;
pub mod prelude;
pub mod prompt;
pub mod retrieve;

pub use document::{DirectorySource, Document, DocumentSource, StaticSource};
pub use engine::{IndexStatus, RagEngine};
pub use error::{RagError, RagResult};
pub use index::{build_index, Chunk, Index, IndexedChunk};
pub use prompt::{
    assemble, assemble_rag, user_message, CorpusPrompt, PromptTemplate, RetrievalPrompt,
    GROUNDING_INSTRUCTION,
};
pub use retrieve::RetrievalHit;
