//! Owner of the live index generation.
//!
//! [`RagEngine`] holds the current [`Index`] behind an `Arc` and replaces it
//! wholesale on rebuild. Readers clone the `Arc` and keep a consistent
//! generation for as long as they need it, while a rebuild builds the next
//! generation off to the side. Rebuilds are serialized; a failed rebuild
//! leaves the previous generation in place.

use crate::document::{Document, DocumentSource};
use crate::error::{RagError, RagResult};
use crate::index::{build_index, Index};
use crate::retrieve::RetrievalHit;
use ragchat_embeddings::{Chunker, Embedder};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

/// Snapshot of the engine state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexStatus {
    /// False until a generation has been built successfully.
    pub ready: bool,
    pub chunks: usize,
    pub generation: u64,
    pub dimension: usize,
    /// Error of the most recent failed rebuild, cleared on success.
    pub last_error: Option<String>,
}

/// Retrieval engine with an atomically swappable index.
pub struct RagEngine {
    embedder: Arc<dyn Embedder>,
    chunker: Chunker,
    index: RwLock<Option<Arc<Index>>>,
    corpus: RwLock<Arc<Vec<Document>>>,
    last_error: RwLock<Option<String>>,
    rebuild_lock: Mutex<()>,
}

impl RagEngine {
    /// Create an engine with no index and an empty corpus.
    pub fn new(embedder: Arc<dyn Embedder>, chunker: Chunker) -> Self {
        Self {
            embedder,
            chunker,
            index: RwLock::new(None),
            corpus: RwLock::new(Arc::new(Vec::new())),
            last_error: RwLock::new(None),
            rebuild_lock: Mutex::new(()),
        }
    }

    pub fn embedder(&self) -> &Arc<dyn Embedder> {
        &self.embedder
    }

    pub fn chunker(&self) -> &Chunker {
        &self.chunker
    }

    /// Name of the embedding model used for both chunks and queries.
    pub fn embed_model(&self) -> &str {
        self.embedder.model_name()
    }

    /// Current index generation, if one was ever built.
    pub async fn current(&self) -> Option<Arc<Index>> {
        self.index.read().await.clone()
    }

    /// Documents from the most recent successful load.
    pub async fn corpus(&self) -> Arc<Vec<Document>> {
        self.corpus.read().await.clone()
    }

    pub async fn status(&self) -> IndexStatus {
        let index = self.current().await;
        let last_error = self.last_error.read().await.clone();
        match index {
            Some(index) => IndexStatus {
                ready: true,
                chunks: index.len(),
                generation: index.generation(),
                dimension: index.dimension(),
                last_error,
            },
            None => IndexStatus {
                ready: false,
                chunks: 0,
                generation: 0,
                dimension: 0,
                last_error,
            },
        }
    }

    /// Replace the corpus with `documents` and index it.
    pub async fn rebuild(&self, documents: Vec<Document>) -> RagResult<Arc<Index>> {
        let _guard = self.rebuild_lock.lock().await;
        self.swap_corpus(documents).await;
        self.rebuild_locked().await
    }

    /// Re-read `source`, replace the corpus and index it.
    ///
    /// Loading runs on the blocking pool. The corpus is replaced as soon as
    /// loading succeeds, even if embedding then fails.
    pub async fn reload(&self, source: Arc<dyn DocumentSource>) -> RagResult<Arc<Index>> {
        let _guard = self.rebuild_lock.lock().await;

        let loader = source.clone();
        let loaded = tokio::task::spawn_blocking(move || loader.load())
            .await
            .map_err(|e| RagError::DocumentSource {
                path: source.describe(),
                source: std::io::Error::other(e),
            })
            .and_then(|result| result);

        let documents = match loaded {
            Ok(documents) => documents,
            Err(e) => {
                warn!(source = %source.describe(), error = %e, "failed to load documents");
                *self.last_error.write().await = Some(e.to_string());
                return Err(e);
            }
        };
        info!(source = %source.describe(), documents = documents.len(), "loaded documents");

        self.swap_corpus(documents).await;
        self.rebuild_locked().await
    }

    /// Top-`k` chunks of the current generation for `query`.
    pub async fn search(&self, query: &str, k: usize) -> RagResult<Vec<RetrievalHit>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(RagError::EmptyQuery);
        }
        let index = self.current().await.ok_or(RagError::RetrievalUnavailable)?;
        index.search(self.embedder.as_ref(), query, k).await
    }

    async fn swap_corpus(&self, documents: Vec<Document>) {
        *self.corpus.write().await = Arc::new(documents);
    }

    /// Caller holds `rebuild_lock`.
    async fn rebuild_locked(&self) -> RagResult<Arc<Index>> {
        let corpus = self.corpus().await;
        let generation = self.current().await.map_or(1, |i| i.generation() + 1);

        match build_index(&corpus, &self.chunker, self.embedder.as_ref(), generation).await {
            Ok(index) => {
                let index = Arc::new(index);
                *self.index.write().await = Some(index.clone());
                *self.last_error.write().await = None;
                info!(
                    generation,
                    chunks = index.len(),
                    dimension = index.dimension(),
                    model = self.embed_model(),
                    "index swapped"
                );
                Ok(index)
            }
            Err(e) => {
                warn!(generation, error = %e, "index rebuild failed, keeping previous generation");
                *self.last_error.write().await = Some(e.to_string());
                Err(e)
            }
        }
    }
}

impl std::fmt::Debug for RagEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RagEngine")
            .field("embed_model", &self.embed_model())
            .field("chunker", &self.chunker)
            .finish_non_exhaustive()
    }
}
