//! Application state for the web server.
//!
//! Everything is shared behind `Arc`; the index itself lives in the
//! [`RagEngine`], which swaps generations without blocking readers.

use crate::config::{Config, EmbedProvider};
use anyhow::{Context, Result};
use ragchat_embeddings::{
    ChunkConfig, Chunker, Embedder, OllamaEmbedConfig, OllamaEmbedder, SimpleEmbedder,
};
use ragchat_llm::{ChatBackend, ChatRequest, LlmConfig, OllamaBackend};
use ragchat_rag::{user_message, DirectorySource, DocumentSource, RagEngine};
use std::sync::Arc;
use tracing::{info, warn};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub engine: Arc<RagEngine>,
    pub source: Arc<dyn DocumentSource>,
    pub backend: Arc<dyn ChatBackend>,
    /// Persona preamble opening every system prompt.
    pub persona: Arc<str>,
}

impl AppState {
    /// Wire up Ollama clients and the context directory from `config`.
    pub fn from_config(config: Config) -> Result<Self> {
        let embedder: Arc<dyn Embedder> = match config.rag.embed_provider {
            EmbedProvider::Ollama => {
                let embed_config = OllamaEmbedConfig::new(&config.ollama.url, &config.ollama.embed_model)
                    .with_timeout(config.ollama.embed_timeout_secs)
                    .with_auth_token(config.ollama.auth_token.clone());
                Arc::new(OllamaEmbedder::new(embed_config).context("Failed to create embedding client")?)
            }
            EmbedProvider::Hash => Arc::new(SimpleEmbedder::default()),
        };

        let generation = &config.generation;
        let llm_config = LlmConfig {
            model: config.ollama.model.clone(),
            num_ctx: generation.num_ctx,
            num_predict: generation.num_predict,
            stream_num_predict: generation.stream_num_predict,
            temperature: generation.temperature,
            timeout_secs: config.ollama.timeout_secs,
            auth_token: config.ollama.auth_token.clone(),
        };
        let backend = OllamaBackend::with_config(&config.ollama.url, llm_config)
            .context("Failed to create chat client")?;

        let source = DirectorySource::new(&config.rag.context_dir).with_extension(&config.rag.extension);

        Self::with_components(config, embedder, Arc::new(backend), Arc::new(source))
    }

    /// Assemble state from explicit components.
    pub fn with_components(
        config: Config,
        embedder: Arc<dyn Embedder>,
        backend: Arc<dyn ChatBackend>,
        source: Arc<dyn DocumentSource>,
    ) -> Result<Self> {
        let persona = config.persona()?;
        let chunker = Chunker::new(ChunkConfig::new(config.rag.chunk_size, config.rag.chunk_overlap));
        let engine = RagEngine::new(embedder, chunker);

        Ok(Self {
            config: Arc::new(config),
            engine: Arc::new(engine),
            source,
            backend,
            persona: persona.into(),
        })
    }

    /// Load documents and build the first index generation.
    ///
    /// A failed build is logged and leaves retrieval unavailable; the
    /// full-corpus endpoints keep working.
    pub async fn initialize(&self) {
        match self.engine.reload(self.source.clone()).await {
            Ok(index) => info!(
                chunks = index.len(),
                sections = self.engine.corpus().await.len(),
                "RAG index ready"
            ),
            Err(e) => warn!(error = %e, "initial RAG index build failed, retrieval disabled until rebuild"),
        }
    }

    /// `top_k` from a request, where absent or 0 means the configured default.
    pub fn top_k(&self, requested: Option<usize>) -> usize {
        requested
            .filter(|k| *k > 0)
            .unwrap_or(self.config.rag.top_k)
    }

    /// A chat request with the given system prompt and the user's question.
    pub fn chat_request(&self, system: String, question: &str, model: Option<String>) -> ChatRequest {
        let instruction = self.config.generation.answer_instruction.as_deref();
        ChatRequest::new(system, user_message(question, instruction))
            .with_model(model.filter(|m| !m.trim().is_empty()))
    }

    /// Model that will answer a request.
    pub fn model_for(&self, request: &ChatRequest) -> String {
        self.backend.config().model_for(request).to_string()
    }
}
