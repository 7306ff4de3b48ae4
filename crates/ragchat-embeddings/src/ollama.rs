//! Ollama `/api/embeddings` client.
//!
//! Requires the `ollama` feature.

use crate::{Embedder, EmbeddingError, EmbeddingResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Configuration for the Ollama embedding client.
#[derive(Debug, Clone)]
pub struct OllamaEmbedConfig {
    /// Base URL of the Ollama service, without trailing slash.
    pub base_url: String,
    /// Embedding model name.
    pub model: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Static bearer token forwarded as `Authorization` (optional).
    pub auth_token: Option<String>,
}

impl OllamaEmbedConfig {
    /// Create config for an Ollama instance.
    pub fn new(base_url: &str, model: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            timeout_secs: 60,
            auth_token: None,
        }
    }

    /// Config for a local Ollama with `nomic-embed-text`.
    pub fn localhost() -> Self {
        Self::new("http://localhost:11434", "nomic-embed-text")
    }

    /// Set timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Set the bearer token.
    pub fn with_auth_token(mut self, token: Option<String>) -> Self {
        self.auth_token = token;
        self
    }
}

/// One text goes out as a scalar, several as an array.
#[derive(Debug, Serialize)]
#[serde(untagged)]
enum EmbedInput<'a> {
    One(&'a str),
    Many(&'a [String]),
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: EmbedInput<'a>,
}

/// The two response shapes the service is known to produce.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum EmbedResponse {
    Batch { embeddings: Vec<Vec<f32>> },
    Single { embedding: Vec<f32> },
}

impl EmbedResponse {
    fn into_vectors(self) -> Vec<Vec<f32>> {
        match self {
            Self::Batch { embeddings } => embeddings,
            Self::Single { embedding } => vec![embedding],
        }
    }
}

/// Embedder backed by an Ollama-compatible embedding endpoint.
///
/// # Example
///
/// ```rust,ignore
/// use ragchat_embeddings::{Embedder, OllamaEmbedConfig, OllamaEmbedder};
///
/// let embedder = OllamaEmbedder::new(OllamaEmbedConfig::localhost())?;
/// let vectors = embedder.embed_batch(&["hello".into(), "world".into()]).await?;
/// ```
pub struct OllamaEmbedder {
    config: OllamaEmbedConfig,
    client: reqwest::Client,
}

impl OllamaEmbedder {
    /// Create a new embedder with the given config.
    pub fn new(config: OllamaEmbedConfig) -> EmbeddingResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| EmbeddingError::Transport(e.to_string()))?;

        Ok(Self { config, client })
    }

    /// The config this client was built with.
    pub fn config(&self) -> &OllamaEmbedConfig {
        &self.config
    }

    fn endpoint(&self) -> String {
        format!("{}/api/embeddings", self.config.base_url)
    }

    fn map_send_error(&self, e: reqwest::Error) -> EmbeddingError {
        if e.is_timeout() {
            EmbeddingError::Timeout(self.config.timeout_secs)
        } else {
            EmbeddingError::Transport(e.to_string())
        }
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> EmbeddingResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let input = match texts {
            [one] => EmbedInput::One(one),
            many => EmbedInput::Many(many),
        };
        let request = EmbedRequest {
            model: &self.config.model,
            input,
        };

        debug!(count = texts.len(), model = %self.config.model, "requesting embeddings");

        let mut builder = self.client.post(self.endpoint()).json(&request);
        if let Some(token) = &self.config.auth_token {
            builder = builder.bearer_auth(token);
        }

        let response = builder.send().await.map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| self.map_send_error(e))?;

        if !status.is_success() {
            return Err(EmbeddingError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let vectors = serde_json::from_str::<EmbedResponse>(&body)
            .map_err(|_| EmbeddingError::UnexpectedResponse(truncate(&body, 200)))?
            .into_vectors();

        if vectors.len() != texts.len() {
            return Err(EmbeddingError::CountMismatch {
                expected: texts.len(),
                got: vectors.len(),
            });
        }

        Ok(vectors)
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
