//! Core chat backend trait.

use crate::types::ChatRequest;
use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use std::sync::Mutex;
use thiserror::Error;

/// LLM-related errors.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Inference service returned {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Timeout after {0} seconds")]
    Timeout(u64),
}

impl LlmError {
    /// HTTP status reported by the upstream service, if any.
    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            Self::Upstream { status, .. } => Some(*status),
            Self::ModelNotFound(_) => Some(404),
            _ => None,
        }
    }
}

/// Result type for LLM operations.
pub type LlmResult<T> = Result<T, LlmError>;

/// Incremental answer text. Finite and not restartable.
pub type FragmentStream = BoxStream<'static, LlmResult<String>>;

/// Placeholder answer when the model returns nothing.
pub const EMPTY_ANSWER: &str = "[no response from model]";

/// Configuration for chat requests.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Default model name.
    pub model: String,
    /// Context window passed as `num_ctx`.
    pub num_ctx: u32,
    /// Maximum tokens to generate for complete answers.
    pub num_predict: u32,
    /// Maximum tokens to generate for streamed answers.
    pub stream_num_predict: u32,
    /// Sampling temperature.
    pub temperature: f32,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Static bearer token forwarded as `Authorization` (optional).
    pub auth_token: Option<String>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "qwen2.5:1.5b-instruct".to_string(),
            num_ctx: 2048,
            num_predict: 200,
            stream_num_predict: 160,
            temperature: 0.3,
            timeout_secs: 120,
            auth_token: None,
        }
    }
}

impl LlmConfig {
    /// Set the model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature.clamp(0.0, 2.0);
        self
    }

    /// Set timeout.
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Set the bearer token.
    pub fn with_auth_token(mut self, token: Option<String>) -> Self {
        self.auth_token = token;
        self
    }

    /// Model to use for a request, honoring its override.
    pub fn model_for<'a>(&'a self, request: &'a ChatRequest) -> &'a str {
        request.model.as_deref().unwrap_or(&self.model)
    }
}

/// Core trait for chat backends.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Get the backend name.
    fn name(&self) -> &str;

    /// Get the current configuration.
    fn config(&self) -> &LlmConfig;

    /// Generate a complete answer.
    async fn chat(&self, request: ChatRequest) -> LlmResult<String>;

    /// Generate an answer as a stream of text fragments.
    async fn chat_stream(&self, request: ChatRequest) -> LlmResult<FragmentStream>;

    /// Check if the backend is reachable.
    async fn health_check(&self) -> LlmResult<bool> {
        Ok(true)
    }
}

/// A mock backend for testing.
///
/// Answers with the first canned response whose pattern occurs in the user
/// message or system prompt, else the default response. Streams word by
/// word and records every request it receives.
pub struct MockBackend {
    config: LlmConfig,
    responses: Vec<(String, String)>,
    default_response: String,
    fail_with: Option<u16>,
    fail_mid_stream: bool,
    reachable: bool,
    requests: Mutex<Vec<ChatRequest>>,
}

impl MockBackend {
    /// Create a new mock backend.
    pub fn new() -> Self {
        Self {
            config: LlmConfig::default().with_model("mock-model"),
            responses: Vec::new(),
            default_response: "Mock response".to_string(),
            fail_with: None,
            fail_mid_stream: false,
            reachable: true,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Set the default model.
    pub fn with_model(mut self, model: &str) -> Self {
        self.config = self.config.with_model(model);
        self
    }

    /// Add a canned response for a prompt pattern.
    pub fn with_response(mut self, pattern: &str, response: &str) -> Self {
        self.responses.push((pattern.to_string(), response.to_string()));
        self
    }

    /// Answer used when no pattern matches.
    pub fn with_default_response(mut self, response: &str) -> Self {
        self.default_response = response.to_string();
        self
    }

    /// Make every call fail with the given upstream status.
    pub fn failing(mut self, status: u16) -> Self {
        self.fail_with = Some(status);
        self
    }

    /// Break streams with a connection error after the first fragment.
    pub fn failing_mid_stream(mut self) -> Self {
        self.fail_mid_stream = true;
        self
    }

    /// Report the backend as unreachable from `health_check`.
    pub fn unreachable(mut self) -> Self {
        self.reachable = false;
        self
    }

    /// Every request received so far, oldest first.
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// The most recent request.
    pub fn last_request(&self) -> Option<ChatRequest> {
        self.requests().pop()
    }

    fn answer(&self, request: ChatRequest) -> LlmResult<String> {
        let answer = self
            .responses
            .iter()
            .find(|(pattern, _)| request.user.contains(pattern) || request.system.contains(pattern))
            .map(|(_, response)| response.clone())
            .unwrap_or_else(|| self.default_response.clone());
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(request);

        if let Some(status) = self.fail_with {
            return Err(LlmError::Upstream {
                status,
                body: "mock failure".to_string(),
            });
        }
        Ok(answer)
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatBackend for MockBackend {
    fn name(&self) -> &str {
        "mock"
    }

    fn config(&self) -> &LlmConfig {
        &self.config
    }

    async fn chat(&self, request: ChatRequest) -> LlmResult<String> {
        self.answer(request)
    }

    async fn chat_stream(&self, request: ChatRequest) -> LlmResult<FragmentStream> {
        let answer = self.answer(request)?;
        let mut fragments: Vec<LlmResult<String>> = answer
            .split_inclusive(' ')
            .map(|word| Ok(word.to_string()))
            .collect();
        if self.fail_mid_stream {
            fragments.truncate(1);
            fragments.push(Err(LlmError::ConnectionFailed("stream reset".to_string())));
        }
        Ok(stream::iter(fragments).boxed())
    }

    async fn health_check(&self) -> LlmResult<bool> {
        Ok(self.reachable)
    }
}
