//! Ollama backend for chat inference.
//!
//! Requires the `ollama` feature and a reachable Ollama instance.

use crate::backend::{ChatBackend, FragmentStream, LlmConfig, LlmError, LlmResult, EMPTY_ANSWER};
use crate::types::{ChatMessage, ChatRequest};
use async_trait::async_trait;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Ollama `/api/chat` request.
#[derive(Debug, Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    stream: bool,
    messages: Vec<ChatMessage>,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    num_ctx: u32,
    num_predict: u32,
    temperature: f32,
}

/// One `/api/chat` response object; streaming sends one per line.
#[derive(Debug, Default, Deserialize)]
struct OllamaChatChunk {
    #[serde(default)]
    message: Option<OllamaChunkMessage>,
    #[serde(default)]
    response: Option<String>,
    #[serde(default)]
    done: bool,
}

#[derive(Debug, Default, Deserialize)]
struct OllamaChunkMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OllamaChatChunk {
    /// `message.content`, falling back to `response`. Empty strings count as absent.
    fn text(&self) -> Option<&str> {
        self.message
            .as_ref()
            .and_then(|m| m.content.as_deref())
            .filter(|s| !s.is_empty())
            .or_else(|| self.response.as_deref().filter(|s| !s.is_empty()))
    }
}

/// Parse one newline-delimited line of a streamed answer. Blank or undecodable lines yield `None`.
fn parse_stream_line(line: &[u8]) -> Option<OllamaChatChunk> {
    let line = String::from_utf8_lossy(line);
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    serde_json::from_str(line).ok()
}

/// Ollama backend for chat inference.
///
/// # Example
///
/// ```rust,ignore
/// use ragchat_llm::{ChatBackend, ChatRequest, LlmConfig, OllamaBackend};
///
/// let backend = OllamaBackend::with_config("http://localhost:11434", LlmConfig::default())?;
/// let answer = backend.chat(ChatRequest::new(system_prompt, "Who are you?")).await?;
/// ```
pub struct OllamaBackend {
    endpoint: String,
    config: LlmConfig,
    client: reqwest::Client,
}

impl OllamaBackend {
    /// Create a new Ollama backend with default config.
    pub fn new(endpoint: &str) -> LlmResult<Self> {
        Self::with_config(endpoint, LlmConfig::default())
    }

    /// Create with custom config.
    pub fn with_config(endpoint: &str, config: LlmConfig) -> LlmResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LlmError::ConnectionFailed(e.to_string()))?;

        Ok(Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            config,
            client,
        })
    }

    /// Base URL of the Ollama instance.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn map_send_error(&self, e: reqwest::Error) -> LlmError {
        map_reqwest_error(e, &self.endpoint, self.config.timeout_secs)
    }

    /// Send a chat request and return the successful response.
    async fn send(&self, request: &ChatRequest, stream: bool) -> LlmResult<reqwest::Response> {
        let model = self.config.model_for(request);
        let num_predict = if stream {
            self.config.stream_num_predict
        } else {
            self.config.num_predict
        };

        let payload = OllamaChatRequest {
            model,
            stream,
            messages: request.messages(),
            options: OllamaOptions {
                num_ctx: self.config.num_ctx,
                num_predict,
                temperature: self.config.temperature,
            },
        };

        let url = format!("{}/api/chat", self.endpoint);
        debug!(%url, model, stream, "sending chat request");

        let mut builder = self.client.post(&url).json(&payload);
        if let Some(token) = &self.config.auth_token {
            builder = builder.bearer_auth(token);
        }

        let response = builder.send().await.map_err(|e| self.map_send_error(e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();

            if status.as_u16() == 404 {
                return Err(LlmError::ModelNotFound(format!(
                    "Model '{}' not found ({}). Run: ollama pull {}",
                    model, body, model
                )));
            }

            return Err(LlmError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response)
    }
}

fn map_reqwest_error(e: reqwest::Error, endpoint: &str, timeout_secs: u64) -> LlmError {
    if e.is_timeout() {
        LlmError::Timeout(timeout_secs)
    } else if e.is_connect() {
        LlmError::ConnectionFailed(format!(
            "Cannot connect to Ollama at {}. Is Ollama running?",
            endpoint
        ))
    } else {
        LlmError::ConnectionFailed(e.to_string())
    }
}

#[async_trait]
impl ChatBackend for OllamaBackend {
    fn name(&self) -> &str {
        "ollama"
    }

    fn config(&self) -> &LlmConfig {
        &self.config
    }

    async fn chat(&self, request: ChatRequest) -> LlmResult<String> {
        let response = self.send(&request, false).await?;
        let body = response.text().await.map_err(|e| self.map_send_error(e))?;

        let chunk: OllamaChatChunk = serde_json::from_str(&body)
            .map_err(|e| LlmError::InvalidResponse(format!("{}: {}", e, body)))?;

        Ok(chunk
            .text()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(EMPTY_ANSWER)
            .to_string())
    }

    async fn chat_stream(&self, request: ChatRequest) -> LlmResult<FragmentStream> {
        let response = self.send(&request, true).await?;
        let endpoint = self.endpoint.clone();
        let timeout_secs = self.config.timeout_secs;
        let mut bytes = response.bytes_stream();

        let fragments = async_stream::stream! {
            let mut buffer: Vec<u8> = Vec::new();
            let mut finished = false;

            while !finished {
                let chunk = match bytes.next().await {
                    Some(Ok(chunk)) => chunk,
                    Some(Err(e)) => {
                        yield Err(map_reqwest_error(e, &endpoint, timeout_secs));
                        break;
                    }
                    None => break,
                };
                buffer.extend_from_slice(&chunk);

                while let Some(pos) = buffer.iter().position(|b| *b == b'\n') {
                    let line: Vec<u8> = buffer.drain(..=pos).collect();
                    if let Some(parsed) = parse_stream_line(&line) {
                        if let Some(text) = parsed.text() {
                            yield Ok(text.to_string());
                        }
                        if parsed.done {
                            finished = true;
                            break;
                        }
                    }
                }
            }

            // Final object without a trailing newline.
            if !finished {
                if let Some(parsed) = parse_stream_line(&buffer) {
                    if let Some(text) = parsed.text() {
                        yield Ok(text.to_string());
                    }
                }
            }
        };

        Ok(fragments.boxed())
    }

    async fn health_check(&self) -> LlmResult<bool> {
        let url = format!("{}/api/tags", self.endpoint);

        match self.client.get(&url).send().await {
            Ok(resp) => Ok(resp.status().is_success()),
            Err(_) => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ollama_config() {
        let backend =
            OllamaBackend::with_config("http://localhost:11434/", LlmConfig::default().with_model("mistral"))
                .unwrap();
        assert_eq!(backend.config.model, "mistral");
        assert_eq!(backend.endpoint(), "http://localhost:11434");
    }

    #[test]
    fn test_chunk_text_prefers_message_content() {
        let chunk: OllamaChatChunk = serde_json::from_str(
            r#"{"message": {"role": "assistant", "content": "hi"}, "response": "ignored"}"#,
        )
        .unwrap();
        assert_eq!(chunk.text(), Some("hi"));

        let chunk: OllamaChatChunk =
            serde_json::from_str(r#"{"message": {"content": ""}, "response": "fallback"}"#).unwrap();
        assert_eq!(chunk.text(), Some("fallback"));

        let chunk: OllamaChatChunk = serde_json::from_str(r#"{"done": true}"#).unwrap();
        assert_eq!(chunk.text(), None);
        assert!(chunk.done);
    }

    #[test]
    fn test_parse_stream_line() {
        assert!(parse_stream_line(b"").is_none());
        assert!(parse_stream_line(b"  \r\n").is_none());
        assert!(parse_stream_line(b"not json\n").is_none());

        let parsed = parse_stream_line(b"{\"response\":\"tok\",\"done\":false}\n").unwrap();
        assert_eq!(parsed.text(), Some("tok"));
        assert!(!parsed.done);
    }

    #[test]
    fn test_request_payload() {
        let payload = OllamaChatRequest {
            model: "qwen",
            stream: false,
            messages: ChatRequest::new("sys", "usr").messages(),
            options: OllamaOptions {
                num_ctx: 2048,
                num_predict: 200,
                temperature: 0.5,
            },
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "usr");
        assert_eq!(json["options"]["num_ctx"], 2048);
        assert_eq!(json["stream"], false);
    }
}
