//! HTTP error responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use ragchat_embeddings::EmbeddingError;
use ragchat_llm::LlmError;
use ragchat_rag::RagError;
use serde_json::json;
use tracing::warn;

/// An error rendered as `{"detail": "..."}` with a status code.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub detail: String,
}

impl ApiError {
    pub fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }

    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, detail)
    }

    pub fn unavailable(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, detail)
    }

    pub fn internal(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, detail)
    }
}

/// Upstream status if it is an error status, else 502.
fn upstream_status(status: u16) -> StatusCode {
    StatusCode::from_u16(status)
        .ok()
        .filter(|s| s.is_client_error() || s.is_server_error())
        .unwrap_or(StatusCode::BAD_GATEWAY)
}

impl From<EmbeddingError> for ApiError {
    fn from(err: EmbeddingError) -> Self {
        let status = match &err {
            EmbeddingError::Upstream { status, .. } => upstream_status(*status),
            EmbeddingError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            EmbeddingError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::BAD_GATEWAY,
        };
        Self::new(status, format!("Embedding error: {err}"))
    }
}

impl From<LlmError> for ApiError {
    fn from(err: LlmError) -> Self {
        let status = match &err {
            LlmError::Upstream { status, .. } => upstream_status(*status),
            LlmError::ModelNotFound(_) => StatusCode::NOT_FOUND,
            LlmError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            LlmError::ConnectionFailed(_) | LlmError::InvalidResponse(_) => StatusCode::BAD_GATEWAY,
        };
        Self::new(status, format!("Ollama error: {err}"))
    }
}

impl From<RagError> for ApiError {
    fn from(err: RagError) -> Self {
        match err {
            RagError::EmptyQuery => Self::bad_request("question is empty"),
            RagError::RetrievalUnavailable => Self::unavailable("RAG index is not ready"),
            RagError::Embedding(e) => e.into(),
            RagError::IndexBuild(_) | RagError::DocumentSource { .. } => {
                Self::internal(format!("RAG rebuild error: {err}"))
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            warn!(status = %self.status, detail = %self.detail, "request failed");
        }
        (self.status, Json(json!({ "detail": self.detail }))).into_response()
    }
}
