//! JSON endpoints: health, chat, retrieval chat, rebuild and bench.

use crate::error::ApiError;
use crate::state::AppState;
use axum::{extract::State, response::Redirect, Json};
use ragchat_rag::{assemble, assemble_rag, RetrievalHit};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Upper bound on the reachability check done by `/health`.
const BACKEND_PROBE_TIMEOUT: Duration = Duration::from_secs(2);

const BENCH_QUESTION: &str = "Give me a short summary of the reference texts.";
const BENCH_ANSWER_CHARS: usize = 200;

/// Trimmed question, or 400 when blank.
pub(crate) fn require_question(question: &str) -> Result<&str, ApiError> {
    let question = question.trim();
    if question.is_empty() {
        return Err(ApiError::bad_request("question is empty"));
    }
    Ok(question)
}

pub async fn root() -> Redirect {
    Redirect::temporary("/health")
}

#[derive(Debug, Serialize)]
pub struct RagHealth {
    pub ready: bool,
    pub chunks: usize,
    pub generation: u64,
    pub embed_model: String,
    pub last_error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub sections: Vec<String>,
    pub model: String,
    pub ollama_url: String,
    pub ollama_reachable: bool,
    pub rag: RagHealth,
}

/// Loaded sections, backend reachability and index status.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let corpus = state.engine.corpus().await;
    let status = state.engine.status().await;
    let ollama_reachable =
        match tokio::time::timeout(BACKEND_PROBE_TIMEOUT, state.backend.health_check()).await {
            Ok(Ok(reachable)) => reachable,
            Ok(Err(e)) => {
                debug!(error = %e, "backend health check failed");
                false
            }
            Err(_) => false,
        };

    Json(HealthResponse {
        ok: true,
        sections: corpus.iter().map(|d| d.name.clone()).collect(),
        model: state.backend.config().model.clone(),
        ollama_url: state.config.ollama.url.clone(),
        ollama_reachable,
        rag: RagHealth {
            ready: status.ready,
            chunks: status.chunks,
            generation: status.generation,
            embed_model: state.engine.embed_model().to_string(),
            last_error: status.last_error,
        },
    })
}

#[derive(Debug, Deserialize)]
pub struct ChatBody {
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub model: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub answer: String,
    pub model: String,
}

/// Answer with the whole corpus in the system prompt.
pub async fn chat(
    State(state): State<AppState>,
    Json(body): Json<ChatBody>,
) -> Result<Json<ChatResponse>, ApiError> {
    let question = require_question(&body.question)?;
    let corpus = state.engine.corpus().await;

    let request = state.chat_request(assemble(&state.persona, &corpus), question, body.model);
    let model = state.model_for(&request);
    let answer = state.backend.chat(request).await?;

    Ok(Json(ChatResponse { answer, model }))
}

#[derive(Debug, Deserialize)]
pub struct RagChatBody {
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub top_k: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct HitSummary {
    pub section: String,
    pub chunk_id: usize,
    pub score: f32,
}

impl From<&RetrievalHit> for HitSummary {
    fn from(hit: &RetrievalHit) -> Self {
        Self {
            section: hit.chunk.section.clone(),
            chunk_id: hit.chunk.chunk_id,
            score: hit.score,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RagChatResponse {
    pub answer: String,
    pub model: String,
    pub top_k: usize,
    pub hits: Vec<HitSummary>,
}

/// Answer from the top-k retrieved chunks.
pub async fn chat_rag(
    State(state): State<AppState>,
    Json(body): Json<RagChatBody>,
) -> Result<Json<RagChatResponse>, ApiError> {
    let question = require_question(&body.question)?;

    match state.engine.current().await {
        None => return Err(ApiError::unavailable("RAG index is not ready")),
        Some(index) if index.is_empty() => {
            return Err(ApiError::unavailable("RAG index is empty"));
        }
        Some(_) => {}
    }

    let k = state.top_k(body.top_k);
    let hits = state.engine.search(question, k).await?;

    let system = assemble_rag(&state.persona, question, &hits);
    let request = state.chat_request(system, question, body.model);
    let model = state.model_for(&request);
    let answer = state.backend.chat(request).await?;

    Ok(Json(RagChatResponse {
        answer,
        model,
        top_k: k,
        hits: hits.iter().map(HitSummary::from).collect(),
    }))
}

#[derive(Debug, Serialize)]
pub struct RebuildResponse {
    pub ok: bool,
    pub chunks: usize,
    pub generation: u64,
}

/// Reload the documents and rebuild the index.
pub async fn rebuild(State(state): State<AppState>) -> Result<Json<RebuildResponse>, ApiError> {
    let index = state.engine.reload(state.source.clone()).await?;
    info!(chunks = index.len(), generation = index.generation(), "rebuild requested and completed");

    Ok(Json(RebuildResponse {
        ok: true,
        chunks: index.len(),
        generation: index.generation(),
    }))
}

#[derive(Debug, Serialize)]
pub struct BenchResponse {
    pub model: String,
    pub latency_sec: f64,
    pub chars: usize,
    pub answer: String,
}

/// Time one full-corpus answer.
pub async fn bench(
    State(state): State<AppState>,
    Json(body): Json<ChatBody>,
) -> Result<Json<BenchResponse>, ApiError> {
    let question = match body.question.trim() {
        "" => BENCH_QUESTION,
        q => q,
    };
    let corpus = state.engine.corpus().await;

    let request = state.chat_request(assemble(&state.persona, &corpus), question, body.model);
    let model = state.model_for(&request);

    let started = Instant::now();
    let answer = state.backend.chat(request).await?;
    let elapsed = started.elapsed().as_secs_f64();

    Ok(Json(BenchResponse {
        model,
        latency_sec: (elapsed * 1000.0).round() / 1000.0,
        chars: answer.chars().count(),
        answer: answer.chars().take(BENCH_ANSWER_CHARS).collect(),
    }))
}
