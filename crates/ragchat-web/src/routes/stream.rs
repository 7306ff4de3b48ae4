//! Server-sent events relay for streamed answers.

use super::api::require_question;
use crate::error::ApiError;
use crate::state::AppState;
use async_stream::stream;
use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use futures::{Stream, StreamExt};
use ragchat_rag::{assemble, assemble_rag, RagError};
use serde::Deserialize;
use std::convert::Infallible;
use tracing::{debug, warn};

fn default_use_rag() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct StreamBody {
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default = "default_use_rag")]
    pub use_rag: bool,
    #[serde(default)]
    pub top_k: Option<usize>,
}

async fn corpus_prompt(state: &AppState) -> String {
    assemble(&state.persona, &state.engine.corpus().await)
}

/// Build the system prompt for a streamed answer.
///
/// Retrieval mode falls back to the full corpus when no index is usable.
async fn system_prompt(state: &AppState, question: &str, body: &StreamBody) -> Result<String, ApiError> {
    if !body.use_rag {
        return Ok(corpus_prompt(state).await);
    }

    match state.engine.current().await {
        Some(index) if !index.is_empty() => {}
        _ => {
            warn!("RAG index unavailable or empty, streaming with the full corpus");
            return Ok(corpus_prompt(state).await);
        }
    }

    match state.engine.search(question, state.top_k(body.top_k)).await {
        Ok(hits) => Ok(assemble_rag(&state.persona, question, &hits)),
        Err(RagError::RetrievalUnavailable) => {
            warn!("RAG index unavailable, streaming with the full corpus");
            Ok(corpus_prompt(state).await)
        }
        Err(e) => Err(e.into()),
    }
}

/// SSE data lines cannot carry carriage returns.
fn sse_data(text: &str) -> String {
    text.replace('\r', "")
}

/// Stream the answer as `data:` events, ending with `event: done`.
pub async fn chat_stream(
    State(state): State<AppState>,
    Json(body): Json<StreamBody>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let question = require_question(&body.question)?.to_string();
    let system = system_prompt(&state, &question, &body).await?;

    let request = state.chat_request(system, &question, body.model);
    let mut fragments = state.backend.chat_stream(request).await?;

    let events = stream! {
        while let Some(item) = fragments.next().await {
            match item {
                Ok(fragment) => {
                    yield Ok(Event::default().data(sse_data(&fragment)));
                }
                Err(e) => {
                    warn!(error = %e, "answer stream failed");
                    yield Ok(Event::default().event("error").data(sse_data(&e.to_string())));
                    break;
                }
            }
        }
        debug!("answer stream finished");
        yield Ok(Event::default().event("done").data("[DONE]"));
    };

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}
