//! HTTP routes for the chat server.

mod api;
mod stream;

use crate::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;

/// Create the main router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(api::root))
        .route("/health", get(api::health))
        // Chat
        .route("/chat", post(api::chat))
        .route("/chat_rag", post(api::chat_rag))
        .route("/chat_stream", post(stream::chat_stream))
        .route("/bench", post(api::bench))
        // Index management
        .route("/rag/rebuild", post(api::rebuild))
        // Browser frontends call from another origin
        .layer(CorsLayer::permissive())
        .with_state(state)
}
