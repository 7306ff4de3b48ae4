//! # ragchat Web
//!
//! HTTP chat server that answers from a local document corpus, either with
//! the whole corpus in the prompt or with the top-k retrieved chunks.
//!
//! ## Quick Start
//!
//! ```bash
//! # Put *.txt files in ./context, start Ollama, then:
//! cargo run -p ragchat-web -- --port 8080
//! ```
//!
//! ## API Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | GET | `/` | Redirect to `/health` |
//! | GET | `/health` | Sections, models and index status |
//! | POST | `/chat` | Answer with the full corpus |
//! | POST | `/chat_rag` | Answer with retrieved chunks |
//! | POST | `/chat_stream` | Streamed answer over SSE |
//! | POST | `/rag/rebuild` | Reload documents and rebuild the index |
//! | POST | `/bench` | Time one full-corpus answer |

pub mod config;
pub mod error;
pub mod routes;
pub mod state;

pub use config::Config;
pub use error::ApiError;
pub use state::AppState;
