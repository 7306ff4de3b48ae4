//! # ragchat LLM
//!
//! Chat inference for ragchat. A [`ChatBackend`] takes an assembled system
//! prompt plus the user's message and returns either the whole answer or a
//! [`FragmentStream`] of incremental text.
//!
//! ## Features
//!
//! - `ollama` (default): [`OllamaBackend`] talking to `/api/chat`
//!
//! ## Usage
//!
//! ```rust,ignore
//! use ragchat_llm::{ChatBackend, ChatRequest, OllamaBackend};
//!
//! let backend = OllamaBackend::new("http://localhost:11434")?;
//! let answer = backend.chat(ChatRequest::new(system_prompt, question)).await?;
//! ```

mod backend;
mod types;

pub use backend::{
    ChatBackend, FragmentStream, LlmConfig, LlmError, LlmResult, MockBackend, EMPTY_ANSWER,
};
pub use types::{ChatMessage, ChatRequest, Role};

#[cfg(feature = "ollama")]
mod ollama;
#[cfg(feature = "ollama")]
pub use ollama::OllamaBackend;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::{ChatBackend, ChatRequest, FragmentStream, LlmConfig, LlmError, LlmResult};

    #[cfg(feature = "ollama")]
    pub use crate::OllamaBackend;
}
