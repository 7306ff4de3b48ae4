//! Server configuration.
//!
//! Loaded from `ragchat.toml` (current or a parent directory, or an explicit
//! path), then overridden by environment variables. Every field has a default.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

const CONFIG_FILE: &str = "ragchat.toml";

/// Full server configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub ollama: OllamaConfig,
    #[serde(default)]
    pub rag: RagConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub prompt: PromptConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    /// Base URL shared by the chat and embedding endpoints.
    #[serde(default = "default_ollama_url")]
    pub url: String,
    /// Default chat model.
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_embed_model")]
    pub embed_model: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_embed_timeout_secs")]
    pub embed_timeout_secs: u64,
    /// Static bearer token sent with every upstream request.
    #[serde(default)]
    pub auth_token: Option<String>,
}

/// Which embedder indexes the corpus.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbedProvider {
    #[default]
    Ollama,
    /// Offline feature-hashing embedder.
    Hash,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagConfig {
    #[serde(default = "default_context_dir")]
    pub context_dir: PathBuf,
    #[serde(default = "default_extension")]
    pub extension: String,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default)]
    pub embed_provider: EmbedProvider,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(default = "default_num_ctx")]
    pub num_ctx: u32,
    #[serde(default = "default_num_predict")]
    pub num_predict: u32,
    #[serde(default = "default_stream_num_predict")]
    pub stream_num_predict: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Appended to every user turn, e.g. an answer length or language hint.
    #[serde(default)]
    pub answer_instruction: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptConfig {
    #[serde(default = "default_persona")]
    pub persona: String,
    /// File whose contents replace `persona`.
    #[serde(default)]
    pub persona_file: Option<PathBuf>,
}

// Default value functions
fn default_host() -> String { "127.0.0.1".to_string() }
fn default_port() -> u16 { 8080 }
fn default_ollama_url() -> String { "http://localhost:11434".to_string() }
fn default_model() -> String { "qwen2.5:1.5b-instruct".to_string() }
fn default_embed_model() -> String { "nomic-embed-text".to_string() }
fn default_timeout_secs() -> u64 { 120 }
fn default_embed_timeout_secs() -> u64 { 60 }
fn default_context_dir() -> PathBuf { PathBuf::from("context") }
fn default_extension() -> String { "txt".to_string() }
fn default_chunk_size() -> usize { 900 }
fn default_chunk_overlap() -> usize { 120 }
fn default_top_k() -> usize { 4 }
fn default_num_ctx() -> u32 { 2048 }
fn default_num_predict() -> u32 { 200 }
fn default_stream_num_predict() -> u32 { 160 }
fn default_temperature() -> f32 { 0.3 }
fn default_persona() -> String {
    "You are a concise, professional assistant. Answer using the reference \
     material provided and do not invent concrete facts."
        .to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            url: default_ollama_url(),
            model: default_model(),
            embed_model: default_embed_model(),
            timeout_secs: default_timeout_secs(),
            embed_timeout_secs: default_embed_timeout_secs(),
            auth_token: None,
        }
    }
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            context_dir: default_context_dir(),
            extension: default_extension(),
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            top_k: default_top_k(),
            embed_provider: EmbedProvider::default(),
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            num_ctx: default_num_ctx(),
            num_predict: default_num_predict(),
            stream_num_predict: default_stream_num_predict(),
            temperature: default_temperature(),
            answer_instruction: None,
        }
    }
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            persona: default_persona(),
            persona_file: None,
        }
    }
}

impl Config {
    /// Load from `path`, or from `ragchat.toml` in the current or a parent
    /// directory, or defaults. Environment overrides are applied and the
    /// result validated.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match find_config_file() {
                Some(path) => Self::from_file(&path)?,
                None => Config::default(),
            },
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config: {}", path.display()))
    }

    /// Apply `OLLAMA_URL`, `MODEL_NAME`, `EMBED_MODEL`, `CHUNK_SIZE`,
    /// `CHUNK_OVERLAP`, `TOP_K`, `CONTEXT_DIR`, `OLLAMA_AUTH_TOKEN`, `HOST`
    /// and `PORT` as returned by `lookup`.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("OLLAMA_URL") {
            self.ollama.url = v;
        }
        if let Some(v) = get("MODEL_NAME") {
            self.ollama.model = v;
        }
        if let Some(v) = get("EMBED_MODEL") {
            self.ollama.embed_model = v;
        }
        if let Some(v) = get("OLLAMA_AUTH_TOKEN") {
            self.ollama.auth_token = Some(v);
        }
        if let Some(v) = get("CHUNK_SIZE") {
            self.rag.chunk_size = parse_var("CHUNK_SIZE", &v)?;
        }
        if let Some(v) = get("CHUNK_OVERLAP") {
            self.rag.chunk_overlap = parse_var("CHUNK_OVERLAP", &v)?;
        }
        if let Some(v) = get("TOP_K") {
            self.rag.top_k = parse_var("TOP_K", &v)?;
        }
        if let Some(v) = get("CONTEXT_DIR") {
            self.rag.context_dir = PathBuf::from(v);
        }
        if let Some(v) = get("HOST") {
            self.server.host = v;
        }
        if let Some(v) = get("PORT") {
            self.server.port = parse_var("PORT", &v)?;
        }

        self.ollama.url = self.ollama.url.trim_end_matches('/').to_string();
        Ok(())
    }

    /// Reject settings the server cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.rag.chunk_size == 0 {
            bail!("rag.chunk_size must be greater than 0");
        }
        if self.rag.top_k == 0 {
            bail!("rag.top_k must be greater than 0");
        }
        if self.rag.chunk_overlap >= self.rag.chunk_size {
            warn!(
                chunk_size = self.rag.chunk_size,
                chunk_overlap = self.rag.chunk_overlap,
                "chunk_overlap >= chunk_size, overlap will be clamped"
            );
        }
        Ok(())
    }

    /// The persona preamble, read from `persona_file` when set.
    pub fn persona(&self) -> Result<String> {
        match &self.prompt.persona_file {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read persona: {}", path.display()))?;
                Ok(text.trim().to_string())
            }
            None => Ok(self.prompt.persona.trim().to_string()),
        }
    }

    /// Listen address as `host:port`.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Default config as a TOML string.
    pub fn default_toml() -> Result<String> {
        toml::to_string_pretty(&Config::default()).context("Failed to serialize config")
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid {key}={value:?}: {e}"))
}

/// Find ragchat.toml in current or parent directories.
fn find_config_file() -> Option<PathBuf> {
    let mut dir = std::env::current_dir().ok()?;
    loop {
        let config_path = dir.join(CONFIG_FILE);
        if config_path.exists() {
            return Some(config_path);
        }
        if !dir.pop() {
            return None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.ollama.url, "http://localhost:11434");
        assert_eq!(config.ollama.model, "qwen2.5:1.5b-instruct");
        assert_eq!(config.ollama.embed_model, "nomic-embed-text");
        assert_eq!(config.rag.chunk_size, 900);
        assert_eq!(config.rag.chunk_overlap, 120);
        assert_eq!(config.rag.top_k, 4);
        assert_eq!(config.generation.num_ctx, 2048);
        assert_eq!(config.generation.num_predict, 200);
        assert_eq!(config.generation.stream_num_predict, 160);
        assert_eq!(config.rag.embed_provider, EmbedProvider::Ollama);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
            [ollama]
            model = "llama3.2"

            [rag]
            top_k = 2
            embed_provider = "hash"
            "#,
        )
        .unwrap();
        assert_eq!(config.ollama.model, "llama3.2");
        assert_eq!(config.ollama.embed_model, "nomic-embed-text");
        assert_eq!(config.rag.top_k, 2);
        assert_eq!(config.rag.chunk_size, 900);
        assert_eq!(config.rag.embed_provider, EmbedProvider::Hash);
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config
            .apply_overrides(env(&[
                ("OLLAMA_URL", "http://ollama:11434/"),
                ("MODEL_NAME", "phi3"),
                ("CHUNK_SIZE", "500"),
                ("CHUNK_OVERLAP", "50"),
                ("TOP_K", " 6 "),
                ("CONTEXT_DIR", "/srv/context"),
                ("PORT", "9000"),
                ("EMBED_MODEL", ""),
            ]))
            .unwrap();
        assert_eq!(config.ollama.url, "http://ollama:11434");
        assert_eq!(config.ollama.model, "phi3");
        assert_eq!(config.ollama.embed_model, "nomic-embed-text");
        assert_eq!(config.rag.chunk_size, 500);
        assert_eq!(config.rag.chunk_overlap, 50);
        assert_eq!(config.rag.top_k, 6);
        assert_eq!(config.rag.context_dir, PathBuf::from("/srv/context"));
        assert_eq!(config.server.port, 9000);
    }

    #[test]
    fn test_bad_number_is_an_error() {
        let mut config = Config::default();
        let err = config
            .apply_overrides(env(&[("TOP_K", "many")]))
            .unwrap_err();
        assert!(err.to_string().contains("TOP_K"));
    }

    #[test]
    fn test_validate() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.rag.chunk_overlap = 2000;
        assert!(config.validate().is_ok());

        config.rag.top_k = 0;
        assert!(config.validate().is_err());

        config.rag.top_k = 4;
        config.rag.chunk_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_persona_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("persona.txt");
        std::fs::write(&path, "  You speak like a pirate.\n").unwrap();

        let mut config = Config::default();
        config.prompt.persona_file = Some(path);
        assert_eq!(config.persona().unwrap(), "You speak like a pirate.");

        config.prompt.persona_file = Some(dir.path().join("missing.txt"));
        assert!(config.persona().is_err());
    }

    #[test]
    fn test_default_toml_round_trips() {
        let text = Config::default_toml().unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed.rag.top_k, 4);
    }
}
