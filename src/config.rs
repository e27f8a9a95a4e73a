use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use docchat_core::chunk::DEFAULT_WORDS_PER_CHUNK;
use docchat_core::context::DEFAULT_EXCERPT_CHARS;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub project: ProjectConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_words_per_chunk")]
    pub words_per_chunk: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            words_per_chunk: default_words_per_chunk(),
        }
    }
}

fn default_words_per_chunk() -> usize {
    DEFAULT_WORDS_PER_CHUNK
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default = "default_max_cached_contexts")]
    pub max_cached_contexts: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            max_cached_contexts: default_max_cached_contexts(),
        }
    }
}

fn default_top_k() -> usize {
    3
}
fn default_max_cached_contexts() -> usize {
    8
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
    /// Base URL for the Ollama provider.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "disabled".to_string(),
            model: None,
            dims: None,
            url: None,
            batch_size: 64,
            max_retries: 5,
            timeout_secs: 30,
        }
    }
}

fn default_provider() -> String {
    "disabled".to_string()
}
fn default_batch_size() -> usize {
    64
}
fn default_max_retries() -> u32 {
    5
}
fn default_timeout_secs() -> u64 {
    30
}

impl EmbeddingConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct GenerationConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    /// Base URL for the Ollama provider.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_generation_retries")]
    pub max_retries: u32,
    #[serde(default = "default_generation_timeout_secs")]
    pub timeout_secs: u64,
    /// Upper bound on the whole generation step; `0` disables it.
    #[serde(default)]
    pub answer_timeout_secs: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: "disabled".to_string(),
            model: None,
            url: None,
            max_tokens: 100,
            temperature: 0.7,
            max_retries: 2,
            timeout_secs: 60,
            answer_timeout_secs: 0,
        }
    }
}

fn default_max_tokens() -> u32 {
    100
}
fn default_temperature() -> f32 {
    0.7
}
fn default_generation_retries() -> u32 {
    2
}
fn default_generation_timeout_secs() -> u64 {
    60
}

impl GenerationConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }

    pub fn answer_timeout(&self) -> Option<Duration> {
        (self.answer_timeout_secs > 0).then(|| Duration::from_secs(self.answer_timeout_secs))
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ProjectConfig {
    #[serde(default = "default_excerpt_chars")]
    pub excerpt_chars: usize,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            excerpt_chars: default_excerpt_chars(),
        }
    }
}

fn default_excerpt_chars() -> usize {
    DEFAULT_EXCERPT_CHARS
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    parse_config(&content)
}

/// Parse and validate TOML configuration text.
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    // Validate chunking
    if config.chunking.words_per_chunk == 0 {
        anyhow::bail!("chunking.words_per_chunk must be > 0");
    }

    // Validate retrieval
    if config.retrieval.top_k == 0 {
        anyhow::bail!("retrieval.top_k must be > 0");
    }
    if config.retrieval.max_cached_contexts == 0 {
        anyhow::bail!("retrieval.max_cached_contexts must be > 0");
    }

    // Validate embedding
    if config.embedding.batch_size == 0 {
        anyhow::bail!("embedding.batch_size must be > 0");
    }
    if config.embedding.dims == Some(0) {
        anyhow::bail!("embedding.dims must be > 0 when set");
    }
    match config.embedding.provider.as_str() {
        "disabled" | "local" => {}
        "openai" | "ollama" => {
            if config.embedding.model.is_none() {
                anyhow::bail!(
                    "embedding.model must be specified when provider is '{}'",
                    config.embedding.provider
                );
            }
        }
        other => anyhow::bail!(
            "Unknown embedding provider: '{}'. Must be disabled, openai, ollama, or local.",
            other
        ),
    }

    // Validate generation
    if !(0.0..=2.0).contains(&config.generation.temperature) {
        anyhow::bail!("generation.temperature must be in [0.0, 2.0]");
    }
    match config.generation.provider.as_str() {
        "disabled" => {}
        "openai" | "ollama" => {
            if config.generation.model.is_none() {
                anyhow::bail!(
                    "generation.model must be specified when provider is '{}'",
                    config.generation.provider
                );
            }
        }
        other => anyhow::bail!(
            "Unknown generation provider: '{}'. Must be disabled, openai, or ollama.",
            other
        ),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config.chunking.words_per_chunk, 300);
        assert_eq!(config.retrieval.top_k, 3);
        assert!(!config.embedding.is_enabled());
        assert!(!config.generation.is_enabled());
        assert_eq!(config.generation.answer_timeout(), None);
        assert_eq!(config.project.excerpt_chars, 1000);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_full_config() {
        let config = parse_config(
            r#"
[chunking]
words_per_chunk = 120

[retrieval]
top_k = 5

[embedding]
provider = "ollama"
model = "nomic-embed-text"
dims = 768
url = "http://127.0.0.1:11434"

[generation]
provider = "openai"
model = "gpt-4o-mini"
max_tokens = 256
temperature = 0.2
answer_timeout_secs = 20
"#,
        )
        .unwrap();
        assert_eq!(config.chunking.words_per_chunk, 120);
        assert_eq!(config.retrieval.top_k, 5);
        assert_eq!(config.retrieval.max_cached_contexts, 8);
        assert_eq!(config.embedding.dims, Some(768));
        assert_eq!(config.generation.max_tokens, 256);
        assert_eq!(
            config.generation.answer_timeout(),
            Some(Duration::from_secs(20))
        );
    }

    #[test]
    fn test_rejects_zero_chunk_size() {
        let err = parse_config("[chunking]\nwords_per_chunk = 0\n").unwrap_err();
        assert!(err.to_string().contains("words_per_chunk"));
    }

    #[test]
    fn test_rejects_zero_top_k() {
        assert!(parse_config("[retrieval]\ntop_k = 0\n").is_err());
    }

    #[test]
    fn test_rejects_unknown_providers() {
        assert!(parse_config("[embedding]\nprovider = \"magic\"\n").is_err());
        assert!(parse_config("[generation]\nprovider = \"local\"\n").is_err());
    }

    #[test]
    fn test_network_providers_need_model() {
        assert!(parse_config("[embedding]\nprovider = \"openai\"\n").is_err());
        assert!(parse_config("[generation]\nprovider = \"ollama\"\n").is_err());
        assert!(parse_config("[embedding]\nprovider = \"local\"\n").is_ok());
    }

    #[test]
    fn test_rejects_out_of_range_temperature() {
        assert!(parse_config("[generation]\ntemperature = 3.5\n").is_err());
    }

    #[test]
    fn test_example_config_parses() {
        let config = parse_config(include_str!("../config/docchat.example.toml")).unwrap();
        assert_eq!(config.embedding.provider, "local");
        assert_eq!(config.generation.model.as_deref(), Some("llama3.2"));
        assert_eq!(config.generation.answer_timeout(), None);
    }
}
