//! Generation model implementations.
//!
//! Concrete [`Generator`]s for the providers selectable in `[generation]`:
//! - **[`OpenAiGenerator`]**: `POST /v1/chat/completions`.
//! - **[`OllamaGenerator`]**: `POST {url}/api/generate` with streaming off.
//!
//! Both send the prompt built by
//! [`build_prompt`](docchat_core::generation::build_prompt) and return the
//! raw completion; answer extraction and blank-output detection happen in
//! [`Generator::generate`]. `"disabled"` has no model and fails to load.

use async_trait::async_trait;
use std::sync::Arc;

use docchat_core::generation::Generator;
use docchat_core::RagError;

use crate::config::GenerationConfig;
use crate::http;

const OPENAI_CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";
const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// Build the generation model selected by `config`.
pub async fn load_generator(config: &GenerationConfig) -> Result<Arc<dyn Generator>, RagError> {
    match config.provider.as_str() {
        "disabled" => Err(RagError::generation("generation provider is disabled")),
        "openai" => Ok(Arc::new(OpenAiGenerator::new(config)?)),
        "ollama" => Ok(Arc::new(OllamaGenerator::new(config)?)),
        other => Err(RagError::GenerationFailure(format!(
            "unknown generation provider: {}",
            other
        ))),
    }
}

/// Sampling settings sent with every request.
#[derive(Debug, Clone, Copy)]
struct Sampling {
    max_tokens: u32,
    temperature: f32,
}

impl From<&GenerationConfig> for Sampling {
    fn from(config: &GenerationConfig) -> Self {
        Self {
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        }
    }
}

// ============ OpenAI Provider ============

/// Chat-completions model served by the OpenAI API.
pub struct OpenAiGenerator {
    client: reqwest::Client,
    api_key: String,
    model: String,
    sampling: Sampling,
    max_retries: u32,
}

impl OpenAiGenerator {
    pub fn new(config: &GenerationConfig) -> Result<Self, RagError> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| RagError::generation("generation.model required for OpenAI provider"))?;
        let api_key = http::openai_api_key().map_err(RagError::generation)?;
        let client = http::client(config.timeout_secs).map_err(RagError::generation)?;

        Ok(Self {
            client,
            api_key,
            model,
            sampling: config.into(),
            max_retries: config.max_retries,
        })
    }
}

#[async_trait]
impl Generator for OpenAiGenerator {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str) -> Result<String, RagError> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
            "max_tokens": self.sampling.max_tokens,
            "temperature": self.sampling.temperature,
        });
        let json = http::post_json(
            &self.client,
            OPENAI_CHAT_URL,
            Some(&self.api_key),
            &body,
            self.max_retries,
            "OpenAI",
        )
        .await
        .map_err(RagError::generation)?;
        parse_openai_completion(&json)
    }
}

fn parse_openai_completion(json: &serde_json::Value) -> Result<String, RagError> {
    json.get("choices")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first())
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .map(str::to_string)
        .ok_or_else(|| RagError::generation("invalid OpenAI response: missing choices[0].message.content"))
}

// ============ Ollama Provider ============

/// Completion model served by a local Ollama instance.
pub struct OllamaGenerator {
    client: reqwest::Client,
    model: String,
    url: String,
    sampling: Sampling,
    max_retries: u32,
}

impl OllamaGenerator {
    pub fn new(config: &GenerationConfig) -> Result<Self, RagError> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| RagError::generation("generation.model required for Ollama provider"))?;
        let url = config
            .url
            .clone()
            .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string());
        let client = http::client(config.timeout_secs).map_err(RagError::generation)?;

        Ok(Self {
            client,
            model,
            url,
            sampling: config.into(),
            max_retries: config.max_retries,
        })
    }
}

#[async_trait]
impl Generator for OllamaGenerator {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str) -> Result<String, RagError> {
        let endpoint = format!("{}/api/generate", self.url.trim_end_matches('/'));
        let body = serde_json::json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false,
            "options": {
                "num_predict": self.sampling.max_tokens,
                "temperature": self.sampling.temperature,
            },
        });
        let json = http::post_json(
            &self.client,
            &endpoint,
            None,
            &body,
            self.max_retries,
            "Ollama",
        )
        .await
        .map_err(RagError::generation)?;
        parse_ollama_completion(&json)
    }
}

fn parse_ollama_completion(json: &serde_json::Value) -> Result<String, RagError> {
    json.get("response")
        .and_then(|r| r.as_str())
        .map(str::to_string)
        .ok_or_else(|| RagError::generation("invalid Ollama response: missing response field"))
}
