//! Embedding provider implementations.
//!
//! Concrete [`EmbeddingProvider`]s for the core:
//! - **[`DisabledEmbedder`]**: returns errors; used when embeddings are not configured.
//! - **[`GeminiEmbedder`]**: Generative Language API `models/{model}:embedContent`.
//! - **[`OpenAiEmbedder`]**: OpenAI (or compatible) `POST /v1/embeddings`.
//! - **[`OllamaEmbedder`]**: a local Ollama instance's `/api/embed` endpoint.
//!
//! Every HTTP provider retries transient failures with exponential backoff
//! (see [`crate::http`]). The final failure of one `embed` call is what the
//! indexing pipeline records against the chunk.
//!
//! # Provider Selection
//!
//! ```rust
//! # use nyaya::config::EmbeddingConfig;
//! # use nyaya::embedding::create_provider;
//! let config = EmbeddingConfig::default(); // provider = "disabled"
//! let provider = create_provider(&config).unwrap();
//! assert_eq!(provider.model_name(), "disabled");
//! ```

use anyhow::{bail, Result};
use async_trait::async_trait;

use nyaya_core::embedding::EmbeddingProvider;

use crate::config::EmbeddingConfig;
use crate::http;

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const OPENAI_BASE_URL: &str = "https://api.openai.com";
const OLLAMA_BASE_URL: &str = "http://localhost:11434";

// ============ Disabled Provider ============

/// A no-op embedding provider that always returns errors.
pub struct DisabledEmbedder;

#[async_trait]
impl EmbeddingProvider for DisabledEmbedder {
    fn model_name(&self) -> &str {
        "disabled"
    }
    fn dims(&self) -> usize {
        0
    }
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        bail!("Embedding provider is disabled")
    }
}

// ============ Gemini Provider ============

/// Embedding provider using the Gemini API.
///
/// Requires `GEMINI_API_KEY` (or `API_KEY`) in the environment.
pub struct GeminiEmbedder {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    dims: Option<usize>,
    max_retries: u32,
}

impl GeminiEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        Ok(Self {
            client: http::client(config.timeout_secs)?,
            api_key: http::gemini_api_key()?,
            base_url: http::base_url(config.url.as_deref(), GEMINI_BASE_URL),
            model: required_model(config, "Gemini")?,
            dims: config.dims,
            max_retries: config.max_retries,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for GeminiEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }
    fn dims(&self) -> usize {
        self.dims.unwrap_or(0)
    }
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let url = format!("{}/v1beta/models/{}:embedContent", self.base_url, self.model);
        let body = serde_json::json!({
            "model": format!("models/{}", self.model),
            "content": { "parts": [{ "text": text }] },
        });
        let json = http::post_json(
            &self.client,
            &url,
            &[("x-goog-api-key", self.api_key.clone())],
            &body,
            self.max_retries,
            "Gemini",
        )
        .await?;
        check_dims(parse_gemini_response(&json)?, self.dims)
    }
}

/// Extract `embedding.values` from an `embedContent` reply.
fn parse_gemini_response(json: &serde_json::Value) -> Result<Vec<f32>> {
    let values = json
        .get("embedding")
        .and_then(|e| e.get("values"))
        .and_then(|v| v.as_array())
        .ok_or_else(|| anyhow::anyhow!("Invalid Gemini response: missing embedding.values"))?;
    Ok(to_f32(values))
}

// ============ OpenAI Provider ============

/// Embedding provider using the OpenAI API. Requires `OPENAI_API_KEY`.
pub struct OpenAiEmbedder {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    dims: Option<usize>,
    max_retries: u32,
}

impl OpenAiEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        Ok(Self {
            client: http::client(config.timeout_secs)?,
            api_key: http::openai_api_key()?,
            base_url: http::base_url(config.url.as_deref(), OPENAI_BASE_URL),
            model: required_model(config, "OpenAI")?,
            dims: config.dims,
            max_retries: config.max_retries,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }
    fn dims(&self) -> usize {
        self.dims.unwrap_or(0)
    }
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let url = format!("{}/v1/embeddings", self.base_url);
        let body = serde_json::json!({
            "model": self.model,
            "input": text,
        });
        let json = http::post_json(
            &self.client,
            &url,
            &[("Authorization", format!("Bearer {}", self.api_key))],
            &body,
            self.max_retries,
            "OpenAI",
        )
        .await?;
        check_dims(parse_openai_response(&json)?, self.dims)
    }
}

/// Extract `data[0].embedding` from an embeddings reply.
fn parse_openai_response(json: &serde_json::Value) -> Result<Vec<f32>> {
    let embedding = json
        .get("data")
        .and_then(|d| d.as_array())
        .and_then(|d| d.first())
        .and_then(|item| item.get("embedding"))
        .and_then(|e| e.as_array())
        .ok_or_else(|| anyhow::anyhow!("Invalid OpenAI response: missing data[0].embedding"))?;
    Ok(to_f32(embedding))
}

// ============ Ollama Provider ============

/// Embedding provider using a local Ollama instance.
///
/// Calls `POST /api/embed` on the configured URL (default: `http://localhost:11434`).
pub struct OllamaEmbedder {
    client: reqwest::Client,
    url: String,
    model: String,
    dims: Option<usize>,
    max_retries: u32,
}

impl OllamaEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        Ok(Self {
            client: http::client(config.timeout_secs)?,
            url: http::base_url(config.url.as_deref(), OLLAMA_BASE_URL),
            model: required_model(config, "Ollama")?,
            dims: config.dims,
            max_retries: config.max_retries,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }
    fn dims(&self) -> usize {
        self.dims.unwrap_or(0)
    }
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let body = serde_json::json!({
            "model": self.model,
            "input": text,
        });
        let json = http::post_json(
            &self.client,
            &format!("{}/api/embed", self.url),
            &[],
            &body,
            self.max_retries,
            "Ollama",
        )
        .await?;
        check_dims(parse_ollama_response(&json)?, self.dims)
    }
}

fn parse_ollama_response(json: &serde_json::Value) -> Result<Vec<f32>> {
    let embedding = json
        .get("embeddings")
        .and_then(|e| e.as_array())
        .and_then(|e| e.first())
        .and_then(|e| e.as_array())
        .ok_or_else(|| anyhow::anyhow!("Invalid Ollama response: missing embeddings[0]"))?;
    Ok(to_f32(embedding))
}

// ============ Helpers ============

fn required_model(config: &EmbeddingConfig, service: &str) -> Result<String> {
    config
        .model
        .clone()
        .ok_or_else(|| anyhow::anyhow!("embedding.model required for {} provider", service))
}

fn to_f32(values: &[serde_json::Value]) -> Vec<f32> {
    values
        .iter()
        .map(|v| v.as_f64().unwrap_or(0.0) as f32)
        .collect()
}

/// Reject an empty vector, or one whose length differs from the configured dims.
fn check_dims(vector: Vec<f32>, expected: Option<usize>) -> Result<Vec<f32>> {
    if vector.is_empty() {
        bail!("Embedding response contained an empty vector");
    }
    match expected {
        Some(dims) if dims != vector.len() => bail!(
            "Embedding has {} dimensions, embedding.dims is {}",
            vector.len(),
            dims
        ),
        _ => Ok(vector),
    }
}

/// Create the appropriate [`EmbeddingProvider`] based on configuration.
///
/// | Config Value | Provider |
/// |-------------|----------|
/// | `"disabled"` | [`DisabledEmbedder`] |
/// | `"gemini"` | [`GeminiEmbedder`] |
/// | `"openai"` | [`OpenAiEmbedder`] |
/// | `"ollama"` | [`OllamaEmbedder`] |
pub fn create_provider(config: &EmbeddingConfig) -> Result<Box<dyn EmbeddingProvider>> {
    match config.provider.as_str() {
        "disabled" => Ok(Box::new(DisabledEmbedder)),
        "gemini" => Ok(Box::new(GeminiEmbedder::new(config)?)),
        "openai" => Ok(Box::new(OpenAiEmbedder::new(config)?)),
        "ollama" => Ok(Box::new(OllamaEmbedder::new(config)?)),
        other => bail!("Unknown embedding provider: {}", other),
    }
}
