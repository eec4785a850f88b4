//! Embedding provider trait.
//!
//! The core never talks to a model directly: it is handed an
//! [`EmbeddingProvider`] and calls [`embed`](EmbeddingProvider::embed) once
//! per chunk while indexing and once per query.
//!
//! Concrete providers (Gemini, OpenAI, Ollama) live in the `nyaya` app
//! crate.

use anyhow::Result;
use async_trait::async_trait;

/// Trait for embedding providers.
///
/// Vector dimensionality must stay constant for the lifetime of one
/// knowledge base; the index reports a mismatch at query time.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Returns the model identifier (e.g. `"text-embedding-004"`).
    fn model_name(&self) -> &str;
    /// Returns the embedding vector dimensionality (e.g. `768`).
    fn dims(&self) -> usize;
    /// Embed one text. Errors cover transport, quota, and malformed replies.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}
