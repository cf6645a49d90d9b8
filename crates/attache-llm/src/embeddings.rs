//! Text embedding providers.
//!
//! Provides the [`Embedder`] trait plus two implementations:
//!
//! - [`OpenAiEmbedder`]: calls an OpenAI-compatible `/embeddings` endpoint
//! - [`MockEmbedder`]: returns deterministic embeddings for testing
//!
//! Quota errors are surfaced as [`LlmError::QuotaExceeded`] so callers can
//! substitute a fallback vector instead of failing ingestion.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{LlmError, Result};
use crate::openai::DEFAULT_BASE_URL;

// ─────────────────────────────────────────────────────────────────────────────
// Embedder Trait
// ─────────────────────────────────────────────────────────────────────────────

/// A text embedding provider.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a single text into a fixed-length vector.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed a batch of texts, preserving input order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed(text).await?);
        }
        Ok(results)
    }

    /// Output vector dimension.
    fn dimensions(&self) -> usize;

    /// Provider name for logging.
    fn name(&self) -> &str;
}

/// Shared reference to an embedder.
pub type SharedEmbedder = Arc<dyn Embedder>;

// ─────────────────────────────────────────────────────────────────────────────
// Mock Embedder
// ─────────────────────────────────────────────────────────────────────────────

/// Deterministic embedder for testing.
///
/// Hashes the input text to seed a small PRNG, so identical texts always
/// produce identical (unit-normalized) vectors. Texts sharing words do not
/// embed similarly; tests that need semantic ranking should construct
/// vectors directly.
pub struct MockEmbedder {
    dims: usize,
    quota_exhausted: bool,
}

impl MockEmbedder {
    /// Create a mock embedder with the given output dimension.
    pub fn new(dims: usize) -> Self {
        Self {
            dims,
            quota_exhausted: false,
        }
    }

    /// Make every call fail with [`LlmError::QuotaExceeded`], for
    /// exercising fallback paths.
    pub fn with_quota_exhausted(mut self) -> Self {
        self.quota_exhausted = true;
        self
    }

    fn hash(text: &str) -> u64 {
        // djb2
        let mut hash: u64 = 5381;
        for byte in text.bytes() {
            hash = hash.wrapping_mul(33).wrapping_add(byte as u64);
        }
        hash
    }
}

impl Default for MockEmbedder {
    fn default() -> Self {
        Self::new(1536)
    }
}

#[async_trait]
impl Embedder for MockEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if self.quota_exhausted {
            return Err(LlmError::QuotaExceeded("mock quota exhausted".into()));
        }

        let mut state = Self::hash(text);
        let mut vector: Vec<f32> = (0..self.dims)
            .map(|_| {
                state = state.wrapping_mul(1103515245).wrapping_add(12345);
                ((state >> 16) & 0x7fff) as f32 / 32768.0 - 0.5
            })
            .collect();

        // Unit-normalize so cosine similarity behaves
        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut vector {
                *x /= norm;
            }
        }
        Ok(vector)
    }

    fn dimensions(&self) -> usize {
        self.dims
    }

    fn name(&self) -> &str {
        "mock"
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// OpenAI Embedder
// ─────────────────────────────────────────────────────────────────────────────

/// Default embedding model.
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";

/// Default embedding dimension for `text-embedding-3-small`.
pub const DEFAULT_EMBEDDING_DIMS: usize = 1536;

/// Configuration for the OpenAI embedder.
#[derive(Debug, Clone)]
pub struct OpenAiEmbedderConfig {
    /// API key for authentication.
    pub api_key: String,
    /// Base URL (no trailing slash).
    pub base_url: String,
    /// Embedding model to use.
    pub model: String,
    /// Request timeout.
    pub timeout: Duration,
}

impl OpenAiEmbedderConfig {
    /// Create a config with the given API key and defaults.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_EMBEDDING_MODEL.to_string(),
            timeout: Duration::from_secs(60),
        }
    }

    /// Override the base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Known output dimension for the configured model.
    pub fn dimensions(&self) -> usize {
        match self.model.as_str() {
            "text-embedding-3-large" => 3072,
            _ => DEFAULT_EMBEDDING_DIMS,
        }
    }
}

/// OpenAI-compatible embedding backend.
pub struct OpenAiEmbedder {
    client: Client,
    config: OpenAiEmbedderConfig,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

impl OpenAiEmbedder {
    /// Create an embedder from a config.
    pub fn new(config: OpenAiEmbedderConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LlmError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    async fn request(&self, input: &[String]) -> Result<Vec<Vec<f32>>> {
        let response = self
            .client
            .post(format!("{}/embeddings", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .json(&EmbeddingRequest {
                model: &self.config.model,
                input,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(match status.as_u16() {
                429 => LlmError::QuotaExceeded(body),
                401 | 403 => LlmError::Auth(body),
                _ => LlmError::Backend(format!("HTTP {status}: {body}")),
            });
        }

        let mut body: EmbeddingResponse = response.json().await?;
        // Providers may return entries out of order
        body.data.sort_by_key(|d| d.index);
        debug!(count = body.data.len(), model = %self.config.model, "Embeddings received");
        Ok(body.data.into_iter().map(|d| d.embedding).collect())
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let input = [text.to_string()];
        self.request(&input)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::Backend("embedding response was empty".into()))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.request(texts).await
    }

    fn dimensions(&self) -> usize {
        self.config.dimensions()
    }

    fn name(&self) -> &str {
        "openai"
    }
}
