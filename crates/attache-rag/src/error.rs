//! Error types for ingestion and retrieval.

use thiserror::Error;

/// Errors that can occur during ingestion or retrieval.
#[derive(Debug, Error)]
pub enum RagError {
    /// Chunking configuration would not terminate or produce progress.
    #[error("Invalid chunk config: {0}")]
    InvalidChunkConfig(String),

    /// The embedding provider failed (other than quota, which falls back).
    #[error("Embedding error: {0}")]
    Embedding(#[from] attache_llm::LlmError),

    /// The embedding store rejected a write.
    #[error("Store error: {0}")]
    Store(#[from] attache_memory::MemoryError),
}

/// Result type alias for ingestion and retrieval operations.
pub type Result<T> = std::result::Result<T, RagError>;
