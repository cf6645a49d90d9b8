//! Error types for the agent crate.

use thiserror::Error;

/// Errors that can occur in the agent crate.
///
/// Most of these never reach callers of the conversation agent: tool
/// errors are captured into failed tool results at the dispatch boundary,
/// and turn-level errors degrade to an offline response.
#[derive(Debug, Error)]
pub enum AgentError {
    /// Completion or embedding provider error.
    #[error("LLM error: {0}")]
    Llm(#[from] attache_llm::LlmError),

    /// Storage error.
    #[error("Storage error: {0}")]
    Memory(#[from] attache_memory::MemoryError),

    /// Retrieval or ingestion error.
    #[error("Retrieval error: {0}")]
    Retrieval(#[from] attache_rag::RagError),

    /// A capability provider (email, calendar, CRM) call failed.
    #[error("Provider error: {0}")]
    Provider(String),

    /// Tool arguments failed validation.
    #[error("Invalid tool parameters: {0}")]
    InvalidToolParams(String),

    /// A tool definition was rejected at registration.
    #[error("Tool registration error: {0}")]
    ToolRegistration(String),

    /// Serialization failed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AgentError {
    /// Create a provider error.
    pub fn provider(msg: impl Into<String>) -> Self {
        AgentError::Provider(msg.into())
    }

    /// Create an invalid-parameters error.
    pub fn invalid_params(msg: impl Into<String>) -> Self {
        AgentError::InvalidToolParams(msg.into())
    }
}

/// Result type alias for agent operations.
pub type Result<T> = std::result::Result<T, AgentError>;
