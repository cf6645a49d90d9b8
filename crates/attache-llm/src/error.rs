//! Error types for completion and embedding providers.

use thiserror::Error;

/// Errors that can occur when calling a model provider.
#[derive(Debug, Error)]
pub enum LlmError {
    /// The provider rejected the request due to rate limiting or an
    /// exhausted quota (HTTP 429 equivalent).
    ///
    /// Callers are expected to degrade on this kind: the conversation
    /// agent falls back to an offline response, and embedding callers
    /// substitute a fallback vector.
    #[error("Quota exceeded: {0}")]
    QuotaExceeded(String),

    /// The requested model does not exist or is not available to this
    /// account (HTTP 404 equivalent).
    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    /// Authentication failed (missing or invalid API key).
    #[error("Authentication error: {0}")]
    Auth(String),

    /// The provider returned an error response (5xx or malformed body).
    #[error("Backend error: {0}")]
    Backend(String),

    /// Network-level failure (connection, timeout, DNS).
    #[error("Network error: {0}")]
    Network(String),

    /// The request was rejected as invalid (4xx other than 401/404/429).
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error (missing key, bad URL).
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl LlmError {
    /// Whether retrying the request might succeed.
    ///
    /// Only transient network failures are retryable here. Quota errors
    /// are deliberately not retried: the caller's contract is to degrade
    /// immediately, not to wait out the limit.
    pub fn is_retryable(&self) -> bool {
        matches!(self, LlmError::Network(_))
    }

    /// Whether this error should degrade the whole turn to an offline
    /// response rather than propagate.
    pub fn degrades_turn(&self) -> bool {
        matches!(
            self,
            LlmError::QuotaExceeded(_) | LlmError::ModelUnavailable(_)
        )
    }
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LlmError::Network(format!("Request timeout: {err}"))
        } else if err.is_connect() {
            LlmError::Network(format!("Connection failed: {err}"))
        } else {
            LlmError::Network(err.to_string())
        }
    }
}

/// Result type alias for provider operations.
pub type Result<T> = std::result::Result<T, LlmError>;
