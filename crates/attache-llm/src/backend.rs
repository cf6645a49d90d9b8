//! Backend trait for completion providers.
//!
//! The [`LlmBackend`] trait abstracts over the chat completion service.
//! A deterministic [`MockBackend`] is provided for tests.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::{LlmError, Result};
use crate::types::{CompletionRequest, CompletionResponse};

// ─────────────────────────────────────────────────────────────────────────────
// Backend Trait
// ─────────────────────────────────────────────────────────────────────────────

/// A chat completion provider.
#[async_trait]
pub trait LlmBackend: Send + Sync {
    /// Send a completion request and wait for the full response.
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse>;

    /// Provider name for logging.
    fn name(&self) -> &str;
}

/// Shared reference to a backend.
pub type SharedBackend = Arc<dyn LlmBackend>;

// ─────────────────────────────────────────────────────────────────────────────
// Retry Helper
// ─────────────────────────────────────────────────────────────────────────────

/// Execute an operation with exponential backoff on retryable errors.
///
/// Only errors classified retryable by [`LlmError::is_retryable`] are
/// retried; quota and model-availability errors pass through immediately
/// so the caller can degrade.
pub async fn with_retry<F, Fut, T>(
    max_retries: u32,
    initial_backoff: Duration,
    backend_name: &str,
    mut f: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    let mut backoff = initial_backoff;
    let mut attempt = 0;

    loop {
        match f().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() && attempt < max_retries => {
                attempt += 1;
                warn!(
                    backend = backend_name,
                    attempt,
                    max_retries,
                    error = %err,
                    "Retryable error, backing off for {:?}",
                    backoff
                );
                tokio::time::sleep(backoff).await;
                backoff *= 2;
            }
            Err(err) => return Err(err),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Mock Backend
// ─────────────────────────────────────────────────────────────────────────────

/// A mock backend for testing.
///
/// Returns queued replies in order and records every request it receives,
/// so tests can assert on the exact prompts and tool schemas sent.
pub struct MockBackend {
    replies: parking_lot::Mutex<std::collections::VecDeque<Result<CompletionResponse>>>,
    requests: parking_lot::Mutex<Vec<CompletionRequest>>,
}

impl MockBackend {
    /// Create a mock with a queue of replies.
    pub fn new(responses: Vec<CompletionResponse>) -> Self {
        Self {
            replies: parking_lot::Mutex::new(responses.into_iter().map(Ok).collect()),
            requests: parking_lot::Mutex::new(Vec::new()),
        }
    }

    /// Create a mock that returns a single text response.
    pub fn with_text(text: impl Into<String>) -> Self {
        Self::new(vec![CompletionResponse::text(text)])
    }

    /// Queue an additional response.
    pub fn push_response(&self, response: CompletionResponse) {
        self.replies.lock().push_back(Ok(response));
    }

    /// Queue an error reply.
    pub fn push_error(&self, error: LlmError) {
        self.replies.lock().push_back(Err(error));
    }

    /// All requests received so far.
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().clone()
    }

    /// Number of requests received so far.
    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }
}

#[async_trait]
impl LlmBackend for MockBackend {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        debug!(messages = request.messages.len(), "MockBackend.complete");
        self.requests.lock().push(request);
        self.replies
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::Internal("MockBackend: reply queue empty".into())))
    }

    fn name(&self) -> &str {
        "mock"
    }
}
