//! Completion and embedding provider abstraction for Attache.
//!
//! This crate provides a unified interface for the two external model
//! services the assistant depends on: chat completions (with tool calling)
//! and text embeddings.
//!
//! The core abstractions are the [`LlmBackend`] and [`Embedder`] traits.
//! An OpenAI-compatible HTTP implementation is provided for both, along
//! with deterministic mocks for testing.
//!
//! Rate limits and missing models are surfaced as distinguishable error
//! kinds ([`LlmError::QuotaExceeded`], [`LlmError::ModelUnavailable`]) so
//! callers can degrade rather than fail.

pub mod backend;
pub mod embeddings;
pub mod error;
pub mod openai;
pub mod types;

pub use backend::{LlmBackend, MockBackend, SharedBackend, with_retry};
pub use embeddings::{
    Embedder, MockEmbedder, OpenAiEmbedder, OpenAiEmbedderConfig, SharedEmbedder,
};
pub use error::{LlmError, Result};
pub use openai::{OpenAiBackend, OpenAiConfig};
pub use types::{
    CompletionRequest, CompletionResponse, Message, Role, StopReason, ToolCall, ToolChoice,
    ToolDefinition, Usage,
};
