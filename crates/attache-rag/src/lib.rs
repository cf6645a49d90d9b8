//! Document ingestion and context retrieval for Attache.
//!
//! This crate connects the embedding provider to the embedding store:
//!
//! - [`chunk_text`] splits documents into overlapping windows
//! - [`DocumentProcessor`] embeds chunks and writes them to the store,
//!   with formatting helpers for emails, CRM records, and calendar events
//! - [`ContextRetriever`] embeds queries, searches the store, and
//!   assembles a token-bounded context string for the agent's prompt
//!
//! Quota errors from the embedding provider never fail these paths: a
//! pseudo-random fallback vector keeps ingestion and search exercisable
//! with no credits, at the cost of retrieval quality.

pub mod chunk;
pub mod error;
pub mod ingest;
pub mod processor;
pub mod retriever;

pub use chunk::{ChunkConfig, chunk_text};
pub use error::{RagError, Result};
pub use ingest::{CalendarEventInput, ContactInput, EmailInput, NoteInput};
pub use processor::DocumentProcessor;
pub use retriever::{ContextRetriever, DEFAULT_CONTEXT_LIMIT, DEFAULT_MAX_CONTEXT_TOKENS, build_context};
