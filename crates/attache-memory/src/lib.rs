//! Persistent storage for Attache.
//!
//! Provides an SQLite-backed [`MemoryStore`] holding three kinds of shared
//! state:
//!
//! - **Embeddings**: content chunks with fixed-dimension vectors, searched
//!   by full-scan cosine similarity (no native vector index)
//! - **Tasks**: work items created by tools or proactive handlers
//! - **Standing instructions**: persisted directives consulted on every
//!   conversation turn and proactive trigger
//!
//! Retrieval is deliberately forgiving: a failed embedding search degrades
//! to an empty result set instead of propagating, so a storage outage never
//! crashes a conversation turn. Writes propagate their errors.

pub mod error;
pub mod instructions;
pub mod store;
pub mod tasks;
pub mod types;
pub mod vector;

pub use error::{MemoryError, Result};
pub use store::MemoryStore;
pub use types::{
    EmbeddingFilter, EmbeddingRecord, Instruction, NewTask, ScoredRecord, SearchOutcome, Task,
    TaskPriority, TaskStatus, TaskUpdate,
};
pub use vector::cosine_similarity;
