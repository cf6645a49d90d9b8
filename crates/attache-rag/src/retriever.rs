//! Query-side retrieval: embed a query, search the store, assemble a
//! token-bounded context string.

use std::sync::Arc;

use attache_llm::SharedEmbedder;
use attache_memory::{EmbeddingFilter, MemoryStore, ScoredRecord, SearchOutcome};
use tracing::debug;

use crate::error::Result;
use crate::processor::embed_with_quota_fallback;

/// Default number of records returned by a context search.
pub const DEFAULT_CONTEXT_LIMIT: usize = 10;

/// Default token budget for an assembled context string.
pub const DEFAULT_MAX_CONTEXT_TOKENS: usize = 4000;

/// Embeds queries and searches the embedding store.
pub struct ContextRetriever {
    store: Arc<MemoryStore>,
    embedder: SharedEmbedder,
}

impl ContextRetriever {
    /// Create a retriever over the given store and embedder.
    pub fn new(store: Arc<MemoryStore>, embedder: SharedEmbedder) -> Self {
        Self { store, embedder }
    }

    /// Find the records most relevant to a query.
    ///
    /// Embedding quota exhaustion falls back to a random vector (results
    /// become arbitrary but the call succeeds); other embedding failures
    /// propagate. Store failures degrade inside the returned outcome.
    pub async fn search_context(
        &self,
        query: &str,
        limit: usize,
        filter: &EmbeddingFilter,
    ) -> Result<SearchOutcome> {
        let query_embedding = embed_with_quota_fallback(&self.embedder, query).await?;
        let outcome = self.store.search_embeddings(&query_embedding, limit, filter);
        debug!(
            query_len = query.len(),
            results = outcome.records().len(),
            degraded = outcome.is_degraded(),
            "Context search"
        );
        Ok(outcome)
    }

    /// Convenience: search with the default limit and no filters.
    pub async fn search(&self, query: &str) -> Result<SearchOutcome> {
        self.search_context(query, DEFAULT_CONTEXT_LIMIT, &EmbeddingFilter::none())
            .await
    }
}

/// Assemble records into a prompt context block within a token budget.
///
/// Records are concatenated in the given order as
/// `"Source: <source>\nContent: <content>\n\n"`. Token cost is estimated
/// as `ceil(len / 4)` of the content; assembly stops before the first
/// record that would exceed `max_tokens` rather than truncating it
/// mid-record.
pub fn build_context(records: &[ScoredRecord], max_tokens: usize) -> String {
    let mut context = String::new();
    let mut used_tokens = 0usize;

    for scored in records {
        let content = &scored.record.content;
        let cost = content.len().div_ceil(4);
        if used_tokens + cost > max_tokens {
            break;
        }
        context.push_str(&format!(
            "Source: {}\nContent: {}\n\n",
            scored.record.source, content
        ));
        used_tokens += cost;
    }

    context.trim().to_string()
}
