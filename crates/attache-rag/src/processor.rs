//! Document ingestion: chunk, embed, store.

use std::sync::Arc;

use attache_llm::{LlmError, SharedEmbedder};
use attache_memory::{EmbeddingRecord, MemoryStore};
use futures::future::try_join_all;
use rand::Rng;
use serde_json::Value;
use tracing::{debug, warn};

use crate::chunk::{ChunkConfig, chunk_text};
use crate::error::Result;

/// Generate a pseudo-random fallback vector with components in [-0.5, 0.5).
///
/// Used when the embedding provider reports an exhausted quota, so
/// ingestion and search stay exercisable offline. Retrieval quality is
/// sacrificed knowingly; the vector carries no semantics.
pub(crate) fn fallback_vector(dims: usize) -> Vec<f32> {
    let mut rng = rand::rng();
    (0..dims).map(|_| rng.random::<f32>() - 0.5).collect()
}

/// Embed a text, substituting a fallback vector on quota exhaustion.
pub(crate) async fn embed_with_quota_fallback(
    embedder: &SharedEmbedder,
    text: &str,
) -> Result<Vec<f32>> {
    match embedder.embed(text).await {
        Ok(vector) => Ok(vector),
        Err(LlmError::QuotaExceeded(msg)) => {
            warn!(error = %msg, "Embedding quota exceeded, using fallback vector");
            Ok(fallback_vector(embedder.dimensions()))
        }
        Err(err) => Err(err.into()),
    }
}

/// Chunks documents, embeds each chunk, and writes them to the store.
pub struct DocumentProcessor {
    store: Arc<MemoryStore>,
    embedder: SharedEmbedder,
    chunking: ChunkConfig,
}

impl DocumentProcessor {
    /// Create a processor with default chunking (1000 chars, 200 overlap).
    pub fn new(store: Arc<MemoryStore>, embedder: SharedEmbedder) -> Self {
        Self {
            store,
            embedder,
            chunking: ChunkConfig::default(),
        }
    }

    /// Override the chunking configuration.
    pub fn with_chunking(mut self, chunking: ChunkConfig) -> Self {
        self.chunking = chunking;
        self
    }

    /// The backing store.
    pub fn store(&self) -> &Arc<MemoryStore> {
        &self.store
    }

    /// Embed a text, substituting a fallback vector on quota exhaustion.
    ///
    /// All other provider failures propagate.
    pub async fn embed_or_fallback(&self, text: &str) -> Result<Vec<f32>> {
        embed_with_quota_fallback(&self.embedder, text).await
    }

    /// Chunk a document, embed every chunk, and store the results.
    ///
    /// Embeddings are requested concurrently with an all-or-nothing join:
    /// one chunk's failure aborts the whole call and nothing is written.
    /// Each stored chunk's metadata carries `chunk_index` and
    /// `total_chunks` alongside the caller's fields.
    pub async fn process(
        &self,
        content: &str,
        metadata: &Value,
        source: &str,
        source_id: Option<&str>,
    ) -> Result<Vec<EmbeddingRecord>> {
        let chunks = chunk_text(content, &self.chunking);
        if chunks.is_empty() {
            return Ok(Vec::new());
        }

        let embeddings =
            try_join_all(chunks.iter().map(|chunk| self.embed_or_fallback(chunk))).await?;

        let total_chunks = chunks.len();
        let mut records = Vec::with_capacity(total_chunks);
        for (index, (chunk, embedding)) in chunks.iter().zip(embeddings.iter()).enumerate() {
            let mut chunk_metadata = match metadata {
                Value::Object(map) => map.clone(),
                Value::Null => serde_json::Map::new(),
                other => {
                    let mut map = serde_json::Map::new();
                    map.insert("value".to_string(), other.clone());
                    map
                }
            };
            chunk_metadata.insert("chunk_index".to_string(), Value::from(index));
            chunk_metadata.insert("total_chunks".to_string(), Value::from(total_chunks));

            let record = self.store.insert_embedding(
                chunk,
                embedding,
                &Value::Object(chunk_metadata),
                source,
                source_id,
            )?;
            records.push(record);
        }

        debug!(
            source,
            chunks = total_chunks,
            "Document processed and stored"
        );
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use attache_llm::{Embedder, MockEmbedder};
    use serde_json::json;

    fn processor(embedder: MockEmbedder) -> DocumentProcessor {
        let store = Arc::new(MemoryStore::open_in_memory().unwrap());
        DocumentProcessor::new(store, Arc::new(embedder))
    }

    #[tokio::test]
    async fn test_process_stores_all_chunks() {
        let p = processor(MockEmbedder::new(8)).with_chunking(ChunkConfig::new(10, 2).unwrap());
        let records = p
            .process(
                "abcdefghijklmnopqrstuvwxyz",
                &json!({"subject": "letters"}),
                "notes",
                Some("doc-1"),
            )
            .await
            .unwrap();

        assert!(records.len() > 1);
        assert_eq!(p.store().count_embeddings().unwrap(), records.len());
        for (i, record) in records.iter().enumerate() {
            assert_eq!(record.metadata["chunk_index"], json!(i));
            assert_eq!(record.metadata["total_chunks"], json!(records.len()));
            assert_eq!(record.metadata["subject"], json!("letters"));
            assert_eq!(record.source, "notes");
            assert_eq!(record.source_id.as_deref(), Some("doc-1"));
        }
    }

    #[tokio::test]
    async fn test_process_empty_content() {
        let p = processor(MockEmbedder::new(8));
        let records = p.process("", &json!({}), "notes", None).await.unwrap();
        assert!(records.is_empty());
        assert_eq!(p.store().count_embeddings().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_quota_exhaustion_falls_back_instead_of_failing() {
        let p = processor(MockEmbedder::new(8).with_quota_exhausted());
        let records = p
            .process("some content", &json!({}), "notes", None)
            .await
            .unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].embedding.len(), 8);
        // The fallback vector is non-zero
        assert!(records[0].embedding.iter().any(|&x| x != 0.0));
    }

    #[tokio::test]
    async fn test_embed_or_fallback_dimension() {
        let embedder = MockEmbedder::new(16).with_quota_exhausted();
        let dims = embedder.dimensions();
        let p = processor(embedder);
        let vector = p.embed_or_fallback("anything").await.unwrap();
        assert_eq!(vector.len(), dims);
        assert!(vector.iter().all(|&x| (-0.5..0.5).contains(&x)));
    }

    #[tokio::test]
    async fn test_fallback_vector_range() {
        let v = fallback_vector(256);
        assert_eq!(v.len(), 256);
        assert!(v.iter().all(|&x| (-0.5..0.5).contains(&x)));
    }
}
