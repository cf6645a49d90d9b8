//! Embedding storage and full-scan similarity search.
//!
//! There is no native vector index here: search reads up to a fixed cap
//! of candidate rows, scores every one with cosine similarity in memory,
//! and sorts. Linear scan is acceptable at the target corpus size
//! (hundreds to low thousands of chunks); the cap bounds the worst case.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use rusqlite::{Row, ToSql, params};
use tracing::{debug, warn};
use zerocopy::IntoBytes;

use crate::error::{MemoryError, Result};
use crate::store::MemoryStore;
use crate::types::{EmbeddingFilter, EmbeddingRecord, ScoredRecord, SearchOutcome};

// ─────────────────────────────────────────────────────────────────────────────
// Constants
// ─────────────────────────────────────────────────────────────────────────────

/// Maximum number of rows considered by a similarity scan.
pub const SCAN_CAP: usize = 1000;

// ─────────────────────────────────────────────────────────────────────────────
// Vector Encoding
// ─────────────────────────────────────────────────────────────────────────────

/// Encode an embedding as an f32 byte blob.
pub fn encode_embedding(embedding: &[f32]) -> Vec<u8> {
    embedding.as_bytes().to_vec()
}

/// Decode an f32 byte blob back into an embedding.
pub fn decode_embedding(bytes: &[u8]) -> Result<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(MemoryError::InvalidData(format!(
            "embedding blob length {} is not a multiple of 4",
            bytes.len()
        )));
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}

// ─────────────────────────────────────────────────────────────────────────────
// Cosine Similarity
// ─────────────────────────────────────────────────────────────────────────────

/// Cosine similarity of two vectors.
///
/// Returns 0.0 when the dimensions differ or either vector has zero norm;
/// mismatched records sort to the bottom instead of failing the scan.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

// ─────────────────────────────────────────────────────────────────────────────
// Store Operations
// ─────────────────────────────────────────────────────────────────────────────

impl MemoryStore {
    /// Insert a content chunk with its embedding.
    pub fn insert_embedding(
        &self,
        content: &str,
        embedding: &[f32],
        metadata: &serde_json::Value,
        source: &str,
        source_id: Option<&str>,
    ) -> Result<EmbeddingRecord> {
        let now = Utc::now();
        let conn = self.conn.lock();

        conn.execute(
            r#"
            INSERT INTO embeddings (content, embedding, metadata, source, source_id, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                content,
                encode_embedding(embedding),
                metadata.to_string(),
                source,
                source_id,
                now.to_rfc3339(),
                now.to_rfc3339(),
            ],
        )?;

        let id = conn.last_insert_rowid();
        debug!(id, source, dims = embedding.len(), "Embedding inserted");

        Ok(EmbeddingRecord {
            id,
            content: content.to_string(),
            embedding: embedding.to_vec(),
            metadata: metadata.clone(),
            source: source.to_string(),
            source_id: source_id.map(String::from),
            created_at: now,
            updated_at: now,
        })
    }

    /// Search for the `limit` records most similar to the query vector.
    ///
    /// Persistence failures never propagate: the outcome is degraded to an
    /// empty result so a storage outage cannot crash the calling turn.
    pub fn search_embeddings(
        &self,
        query: &[f32],
        limit: usize,
        filter: &EmbeddingFilter,
    ) -> SearchOutcome {
        match self.scan_embeddings(query, limit, filter) {
            Ok(records) => SearchOutcome::Ok(records),
            Err(err) => {
                warn!(error = %err, "Embedding search failed, degrading to empty result");
                SearchOutcome::Degraded {
                    error: err.to_string(),
                }
            }
        }
    }

    fn scan_embeddings(
        &self,
        query: &[f32],
        limit: usize,
        filter: &EmbeddingFilter,
    ) -> Result<Vec<ScoredRecord>> {
        let conn = self.conn.lock();

        let mut sql = String::from(
            "SELECT id, content, embedding, metadata, source, source_id, created_at, updated_at \
             FROM embeddings",
        );
        let mut clauses: Vec<&str> = Vec::new();
        let mut params_vec: Vec<&dyn ToSql> = Vec::new();

        if let Some(source) = &filter.source {
            clauses.push("source = ?");
            params_vec.push(source);
        }
        if let Some(source_id) = &filter.source_id {
            clauses.push("source_id = ?");
            params_vec.push(source_id);
        }
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY id LIMIT ?");
        let cap = SCAN_CAP as i64;
        params_vec.push(&cap);

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_vec.as_slice(), row_to_record)?;

        let mut scored: Vec<ScoredRecord> = Vec::new();
        for row in rows {
            let record = row??;
            let similarity = cosine_similarity(query, &record.embedding);
            scored.push(ScoredRecord { record, similarity });
        }

        // Stable sort keeps insertion order among ties
        scored.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(Ordering::Equal)
        });
        let candidates = scored.len();
        scored.truncate(limit);

        debug!(candidates, results = scored.len(), "Similarity scan complete");
        Ok(scored)
    }

    /// Number of stored embedding records.
    pub fn count_embeddings(&self) -> Result<usize> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM embeddings", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

type RowResult = std::result::Result<Result<EmbeddingRecord>, rusqlite::Error>;

fn row_to_record(row: &Row<'_>) -> RowResult {
    let id: i64 = row.get(0)?;
    let content: String = row.get(1)?;
    let blob: Vec<u8> = row.get(2)?;
    let metadata_json: String = row.get(3)?;
    let source: String = row.get(4)?;
    let source_id: Option<String> = row.get(5)?;
    let created_at: String = row.get(6)?;
    let updated_at: String = row.get(7)?;

    Ok((|| {
        Ok(EmbeddingRecord {
            id,
            content,
            embedding: decode_embedding(&blob)?,
            metadata: serde_json::from_str(&metadata_json)?,
            source,
            source_id,
            created_at: parse_timestamp(&created_at)?,
            updated_at: parse_timestamp(&updated_at)?,
        })
    })())
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| MemoryError::InvalidData(format!("bad timestamp '{s}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn store() -> MemoryStore {
        MemoryStore::open_in_memory().unwrap()
    }

    #[test]
    fn test_cosine_identical_vectors() {
        let v = vec![1.0, 2.0, 3.0];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_orthogonal_vectors() {
        let a = vec![1.0, 0.0];
        let b = vec![0.0, 1.0];
        assert_eq!(cosine_similarity(&a, &b), 0.0);
    }

    #[test]
    fn test_cosine_opposite_vectors() {
        let a = vec![1.0, 0.0];
        let b = vec![-1.0, 0.0];
        assert!((cosine_similarity(&a, &b) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_dimension_mismatch_is_zero() {
        let a = vec![1.0, 2.0, 3.0];
        let b = vec![1.0, 2.0];
        assert_eq!(cosine_similarity(&a, &b), 0.0);
        assert_eq!(cosine_similarity(&b, &a), 0.0);
        assert_eq!(cosine_similarity(&a, &[]), 0.0);
    }

    #[test]
    fn test_cosine_zero_norm_is_zero() {
        let a = vec![0.0, 0.0, 0.0];
        let b = vec![1.0, 2.0, 3.0];
        assert_eq!(cosine_similarity(&a, &b), 0.0);
        assert_eq!(cosine_similarity(&b, &a), 0.0);
    }

    #[test]
    fn test_encode_decode_round_trip() {
        let v = vec![0.5, -1.25, 3.75, 0.0];
        let decoded = decode_embedding(&encode_embedding(&v)).unwrap();
        assert_eq!(decoded, v);
    }

    #[test]
    fn test_decode_bad_length_errors() {
        assert!(matches!(
            decode_embedding(&[1, 2, 3]),
            Err(MemoryError::InvalidData(_))
        ));
    }

    #[test]
    fn test_insert_and_search() {
        let store = store();
        store
            .insert_embedding("about cats", &[1.0, 0.0], &json!({}), "notes", None)
            .unwrap();
        store
            .insert_embedding("about dogs", &[0.0, 1.0], &json!({}), "notes", None)
            .unwrap();

        let outcome = store.search_embeddings(&[0.9, 0.1], 10, &EmbeddingFilter::none());
        let records = outcome.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].record.content, "about cats");
        assert!(records[0].similarity > records[1].similarity);
    }

    #[test]
    fn test_search_ordering_non_increasing() {
        let store = store();
        let vectors = [
            [1.0f32, 0.0],
            [0.7, 0.7],
            [0.0, 1.0],
            [-0.5, 0.5],
            [0.9, 0.2],
        ];
        for (i, v) in vectors.iter().enumerate() {
            store
                .insert_embedding(&format!("chunk {i}"), v, &json!({}), "notes", None)
                .unwrap();
        }

        let outcome = store.search_embeddings(&[1.0, 0.0], 10, &EmbeddingFilter::none());
        let records = outcome.records();
        assert_eq!(records.len(), 5);
        for pair in records.windows(2) {
            assert!(pair[0].similarity >= pair[1].similarity);
        }
    }

    #[test]
    fn test_search_respects_limit() {
        let store = store();
        for i in 0..5 {
            store
                .insert_embedding(&format!("chunk {i}"), &[1.0, 0.0], &json!({}), "notes", None)
                .unwrap();
        }
        let outcome = store.search_embeddings(&[1.0, 0.0], 3, &EmbeddingFilter::none());
        assert_eq!(outcome.records().len(), 3);
    }

    #[test]
    fn test_search_scan_cap() {
        let store = store();
        for i in 0..(SCAN_CAP + 5) {
            store
                .insert_embedding(&format!("chunk {i}"), &[1.0, 0.0], &json!({}), "bulk", None)
                .unwrap();
        }
        let outcome = store.search_embeddings(&[1.0, 0.0], SCAN_CAP + 5, &EmbeddingFilter::none());
        assert_eq!(outcome.records().len(), SCAN_CAP);
    }

    #[test]
    fn test_search_dimension_mismatch_scores_zero() {
        let store = store();
        store
            .insert_embedding("matching dims", &[1.0, 0.0], &json!({}), "notes", None)
            .unwrap();
        store
            .insert_embedding("wrong dims", &[1.0, 0.0, 0.0], &json!({}), "notes", None)
            .unwrap();

        let outcome = store.search_embeddings(&[1.0, 0.0], 10, &EmbeddingFilter::none());
        let records = outcome.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].record.content, "matching dims");
        assert_eq!(records[1].similarity, 0.0);
    }

    #[test]
    fn test_search_filters() {
        let store = store();
        store
            .insert_embedding("email chunk", &[1.0, 0.0], &json!({}), "gmail", Some("m1"))
            .unwrap();
        store
            .insert_embedding("crm chunk", &[1.0, 0.0], &json!({}), "hubspot", Some("c1"))
            .unwrap();

        let outcome =
            store.search_embeddings(&[1.0, 0.0], 10, &EmbeddingFilter::source("gmail"));
        assert_eq!(outcome.records().len(), 1);
        assert_eq!(outcome.records()[0].record.source, "gmail");

        let outcome = store.search_embeddings(
            &[1.0, 0.0],
            10,
            &EmbeddingFilter::source("hubspot").with_source_id("c1"),
        );
        assert_eq!(outcome.records().len(), 1);
        assert_eq!(outcome.records()[0].record.source_id.as_deref(), Some("c1"));

        let outcome = store.search_embeddings(
            &[1.0, 0.0],
            10,
            &EmbeddingFilter::source("gmail").with_source_id("nope"),
        );
        assert!(outcome.records().is_empty());
        assert!(!outcome.is_degraded());
    }

    #[test]
    fn test_search_degrades_on_persistence_failure() {
        let store = store();
        store.conn.lock().execute_batch("DROP TABLE embeddings").unwrap();

        let outcome = store.search_embeddings(&[1.0, 0.0], 10, &EmbeddingFilter::none());
        assert!(outcome.is_degraded());
        assert!(outcome.records().is_empty());
    }

    #[test]
    fn test_metadata_round_trip() {
        let store = store();
        let metadata = json!({"chunk_index": 0, "total_chunks": 2, "subject": "hello"});
        store
            .insert_embedding("text", &[1.0, 0.0], &metadata, "gmail", Some("m1"))
            .unwrap();

        let outcome = store.search_embeddings(&[1.0, 0.0], 1, &EmbeddingFilter::none());
        assert_eq!(outcome.records()[0].record.metadata, metadata);
    }
}
