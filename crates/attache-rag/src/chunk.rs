//! Sliding-window text chunking.

use crate::error::{RagError, Result};

/// Default window size in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 1000;

/// Default overlap between consecutive windows, in characters.
pub const DEFAULT_OVERLAP: usize = 200;

/// Chunking configuration.
///
/// Construction enforces `overlap < chunk_size`; otherwise the window
/// never advances.
#[derive(Debug, Clone, Copy)]
pub struct ChunkConfig {
    chunk_size: usize,
    overlap: usize,
}

impl ChunkConfig {
    /// Create a config, rejecting parameters that cannot make progress.
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(RagError::InvalidChunkConfig(
                "chunk_size must be greater than 0".into(),
            ));
        }
        if overlap >= chunk_size {
            return Err(RagError::InvalidChunkConfig(format!(
                "overlap ({overlap}) must be less than chunk_size ({chunk_size})"
            )));
        }
        Ok(Self {
            chunk_size,
            overlap,
        })
    }

    /// Window size in characters.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Overlap between consecutive windows, in characters.
    pub fn overlap(&self) -> usize {
        self.overlap
    }
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_OVERLAP,
        }
    }
}

/// Split text into overlapping windows of `config.chunk_size()` characters.
///
/// Each window spans `[start, start + chunk_size)` in characters; the next
/// window starts at `end - overlap`, so consecutive chunks share exactly
/// `overlap` characters. The final window ends at the text end. Empty
/// input yields no chunks.
pub fn chunk_text(text: &str, config: &ChunkConfig) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }

    // Byte offset of every char boundary, plus the end of the text
    let boundaries: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();
    let n_chars = boundaries.len() - 1;

    let mut chunks = Vec::new();
    let mut start = 0usize;
    loop {
        let end = (start + config.chunk_size).min(n_chars);
        chunks.push(text[boundaries[start]..boundaries[end]].to_string());
        if end == n_chars {
            break;
        }
        start = end - config.overlap;
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = ChunkConfig::default();
        assert_eq!(config.chunk_size(), 1000);
        assert_eq!(config.overlap(), 200);
    }

    #[test]
    fn test_config_rejects_overlap_at_least_chunk_size() {
        assert!(matches!(
            ChunkConfig::new(100, 100),
            Err(RagError::InvalidChunkConfig(_))
        ));
        assert!(matches!(
            ChunkConfig::new(100, 150),
            Err(RagError::InvalidChunkConfig(_))
        ));
        assert!(matches!(
            ChunkConfig::new(0, 0),
            Err(RagError::InvalidChunkConfig(_))
        ));
        assert!(ChunkConfig::new(100, 99).is_ok());
    }

    #[test]
    fn test_short_text_single_chunk() {
        let config = ChunkConfig::default();
        let chunks = chunk_text("short text", &config);
        assert_eq!(chunks, vec!["short text"]);
    }

    #[test]
    fn test_empty_text_no_chunks() {
        let config = ChunkConfig::default();
        assert!(chunk_text("", &config).is_empty());
    }

    #[test]
    fn test_windows_overlap_exactly() {
        let config = ChunkConfig::new(10, 3).unwrap();
        let text = "abcdefghijklmnopqrstuvwxyz";
        let chunks = chunk_text(text, &config);

        assert_eq!(chunks[0], "abcdefghij");
        // Next window starts at 10 - 3 = 7
        assert_eq!(chunks[1], "hijklmnopq");
        for pair in chunks.windows(2) {
            let prev_tail = &pair[0][pair[0].len() - 3..];
            let next_head = &pair[1][..3];
            assert_eq!(prev_tail, next_head);
        }
    }

    #[test]
    fn test_coverage_is_exact() {
        let config = ChunkConfig::new(10, 3).unwrap();
        let text = "abcdefghijklmnopqrstuvwxyz0123456789";
        let chunks = chunk_text(text, &config);

        // First chunk whole, later chunks minus the shared prefix
        let mut rebuilt = chunks[0].clone();
        for chunk in &chunks[1..] {
            rebuilt.push_str(&chunk[3..]);
        }
        assert_eq!(rebuilt, text);
    }

    #[test]
    fn test_terminates_when_tail_is_small() {
        // Final window ends at the text end instead of re-emitting the tail
        let config = ChunkConfig::new(10, 9).unwrap();
        let text = "abcdefghijkl";
        let chunks = chunk_text(text, &config);
        assert_eq!(chunks, vec!["abcdefghij", "bcdefghijk", "cdefghijkl"]);
    }

    #[test]
    fn test_multibyte_char_boundaries() {
        let config = ChunkConfig::new(4, 1).unwrap();
        let text = "héllo wörld ünïcode";
        let chunks = chunk_text(text, &config);

        // Chunk sizes are in characters, not bytes
        assert_eq!(chunks[0].chars().count(), 4);
        let mut rebuilt = chunks[0].clone();
        for chunk in &chunks[1..] {
            let skip: String = chunk.chars().skip(1).collect();
            rebuilt.push_str(&skip);
        }
        assert_eq!(rebuilt, text);
    }

    #[test]
    fn test_exact_multiple_of_window() {
        let config = ChunkConfig::new(5, 2).unwrap();
        let text = "abcdefgh"; // windows: [0,5), [3,8)
        let chunks = chunk_text(text, &config);
        assert_eq!(chunks, vec!["abcde", "defgh"]);
    }
}
