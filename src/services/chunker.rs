//! Fixed-size character chunking with overlap.

use crate::error::ConfigError;
use crate::models::{ChunkingConfig, Document, DocumentChunk};

/// Text chunker that splits text into fixed-size, optionally overlapping windows.
#[derive(Debug, Clone)]
pub struct TextChunker {
    /// Window size in characters
    chunk_size: usize,
    /// Characters shared by consecutive windows
    overlap: usize,
}

impl TextChunker {
    /// Create a chunker; `chunk_overlap` must be smaller than a non-zero `chunk_size`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self, ConfigError> {
        if chunk_size == 0 {
            return Err(ConfigError::ValidationError(
                "chunk_size must be greater than 0".to_string(),
            ));
        }
        if chunk_overlap >= chunk_size {
            return Err(ConfigError::ValidationError(format!(
                "chunk_overlap ({}) must be less than chunk_size ({})",
                chunk_overlap, chunk_size
            )));
        }
        Ok(Self {
            chunk_size,
            overlap: chunk_overlap,
        })
    }

    pub fn from_config(config: &ChunkingConfig) -> Result<Self, ConfigError> {
        Self::new(config.chunk_size, config.chunk_overlap)
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Split text into windows of `chunk_size` characters.
    pub fn split(&self, text: &str) -> Vec<String> {
        self.windows(text)
            .into_iter()
            .map(|(content, _, _)| content)
            .collect()
    }

    /// Chunk a document's extracted text.
    pub fn chunk(&self, document: &Document, text: &str) -> Vec<DocumentChunk> {
        let windows = self.windows(text);
        let total_chunks = windows.len() as u32;

        windows
            .into_iter()
            .enumerate()
            .map(|(idx, (content, start, end))| {
                DocumentChunk::from_document(
                    document,
                    content,
                    idx as u32,
                    total_chunks,
                    start as u64,
                    end as u64,
                )
            })
            .collect()
    }

    /// Windows with their character offsets `[start, end)`.
    fn windows(&self, text: &str) -> Vec<(String, usize, usize)> {
        let chars: Vec<char> = text.chars().collect();
        let total_chars = chars.len();
        let step = self.chunk_size - self.overlap;

        let mut windows = Vec::new();
        let mut start = 0;

        while start < total_chars {
            let end = (start + self.chunk_size).min(total_chars);
            windows.push((chars[start..end].iter().collect(), start, end));

            if end == total_chars {
                break;
            }
            start += step;
        }

        windows
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DocumentFormat;
    use std::path::PathBuf;

    fn create_test_document(content: &str) -> Document {
        Document::new(
            "a.md".to_string(),
            PathBuf::from("/docs/a.md"),
            DocumentFormat::Markdown,
            content.as_bytes().to_vec(),
        )
    }

    fn sample_text(len: usize) -> String {
        (0..len)
            .map(|i| char::from(b'a' + (i % 26) as u8))
            .collect()
    }

    #[test]
    fn test_no_overlap_lengths() {
        let chunker = TextChunker::new(1000, 0).unwrap();
        let chunks = chunker.split(&sample_text(2500));
        let lengths: Vec<usize> = chunks.iter().map(|c| c.chars().count()).collect();
        assert_eq!(lengths, vec![1000, 1000, 500]);
    }

    #[test]
    fn test_overlap_region_shared() {
        let text = sample_text(1200);
        let chars: Vec<char> = text.chars().collect();
        let chunker = TextChunker::new(1000, 200).unwrap();
        let chunks = chunker.split(&text);

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0], chars[0..1000].iter().collect::<String>());
        assert_eq!(chunks[1], chars[800..1200].iter().collect::<String>());
        assert_eq!(chunks[1].chars().count(), 400);

        let overlap: String = chars[800..1000].iter().collect();
        assert!(chunks[0].ends_with(&overlap));
        assert!(chunks[1].starts_with(&overlap));
    }

    #[test]
    fn test_reconstruction_without_overlap() {
        let text = sample_text(3333);
        let chunker = TextChunker::new(500, 0).unwrap();
        assert_eq!(chunker.split(&text).concat(), text);
    }

    #[test]
    fn test_reconstruction_with_overlap() {
        let text = sample_text(2750);
        let chunker = TextChunker::new(600, 150).unwrap();
        let chunks = chunker.split(&text);

        let mut rebuilt: String = chunks[0].clone();
        for chunk in &chunks[1..] {
            rebuilt.extend(chunk.chars().skip(150));
        }
        assert_eq!(rebuilt, text);
        assert!(chunks.iter().all(|c| c.chars().count() <= 600));
    }

    #[test]
    fn test_exact_multiple_has_no_trailing_chunk() {
        let chunker = TextChunker::new(100, 0).unwrap();
        assert_eq!(chunker.split(&sample_text(300)).len(), 3);
    }

    #[test]
    fn test_short_text_single_chunk() {
        let chunker = TextChunker::new(1000, 200).unwrap();
        assert_eq!(chunker.split("Hello, world!"), vec!["Hello, world!"]);
    }

    #[test]
    fn test_empty_text() {
        let chunker = TextChunker::new(1000, 0).unwrap();
        assert!(chunker.split("").is_empty());
        assert!(chunker.chunk(&create_test_document(""), "").is_empty());
    }

    #[test]
    fn test_multibyte_characters() {
        let text = "가나다라마바사아자차";
        let chunker = TextChunker::new(4, 1).unwrap();
        assert_eq!(chunker.split(text), vec!["가나다라", "라마바사", "사아자차"]);
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(matches!(
            TextChunker::new(100, 100),
            Err(ConfigError::ValidationError(_))
        ));
        assert!(TextChunker::new(100, 150).is_err());
        assert!(TextChunker::new(0, 0).is_err());
    }

    #[test]
    fn test_chunk_metadata() {
        let text = sample_text(2500);
        let doc = create_test_document(&text);
        let chunker = TextChunker::new(1000, 0).unwrap();
        let chunks = chunker.chunk(&doc, &text);

        assert_eq!(chunks.len(), 3);
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.chunk_index, i as u32);
            assert_eq!(chunk.total_chunks, 3);
            assert_eq!(chunk.document_id, doc.id);
            assert_eq!(chunk.source, "a.md");
            assert_eq!(chunk.start_offset, (i * 1000) as u64);
        }
        assert_eq!(chunks[2].end_offset, 2500);
    }
}
