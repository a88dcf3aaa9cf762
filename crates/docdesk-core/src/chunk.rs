//! Separator-based character splitter with overlap.
//!
//! Splits document content into [`Chunk`]s of at most `chunk_size`
//! characters (counted as Unicode scalar values), carrying up to
//! `chunk_overlap` characters of trailing context into the next chunk.
//!
//! # Algorithm
//!
//! 1. Split the text on the separator (`"\n"` by default) and drop empty pieces.
//! 2. Append pieces to a window, joined by the separator, while the joined
//!    length stays within `chunk_size`.
//! 3. When the next piece would overflow, emit the window (trimmed), then
//!    drop pieces from its front until what remains is at most
//!    `chunk_overlap` characters and the next piece fits beside it.
//! 4. A single piece longer than `chunk_size` is emitted on its own; it is
//!    never cut mid-line.
//!
//! Each chunk gets a random UUID and the SHA-256 of its text, which the
//! index builder uses to embed identical texts once.
//!
//! ```rust
//! use docdesk_core::chunk::CharacterSplitter;
//!
//! let splitter = CharacterSplitter::new(7, 3).unwrap();
//! assert_eq!(
//!     splitter.split_text("aaa\nbbb\nccc"),
//!     vec!["aaa\nbbb".to_string(), "bbb\nccc".to_string()]
//! );
//! ```

use std::collections::VecDeque;

use anyhow::{bail, Result};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::models::{Chunk, Document};

/// Default separator: one line per piece.
pub const DEFAULT_SEPARATOR: &str = "\n";

#[derive(Debug, Clone)]
pub struct CharacterSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
    separator: String,
}

impl CharacterSplitter {
    /// Create a splitter using the newline separator.
    ///
    /// # Errors
    ///
    /// `chunk_size` must be > 0 and `chunk_overlap` must be smaller than it.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            bail!("chunk_size must be > 0");
        }
        if chunk_overlap >= chunk_size {
            bail!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                chunk_overlap,
                chunk_size
            );
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
            separator: DEFAULT_SEPARATOR.to_string(),
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Split raw text into chunk strings.
    pub fn split_text(&self, text: &str) -> Vec<String> {
        let pieces: Vec<&str> = text
            .split(self.separator.as_str())
            .filter(|p| !p.is_empty())
            .collect();
        self.merge_pieces(&pieces)
    }

    /// Split one document into chunks that carry its metadata.
    pub fn split_document(&self, doc: &Document) -> Vec<Chunk> {
        self.split_text(&doc.content)
            .into_iter()
            .enumerate()
            .map(|(i, text)| make_chunk(i, text, doc))
            .collect()
    }

    /// Split every document, preserving document order.
    pub fn split_documents(&self, docs: &[Document]) -> Vec<Chunk> {
        docs.iter().flat_map(|d| self.split_document(d)).collect()
    }

    fn merge_pieces(&self, pieces: &[&str]) -> Vec<String> {
        let sep_len = char_len(&self.separator);
        let mut chunks = Vec::new();
        let mut window: VecDeque<&str> = VecDeque::new();
        let mut total = 0usize;

        let joiner = |window: &VecDeque<&str>| if window.is_empty() { 0 } else { sep_len };

        for &piece in pieces {
            let len = char_len(piece);

            if total + len + joiner(&window) > self.chunk_size {
                if total > self.chunk_size {
                    tracing::warn!(
                        size = total,
                        chunk_size = self.chunk_size,
                        "created a chunk longer than chunk_size"
                    );
                }
                if !window.is_empty() {
                    if let Some(chunk) = self.join(&window) {
                        chunks.push(chunk);
                    }
                    while total > self.chunk_overlap
                        || (total > 0 && total + len + joiner(&window) > self.chunk_size)
                    {
                        let Some(first) = window.pop_front() else {
                            break;
                        };
                        total = total.saturating_sub(char_len(first) + joiner(&window));
                    }
                }
            }

            window.push_back(piece);
            if window.len() > 1 {
                total += sep_len;
            }
            total += len;
        }

        if let Some(chunk) = self.join(&window) {
            chunks.push(chunk);
        }
        chunks
    }

    fn join(&self, window: &VecDeque<&str>) -> Option<String> {
        let joined = window
            .iter()
            .copied()
            .collect::<Vec<_>>()
            .join(&self.separator);
        let trimmed = joined.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn make_chunk(index: usize, text: String, doc: &Document) -> Chunk {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let hash = format!("{:x}", hasher.finalize());

    Chunk {
        id: Uuid::new_v4().to_string(),
        chunk_index: index,
        text,
        hash,
        metadata: doc.metadata.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DocumentMetadata;

    fn splitter(size: usize, overlap: usize) -> CharacterSplitter {
        CharacterSplitter::new(size, overlap).unwrap()
    }

    #[test]
    fn test_small_text_single_chunk() {
        assert_eq!(splitter(100, 10).split_text("Hello, world!"), vec!["Hello, world!"]);
    }

    #[test]
    fn test_empty_text_has_no_chunks() {
        assert!(splitter(100, 10).split_text("").is_empty());
        assert!(splitter(100, 10).split_text("\n\n\n").is_empty());
    }

    #[test]
    fn test_overlap_carries_tail() {
        let chunks = splitter(7, 3).split_text("aaa\nbbb\nccc");
        assert_eq!(chunks, vec!["aaa\nbbb", "bbb\nccc"]);
    }

    #[test]
    fn test_zero_overlap() {
        let chunks = splitter(7, 0).split_text("aaa\nbbb\nccc");
        assert_eq!(chunks, vec!["aaa\nbbb", "ccc"]);
    }

    #[test]
    fn test_oversized_line_kept_whole() {
        let long = "x".repeat(20);
        let text = format!("short\n{}", long);
        let chunks = splitter(10, 0).split_text(&text);
        assert_eq!(chunks, vec!["short".to_string(), long]);
    }

    #[test]
    fn test_blank_lines_dropped() {
        assert_eq!(splitter(10, 0).split_text("a\n\n\nb"), vec!["a\nb"]);
    }

    #[test]
    fn test_counts_characters_not_bytes() {
        let chunks = splitter(5, 0).split_text("あいう\nえお");
        assert_eq!(chunks, vec!["あいう", "えお"]);
    }

    #[test]
    fn test_chunks_never_exceed_size_for_short_lines() {
        let text = (0..200)
            .map(|i| format!("line {}", i))
            .collect::<Vec<_>>()
            .join("\n");
        for chunk in splitter(50, 10).split_text(&text) {
            assert!(chunk.chars().count() <= 50, "chunk too long: {:?}", chunk);
        }
    }

    #[test]
    fn test_split_document_copies_metadata() {
        let doc = Document::new(
            "one\ntwo\nthree",
            DocumentMetadata::new("manual.pdf").with_page(2),
        );
        let chunks = splitter(8, 0).split_document(&doc);
        assert_eq!(chunks.len(), 2);
        for (i, c) in chunks.iter().enumerate() {
            assert_eq!(c.chunk_index, i);
            assert_eq!(c.metadata.source, "manual.pdf");
            assert_eq!(c.metadata.page, Some(2));
            assert_eq!(c.hash.len(), 64);
        }
    }

    #[test]
    fn test_identical_text_same_hash() {
        let a = Document::new("same", DocumentMetadata::new("a.txt"));
        let b = Document::new("same", DocumentMetadata::new("b.txt"));
        let chunks = splitter(10, 0).split_documents(&[a, b]);
        assert_eq!(chunks[0].hash, chunks[1].hash);
        assert_ne!(chunks[0].id, chunks[1].id);
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(CharacterSplitter::new(0, 0).is_err());
        assert!(CharacterSplitter::new(10, 10).is_err());
        assert!(CharacterSplitter::new(10, 9).is_ok());
    }
}
