//! Core data models that flow through ingestion, indexing and retrieval.

use serde::{Deserialize, Serialize};

/// Prefix that marks a source as a web address.
pub const WEB_SOURCE_PREFIX: &str = "http";

/// Metadata attached to a loaded document and copied onto its chunks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    /// File path or URL the document was loaded from.
    pub source: String,
    /// 0-based page index, for paginated formats.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    /// Human-readable title (web pages).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl DocumentMetadata {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            page: None,
            title: None,
        }
    }

    pub fn with_page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn kind(&self) -> SourceKind {
        SourceKind::of(&self.source)
    }
}

/// A loaded document. Immutable once produced by ingestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub content: String,
    pub metadata: DocumentMetadata,
}

impl Document {
    pub fn new(content: impl Into<String>, metadata: DocumentMetadata) -> Self {
        Self {
            content: content.into(),
            metadata,
        }
    }
}

/// A chunk of a document's content, with the parent's metadata.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub id: String,
    /// Position of this chunk within its parent document.
    pub chunk_index: usize,
    pub text: String,
    /// SHA-256 hex digest of `text`.
    pub hash: String,
    pub metadata: DocumentMetadata,
}

/// A chunk returned by the retriever, best match first.
#[derive(Debug, Clone)]
pub struct RetrievedChunk {
    pub text: String,
    pub metadata: DocumentMetadata,
    pub score: f32,
}

impl RetrievedChunk {
    pub fn source(&self) -> &str {
        &self.metadata.source
    }
}

/// Whether a source string points to the web or to a local document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Web,
    Document,
}

impl SourceKind {
    pub fn of(source: &str) -> Self {
        if source.starts_with(WEB_SOURCE_PREFIX) {
            SourceKind::Web
        } else {
            SourceKind::Document
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_kind() {
        assert_eq!(SourceKind::of("https://example.com/a"), SourceKind::Web);
        assert_eq!(SourceKind::of("http://intra/x"), SourceKind::Web);
        assert_eq!(SourceKind::of("data/policy.pdf"), SourceKind::Document);
        assert_eq!(SourceKind::of("/srv/http/readme.txt"), SourceKind::Document);
    }

    #[test]
    fn test_metadata_builders() {
        let meta = DocumentMetadata::new("a.pdf").with_page(3).with_title("A");
        assert_eq!(meta.page, Some(3));
        assert_eq!(meta.title.as_deref(), Some("A"));
        assert_eq!(meta.kind(), SourceKind::Document);
    }
}
