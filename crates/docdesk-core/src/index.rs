//! Index builder: split, embed, store.
//!
//! Runs once per session. Chunks with identical text (same SHA-256) are
//! embedded once and share the vector. Texts are sent to the embedder in
//! batches of `batch_size`; any embedding failure aborts the build.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{bail, Context, Result};

use crate::chunk::CharacterSplitter;
use crate::embedding::Embedder;
use crate::models::Document;
use crate::retriever::Retriever;
use crate::store::memory::InMemoryStore;
use crate::store::VectorStore;

/// Counters reported after an index build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexStats {
    pub documents: usize,
    pub chunks: usize,
    /// Distinct chunk texts sent to the embedder.
    pub embedded_texts: usize,
}

/// Split, embed and index `docs`, returning a retriever over the result.
pub async fn build_retriever(
    docs: &[Document],
    splitter: &CharacterSplitter,
    embedder: Arc<dyn Embedder>,
    batch_size: usize,
    top_k: usize,
) -> Result<(Retriever, IndexStats)> {
    if batch_size == 0 {
        bail!("embedding batch_size must be > 0");
    }

    let chunks = splitter.split_documents(docs);

    let mut unique_texts: Vec<String> = Vec::new();
    let mut slot_by_hash: HashMap<&str, usize> = HashMap::new();
    let slots: Vec<usize> = chunks
        .iter()
        .map(|c| {
            *slot_by_hash.entry(c.hash.as_str()).or_insert_with(|| {
                unique_texts.push(c.text.clone());
                unique_texts.len() - 1
            })
        })
        .collect();

    let mut unique_vectors: Vec<Vec<f32>> = Vec::with_capacity(unique_texts.len());
    for batch in unique_texts.chunks(batch_size) {
        let vectors = embedder
            .embed_texts(batch)
            .await
            .with_context(|| format!("failed to embed a batch of {} chunks", batch.len()))?;
        if vectors.len() != batch.len() {
            bail!(
                "embedding service returned {} vectors for {} texts",
                vectors.len(),
                batch.len()
            );
        }
        unique_vectors.extend(vectors);
    }

    let vectors: Vec<Vec<f32>> = slots.iter().map(|&i| unique_vectors[i].clone()).collect();

    let store = InMemoryStore::new();
    store.add(&chunks, &vectors).await?;

    let stats = IndexStats {
        documents: docs.len(),
        chunks: chunks.len(),
        embedded_texts: unique_texts.len(),
    };
    tracing::info!(
        documents = stats.documents,
        chunks = stats.chunks,
        embedded = stats.embedded_texts,
        model = embedder.model_name(),
        "vector index built"
    );

    Ok((Retriever::new(Arc::new(store), embedder, top_k), stats))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DocumentMetadata;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Records every batch it is asked to embed.
    struct Recording {
        batches: Mutex<Vec<usize>>,
    }

    #[async_trait]
    impl Embedder for Recording {
        fn model_name(&self) -> &str {
            "recording"
        }
        async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            self.batches.lock().unwrap().push(texts.len());
            Ok(texts.iter().map(|t| vec![t.len() as f32, 1.0]).collect())
        }
    }

    struct Failing;

    #[async_trait]
    impl Embedder for Failing {
        fn model_name(&self) -> &str {
            "failing"
        }
        async fn embed_texts(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
            bail!("401 Unauthorized")
        }
    }

    fn docs() -> Vec<Document> {
        vec![
            Document::new("alpha\nbeta\ngamma", DocumentMetadata::new("a.txt")),
            Document::new("alpha", DocumentMetadata::new("b.txt")),
            Document::new("", DocumentMetadata::new("empty.txt")),
        ]
    }

    #[tokio::test]
    async fn test_build_dedups_and_batches() {
        let embedder = Arc::new(Recording {
            batches: Mutex::new(Vec::new()),
        });
        let splitter = CharacterSplitter::new(5, 0).unwrap();
        let (retriever, stats) = build_retriever(&docs(), &splitter, embedder.clone(), 2, 4)
            .await
            .unwrap();

        assert_eq!(stats.documents, 3);
        assert_eq!(stats.chunks, 4);
        assert_eq!(stats.embedded_texts, 3);
        assert_eq!(*embedder.batches.lock().unwrap(), vec![2, 1]);
        assert_eq!(retriever.top_k(), 4);
    }

    #[tokio::test]
    async fn test_embedding_failure_aborts_build() {
        let splitter = CharacterSplitter::new(5, 0).unwrap();
        let err = build_retriever(&docs(), &splitter, Arc::new(Failing), 8, 4)
            .await
            .unwrap_err();
        assert!(format!("{:#}", err).contains("401"));
    }

    #[tokio::test]
    async fn test_empty_corpus_builds_empty_index() {
        let splitter = CharacterSplitter::new(5, 0).unwrap();
        let embedder = Arc::new(Recording {
            batches: Mutex::new(Vec::new()),
        });
        let (retriever, stats) = build_retriever(&[], &splitter, embedder.clone(), 8, 4)
            .await
            .unwrap();
        assert_eq!(stats, IndexStats::default());
        assert!(embedder.batches.lock().unwrap().is_empty());
        // Retrieval still embeds the query, then finds nothing.
        assert!(retriever.retrieve("anything").await.unwrap().is_empty());
    }
}
