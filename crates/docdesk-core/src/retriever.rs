//! Top-K retriever over a [`VectorStore`].

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::embedding::Embedder;
use crate::models::RetrievedChunk;
use crate::store::VectorStore;

/// Embeds a query and returns the `top_k` most similar chunks.
///
/// Cloning is cheap; the store and embedder are shared.
#[derive(Clone)]
pub struct Retriever {
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn Embedder>,
    top_k: usize,
}

impl Retriever {
    pub fn new(store: Arc<dyn VectorStore>, embedder: Arc<dyn Embedder>, top_k: usize) -> Self {
        Self {
            store,
            embedder,
            top_k,
        }
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    pub async fn retrieve(&self, query: &str) -> Result<Vec<RetrievedChunk>> {
        let query_vec = self
            .embedder
            .embed_query(query)
            .await
            .context("failed to embed query")?;
        self.store.similarity_search(&query_vec, self.top_k).await
    }
}

impl std::fmt::Debug for Retriever {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Retriever")
            .field("embedder", &self.embedder.model_name())
            .field("top_k", &self.top_k)
            .finish()
    }
}
