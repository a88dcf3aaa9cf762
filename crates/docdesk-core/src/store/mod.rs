//! Vector store abstraction.
//!
//! The [`VectorStore`] trait is the only view the retriever has of the
//! index. The built-in [`memory::InMemoryStore`] is a brute-force cosine
//! store; the index is rebuilt from source documents every session, so no
//! persistent backend is needed.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{Chunk, RetrievedChunk};

#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Add chunks with their embedding vectors (one per chunk, same order).
    async fn add(&self, chunks: &[Chunk], vectors: &[Vec<f32>]) -> Result<()>;

    /// Return the `k` chunks most similar to `query_vec`, best first.
    async fn similarity_search(&self, query_vec: &[f32], k: usize) -> Result<Vec<RetrievedChunk>>;

    /// Number of stored chunks.
    async fn len(&self) -> Result<usize>;
}
