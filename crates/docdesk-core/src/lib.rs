//! # docdesk core
//!
//! Shared, I/O-free logic for docdesk: data models, legacy text
//! normalization, the character splitter, collaborator traits (embedding,
//! chat, vector store), the in-memory index, the retrieval pipeline and the
//! assistant response payloads.
//!
//! This crate performs no filesystem or network access. Concrete loaders,
//! HTTP clients and the terminal renderer live in the `docdesk` app crate.
//!
//! ```text
//! Documents ──▶ split ──▶ embed ──▶ VectorStore
//!                                      │
//!   utterance ──▶ rewrite ──▶ Retriever┘──▶ answer ──▶ AssistantPayload ──▶ Blocks
//! ```

pub mod chunk;
pub mod embedding;
pub mod index;
pub mod llm;
pub mod models;
pub mod normalize;
pub mod pipeline;
pub mod response;
pub mod retriever;
pub mod store;
