//! # docdesk
//!
//! A conversational assistant over internal documents. It answers in one of
//! two modes:
//!
//! - **Document search**: which file is relevant to what I typed?
//! - **Inquiry**: answer my question from the documents, with sources.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//! │  Ingestion   │──▶│ Index build  │──▶│  Retriever   │
//! │ files + web  │   │ split+embed  │   │   top-K      │
//! └──────────────┘   └──────────────┘   └──────┬───────┘
//!                                              │
//!      ┌──────────┐   ┌──────────────┐   ┌─────▼────────┐
//!      │ Terminal │◀──│   Payload    │◀──│   Pipeline   │
//!      │ renderer │   │ format+dedup │   │ rewrite+LLM  │
//!      └──────────┘   └──────────────┘   └──────────────┘
//! ```
//!
//! The pure pieces (splitting, indexing, the pipeline, payload formatting)
//! live in `docdesk-core`. This crate adds configuration, logging, file and
//! web loading, the OpenAI clients, the session and the CLI.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing and validation |
//! | [`logging`] | Daily-rolling file logger |
//! | [`error`] | User-facing error kinds |
//! | [`extract`] | PDF and DOCX text extraction |
//! | [`loaders`] | File loaders by extension |
//! | [`web`] | Web page fetching |
//! | [`ingest`] | Recursive document ingestion |
//! | [`openai`] | Embedding and chat-completion clients |
//! | [`session`] | Conversation session |
//! | [`render`] | Terminal output |

pub mod config;
pub mod error;
pub mod extract;
pub mod ingest;
pub mod loaders;
pub mod logging;
pub mod openai;
pub mod render;
pub mod session;
pub mod web;
