//! Conversation session.
//!
//! A [`Session`] owns everything one conversation needs: its id, the
//! conversation log (structured turns, replayable), the raw chat history
//! fed back to the model, and the retriever. The retriever is built on
//! first use and reused for the rest of the session.
//!
//! Every failure is logged with a fixed per-stage message and returned as
//! an [`AppError`]. A failed turn leaves the log and the history untouched.

use std::io::Write;
use std::sync::Arc;

use anyhow::{Context, Result};
use docdesk_core::chunk::CharacterSplitter;
use docdesk_core::embedding::Embedder;
use docdesk_core::index::build_retriever;
use docdesk_core::llm::{ChatMessage, ChatModel};
use docdesk_core::pipeline::ResponsePipeline;
use docdesk_core::response::{build_payload, AssistantPayload, Mode, Turn};
use docdesk_core::retriever::Retriever;
use tokio::sync::OnceCell;
use tracing::Instrument;

use crate::config::Config;
use crate::error::AppError;
use crate::ingest;
use crate::logging;
use crate::openai::{api_key_from_env, OpenAIChat, OpenAIEmbedder};
use crate::render;
use crate::web::{HttpPageFetcher, PageFetcher};

/// External collaborators a session talks to.
#[derive(Clone)]
pub struct Services {
    pub embedder: Arc<dyn Embedder>,
    pub chat: Arc<dyn ChatModel>,
    pub fetcher: Arc<dyn PageFetcher>,
}

impl Services {
    /// OpenAI clients plus the HTTP page fetcher. Fails when the API key
    /// variable is unset.
    pub fn from_config(config: &Config) -> Result<Self> {
        let api_key = api_key_from_env(&config.llm.api_key_env)?;
        Ok(Self {
            embedder: Arc::new(OpenAIEmbedder::new(&config.embedding, api_key.clone())?),
            chat: Arc::new(OpenAIChat::new(&config.llm, api_key)?),
            fetcher: Arc::new(HttpPageFetcher::new(config.ingest.fetch_timeout_secs)?),
        })
    }
}

pub struct Session {
    session_id: String,
    config: Config,
    services: Services,
    pipeline: ResponsePipeline,
    retriever: OnceCell<Retriever>,
    messages: Vec<Turn>,
    chat_history: Vec<ChatMessage>,
    span: tracing::Span,
}

impl Session {
    pub fn new(config: Config, services: Services) -> Self {
        let session_id = uuid::Uuid::new_v4().simple().to_string();
        let pipeline = ResponsePipeline::new(services.chat.clone(), config.prompts.to_prompts());
        let span = logging::session_span(&session_id);
        Self {
            session_id,
            config,
            services,
            pipeline,
            retriever: OnceCell::new(),
            messages: Vec::new(),
            chat_history: Vec::new(),
            span,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Structured conversation log, oldest first.
    pub fn messages(&self) -> &[Turn] {
        &self.messages
    }

    /// Raw user and assistant messages as sent to the model.
    pub fn chat_history(&self) -> &[ChatMessage] {
        &self.chat_history
    }

    pub fn is_initialized(&self) -> bool {
        self.retriever.initialized()
    }

    /// Ingest documents and build the retriever, once. Later calls return
    /// the same retriever.
    pub async fn initialize(&self) -> Result<&Retriever, AppError> {
        self.retriever
            .get_or_try_init(|| self.build())
            .instrument(self.span.clone())
            .await
            .map_err(|e| AppError::Initialize(e).logged())
    }

    async fn build(&self) -> Result<Retriever> {
        tracing::info!(app = %self.config.app.name, "initializing session");
        let splitter = CharacterSplitter::new(
            self.config.chunking.chunk_size,
            self.config.chunking.chunk_overlap,
        )?;
        let docs = ingest::load_all_documents(&self.config.ingest, self.services.fetcher.as_ref())
            .await
            .context("ingestion failed")?;
        let (retriever, _stats) = build_retriever(
            &docs,
            &splitter,
            self.services.embedder.clone(),
            self.config.embedding.batch_size,
            self.config.retrieval.top_k,
        )
        .await
        .context("index build failed")?;
        Ok(retriever)
    }

    /// Run one turn. On success the utterance and the payload are appended
    /// to the log and the utterance and raw answer to the chat history.
    pub async fn handle_turn(&mut self, mode: Mode, input: &str) -> Result<AssistantPayload, AppError> {
        let span = self.span.clone();
        self.turn(mode, input).instrument(span).await
    }

    async fn turn(&mut self, mode: Mode, input: &str) -> Result<AssistantPayload, AppError> {
        let retriever = self.initialize().await?.clone();
        tracing::info!(mode = %mode, input, "user input");

        let response = self
            .pipeline
            .run(&retriever, mode, input, &self.chat_history)
            .await
            .map_err(|e| AppError::Response(e).logged())?;

        let payload = build_payload(mode, &response, self.pipeline.prompts())
            .map_err(|e| AppError::Display(e).logged())?;
        let json = serde_json::to_string(&payload)
            .context("failed to serialize payload")
            .map_err(|e| AppError::Display(e).logged())?;
        tracing::info!(mode = %mode, payload = %json, "assistant response");

        self.messages.push(Turn::User(input.to_string()));
        self.messages.push(Turn::Assistant(payload.clone()));
        self.chat_history.push(ChatMessage::user(input));
        self.chat_history.push(ChatMessage::assistant(response.answer));
        Ok(payload)
    }

    /// Re-render every stored turn to `out`.
    pub fn replay_log<W: Write>(&self, out: &mut W) -> Result<(), AppError> {
        let _entered = self.span.enter();
        for turn in &self.messages {
            render::write_turn(out, turn)
                .context("failed to write conversation log")
                .map_err(|e| AppError::ConversationLog(e).logged())?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("session_id", &self.session_id)
            .field("turns", &self.messages.len())
            .field("initialized", &self.is_initialized())
            .finish()
    }
}
