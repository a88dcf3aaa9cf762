//! History-aware retrieval and answer generation.
//!
//! One turn runs three steps, each awaited in order:
//!
//! 1. **Rewrite**: when there is chat history, ask the model to turn the
//!    utterance into a standalone question (pronouns and ellipsis resolved).
//!    With no history the utterance is used as-is.
//! 2. **Retrieve**: the top-K chunks for the rewritten query.
//! 3. **Answer**: the mode's system prompt, with the retrieved chunks
//!    substituted for `{context}`, then the history and the utterance.
//!
//! There are no retries; the first failing step fails the turn.

use std::sync::Arc;

use anyhow::{bail, Context, Result};

use crate::llm::{ChatMessage, ChatModel};
use crate::models::RetrievedChunk;
use crate::response::Mode;
use crate::retriever::Retriever;

/// Placeholder replaced by the retrieved chunk texts.
pub const CONTEXT_PLACEHOLDER: &str = "{context}";

const DOCUMENT_SEPARATOR: &str = "\n\n";

pub const DEFAULT_NO_DOC_MATCH_ANSWER: &str = "No related documents found.";
pub const DEFAULT_NO_DOC_MATCH_MESSAGE: &str =
    "No file related to your input was found. Please try rephrasing your input.";
pub const DEFAULT_INQUIRY_NO_MATCH_ANSWER: &str =
    "I could not find information related to your question in the available documents.";

pub const DEFAULT_REWRITE_PROMPT: &str = "Given the chat history and the latest user input, \
which may refer to context in the chat history, rewrite the input as a standalone question \
that can be understood without the chat history. Do not answer it. If no rewrite is needed, \
return the input unchanged.";

pub const DEFAULT_DOC_SEARCH_PROMPT: &str = "You locate internal documents for the user. \
Use the retrieved context below to decide whether any document relates to the user's input. \
If none does, reply exactly with \"No related documents found.\" Otherwise reply with a \
one-sentence summary of the most relevant document.\n\n{context}";

pub const DEFAULT_INQUIRY_PROMPT: &str = "You answer employee questions using only the \
retrieved context below. Answer in detail and in a structured way. If the context does not \
contain the answer, reply exactly with \"I could not find information related to your \
question in the available documents.\"\n\n{context}";

/// System prompts and sentinel answers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompts {
    pub rewrite: String,
    pub doc_search: String,
    pub inquiry: String,
    /// Document-search answer meaning "nothing relevant".
    pub no_doc_match_answer: String,
    /// Message shown for a document search with no match.
    pub no_doc_match_message: String,
    /// Inquiry answer meaning "nothing relevant".
    pub inquiry_no_match_answer: String,
}

impl Default for Prompts {
    fn default() -> Self {
        Self {
            rewrite: DEFAULT_REWRITE_PROMPT.to_string(),
            doc_search: DEFAULT_DOC_SEARCH_PROMPT.to_string(),
            inquiry: DEFAULT_INQUIRY_PROMPT.to_string(),
            no_doc_match_answer: DEFAULT_NO_DOC_MATCH_ANSWER.to_string(),
            no_doc_match_message: DEFAULT_NO_DOC_MATCH_MESSAGE.to_string(),
            inquiry_no_match_answer: DEFAULT_INQUIRY_NO_MATCH_ANSWER.to_string(),
        }
    }
}

impl Prompts {
    pub fn answer_prompt(&self, mode: Mode) -> &str {
        match mode {
            Mode::DocumentSearch => &self.doc_search,
            Mode::Inquiry => &self.inquiry,
        }
    }

    pub fn validate(&self) -> Result<()> {
        for (name, prompt) in [("doc_search", &self.doc_search), ("inquiry", &self.inquiry)] {
            if !prompt.contains(CONTEXT_PLACEHOLDER) {
                bail!("prompts.{} must contain {}", name, CONTEXT_PLACEHOLDER);
            }
        }
        if self.no_doc_match_answer.trim().is_empty() || self.inquiry_no_match_answer.trim().is_empty() {
            bail!("no-match sentinel answers must not be empty");
        }
        Ok(())
    }
}

/// Everything a turn produced, before formatting.
#[derive(Debug, Clone)]
pub struct LlmResponse {
    /// The raw user utterance.
    pub input: String,
    /// The standalone query used for retrieval.
    pub query: String,
    /// The model's answer.
    pub answer: String,
    /// Retrieved chunks, best match first.
    pub context: Vec<RetrievedChunk>,
}

pub struct ResponsePipeline {
    chat: Arc<dyn ChatModel>,
    prompts: Prompts,
}

impl ResponsePipeline {
    pub fn new(chat: Arc<dyn ChatModel>, prompts: Prompts) -> Self {
        Self { chat, prompts }
    }

    pub fn prompts(&self) -> &Prompts {
        &self.prompts
    }

    /// Run one turn against `retriever`. `history` is not modified.
    pub async fn run(
        &self,
        retriever: &Retriever,
        mode: Mode,
        input: &str,
        history: &[ChatMessage],
    ) -> Result<LlmResponse> {
        let query = self.rewrite_query(input, history).await?;
        let context = retriever
            .retrieve(&query)
            .await
            .context("retrieval failed")?;

        let system = self
            .prompts
            .answer_prompt(mode)
            .replace(CONTEXT_PLACEHOLDER, &format_context(&context));
        let messages = with_history(system, history, input);
        let answer = self
            .chat
            .complete(&messages)
            .await
            .context("answer generation failed")?;

        Ok(LlmResponse {
            input: input.to_string(),
            query,
            answer,
            context,
        })
    }

    async fn rewrite_query(&self, input: &str, history: &[ChatMessage]) -> Result<String> {
        if history.is_empty() {
            return Ok(input.to_string());
        }
        let messages = with_history(self.prompts.rewrite.clone(), history, input);
        let rewritten = self
            .chat
            .complete(&messages)
            .await
            .context("query rewrite failed")?;
        tracing::debug!(input, rewritten = %rewritten, "query rewritten");
        Ok(rewritten.trim().to_string())
    }
}

fn with_history(system: String, history: &[ChatMessage], input: &str) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(ChatMessage::system(system));
    messages.extend_from_slice(history);
    messages.push(ChatMessage::user(input));
    messages
}

fn format_context(context: &[RetrievedChunk]) -> String {
    context
        .iter()
        .map(|c| c.text.as_str())
        .collect::<Vec<_>>()
        .join(DOCUMENT_SEPARATOR)
}
