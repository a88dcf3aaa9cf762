//! Assistant response payloads and their rendering.
//!
//! A turn's answer is turned into an [`AssistantPayload`] once, stored in
//! the conversation log, and rendered to [`Block`]s by [`render_payload`].
//! The live path and log replay both go through `render_payload`, so a
//! replayed turn is always identical to what was shown when it was created.
//!
//! # Document search
//!
//! The first retrieved chunk's source is the main result. Later chunks are
//! scanned in retrieval order and become secondary candidates when their
//! source differs from the main one and has not been listed yet; the first
//! occurrence wins, even if a later one carries a different page.
//!
//! # Inquiry
//!
//! The synthesized answer is shown, followed by one citation per distinct
//! source in retrieval order. When the answer is the no-match sentinel, no
//! citations are recorded.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::models::{RetrievedChunk, SourceKind};
use crate::pipeline::{LlmResponse, Prompts};

pub const MAIN_MESSAGE: &str =
    "Information related to your input may be found in the following file.";
pub const SUB_MESSAGE: &str = "Other candidate file locations:";
pub const SOURCES_HEADING: &str = "Sources";

/// Response mode selected by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Locate the files relevant to the input.
    DocumentSearch,
    /// Answer the input from the retrieved context.
    Inquiry,
}

impl Mode {
    pub fn label(self) -> &'static str {
        match self {
            Mode::DocumentSearch => "document search",
            Mode::Inquiry => "inquiry",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Mode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "search" | "document-search" | "document_search" | "a" => Ok(Mode::DocumentSearch),
            "inquiry" | "b" => Ok(Mode::Inquiry),
            other => bail!("Unknown mode: '{}'. Use search or inquiry.", other),
        }
    }
}

/// Icon shown beside a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Icon {
    Link,
    Document,
}

pub fn source_icon(source: &str) -> Icon {
    match SourceKind::of(source) {
        SourceKind::Web => Icon::Link,
        SourceKind::Document => Icon::Document,
    }
}

/// Append the 1-indexed page to a document source; web sources never get one.
pub fn format_with_page_info(source: &str, page: Option<u32>) -> String {
    match (SourceKind::of(source), page) {
        (SourceKind::Document, Some(page)) => format!("{} (page {})", source, page + 1),
        _ => source.to_string(),
    }
}

/// A cited source with its stored 0-based page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRef {
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
}

impl SourceRef {
    fn from_chunk(chunk: &RetrievedChunk) -> Self {
        Self {
            source: chunk.metadata.source.clone(),
            page: chunk.metadata.page,
        }
    }

    pub fn display(&self) -> String {
        format_with_page_info(&self.source, self.page)
    }

    pub fn icon(&self) -> Icon {
        source_icon(&self.source)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubChoices {
    pub message: String,
    pub choices: Vec<SourceRef>,
}

/// Document search result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum SearchPayload {
    /// Nothing relevant; no file path is reported.
    NoMatch { answer: String },
    Found {
        main_message: String,
        main: SourceRef,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        sub: Option<SubChoices>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citations {
    pub message: String,
    /// Rendered source strings, page suffix included.
    pub sources: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InquiryPayload {
    pub answer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub citations: Option<Citations>,
}

/// Stored content of an assistant turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum AssistantPayload {
    DocumentSearch(SearchPayload),
    Inquiry(InquiryPayload),
}

impl AssistantPayload {
    pub fn mode(&self) -> Mode {
        match self {
            AssistantPayload::DocumentSearch(_) => Mode::DocumentSearch,
            AssistantPayload::Inquiry(_) => Mode::Inquiry,
        }
    }
}

/// One entry of the conversation log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", content = "content", rename_all = "lowercase")]
pub enum Turn {
    User(String),
    Assistant(AssistantPayload),
}

/// Build the stored payload for a pipeline response.
///
/// # Errors
///
/// Fails when a retrieved chunk has an empty source, which would produce a
/// citation pointing nowhere.
pub fn build_payload(
    mode: Mode,
    response: &LlmResponse,
    prompts: &Prompts,
) -> Result<AssistantPayload> {
    if let Some(pos) = response.context.iter().position(|c| c.source().is_empty()) {
        bail!("retrieved chunk #{} has no source", pos);
    }
    Ok(match mode {
        Mode::DocumentSearch => AssistantPayload::DocumentSearch(build_search_payload(
            &response.answer,
            &response.context,
            prompts,
        )),
        Mode::Inquiry => AssistantPayload::Inquiry(build_inquiry_payload(
            &response.answer,
            &response.context,
            prompts,
        )),
    })
}

pub fn build_search_payload(
    answer: &str,
    context: &[RetrievedChunk],
    prompts: &Prompts,
) -> SearchPayload {
    let Some((first, rest)) = context.split_first() else {
        return no_match(prompts);
    };
    if answer == prompts.no_doc_match_answer {
        return no_match(prompts);
    }

    let main = SourceRef::from_chunk(first);
    let mut seen: HashSet<&str> = HashSet::new();
    let choices: Vec<SourceRef> = rest
        .iter()
        .filter(|c| c.source() != main.source && seen.insert(c.source()))
        .map(SourceRef::from_chunk)
        .collect();

    let sub = if choices.is_empty() {
        None
    } else {
        Some(SubChoices {
            message: SUB_MESSAGE.to_string(),
            choices,
        })
    };

    SearchPayload::Found {
        main_message: MAIN_MESSAGE.to_string(),
        main,
        sub,
    }
}

fn no_match(prompts: &Prompts) -> SearchPayload {
    SearchPayload::NoMatch {
        answer: prompts.no_doc_match_message.clone(),
    }
}

pub fn build_inquiry_payload(
    answer: &str,
    context: &[RetrievedChunk],
    prompts: &Prompts,
) -> InquiryPayload {
    if answer == prompts.inquiry_no_match_answer {
        return InquiryPayload {
            answer: answer.to_string(),
            citations: None,
        };
    }

    let mut seen: HashSet<&str> = HashSet::new();
    let sources: Vec<String> = context
        .iter()
        .filter(|c| seen.insert(c.source()))
        .map(|c| format_with_page_info(c.source(), c.metadata.page))
        .collect();

    InquiryPayload {
        answer: answer.to_string(),
        citations: Some(Citations {
            message: SOURCES_HEADING.to_string(),
            sources,
        }),
    }
}

/// A presentation block handed to the renderer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Block {
    Markdown(String),
    /// Highlighted primary source.
    Success { text: String, icon: Icon },
    /// Secondary source or citation.
    Info { text: String, icon: Icon },
    Divider,
    Heading(String),
}

pub fn render_payload(payload: &AssistantPayload) -> Vec<Block> {
    let mut blocks = Vec::new();
    match payload {
        AssistantPayload::DocumentSearch(SearchPayload::NoMatch { answer }) => {
            blocks.push(Block::Markdown(answer.clone()));
        }
        AssistantPayload::DocumentSearch(SearchPayload::Found {
            main_message,
            main,
            sub,
        }) => {
            blocks.push(Block::Markdown(main_message.clone()));
            blocks.push(Block::Success {
                text: main.display(),
                icon: main.icon(),
            });
            if let Some(sub) = sub {
                blocks.push(Block::Markdown(sub.message.clone()));
                blocks.extend(sub.choices.iter().map(|c| Block::Info {
                    text: c.display(),
                    icon: c.icon(),
                }));
            }
        }
        AssistantPayload::Inquiry(InquiryPayload { answer, citations }) => {
            blocks.push(Block::Markdown(answer.clone()));
            if let Some(citations) = citations {
                blocks.push(Block::Divider);
                blocks.push(Block::Heading(citations.message.clone()));
                blocks.extend(citations.sources.iter().map(|s| Block::Info {
                    text: s.clone(),
                    icon: source_icon(s),
                }));
            }
        }
    }
    blocks
}

pub fn render_turn(turn: &Turn) -> Vec<Block> {
    match turn {
        Turn::User(text) => vec![Block::Markdown(text.clone())],
        Turn::Assistant(payload) => render_payload(payload),
    }
}
