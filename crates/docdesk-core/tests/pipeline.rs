//! End-to-end tests of the retrieval pipeline with in-process fakes.
//!
//! The embedder counts vocabulary words, and the chat model replays
//! scripted answers while recording every request, so no test touches the
//! network.

use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex};

use anyhow::{bail, Result};
use async_trait::async_trait;
use docdesk_core::chunk::CharacterSplitter;
use docdesk_core::embedding::Embedder;
use docdesk_core::index::build_retriever;
use docdesk_core::llm::{ChatMessage, ChatModel, Role};
use docdesk_core::models::{Document, DocumentMetadata};
use docdesk_core::pipeline::{Prompts, ResponsePipeline};
use docdesk_core::response::{build_payload, AssistantPayload, Mode, SearchPayload};
use docdesk_core::retriever::Retriever;

const VOCAB: &[&str] = &["vacation", "policy", "expense", "travel", "salary", "meeting"];

struct KeywordEmbedder;

#[async_trait]
impl Embedder for KeywordEmbedder {
    fn model_name(&self) -> &str {
        "keyword-counts"
    }

    async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts
            .iter()
            .map(|t| {
                let lower = t.to_lowercase();
                VOCAB
                    .iter()
                    .map(|w| lower.matches(w).count() as f32)
                    .collect()
            })
            .collect())
    }
}

struct ScriptedChat {
    replies: Mutex<VecDeque<Result<String, String>>>,
    requests: Mutex<Vec<Vec<ChatMessage>>>,
}

impl ScriptedChat {
    fn new(replies: Vec<Result<&str, &str>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(
                replies
                    .into_iter()
                    .map(|r| r.map(String::from).map_err(String::from))
                    .collect(),
            ),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn requests(&self) -> Vec<Vec<ChatMessage>> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatModel for ScriptedChat {
    fn model_name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        self.requests.lock().unwrap().push(messages.to_vec());
        match self.replies.lock().unwrap().pop_front() {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(e)) => bail!(e),
            None => bail!("no scripted reply left"),
        }
    }
}

fn corpus() -> Vec<Document> {
    vec![
        Document::new(
            "Vacation policy: twenty days per year.\nVacation requests go to your manager.",
            DocumentMetadata::new("data/hr/vacation_policy.pdf").with_page(0),
        ),
        Document::new(
            "Vacation carry-over policy: up to five days.",
            DocumentMetadata::new("data/hr/vacation_policy.pdf").with_page(1),
        ),
        Document::new(
            "Travel expense policy for business trips.",
            DocumentMetadata::new("data/finance/travel.txt"),
        ),
        Document::new(
            "Vacation calendar for the team.",
            DocumentMetadata::new("https://intranet.example.com/calendar"),
        ),
        Document::new(
            "Meeting notes about salary review.",
            DocumentMetadata::new("data/minutes/2024-04.txt"),
        ),
    ]
}

async fn retriever(top_k: usize) -> Retriever {
    let splitter = CharacterSplitter::new(60, 0).unwrap();
    let (retriever, _) = build_retriever(&corpus(), &splitter, Arc::new(KeywordEmbedder), 16, top_k)
        .await
        .unwrap();
    retriever
}

#[tokio::test]
async fn first_turn_skips_rewrite() {
    let chat = ScriptedChat::new(vec![Ok("The vacation policy document.")]);
    let pipeline = ResponsePipeline::new(chat.clone(), Prompts::default());
    let retriever = retriever(4).await;

    let response = pipeline
        .run(&retriever, Mode::DocumentSearch, "vacation policy", &[])
        .await
        .unwrap();

    assert_eq!(response.query, "vacation policy");
    assert_eq!(chat.requests().len(), 1);
    assert_eq!(response.context.len(), 4);
    assert_eq!(response.context[0].source(), "data/hr/vacation_policy.pdf");

    let requests = chat.requests();
    let system = &requests[0][0];
    assert_eq!(system.role, Role::System);
    assert!(system.content.contains("Vacation policy: twenty days per year."));
    assert!(!system.content.contains("{context}"));
}

#[tokio::test]
async fn vacation_policy_search_dedups_sources() {
    let chat = ScriptedChat::new(vec![Ok("The vacation policy document.")]);
    let pipeline = ResponsePipeline::new(chat, Prompts::default());
    let top_k = 4;
    let retriever = retriever(top_k).await;

    let response = pipeline
        .run(&retriever, Mode::DocumentSearch, "vacation policy", &[])
        .await
        .unwrap();
    let payload = build_payload(Mode::DocumentSearch, &response, pipeline.prompts()).unwrap();

    let AssistantPayload::DocumentSearch(SearchPayload::Found { main, sub, .. }) = payload else {
        panic!("expected a document match");
    };
    assert_eq!(main.source, "data/hr/vacation_policy.pdf");
    let choices = sub.map(|s| s.choices).unwrap_or_default();
    assert!(choices.len() <= top_k - 1);
    assert!(choices.iter().all(|c| c.source != main.source));
    let distinct: HashSet<&str> = choices.iter().map(|c| c.source.as_str()).collect();
    assert_eq!(distinct.len(), choices.len());
    assert_eq!(choices[0].source, "https://intranet.example.com/calendar");
}

#[tokio::test]
async fn follow_up_turn_uses_rewritten_query() {
    let chat = ScriptedChat::new(vec![Ok("travel expense policy"), Ok("Keep your receipts.")]);
    let pipeline = ResponsePipeline::new(chat.clone(), Prompts::default());
    let retriever = retriever(2).await;
    let history = vec![
        ChatMessage::user("what about trips?"),
        ChatMessage::assistant("Trips need approval."),
    ];

    let response = pipeline
        .run(&retriever, Mode::Inquiry, "and the costs?", &history)
        .await
        .unwrap();

    assert_eq!(response.query, "travel expense policy");
    assert_eq!(response.answer, "Keep your receipts.");
    assert_eq!(response.input, "and the costs?");
    assert_eq!(response.context[0].source(), "data/finance/travel.txt");

    let requests = chat.requests();
    assert_eq!(requests.len(), 2);
    // system + 2 history messages + input, for both calls
    assert_eq!(requests[0].len(), 4);
    assert_eq!(requests[1].len(), 4);
    assert_eq!(requests[1][3], ChatMessage::user("and the costs?"));
}

#[tokio::test]
async fn rewrite_failure_fails_the_turn() {
    let chat = ScriptedChat::new(vec![Err("503 Service Unavailable")]);
    let pipeline = ResponsePipeline::new(chat.clone(), Prompts::default());
    let retriever = retriever(2).await;
    let history = vec![ChatMessage::user("a"), ChatMessage::assistant("b")];

    let err = pipeline
        .run(&retriever, Mode::Inquiry, "c", &history)
        .await
        .unwrap_err();
    assert!(format!("{:#}", err).contains("query rewrite failed"));
    assert_eq!(chat.requests().len(), 1);
}

#[tokio::test]
async fn inquiry_sentinel_yields_no_citations() {
    let prompts = Prompts::default();
    let sentinel = prompts.inquiry_no_match_answer.clone();
    let chat = ScriptedChat::new(vec![Ok(sentinel.as_str())]);
    let pipeline = ResponsePipeline::new(chat, prompts);
    let retriever = retriever(3).await;

    let response = pipeline
        .run(&retriever, Mode::Inquiry, "office wifi password", &[])
        .await
        .unwrap();
    let payload = build_payload(Mode::Inquiry, &response, pipeline.prompts()).unwrap();
    let AssistantPayload::Inquiry(inquiry) = payload else {
        panic!("expected inquiry payload");
    };
    assert_eq!(inquiry.answer, sentinel);
    assert!(inquiry.citations.is_none());
}
