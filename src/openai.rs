//! OpenAI-compatible embedding and chat-completion clients.
//!
//! Both talk to `base_url` (`https://api.openai.com/v1` by default) with a
//! bearer key read from the environment variable named by `llm.api_key_env`.
//! Requests are not retried: a non-success status fails the call with the
//! status and response body.

use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use docdesk_core::embedding::Embedder;
use docdesk_core::llm::{ChatMessage, ChatModel};
use serde::{Deserialize, Serialize};

use crate::config::{EmbeddingConfig, LlmConfig};

/// Read the API key from the environment variable `var`.
pub fn api_key_from_env(var: &str) -> Result<String> {
    let key = std::env::var(var).map_err(|_| anyhow!("{} environment variable not set", var))?;
    if key.trim().is_empty() {
        bail!("{} environment variable is empty", var);
    }
    Ok(key)
}

fn build_client(timeout_secs: u64) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .context("Failed to create HTTP client")
}

fn endpoint(base_url: &str, path: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), path)
}

async fn post_json<T: Serialize + ?Sized>(
    client: &reqwest::Client,
    url: &str,
    api_key: &str,
    body: &T,
) -> Result<String> {
    let response = client
        .post(url)
        .header("Authorization", format!("Bearer {}", api_key))
        .json(body)
        .send()
        .await
        .with_context(|| format!("Request to {} failed", url))?;

    let status = response.status();
    let text = response.text().await.context("Failed to read response body")?;
    if !status.is_success() {
        bail!("OpenAI API error {}: {}", status, text);
    }
    Ok(text)
}

pub struct OpenAIEmbedder {
    client: reqwest::Client,
    url: String,
    api_key: String,
    model: String,
}

impl OpenAIEmbedder {
    pub fn new(config: &EmbeddingConfig, api_key: String) -> Result<Self> {
        Ok(Self {
            client: build_client(config.timeout_secs)?,
            url: endpoint(&config.base_url, "embeddings"),
            api_key,
            model: config.model.clone(),
        })
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Deserialize)]
struct EmbeddingItem {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

#[async_trait]
impl Embedder for OpenAIEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let body = EmbeddingRequest {
            model: &self.model,
            input: texts,
        };
        let text = post_json(&self.client, &self.url, &self.api_key, &body).await?;
        parse_embedding_response(&text, texts.len())
    }
}

fn parse_embedding_response(text: &str, expected: usize) -> Result<Vec<Vec<f32>>> {
    let mut parsed: EmbeddingResponse =
        serde_json::from_str(text).context("Invalid embeddings response")?;
    if parsed.data.len() != expected {
        bail!(
            "Invalid embeddings response: {} embeddings for {} inputs",
            parsed.data.len(),
            expected
        );
    }
    // Sort by index to ensure order matches input
    parsed.data.sort_by_key(|item| item.index);
    Ok(parsed.data.into_iter().map(|item| item.embedding).collect())
}

pub struct OpenAIChat {
    client: reqwest::Client,
    url: String,
    api_key: String,
    model: String,
    temperature: f32,
}

impl OpenAIChat {
    pub fn new(config: &LlmConfig, api_key: String) -> Result<Self> {
        Ok(Self {
            client: build_client(config.timeout_secs)?,
            url: endpoint(&config.base_url, "chat/completions"),
            api_key,
            model: config.model.clone(),
            temperature: config.temperature,
        })
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[async_trait]
impl ChatModel for OpenAIChat {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        let body = ChatRequest {
            model: &self.model,
            messages,
            temperature: self.temperature,
        };
        let text = post_json(&self.client, &self.url, &self.api_key, &body).await?;
        parse_chat_response(&text)
    }
}

fn parse_chat_response(text: &str) -> Result<String> {
    let parsed: ChatResponse =
        serde_json::from_str(text).context("Invalid chat completion response")?;
    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| anyhow!("Empty response from chat completion"))
}
