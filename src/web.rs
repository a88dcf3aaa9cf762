//! Web page loading.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use docdesk_core::models::{Document, DocumentMetadata};

/// Column width used when rendering HTML to text.
const TEXT_WIDTH: usize = 120;

/// Fetches a URL and turns it into documents.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<Document>>;
}

/// HTTP GET via reqwest; HTML bodies are rendered to plain text.
pub struct HttpPageFetcher {
    client: reqwest::Client,
}

impl HttpPageFetcher {
    pub fn new(timeout_secs: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(concat!("docdesk/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<Document>> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("Failed to fetch {}", url))?;

        let status = resp.status();
        if !status.is_success() {
            bail!("Fetching {} returned HTTP {}", url, status);
        }

        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        let body = resp
            .bytes()
            .await
            .with_context(|| format!("Failed to read body of {}", url))?;

        Ok(vec![page_to_document(url, &content_type, &body)])
    }
}

pub fn page_to_document(url: &str, content_type: &str, body: &[u8]) -> Document {
    let mut metadata = DocumentMetadata::new(url);
    if !content_type.contains("html") {
        return Document::new(String::from_utf8_lossy(body).into_owned(), metadata);
    }

    let raw = String::from_utf8_lossy(body);
    if let Some(title) = html_title(&raw) {
        metadata = metadata.with_title(title);
    }
    let text = html2text::from_read(body, TEXT_WIDTH).unwrap_or_else(|_| raw.into_owned());
    Document::new(text, metadata)
}

/// Text of the first `<title>` element, whitespace collapsed.
fn html_title(html: &str) -> Option<String> {
    let lower = html.to_ascii_lowercase();
    let open = lower.find("<title")?;
    let start = open + lower[open..].find('>')? + 1;
    let end = start + lower[start..].find("</title")?;
    let title = html[start..end].split_whitespace().collect::<Vec<_>>().join(" ");
    (!title.is_empty()).then_some(title)
}
