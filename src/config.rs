//! TOML configuration.
//!
//! Every section except `[ingest]` may be omitted; missing keys fall back to
//! the `default_*` functions below. [`load_config`] validates the parsed file
//! and fails with a message naming the offending key.
//!
//! ```toml
//! [app]
//! name = "docdesk"
//! log_dir = "./logs"
//!
//! [ingest]
//! root = "./data"
//! web_urls = ["https://intranet.example.com/handbook"]
//! exclude_globs = ["**/drafts/**"]
//!
//! [ingest.loaders]
//! pdf = "pdf"
//! txt = "text"
//!
//! [chunking]
//! chunk_size = 300
//! chunk_overlap = 20
//!
//! [retrieval]
//! top_k = 5
//!
//! [llm]
//! model = "gpt-4o-mini"
//! temperature = 0.5
//! ```

use anyhow::{bail, Context, Result};
use docdesk_core::normalize::TextNormalization;
use docdesk_core::pipeline::{self, Prompts};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::loaders::LoaderKind;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub app: AppConfig,
    pub ingest: IngestConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub prompts: PromptsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default = "default_app_name")]
    pub name: String,
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: default_app_name(),
            log_dir: default_log_dir(),
        }
    }
}

fn default_app_name() -> String {
    "docdesk".to_string()
}
fn default_log_dir() -> PathBuf {
    PathBuf::from("./logs")
}

#[derive(Debug, Deserialize, Clone)]
pub struct IngestConfig {
    pub root: PathBuf,
    #[serde(default)]
    pub web_urls: Vec<String>,
    /// Extension (without the dot) to loader.
    #[serde(default = "default_loaders")]
    pub loaders: BTreeMap<String, LoaderKind>,
    #[serde(default = "default_exclude_globs")]
    pub exclude_globs: Vec<String>,
    #[serde(default)]
    pub follow_symlinks: bool,
    /// Forces the legacy CP932 round-trip on or off. Unset means the
    /// platform default.
    #[serde(default)]
    pub legacy_cp932: Option<bool>,
    /// Per-request timeout for `web_urls`.
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
}

impl IngestConfig {
    pub fn normalization(&self) -> TextNormalization {
        TextNormalization::from_override(self.legacy_cp932)
    }
}

fn default_loaders() -> BTreeMap<String, LoaderKind> {
    [
        ("txt", LoaderKind::Text),
        ("md", LoaderKind::Text),
        ("csv", LoaderKind::Csv),
        ("pdf", LoaderKind::Pdf),
        ("docx", LoaderKind::Docx),
    ]
    .into_iter()
    .map(|(ext, kind)| (ext.to_string(), kind))
    .collect()
}
fn default_fetch_timeout_secs() -> u64 {
    30
}
fn default_exclude_globs() -> Vec<String> {
    vec!["**/.git/**".to_string()]
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
        }
    }
}

fn default_chunk_size() -> usize {
    300
}
fn default_chunk_overlap() -> usize {
    20
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
        }
    }
}

fn default_top_k() -> usize {
    5
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_model")]
    pub model: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: default_embedding_model(),
            base_url: default_base_url(),
            batch_size: default_batch_size(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}
fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}
fn default_batch_size() -> usize {
    64
}
fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    #[serde(default = "default_llm_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Name of the environment variable holding the API key. The embedding
    /// client reads the same key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: default_llm_model(),
            temperature: default_temperature(),
            base_url: default_base_url(),
            api_key_env: default_api_key_env(),
            timeout_secs: default_llm_timeout_secs(),
        }
    }
}

fn default_llm_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_temperature() -> f32 {
    0.5
}
fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}
fn default_llm_timeout_secs() -> u64 {
    120
}

/// Prompt overrides. Unset keys keep the built-in prompts.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct PromptsConfig {
    pub rewrite: Option<String>,
    pub doc_search: Option<String>,
    pub inquiry: Option<String>,
    pub no_doc_match_answer: Option<String>,
    pub no_doc_match_message: Option<String>,
    pub inquiry_no_match_answer: Option<String>,
}

impl PromptsConfig {
    pub fn to_prompts(&self) -> Prompts {
        let defaults = Prompts::default();
        let pick = |value: &Option<String>, fallback: String| value.clone().unwrap_or(fallback);
        Prompts {
            rewrite: pick(&self.rewrite, defaults.rewrite),
            doc_search: pick(&self.doc_search, defaults.doc_search),
            inquiry: pick(&self.inquiry, defaults.inquiry),
            no_doc_match_answer: pick(&self.no_doc_match_answer, defaults.no_doc_match_answer),
            no_doc_match_message: pick(&self.no_doc_match_message, defaults.no_doc_match_message),
            inquiry_no_match_answer: pick(
                &self.inquiry_no_match_answer,
                defaults.inquiry_no_match_answer,
            ),
        }
    }
}

impl Config {
    /// All-defaults configuration rooted at `./data`. Used by tests and by
    /// callers embedding the library without a config file.
    pub fn minimal() -> Self {
        Self {
            app: AppConfig::default(),
            ingest: IngestConfig {
                root: PathBuf::from("./data"),
                web_urls: Vec::new(),
                loaders: default_loaders(),
                exclude_globs: default_exclude_globs(),
                follow_symlinks: false,
                legacy_cp932: None,
                fetch_timeout_secs: default_fetch_timeout_secs(),
            },
            chunking: ChunkingConfig::default(),
            retrieval: RetrievalConfig::default(),
            embedding: EmbeddingConfig::default(),
            llm: LlmConfig::default(),
            prompts: PromptsConfig::default(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        // Validate chunking
        if self.chunking.chunk_size == 0 {
            bail!("chunking.chunk_size must be > 0");
        }
        if self.chunking.chunk_overlap >= self.chunking.chunk_size {
            bail!(
                "chunking.chunk_overlap ({}) must be smaller than chunking.chunk_size ({})",
                self.chunking.chunk_overlap,
                self.chunking.chunk_size
            );
        }

        // Validate retrieval
        if self.retrieval.top_k < 1 {
            bail!("retrieval.top_k must be >= 1");
        }

        // Validate ingestion
        for url in &self.ingest.web_urls {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                bail!("ingest.web_urls entry is not an http(s) URL: '{}'", url);
            }
        }
        for ext in self.ingest.loaders.keys() {
            if ext.trim_start_matches('.').is_empty() {
                bail!("ingest.loaders contains an empty extension");
            }
        }

        // Validate services
        if self.embedding.batch_size == 0 {
            bail!("embedding.batch_size must be > 0");
        }
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            bail!("llm.temperature must be in [0.0, 2.0]");
        }
        if self.llm.api_key_env.trim().is_empty() {
            bail!("llm.api_key_env must name an environment variable");
        }

        self.prompts.to_prompts().validate().with_context(|| {
            format!(
                "invalid [prompts]; answer prompts must keep {}",
                pipeline::CONTEXT_PLACEHOLDER
            )
        })?;

        Ok(())
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    parse_config(&content)
}

pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;
    config.validate()?;
    Ok(config)
}
