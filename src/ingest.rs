//! Document ingestion.
//!
//! Walks the configured root recursively, loads every file whose extension
//! has a loader, then appends the configured web pages. Every string of
//! every document is passed through the configured [`TextNormalization`].
//!
//! Files with unmapped extensions are skipped silently. Any loader or fetch
//! failure aborts ingestion.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{bail, Context, Result};
use docdesk_core::chunk::CharacterSplitter;
use docdesk_core::models::Document;
use docdesk_core::normalize::TextNormalization;
use globset::{Glob, GlobSet, GlobSetBuilder};
use walkdir::WalkDir;

use crate::config::IngestConfig;
use crate::loaders::LoaderRegistry;
use crate::web::PageFetcher;

/// Load, in order, every file document under `config.root` and then every
/// web page in `config.web_urls`, normalized.
pub async fn load_all_documents(
    config: &IngestConfig,
    fetcher: &dyn PageFetcher,
) -> Result<Vec<Document>> {
    let registry = LoaderRegistry::from_config(&config.loaders);
    let mut docs = load_directory(
        &config.root,
        &registry,
        &config.exclude_globs,
        config.follow_symlinks,
    )?;
    let file_docs = docs.len();

    docs.extend(load_web_pages(&config.web_urls, fetcher).await?);

    let normalization = config.normalization();
    tracing::info!(
        root = %config.root.display(),
        file_documents = file_docs,
        web_documents = docs.len() - file_docs,
        lossy = normalization.is_lossy(),
        "documents loaded"
    );
    Ok(normalize_all(docs, normalization))
}

/// Load every file under `root` that has a loader. Output follows the
/// file-name-sorted walk order.
pub fn load_directory(
    root: &Path,
    registry: &LoaderRegistry,
    exclude_globs: &[String],
    follow_symlinks: bool,
) -> Result<Vec<Document>> {
    if !root.is_dir() {
        bail!("Document root does not exist or is not a directory: {}", root.display());
    }
    let exclude_set = build_globset(exclude_globs)?;

    let mut docs = Vec::new();
    let walker = WalkDir::new(root)
        .follow_links(follow_symlinks)
        .sort_by_file_name();
    for entry in walker {
        let entry = entry.with_context(|| format!("Failed to walk {}", root.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        if exclude_set.is_match(relative) {
            continue;
        }

        let Some(loader) = registry.loader_for(path) else {
            tracing::debug!(path = %path.display(), "skipped: no loader for extension");
            continue;
        };
        let loaded = loader.load(path)?;
        tracing::debug!(
            path = %path.display(),
            loader = loader.name(),
            documents = loaded.len(),
            "file loaded"
        );
        docs.extend(loaded);
    }
    Ok(docs)
}

/// Fetch each URL in order; the first failure aborts.
pub async fn load_web_pages(urls: &[String], fetcher: &dyn PageFetcher) -> Result<Vec<Document>> {
    let mut docs = Vec::new();
    for url in urls {
        let page = fetcher
            .fetch(url)
            .await
            .with_context(|| format!("Failed to load web page: {}", url))?;
        docs.extend(page);
    }
    Ok(docs)
}

pub fn normalize_all(docs: Vec<Document>, normalization: TextNormalization) -> Vec<Document> {
    docs.into_iter()
        .map(|d| normalization.apply_document(d))
        .collect()
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(
            Glob::new(pattern).with_context(|| format!("Invalid exclude glob: '{}'", pattern))?,
        );
    }
    Ok(builder.build()?)
}

/// Per-source counts for the ingest dry run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceSummary {
    pub documents: usize,
    pub chunks: usize,
    pub characters: usize,
}

/// Summarize `docs` by source without embedding anything.
pub fn summarize(docs: &[Document], splitter: &CharacterSplitter) -> BTreeMap<String, SourceSummary> {
    let mut out: BTreeMap<String, SourceSummary> = BTreeMap::new();
    for doc in docs {
        let entry = out.entry(doc.metadata.source.clone()).or_default();
        entry.documents += 1;
        entry.chunks += splitter.split_text(&doc.content).len();
        entry.characters += doc.content.chars().count();
    }
    out
}
