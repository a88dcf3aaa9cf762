//! File loaders, dispatched by extension.
//!
//! Each loader turns one file into one or more [`Document`]s whose `source`
//! is the file path. The [`LoaderRegistry`] maps lowercase extensions to
//! loaders; files with unmapped extensions are not loaded at all.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use anyhow::{Context, Result};
use docdesk_core::models::{Document, DocumentMetadata};
use serde::Deserialize;

use crate::extract;

/// Loaders selectable from `[ingest.loaders]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoaderKind {
    Text,
    Csv,
    Pdf,
    Docx,
}

impl LoaderKind {
    pub fn loader(self) -> Box<dyn FileLoader> {
        match self {
            LoaderKind::Text => Box::new(TextLoader),
            LoaderKind::Csv => Box::new(CsvLoader),
            LoaderKind::Pdf => Box::new(PdfLoader),
            LoaderKind::Docx => Box::new(DocxLoader),
        }
    }
}

/// Loads a single file. Must return at least one document on success.
pub trait FileLoader: Send + Sync {
    fn name(&self) -> &'static str;

    fn load(&self, path: &Path) -> Result<Vec<Document>>;
}

fn source_of(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// UTF-8 text, one document per file.
pub struct TextLoader;

impl FileLoader for TextLoader {
    fn name(&self) -> &'static str {
        "text"
    }

    fn load(&self, path: &Path) -> Result<Vec<Document>> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read text file: {}", path.display()))?;
        Ok(vec![Document::new(content, DocumentMetadata::new(source_of(path)))])
    }
}

/// CSV, one document per file. Each record becomes `header: value` lines;
/// records are separated by a blank line.
pub struct CsvLoader;

impl FileLoader for CsvLoader {
    fn name(&self) -> &'static str {
        "csv"
    }

    fn load(&self, path: &Path) -> Result<Vec<Document>> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(path)
            .with_context(|| format!("Failed to open CSV file: {}", path.display()))?;
        let headers = reader
            .headers()
            .with_context(|| format!("Failed to read CSV header: {}", path.display()))?
            .clone();

        let mut records = Vec::new();
        for (row, record) in reader.records().enumerate() {
            let record = record
                .with_context(|| format!("Malformed CSV record {} in {}", row + 1, path.display()))?;
            let lines: Vec<String> = record
                .iter()
                .enumerate()
                .map(|(i, value)| match headers.get(i) {
                    Some(header) => format!("{}: {}", header.trim(), value.trim()),
                    None => value.trim().to_string(),
                })
                .collect();
            records.push(lines.join("\n"));
        }

        Ok(vec![Document::new(
            records.join("\n\n"),
            DocumentMetadata::new(source_of(path)),
        )])
    }
}

/// PDF, one document per page with a 0-based `page`.
pub struct PdfLoader;

impl FileLoader for PdfLoader {
    fn name(&self) -> &'static str {
        "pdf"
    }

    fn load(&self, path: &Path) -> Result<Vec<Document>> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read PDF file: {}", path.display()))?;
        let pages = extract::extract_pdf_pages(&bytes)
            .with_context(|| format!("Failed to load PDF: {}", path.display()))?;
        let source = source_of(path);
        Ok(pages
            .into_iter()
            .enumerate()
            .map(|(page, text)| {
                Document::new(text, DocumentMetadata::new(source.clone()).with_page(page as u32))
            })
            .collect())
    }
}

/// Word `.docx`, one document per file.
pub struct DocxLoader;

impl FileLoader for DocxLoader {
    fn name(&self) -> &'static str {
        "docx"
    }

    fn load(&self, path: &Path) -> Result<Vec<Document>> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read DOCX file: {}", path.display()))?;
        let text = extract::extract_docx(&bytes)
            .with_context(|| format!("Failed to load DOCX: {}", path.display()))?;
        Ok(vec![Document::new(text, DocumentMetadata::new(source_of(path)))])
    }
}

/// Extension to loader mapping. Extensions are matched case-insensitively
/// and a leading dot is ignored.
#[derive(Default)]
pub struct LoaderRegistry {
    loaders: HashMap<String, Box<dyn FileLoader>>,
}

impl LoaderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(map: &BTreeMap<String, LoaderKind>) -> Self {
        let mut registry = Self::new();
        for (ext, kind) in map {
            registry.register(ext, kind.loader());
        }
        registry
    }

    pub fn register(&mut self, ext: &str, loader: Box<dyn FileLoader>) {
        self.loaders.insert(normalize_ext(ext), loader);
    }

    pub fn loader_for(&self, path: &Path) -> Option<&dyn FileLoader> {
        let ext = path.extension()?.to_str()?;
        self.loaders.get(&normalize_ext(ext)).map(|l| l.as_ref())
    }

    pub fn len(&self) -> usize {
        self.loaders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loaders.is_empty()
    }
}

fn normalize_ext(ext: &str) -> String {
    ext.trim_start_matches('.').to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn default_registry() -> LoaderRegistry {
        let map: BTreeMap<String, LoaderKind> = [
            (".TXT".to_string(), LoaderKind::Text),
            ("csv".to_string(), LoaderKind::Csv),
        ]
        .into_iter()
        .collect();
        LoaderRegistry::from_config(&map)
    }

    #[test]
    fn test_registry_matches_case_insensitively() {
        let registry = default_registry();
        assert_eq!(registry.len(), 2);
        assert_eq!(
            registry.loader_for(Path::new("a/b/Notes.Txt")).map(|l| l.name()),
            Some("text")
        );
        assert_eq!(
            registry.loader_for(Path::new("x.csv")).map(|l| l.name()),
            Some("csv")
        );
        assert!(registry.loader_for(Path::new("x.tmp")).is_none());
        assert!(registry.loader_for(Path::new("Makefile")).is_none());
    }

    #[test]
    fn test_text_loader_single_document() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("a.txt");
        fs::write(&path, "hello\nworld").unwrap();
        let docs = TextLoader.load(&path).unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].content, "hello\nworld");
        assert_eq!(docs[0].metadata.source, path.to_string_lossy());
        assert_eq!(docs[0].metadata.page, None);
    }

    #[test]
    fn test_empty_text_file_yields_one_document() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("empty.txt");
        fs::write(&path, "").unwrap();
        let docs = TextLoader.load(&path).unwrap();
        assert_eq!(docs.len(), 1);
        assert!(docs[0].content.is_empty());
    }

    #[test]
    fn test_text_loader_rejects_invalid_utf8() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("bin.txt");
        fs::write(&path, [0xff, 0xfe, 0x00]).unwrap();
        assert!(TextLoader.load(&path).is_err());
    }

    #[test]
    fn test_csv_loader_renders_records() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("staff.csv");
        fs::write(&path, "name,dept\nAiko,HR\nBen,Finance\n").unwrap();
        let docs = CsvLoader.load(&path).unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].content, "name: Aiko\ndept: HR\n\nname: Ben\ndept: Finance");
    }

    #[test]
    fn test_header_only_csv_yields_empty_document() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("empty.csv");
        fs::write(&path, "name,dept\n").unwrap();
        let docs = CsvLoader.load(&path).unwrap();
        assert_eq!(docs.len(), 1);
        assert!(docs[0].content.is_empty());
    }

    #[test]
    fn test_invalid_pdf_fails() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("broken.pdf");
        fs::write(&path, "not a pdf").unwrap();
        let err = PdfLoader.load(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("broken.pdf"));
    }
}
