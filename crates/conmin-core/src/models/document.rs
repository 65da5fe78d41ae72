//! Upstream input: the pages of one document.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::concession::TextSource;
use super::config::PdfConfig;
use crate::error::Result;

/// Text of a single page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageText {
    /// Page number (1-indexed).
    pub number: u32,
    /// Raw page text.
    pub text: String,
    /// Text layer or OCR.
    #[serde(default)]
    pub source: TextSource,
}

impl PageText {
    pub fn new(number: u32, text: impl Into<String>, source: TextSource) -> Self {
        Self {
            number,
            text: text.into(),
            source,
        }
    }

    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// One document, as handed over by the PDF/OCR collaborator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// File name used as the document id (`archivo` on export).
    #[serde(default)]
    pub archivo: String,
    pub pages: Vec<PageText>,
}

impl Document {
    pub fn new(archivo: impl Into<String>, pages: Vec<PageText>) -> Self {
        Self {
            archivo: archivo.into(),
            pages,
        }
    }

    /// Build a document from plain text, one page per form feed
    /// (the page separator written by `pdftotext`).
    pub fn from_text(archivo: impl Into<String>, text: &str) -> Self {
        let pages = text
            .split('\u{000c}')
            .enumerate()
            .map(|(i, page)| PageText::new(i as u32 + 1, page, TextSource::TextLayer))
            .filter(|page| !page.is_blank())
            .collect();
        Self::new(archivo, pages)
    }

    /// Load a JSON page dump. A missing `archivo` is filled from the file name.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut document: Document = serde_json::from_str(&content)?;
        if document.archivo.is_empty() {
            document.archivo = file_name(path);
        }
        Ok(document)
    }

    /// Load a plain text file.
    pub fn from_text_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(Self::from_text(file_name(path), &content))
    }

    /// Load any supported input by extension: `.pdf`, `.json` page dump, or
    /// plain text.
    pub fn load(path: &Path, pdf: &PdfConfig, ocr_dir: Option<&Path>) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "pdf" => crate::pdf::load_pdf(path, pdf, ocr_dir),
            "json" => Self::from_json_file(path),
            _ => Self::from_text_file(path),
        }
    }

    /// Whether any page came from OCR.
    pub fn has_ocr_pages(&self) -> bool {
        self.pages.iter().any(|p| p.source == TextSource::Ocr)
    }
}

pub(crate) fn file_name(path: &Path) -> String {
    path.file_name()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_string()
}
