//! PDF page source.
//!
//! Only the text layer is read here. Scanned pages get their text from an
//! [`OcrSidecar`] written by an external OCR tool.

mod extractor;
mod sidecar;

pub use extractor::PdfExtractor;
pub use sidecar::{sidecar_path, OcrPage, OcrSidecar};

use std::path::Path;

use crate::error::PdfError;
use crate::models::config::PdfConfig;
use crate::models::document::{file_name, Document};

/// Type of PDF content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PdfType {
    /// Every page has a usable text layer.
    Text,
    /// No page has a usable text layer.
    Scanned,
    /// Some pages need OCR.
    Hybrid,
    /// No pages.
    Empty,
}

/// Result type for PDF operations.
pub type Result<T> = std::result::Result<T, PdfError>;

/// Trait for PDF processing implementations.
pub trait PdfProcessor {
    /// Load a PDF from bytes.
    fn load(&mut self, data: &[u8]) -> Result<()>;

    /// Get the number of pages in the PDF.
    fn page_count(&self) -> u32;

    /// Extract text from the entire PDF.
    fn extract_text(&self) -> Result<String>;

    /// Extract text from a specific page.
    fn extract_page_text(&self, page: u32) -> Result<String>;
}

/// Read a PDF file into pages, filling scanned pages from its OCR sidecar.
pub fn load_pdf(path: &Path, config: &PdfConfig, ocr_dir: Option<&Path>) -> crate::Result<Document> {
    let data = std::fs::read(path)?;
    let mut extractor = PdfExtractor::new().with_min_text_length(config.min_text_length);
    extractor.load(&data)?;

    let sidecar = OcrSidecar::for_pdf(path, &config.ocr_sidecar_suffix, ocr_dir)?;
    Ok(extractor.to_document(&file_name(path), sidecar.as_ref())?)
}
