//! PDF text-layer extraction using lopdf and pdf-extract.

use lopdf::Document as LoDocument;
use tracing::{debug, warn};

use super::sidecar::OcrSidecar;
use super::{PdfProcessor, PdfType, Result};
use crate::error::PdfError;
use crate::models::concession::TextSource;
use crate::models::document::{Document, PageText};

/// Per-page text extractor.
pub struct PdfExtractor {
    document: Option<LoDocument>,
    raw_data: Vec<u8>,
    min_text_length: usize,
}

impl PdfExtractor {
    pub fn new() -> Self {
        Self {
            document: None,
            raw_data: Vec::new(),
            min_text_length: 20,
        }
    }

    /// Pages with fewer non-whitespace characters count as scanned.
    pub fn with_min_text_length(mut self, min_text_length: usize) -> Self {
        self.min_text_length = min_text_length;
        self
    }

    /// Whether a page's text layer is too thin to use.
    pub fn needs_ocr(&self, text: &str) -> bool {
        text.chars().filter(|c| !c.is_whitespace()).count() < self.min_text_length
    }

    /// Text layer of every page, in page order.
    pub fn pages_text(&self) -> Result<Vec<String>> {
        self.loaded()?;
        let page_count = self.page_count();

        let mut pages = Vec::with_capacity(page_count as usize);
        let mut failed = 0;
        for number in 1..=page_count {
            match self.extract_page_text(number) {
                Ok(text) => pages.push(text),
                Err(e) => {
                    debug!("lopdf could not read page {}: {}", number, e);
                    failed += 1;
                    pages.push(String::new());
                }
            }
        }

        if failed > 0 || pages.iter().all(|p| self.needs_ocr(p)) {
            // pdf-extract handles more font encodings than lopdf
            match self.pages_from_full_text(pages.len()) {
                Ok(Some(fallback)) => return Ok(fallback),
                Ok(None) => {}
                Err(e) => debug!("pdf-extract fallback failed: {}", e),
            }
        }

        Ok(pages)
    }

    fn pages_from_full_text(&self, page_count: usize) -> Result<Option<Vec<String>>> {
        let full = self.extract_text()?;
        if full.trim().is_empty() {
            return Ok(None);
        }

        let split: Vec<String> = full.split('\u{000c}').map(str::to_string).collect();
        if split.len() >= page_count {
            return Ok(Some(split.into_iter().take(page_count).collect()));
        }

        warn!(
            "pdf-extract returned {} page breaks for {} pages; keeping text on page 1",
            split.len(),
            page_count
        );
        let mut pages = vec![String::new(); page_count];
        if let Some(first) = pages.first_mut() {
            *first = full;
        }
        Ok(Some(pages))
    }

    /// Classify a PDF from its per-page text layers.
    pub fn classify(&self, pages: &[String]) -> PdfType {
        let scanned = pages.iter().filter(|p| self.needs_ocr(p)).count();
        match (scanned, pages.len()) {
            (_, 0) => PdfType::Empty,
            (0, _) => PdfType::Text,
            (s, n) if s == n => PdfType::Scanned,
            _ => PdfType::Hybrid,
        }
    }

    /// Build a [`Document`]. Pages without a usable text layer take their text
    /// from the OCR sidecar when one is given.
    pub fn to_document(&self, archivo: &str, sidecar: Option<&OcrSidecar>) -> Result<Document> {
        let texts = self.pages_text()?;
        Ok(self.assemble_pages(archivo, texts, sidecar))
    }

    fn assemble_pages(&self, archivo: &str, texts: Vec<String>, sidecar: Option<&OcrSidecar>) -> Document {
        let pdf_type = self.classify(&texts);
        debug!("{}: {:?} PDF with {} pages", archivo, pdf_type, texts.len());
        if matches!(pdf_type, PdfType::Scanned | PdfType::Hybrid) && sidecar.is_none() {
            warn!("{}: {:?} PDF has no OCR sidecar", archivo, pdf_type);
        }

        let mut pages = Vec::with_capacity(texts.len());
        for (index, text) in texts.into_iter().enumerate() {
            let number = index as u32 + 1;
            if !self.needs_ocr(&text) {
                pages.push(PageText::new(number, text, TextSource::TextLayer));
                continue;
            }

            match sidecar.and_then(|s| s.page(number)) {
                Some(ocr_text) => {
                    debug!("{}: page {} taken from OCR sidecar", archivo, number);
                    pages.push(PageText::new(number, ocr_text, TextSource::Ocr));
                }
                None => {
                    // a thin text layer ("Huso 19") is still better than nothing
                    if text.trim().is_empty() {
                        warn!("{}: page {} has no text layer and no OCR text", archivo, number);
                    } else {
                        debug!("{}: page {} keeps its short text layer", archivo, number);
                    }
                    pages.push(PageText::new(number, text, TextSource::TextLayer));
                }
            }
        }

        Document::new(archivo, pages)
    }

    fn loaded(&self) -> Result<&LoDocument> {
        self.document
            .as_ref()
            .ok_or_else(|| PdfError::Parse("No document loaded".to_string()))
    }
}

impl Default for PdfExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfProcessor for PdfExtractor {
    fn load(&mut self, data: &[u8]) -> Result<()> {
        let mut doc = LoDocument::load_mem(data).map_err(|e| PdfError::Parse(e.to_string()))?;

        // Handle PDFs with empty password encryption
        if doc.is_encrypted() {
            if doc.decrypt("").is_err() {
                return Err(PdfError::Encrypted);
            }
            debug!("Decrypted PDF with empty password");

            let mut decrypted_data = Vec::new();
            doc.save_to(&mut decrypted_data)
                .map_err(|e| PdfError::Parse(format!("Failed to save decrypted PDF: {}", e)))?;
            self.raw_data = decrypted_data;
        } else {
            self.raw_data = data.to_vec();
        }

        let page_count = doc.get_pages().len();
        if page_count == 0 {
            return Err(PdfError::NoPages);
        }

        debug!("Loaded PDF with {} pages", page_count);
        self.document = Some(doc);
        Ok(())
    }

    fn page_count(&self) -> u32 {
        self.document
            .as_ref()
            .map(|doc| doc.get_pages().len() as u32)
            .unwrap_or(0)
    }

    fn extract_text(&self) -> Result<String> {
        let text = pdf_extract::extract_text_from_mem(&self.raw_data)
            .map_err(|e| PdfError::TextExtraction(e.to_string()))?;
        Ok(text)
    }

    fn extract_page_text(&self, page: u32) -> Result<String> {
        let doc = self.loaded()?;
        if !doc.get_pages().contains_key(&page) {
            return Err(PdfError::InvalidPage(page));
        }
        doc.extract_text(&[page])
            .map_err(|e| PdfError::TextExtraction(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pdf_extractor_new() {
        let extractor = PdfExtractor::new();
        assert!(extractor.document.is_none());
        assert_eq!(extractor.page_count(), 0);
        assert!(matches!(extractor.extract_page_text(1), Err(PdfError::Parse(_))));
    }

    #[test]
    fn test_garbage_is_a_parse_error() {
        let mut extractor = PdfExtractor::new();
        assert!(matches!(extractor.load(b"not a pdf"), Err(PdfError::Parse(_))));
    }

    fn texts(pages: &[&str]) -> Vec<String> {
        pages.iter().map(|p| p.to_string()).collect()
    }

    #[test]
    fn test_classify() {
        let extractor = PdfExtractor::new().with_min_text_length(5);
        assert_eq!(extractor.classify(&[]), PdfType::Empty);
        assert_eq!(extractor.classify(&texts(&["ROL NACIONAL", "Huso 19 UTM"])), PdfType::Text);
        assert_eq!(extractor.classify(&texts(&["ROL NACIONAL", " "])), PdfType::Hybrid);
        assert_eq!(extractor.classify(&texts(&["", "a"])), PdfType::Scanned);
    }

    #[test]
    fn test_thin_page_keeps_its_text_layer() {
        let extractor = PdfExtractor::new();
        let document = extractor.assemble_pages(
            "titulo.pdf",
            texts(&["Conservador de Minas de Copiapó, a fojas 10", "Huso 19", ""]),
            None,
        );

        assert_eq!(document.pages.len(), 3);
        assert_eq!(document.pages[1].text, "Huso 19");
        assert_eq!(document.pages[1].source, TextSource::TextLayer);
        assert!(document.pages[2].is_blank());
    }

    #[test]
    fn test_sidecar_replaces_thin_pages() {
        let extractor = PdfExtractor::new();
        let sidecar: OcrSidecar =
            serde_json::from_str(r#"{"pages": [{"number": 2, "text": "Norte 6.345.210 Este 345.210 Huso 19"}]}"#)
                .unwrap();
        let document = extractor.assemble_pages(
            "titulo.pdf",
            texts(&["Conservador de Minas de Copiapó, a fojas 10", "Huso"]),
            Some(&sidecar),
        );

        assert_eq!(document.pages[1].source, TextSource::Ocr);
        assert_eq!(document.pages[1].text, "Norte 6.345.210 Este 345.210 Huso 19");
        assert_eq!(document.pages[0].source, TextSource::TextLayer);
    }

    #[test]
    fn test_needs_ocr_counts_visible_characters() {
        let extractor = PdfExtractor::new().with_min_text_length(5);
        assert!(extractor.needs_ocr("  a b \n c  "));
        assert!(!extractor.needs_ocr("ROL NACIONAL"));
    }
}
