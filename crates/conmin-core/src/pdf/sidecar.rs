//! OCR text produced outside conmin for scanned pages.
//!
//! A sidecar is a JSON file next to the PDF (`titulo.pdf` -> `titulo.ocr.json`)
//! or in a dedicated directory:
//!
//! ```json
//! { "engine": "tesseract 5 spa", "pages": [{ "number": 2, "text": "..." }] }
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// OCR text for some pages of one PDF.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OcrSidecar {
    /// Free-form description of the OCR engine.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engine: Option<String>,
    pub pages: Vec<OcrPage>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OcrPage {
    /// Page number (1-indexed).
    pub number: u32,
    pub text: String,
}

impl OcrSidecar {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Load the sidecar for `pdf` if it exists.
    pub fn for_pdf(pdf: &Path, suffix: &str, ocr_dir: Option<&Path>) -> Result<Option<Self>> {
        let path = sidecar_path(pdf, suffix, ocr_dir);
        if path.is_file() {
            Self::from_file(&path).map(Some)
        } else {
            Ok(None)
        }
    }

    /// Non-blank OCR text of a page.
    pub fn page(&self, number: u32) -> Option<&str> {
        self.pages
            .iter()
            .find(|p| p.number == number && !p.text.trim().is_empty())
            .map(|p| p.text.as_str())
    }
}

/// Where the sidecar of `pdf` is expected.
pub fn sidecar_path(pdf: &Path, suffix: &str, ocr_dir: Option<&Path>) -> PathBuf {
    let stem = pdf
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default();
    let name = format!("{stem}{suffix}");
    match ocr_dir {
        Some(dir) => dir.join(name),
        None => pdf.with_file_name(name),
    }
}
