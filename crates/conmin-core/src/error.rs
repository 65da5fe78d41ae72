//! Error types for the conmin-core library.

use thiserror::Error;

/// Main error type for the conmin library.
///
/// Only the I/O edges (configuration, PDF loading, page dumps) can fail. Field
/// extraction and record assembly degrade confidence instead of returning errors.
#[derive(Error, Debug)]
pub enum ConminError {
    /// PDF processing error.
    #[error("PDF error: {0}")]
    Pdf(#[from] PdfError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors related to PDF processing.
#[derive(Error, Debug)]
pub enum PdfError {
    /// Failed to open/parse the PDF file.
    #[error("failed to parse PDF: {0}")]
    Parse(String),

    /// Failed to extract text from PDF.
    #[error("failed to extract text: {0}")]
    TextExtraction(String),

    /// The PDF is encrypted and cannot be processed.
    #[error("PDF is encrypted")]
    Encrypted,

    /// The PDF is empty or has no pages.
    #[error("PDF has no pages")]
    NoPages,

    /// Invalid page number requested.
    #[error("invalid page number: {0}")]
    InvalidPage(u32),
}

/// Errors raised while loading or compiling configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A threshold or weight is outside its allowed range.
    #[error("invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },

    /// A custom rule pattern does not compile.
    #[error("rule {rule_id} has an invalid pattern: {source}")]
    InvalidPattern {
        rule_id: String,
        #[source]
        source: regex::Error,
    },

    /// A confidence override or disabled entry names no known rule.
    #[error("unknown rule id: {0}")]
    UnknownRule(String),

    /// Two rules share the same id.
    #[error("duplicate rule id: {0}")]
    DuplicateRule(String),
}

/// A numeral phrase outside the supported Spanish cardinal grammar.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NumeralError {
    #[error("not a numeral: {phrase:?} ({reason})")]
    NotANumeral { phrase: String, reason: String },
}

impl NumeralError {
    pub(crate) fn new(phrase: &str, reason: impl Into<String>) -> Self {
        Self::NotANumeral {
            phrase: phrase.to_string(),
            reason: reason.into(),
        }
    }
}

/// Diagnostics for coordinate blocks whose anchors were found but whose values
/// are implausible. These never abort extraction; they lower confidence.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoordinateError {
    #[error("malformed coordinate block: {reason}")]
    MalformedCoordinateBlock { reason: String },
}

/// Result type for the conmin library.
pub type Result<T> = std::result::Result<T, ConminError>;
