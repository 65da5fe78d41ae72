//! Data models: configuration, upstream pages and extraction records.

pub mod concession;
pub mod config;
pub mod document;

pub use concession::{
    ConcessionType, CoordinateBlock, Datum, DocumentRecord, FieldCandidate, FieldName,
    FieldSlot, FieldStatus, FieldValue, RawSpan, TextSource,
};
pub use config::{ConminConfig, CoordinateConfig, CustomRule, ExtractionConfig, PdfConfig, RuleConfig};
pub use document::{Document, PageText};
