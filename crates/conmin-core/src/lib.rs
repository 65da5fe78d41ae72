//! Core library for Chilean mining-title field extraction.
//!
//! This crate provides:
//! - Spanish written-numeral parsing
//! - UTM coordinate block detection (Norte/Este/huso/datum)
//! - Rule-based field extraction with per-field confidence and audit spans
//! - Record assembly with ambiguity flagging, and the flat export row
//! - PDF text-layer loading with OCR sidecars for scanned pages

pub mod assembler;
pub mod coordinates;
pub mod error;
pub mod export;
pub mod extraction;
pub mod models;
pub mod normalize;
pub mod numeral;
pub mod pdf;
pub mod pipeline;

pub use assembler::RecordAssembler;
pub use coordinates::{CoordinateMatch, CoordinateNormalizer};
pub use error::{ConfigError, ConminError, CoordinateError, NumeralError, PdfError, Result};
pub use export::ExportRow;
pub use extraction::{FieldExtractor, Rule, RuleSet, ValueKind};
pub use models::{
    ConcessionType, ConminConfig, CoordinateBlock, Datum, Document, DocumentRecord,
    FieldCandidate, FieldName, FieldSlot, FieldStatus, FieldValue, PageText, RawSpan, TextSource,
};
pub use pdf::{PdfExtractor, PdfProcessor, PdfType};
pub use pipeline::Pipeline;
