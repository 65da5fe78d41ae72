//! Field candidates and document records for Chilean mining titles.

use std::collections::BTreeMap;
use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::CoordinateError;
use crate::normalize::fold;

/// Where a page's text came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TextSource {
    /// Embedded PDF text layer (or plain text input).
    #[default]
    #[serde(rename = "digital")]
    TextLayer,
    /// Text produced by an external OCR engine.
    #[serde(rename = "ocr")]
    Ocr,
}

impl TextSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            TextSource::TextLayer => "digital",
            TextSource::Ocr => "ocr",
        }
    }
}

/// A contiguous slice of the untouched source text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawSpan {
    /// Page number (1-indexed).
    pub page: u32,
    /// Byte offset of the first character in the original page text.
    pub start: usize,
    /// Byte offset one past the last character.
    pub end: usize,
    /// The original text, exactly as it appeared on the page.
    pub text: String,
    /// Text layer or OCR.
    pub source: TextSource,
}

/// The fields extracted from a mining title.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FieldName {
    RolNacional,
    NombreConcesion,
    Tipo,
    SuperficieHa,
    Fojas,
    Numero,
    Anio,
    Conservador,
    Titular,
    Coordenadas,
}

impl FieldName {
    /// Every field, in record order.
    pub const ALL: [FieldName; 10] = [
        FieldName::RolNacional,
        FieldName::NombreConcesion,
        FieldName::Tipo,
        FieldName::SuperficieHa,
        FieldName::Fojas,
        FieldName::Numero,
        FieldName::Anio,
        FieldName::Conservador,
        FieldName::Titular,
        FieldName::Coordenadas,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldName::RolNacional => "ROL_NACIONAL",
            FieldName::NombreConcesion => "NOMBRE_CONCESION",
            FieldName::Tipo => "TIPO",
            FieldName::SuperficieHa => "SUPERFICIE_HA",
            FieldName::Fojas => "FOJAS",
            FieldName::Numero => "NUMERO",
            FieldName::Anio => "ANIO",
            FieldName::Conservador => "CONSERVADOR",
            FieldName::Titular => "TITULAR",
            FieldName::Coordenadas => "COORDENADAS",
        }
    }

    /// Parse a field name as written in configuration files.
    pub fn from_str(s: &str) -> Option<Self> {
        let wanted = s.trim().to_uppercase();
        Self::ALL.into_iter().find(|f| f.as_str() == wanted)
    }

    /// COORDENADAS keeps every distinct block; every other field keeps one value.
    pub fn is_multi_valued(&self) -> bool {
        matches!(self, FieldName::Coordenadas)
    }
}

impl fmt::Display for FieldName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of mining concession or filing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConcessionType {
    /// Concesión de explotación.
    Explotacion,
    /// Concesión de exploración.
    Exploracion,
    /// Manifestación (filing that precedes an exploitation concession).
    Manifestacion,
    /// Pedimento (filing that precedes an exploration concession).
    Pedimento,
}

impl ConcessionType {
    /// Parse from text; accent- and case-insensitive.
    pub fn from_str(s: &str) -> Option<Self> {
        let folded = fold(s.trim());
        if folded.starts_with("explotaci") {
            Some(ConcessionType::Explotacion)
        } else if folded.starts_with("exploraci") {
            Some(ConcessionType::Exploracion)
        } else if folded.starts_with("manifestaci") {
            Some(ConcessionType::Manifestacion)
        } else if folded.starts_with("pedimento") {
            Some(ConcessionType::Pedimento)
        } else {
            None
        }
    }

    pub fn display(&self) -> &'static str {
        match self {
            ConcessionType::Explotacion => "explotación",
            ConcessionType::Exploracion => "exploración",
            ConcessionType::Manifestacion => "manifestación",
            ConcessionType::Pedimento => "pedimento",
        }
    }
}

/// Geodetic reference frame of a UTM block.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Datum {
    Wgs84,
    Psad56,
    #[default]
    Unknown,
}

/// One UTM vertex, in meters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CoordinateBlock {
    pub norte: u64,
    pub este: u64,
    /// UTM zone; 17..=19 covers continental Chile.
    pub huso: u8,
    pub datum: Datum,
    /// No huso was written near the block; `huso` is the configured fallback.
    #[serde(default)]
    pub huso_defaulted: bool,
}

impl CoordinateBlock {
    pub const NORTE_RANGE: std::ops::RangeInclusive<u64> = 1_000_000..=10_000_000;
    pub const ESTE_RANGE: std::ops::RangeInclusive<u64> = 100_000..=900_000;
    pub const HUSO_RANGE: std::ops::RangeInclusive<u8> = 17..=19;

    /// Check the block against plausible Chilean UTM ranges.
    pub fn validate(&self) -> Vec<CoordinateError> {
        let mut issues = Vec::new();

        if !Self::NORTE_RANGE.contains(&self.norte) {
            issues.push(CoordinateError::MalformedCoordinateBlock {
                reason: format!("norte {} outside {:?}", self.norte, Self::NORTE_RANGE),
            });
        }
        if !Self::ESTE_RANGE.contains(&self.este) {
            issues.push(CoordinateError::MalformedCoordinateBlock {
                reason: format!("este {} outside {:?}", self.este, Self::ESTE_RANGE),
            });
        }
        if !Self::HUSO_RANGE.contains(&self.huso) {
            issues.push(CoordinateError::MalformedCoordinateBlock {
                reason: format!("huso {} outside {:?}", self.huso, Self::HUSO_RANGE),
            });
        }

        issues
    }

    /// A block whose huso was read from the text.
    pub fn new(norte: u64, este: u64, huso: u8, datum: Datum) -> Self {
        Self {
            norte,
            este,
            huso,
            datum,
            huso_defaulted: false,
        }
    }

    /// Deduplication key: neither the datum nor the defaulted flag is part
    /// of a vertex's identity.
    pub fn key(&self) -> (u64, u64, u8) {
        (self.norte, self.este, self.huso)
    }
}

impl fmt::Display for CoordinateBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "N {} E {} huso {}{} datum {:?}",
            self.norte,
            self.este,
            self.huso,
            if self.huso_defaulted { " (supuesto)" } else { "" },
            self.datum
        )
    }
}

/// Typed value of an extracted field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    Text(String),
    Integer(u64),
    Hectares(Decimal),
    Tipo(ConcessionType),
    Coordinates(CoordinateBlock),
}

impl FieldValue {
    /// Key under which two values count as the same answer.
    pub fn comparison_key(&self) -> String {
        match self {
            FieldValue::Text(s) => fold(s).split_whitespace().collect::<Vec<_>>().join(" "),
            FieldValue::Integer(n) => n.to_string(),
            FieldValue::Hectares(d) => d.normalize().to_string(),
            FieldValue::Tipo(t) => t.display().to_string(),
            FieldValue::Coordinates(b) => format!("{}/{}/{}", b.norte, b.este, b.huso),
        }
    }

    pub fn as_coordinates(&self) -> Option<&CoordinateBlock> {
        match self {
            FieldValue::Coordinates(block) => Some(block),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Text(s) => f.write_str(s),
            FieldValue::Integer(n) => write!(f, "{n}"),
            FieldValue::Hectares(d) => write!(f, "{}", d.normalize()),
            FieldValue::Tipo(t) => f.write_str(t.display()),
            FieldValue::Coordinates(b) => write!(f, "{b}"),
        }
    }
}

/// A value proposed by one rule on one page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldCandidate {
    pub field: FieldName,
    pub value: FieldValue,
    pub source_span: RawSpan,
    /// Confidence score (0.0 - 1.0).
    pub confidence: f32,
    /// Id of the rule that produced this candidate.
    pub rule_id: String,
}

/// Review state of a record field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FieldStatus {
    /// No rule produced a candidate.
    #[default]
    Absent,
    /// Chosen value reaches the acceptance threshold.
    Accepted,
    /// Chosen value is below the acceptance threshold.
    LowConfidence,
    /// Two different values both reach the threshold; needs an auditor.
    Ambiguous,
}

impl FieldStatus {
    /// Whether the value is exported as the record's answer.
    pub fn is_exported(&self) -> bool {
        matches!(self, FieldStatus::Accepted | FieldStatus::Ambiguous)
    }
}

/// One field of a document record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldSlot {
    /// Chosen value(s); at most one unless the field is multi-valued.
    pub values: Vec<FieldValue>,
    pub confidence: f32,
    pub status: FieldStatus,
    /// Rules behind the chosen value(s).
    pub rule_ids: Vec<String>,
    /// Text windows that justify the chosen value(s).
    pub spans: Vec<RawSpan>,
    /// For ambiguous fields, the competing value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runner_up: Option<FieldValue>,
}

impl FieldSlot {
    pub fn absent() -> Self {
        Self::default()
    }

    pub fn value(&self) -> Option<&FieldValue> {
        self.values.first()
    }
}

/// The assembled result for one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub document_id: String,
    /// One slot per field name, always all of them.
    pub fields: BTreeMap<FieldName, FieldSlot>,
    /// Source of every page of the document.
    #[serde(default)]
    pub page_sources: BTreeMap<u32, TextSource>,
}

impl DocumentRecord {
    /// A record with every field absent.
    pub fn empty(document_id: impl Into<String>) -> Self {
        Self {
            document_id: document_id.into(),
            fields: FieldName::ALL
                .into_iter()
                .map(|f| (f, FieldSlot::absent()))
                .collect(),
            page_sources: BTreeMap::new(),
        }
    }

    pub fn slot(&self, field: FieldName) -> &FieldSlot {
        // every constructor fills all slots; fall back to a shared absent slot
        static ABSENT: FieldSlot = FieldSlot {
            values: Vec::new(),
            confidence: 0.0,
            status: FieldStatus::Absent,
            rule_ids: Vec::new(),
            spans: Vec::new(),
            runner_up: None,
        };
        self.fields.get(&field).unwrap_or(&ABSENT)
    }

    pub fn value(&self, field: FieldName) -> Option<&FieldValue> {
        self.slot(field).value()
    }

    /// Retained coordinate blocks, in document order.
    pub fn coordinates(&self) -> Vec<CoordinateBlock> {
        self.slot(FieldName::Coordenadas)
            .values
            .iter()
            .filter_map(|v| v.as_coordinates().copied())
            .collect()
    }

    /// Fields needing human review.
    pub fn flagged_fields(&self) -> Vec<FieldName> {
        self.fields
            .iter()
            .filter(|(_, slot)| matches!(slot.status, FieldStatus::Ambiguous | FieldStatus::LowConfidence))
            .map(|(field, _)| *field)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_field_name_parsing() {
        assert_eq!(FieldName::from_str("anio"), Some(FieldName::Anio));
        assert_eq!(FieldName::from_str("SUPERFICIE_HA"), Some(FieldName::SuperficieHa));
        assert_eq!(FieldName::from_str("fecha"), None);
    }

    #[test]
    fn test_concession_type_parsing() {
        assert_eq!(ConcessionType::from_str("Explotación"), Some(ConcessionType::Explotacion));
        assert_eq!(ConcessionType::from_str("EXPLORACION"), Some(ConcessionType::Exploracion));
        assert_eq!(ConcessionType::from_str("pedimento"), Some(ConcessionType::Pedimento));
        assert_eq!(ConcessionType::from_str("arriendo"), None);
    }

    #[test]
    fn test_coordinate_validation() {
        let block = CoordinateBlock::new(6_345_210, 345_210, 19, Datum::Unknown);
        assert!(block.validate().is_empty());

        let block = CoordinateBlock::new(345_210, 6_345_210, 24, Datum::Wgs84);
        assert_eq!(block.validate().len(), 3);
    }

    #[test]
    fn test_comparison_key_folds_text() {
        let a = FieldValue::Text("La Esperanza".to_string());
        let b = FieldValue::Text("LA  ESPERANZA".to_string());
        assert_eq!(a.comparison_key(), b.comparison_key());

        let a = FieldValue::Hectares(Decimal::new(1000, 1));
        let b = FieldValue::Hectares(Decimal::from(100));
        assert_eq!(a.comparison_key(), b.comparison_key());
    }

    #[test]
    fn test_empty_record_has_every_slot() {
        let record = DocumentRecord::empty("doc.pdf");
        assert_eq!(record.fields.len(), FieldName::ALL.len());
        assert!(record.fields.values().all(|s| s.status == FieldStatus::Absent));
        assert_eq!(record.value(FieldName::Anio), None);
    }

    #[test]
    fn test_text_source_serialization() {
        assert_eq!(serde_json::to_string(&TextSource::Ocr).unwrap(), "\"ocr\"");
        assert_eq!(serde_json::to_string(&TextSource::TextLayer).unwrap(), "\"digital\"");
    }
}
