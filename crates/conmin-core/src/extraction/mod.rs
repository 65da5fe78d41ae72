//! Rule-based field extraction for mining-title text.

pub mod patterns;
pub mod rules;
pub mod values;

pub use rules::{Matcher, Rule, RuleSet};
pub use values::{parse_chilean_decimal, parse_long_date, ValueKind};

use tracing::{debug, trace};

use crate::coordinates::CoordinateNormalizer;
use crate::error::ConfigError;
use crate::models::concession::{FieldCandidate, FieldValue, RawSpan, TextSource};
use crate::models::config::{ConminConfig, ExtractionConfig};
use crate::models::document::PageText;
use crate::normalize::NormalizedText;

/// Bytes of folded text before a hit that a veto pattern is matched against.
const VETO_WINDOW: usize = 40;

/// Runs every rule of a [`RuleSet`] over page text.
#[derive(Debug, Clone)]
pub struct FieldExtractor {
    rules: RuleSet,
    coordinates: CoordinateNormalizer,
    ocr_confidence_factor: f32,
}

impl Default for FieldExtractor {
    fn default() -> Self {
        Self::new(RuleSet::builtin(), CoordinateNormalizer::default())
    }
}

impl FieldExtractor {
    pub fn new(rules: RuleSet, coordinates: CoordinateNormalizer) -> Self {
        Self {
            rules,
            coordinates,
            ocr_confidence_factor: ExtractionConfig::default().ocr_confidence_factor,
        }
    }

    /// Compile the configured rule set.
    pub fn from_config(config: &ConminConfig) -> Result<Self, ConfigError> {
        let rules = RuleSet::from_config(&config.rules)?;
        let coordinates = CoordinateNormalizer::new(config.coordinates.clone());
        Ok(Self::new(rules, coordinates)
            .with_ocr_confidence_factor(config.extraction.ocr_confidence_factor))
    }

    /// Set the multiplier applied to candidates from OCR pages.
    pub fn with_ocr_confidence_factor(mut self, factor: f32) -> Self {
        self.ocr_confidence_factor = factor;
        self
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub fn coordinates(&self) -> &CoordinateNormalizer {
        &self.coordinates
    }

    /// Extract candidates from one page of text-layer text.
    pub fn extract_fields(&self, raw_text: &str, page: u32) -> Vec<FieldCandidate> {
        self.extract_with_source(raw_text, page, TextSource::TextLayer)
    }

    /// Extract candidates from a page, discounting OCR text.
    pub fn extract_page(&self, page: &PageText) -> Vec<FieldCandidate> {
        self.extract_with_source(&page.text, page.number, page.source)
    }

    fn extract_with_source(&self, raw_text: &str, page: u32, source: TextSource) -> Vec<FieldCandidate> {
        let text = NormalizedText::new(raw_text);
        let factor = match source {
            TextSource::TextLayer => 1.0,
            TextSource::Ocr => self.ocr_confidence_factor,
        };

        let mut candidates = Vec::new();
        for rule in self.rules.iter() {
            let before = candidates.len();
            match &rule.matcher {
                Matcher::Pattern(re) => {
                    self.apply_pattern(rule, re, &text, page, source, factor, &mut candidates)
                }
                Matcher::Coordinates => {
                    for found in self.coordinates.extract_normalized(&text) {
                        candidates.push(FieldCandidate {
                            field: rule.field,
                            value: FieldValue::Coordinates(found.block),
                            source_span: span(&text, found.span, page, source),
                            confidence: found.confidence.min(rule.base_confidence) * factor,
                            rule_id: rule.id.clone(),
                        });
                    }
                }
            }
            if candidates.len() > before {
                debug!("page {}: rule {} produced {} candidate(s)", page, rule.id, candidates.len() - before);
            }
        }

        candidates
    }

    #[allow(clippy::too_many_arguments)]
    fn apply_pattern(
        &self,
        rule: &Rule,
        re: &regex::Regex,
        text: &NormalizedText<'_>,
        page: u32,
        source: TextSource,
        factor: f32,
        out: &mut Vec<FieldCandidate>,
    ) {
        let haystack = text.as_str();

        for caps in re.captures_iter(haystack) {
            let Some(whole) = caps.get(0) else {
                continue;
            };
            let value_match = caps.get(1).unwrap_or(whole);

            if let Some(veto) = &rule.veto {
                let window = preceding_window(haystack, whole.start());
                if veto.is_match(window) {
                    trace!("rule {} vetoed at {}: {:?}", rule.id, whole.start(), window);
                    continue;
                }
            }

            let original = text.original_slice(value_match.range());
            let Some(value) = rule.value.convert(value_match.as_str(), original) else {
                debug!("rule {} matched {:?} but no value could be read", rule.id, whole.as_str());
                continue;
            };

            out.push(FieldCandidate {
                field: rule.field,
                value,
                source_span: span(text, whole.range(), page, source),
                confidence: rule.base_confidence * factor,
                rule_id: rule.id.clone(),
            });
        }
    }
}

fn span(text: &NormalizedText<'_>, range: std::ops::Range<usize>, page: u32, source: TextSource) -> RawSpan {
    let original = text.original_range(range);
    RawSpan {
        page,
        start: original.start,
        end: original.end,
        text: text.original()[original].to_string(),
        source,
    }
}

fn preceding_window(haystack: &str, end: usize) -> &str {
    let mut start = end.saturating_sub(VETO_WINDOW);
    while !haystack.is_char_boundary(start) {
        start += 1;
    }
    &haystack[start..end]
}
