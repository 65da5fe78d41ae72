//! UTM coordinate block detection.
//!
//! Inscriptions list vertices as "Norte: 6.345.210 m Este: 345.210 m",
//! "N 7012345 E 312456", "6.345.210 N 345.210 E", or spelled out in words,
//! usually with "Huso 19" and a datum somewhere nearby. A block is a Norte/Este
//! pair whose anchors sit within the configured window of each other.

use std::borrow::Cow;
use std::ops::Range;

use lazy_static::lazy_static;
use regex::{Captures, Regex};
use tracing::{debug, trace};

use crate::error::CoordinateError;
use crate::models::concession::{CoordinateBlock, Datum};
use crate::models::config::CoordinateConfig;
use crate::normalize::NormalizedText;
use crate::numeral;

/// Digits with optional thousands separators and decimal part.
const COORD_DIGITS: &str = r"\d{1,3}(?:[. ]\d{3})+(?:,\d+)?|\d{5,}(?:[.,]\d+)?";

lazy_static! {
    static ref NUMERAL_PHRASE: String = numeral::numeral_phrase_pattern();

    // "Norte: 6.345.210", "N 7012345", "coordenada norte seis millones ..."
    static ref NORTE_PREFIX: Regex = Regex::new(&format!(
        r"\b(?:coordenadas?\s+)?(?:(?P<word>norte)|(?P<letter>n))\b\.?\s*(?:[:=]\s*)?(?:(?P<digits>{COORD_DIGITS})|(?P<words>{}))",
        *NUMERAL_PHRASE
    )).unwrap();

    static ref ESTE_PREFIX: Regex = Regex::new(&format!(
        r"\b(?:coordenadas?\s+)?(?:(?P<word>este)|(?P<letter>e))\b\.?\s*(?:[:=]\s*)?(?:(?P<digits>{COORD_DIGITS})|(?P<words>{}))",
        *NUMERAL_PHRASE
    )).unwrap();

    // "6.345.210 N", "6.345.210 m norte"
    static ref NORTE_SUFFIX: Regex = Regex::new(&format!(
        r"\b(?P<digits>{COORD_DIGITS})\s*(?:m(?:ts|etros)?\.?\s*)?(?:(?P<word>norte)|(?P<letter>n))\b"
    )).unwrap();

    static ref ESTE_SUFFIX: Regex = Regex::new(&format!(
        r"\b(?P<digits>{COORD_DIGITS})\s*(?:m(?:ts|etros)?\.?\s*)?(?:(?P<word>este)|(?P<letter>e))\b"
    )).unwrap();

    static ref HUSO: Regex = Regex::new(&format!(
        r"\b(?:huso|zona)\s*(?:utm\s*)?[:=]?\s*(?:(?P<digits>\d{{1,2}})(?:\s*(?:sur|[hjks]))?\b|(?P<words>{}))",
        *NUMERAL_PHRASE
    )).unwrap();

    static ref DATUM: Regex = Regex::new(
        r"\b(?:(?P<psad>p\.?\s*s\.?\s*a\.?\s*d\.?\s*-?\s*(?:19)?56)|(?P<wgs>w\.?\s*g\.?\s*s\.?\s*-?\s*(?:19)?84)|(?P<sirgas>sirgas))"
    ).unwrap();

    static ref UTM: Regex = Regex::new(r"\butm\b").unwrap();
}

/// A detected block with its confidence and diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct CoordinateMatch {
    pub block: CoordinateBlock,
    /// Confidence score (0.0 - 1.0).
    pub confidence: f32,
    /// Byte range in the original text covering the anchors used.
    pub span: Range<usize>,
    /// Range violations found on the block.
    pub issues: Vec<CoordinateError>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    Norte,
    Este,
}

impl Axis {
    fn other(self) -> Self {
        match self {
            Axis::Norte => Axis::Este,
            Axis::Este => Axis::Norte,
        }
    }

    fn patterns(self) -> [&'static Regex; 2] {
        match self {
            Axis::Norte => [&*NORTE_PREFIX, &*NORTE_SUFFIX],
            Axis::Este => [&*ESTE_PREFIX, &*ESTE_SUFFIX],
        }
    }
}

/// One anchored Norte or Este value in folded text.
#[derive(Debug, Clone, Copy)]
struct AxisMatch {
    axis: Axis,
    value: u64,
    start: usize,
    end: usize,
    letter_anchor: bool,
    spelled: bool,
}

/// Finds coordinate blocks in page text.
#[derive(Debug, Clone, Default)]
pub struct CoordinateNormalizer {
    config: CoordinateConfig,
}

impl CoordinateNormalizer {
    pub fn new(config: CoordinateConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CoordinateConfig {
        &self.config
    }

    /// Scan `text` for coordinate blocks, in text order.
    pub fn extract<'a>(&'a self, text: &'a str) -> CoordinateBlocks<'a> {
        CoordinateBlocks {
            normalizer: self,
            text: Cow::Owned(NormalizedText::new(text)),
            cursor: 0,
        }
    }

    /// Scan text that has already been folded.
    pub(crate) fn extract_normalized<'a>(
        &'a self,
        text: &'a NormalizedText<'a>,
    ) -> CoordinateBlocks<'a> {
        CoordinateBlocks {
            normalizer: self,
            text: Cow::Borrowed(text),
            cursor: 0,
        }
    }
}

/// Lazy iterator over the blocks of one text. Each call to
/// [`CoordinateNormalizer::extract`] starts a fresh scan.
pub struct CoordinateBlocks<'a> {
    normalizer: &'a CoordinateNormalizer,
    text: Cow<'a, NormalizedText<'a>>,
    cursor: usize,
}

impl Iterator for CoordinateBlocks<'_> {
    type Item = CoordinateMatch;

    fn next(&mut self) -> Option<Self::Item> {
        let haystack = self.text.as_str();
        let window = self.normalizer.config.window;

        while self.cursor < haystack.len() {
            let first = match next_axis(haystack, self.cursor, None) {
                Some(found) => found,
                None => {
                    self.cursor = haystack.len();
                    return None;
                }
            };

            let limit = first.end.saturating_add(window);
            match next_axis(haystack, first.end, Some(first.axis.other())) {
                Some(second) if second.start <= limit => {
                    self.cursor = second.end;
                    return Some(self.build(first, second));
                }
                _ => {
                    trace!(
                        "{:?} anchor at {} has no partner within {} chars",
                        first.axis, first.start, window
                    );
                    self.cursor = first.end;
                }
            }
        }

        None
    }
}

impl CoordinateBlocks<'_> {
    fn build(&self, first: AxisMatch, second: AxisMatch) -> CoordinateMatch {
        let config = &self.normalizer.config;
        let haystack = self.text.as_str();

        let (norte, este) = match first.axis {
            Axis::Norte => (first, second),
            Axis::Este => (second, first),
        };

        let pair = first.start..second.end;
        let huso = find_near(haystack, &HUSO, &pair, config.window, parse_huso);
        let datum = find_near(haystack, &DATUM, &pair, config.window, parse_datum);
        let near_utm = find_near(haystack, &UTM, &pair, config.window, |_| Some(())).is_some();

        let mut covered = pair.clone();
        for range in [huso.as_ref().map(|h| &h.1), datum.as_ref().map(|d| &d.1)]
            .into_iter()
            .flatten()
        {
            covered.start = covered.start.min(range.start);
            covered.end = covered.end.max(range.end);
        }

        let huso_defaulted = huso.is_none();
        let block = CoordinateBlock {
            norte: norte.value,
            este: este.value,
            huso: huso.map(|(h, _)| h).unwrap_or(config.fallback_huso),
            datum: datum.map(|(d, _)| d).unwrap_or(Datum::Unknown),
            huso_defaulted,
        };

        let mut confidence: f32 = if first.letter_anchor || second.letter_anchor {
            0.75
        } else {
            0.9
        };
        if first.spelled || second.spelled {
            confidence = confidence.min(0.8);
        }
        if near_utm {
            confidence = (confidence + 0.05).min(1.0);
        }
        if huso_defaulted {
            confidence = confidence.min(config.defaulted_huso_cap);
        }

        let issues = block.validate();
        if !issues.is_empty() {
            debug!("implausible coordinate block {}: {:?}", block, issues);
            confidence = confidence.min(config.malformed_cap);
        }

        CoordinateMatch {
            block,
            confidence,
            span: self.text.original_range(covered),
            issues,
        }
    }
}

/// Earliest valid anchor at or after `from`, optionally restricted to one axis.
fn next_axis(haystack: &str, from: usize, only: Option<Axis>) -> Option<AxisMatch> {
    let axes: &[Axis] = match only {
        Some(Axis::Norte) => &[Axis::Norte],
        Some(Axis::Este) => &[Axis::Este],
        None => &[Axis::Norte, Axis::Este],
    };

    axes.iter()
        .flat_map(|axis| {
            axis.patterns()
                .into_iter()
                .filter_map(move |re| scan(re, *axis, haystack, from))
        })
        // prefix forms come first in `patterns`, so `min_by_key` keeps them on ties
        .min_by_key(|m| m.start)
}

fn scan(re: &Regex, axis: Axis, haystack: &str, from: usize) -> Option<AxisMatch> {
    let mut pos = from;

    while pos <= haystack.len() {
        let caps = re.captures_at(haystack, pos)?;
        let whole = caps.get(0)?;

        if let Some(found) = axis_value(&caps, axis) {
            return Some(found);
        }

        pos = next_boundary(haystack, whole.start() + 1);
    }

    None
}

fn axis_value(caps: &Captures<'_>, axis: Axis) -> Option<AxisMatch> {
    let whole = caps.get(0)?;
    let letter_anchor = caps.name("letter").is_some();

    let (value, spelled) = if let Some(digits) = caps.name("digits") {
        (parse_coordinate_digits(digits.as_str())?, false)
    } else {
        let words = caps.name("words")?;
        if letter_anchor {
            // a lone "n" or "e" followed by words is ordinary prose
            return None;
        }
        match numeral::parse(words.as_str()) {
            Ok(value) => (value, true),
            Err(e) => {
                debug!("coordinate value skipped: {}", e);
                return None;
            }
        }
    };

    Some(AxisMatch {
        axis,
        value,
        start: whole.start(),
        end: whole.end(),
        letter_anchor,
        spelled,
    })
}

/// Parse "6.345.210", "6 345 210", "6345210,50" or "6345210.5" into whole meters.
pub fn parse_coordinate_digits(raw: &str) -> Option<u64> {
    let raw = raw.trim();
    let integer_part = if let Some((int, _)) = raw.split_once(',') {
        int.to_string()
    } else if is_grouped_thousands(raw) {
        raw.to_string()
    } else if let Some((int, _)) = raw.split_once('.') {
        int.to_string()
    } else {
        raw.to_string()
    };

    let digits: String = integer_part.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}

fn is_grouped_thousands(raw: &str) -> bool {
    let mut groups = raw.split(['.', ' ']);
    let Some(head) = groups.next() else {
        return false;
    };
    let mut saw_group = false;
    for group in groups {
        if group.len() != 3 || !group.chars().all(|c| c.is_ascii_digit()) {
            return false;
        }
        saw_group = true;
    }
    saw_group && (1..=3).contains(&head.len())
}

fn parse_huso(caps: &Captures<'_>) -> Option<u8> {
    if let Some(digits) = caps.name("digits") {
        return digits.as_str().parse().ok();
    }
    let words = caps.name("words")?;
    numeral::parse(words.as_str())
        .ok()
        .and_then(|n| u8::try_from(n).ok())
}

fn parse_datum(caps: &Captures<'_>) -> Option<Datum> {
    if caps.name("psad").is_some() {
        Some(Datum::Psad56)
    } else if caps.name("wgs").is_some() || caps.name("sirgas").is_some() {
        // SIRGAS-Chile coincides with WGS84 at cadastral precision
        Some(Datum::Wgs84)
    } else {
        None
    }
}

/// First match after the pair within `window`, otherwise the closest one before it.
fn find_near<T>(
    haystack: &str,
    re: &Regex,
    pair: &Range<usize>,
    window: usize,
    convert: impl Fn(&Captures<'_>) -> Option<T>,
) -> Option<(T, Range<usize>)> {
    let after_limit = floor_boundary(haystack, pair.end.saturating_add(window));
    let after = &haystack[..after_limit];
    let mut pos = pair.end;
    while pos <= after.len() {
        let Some(caps) = re.captures_at(after, pos) else {
            break;
        };
        let whole = caps.get(0)?;
        if let Some(value) = convert(&caps) {
            return Some((value, whole.range()));
        }
        pos = next_boundary(after, whole.start() + 1);
    }

    let before_start = ceil_boundary(haystack, pair.start.saturating_sub(window));
    let before = &haystack[..pair.start];
    let mut found = None;
    let mut pos = before_start;
    while pos <= before.len() {
        let Some(caps) = re.captures_at(before, pos) else {
            break;
        };
        let whole = caps.get(0)?;
        if let Some(value) = convert(&caps) {
            found = Some((value, whole.range()));
        }
        pos = next_boundary(before, whole.start() + 1);
    }
    found
}

fn next_boundary(s: &str, mut idx: usize) -> usize {
    while idx < s.len() && !s.is_char_boundary(idx) {
        idx += 1;
    }
    idx.max(1).min(s.len() + 1)
}

fn floor_boundary(s: &str, idx: usize) -> usize {
    let mut idx = idx.min(s.len());
    while !s.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

fn ceil_boundary(s: &str, idx: usize) -> usize {
    let mut idx = idx.min(s.len());
    while !s.is_char_boundary(idx) {
        idx += 1;
    }
    idx
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn normalizer() -> CoordinateNormalizer {
        CoordinateNormalizer::new(CoordinateConfig::default())
    }

    #[test]
    fn test_basic_block() {
        let n = normalizer();
        let blocks: Vec<_> = n.extract("Norte: 6.345.210 Este: 345.210 Huso 19").collect();

        assert_eq!(blocks.len(), 1);
        assert_eq!(
            blocks[0].block,
            CoordinateBlock::new(6_345_210, 345_210, 19, Datum::Unknown)
        );
        assert!(!blocks[0].block.huso_defaulted);
        assert!(blocks[0].issues.is_empty());
        assert!(blocks[0].confidence >= 0.9);
    }

    #[test]
    fn test_datum_and_reverse_order() {
        let n = normalizer();
        let text = "Datum PSAD-56, Huso 19 Sur. Vértice 1: Este 312.456 m Norte 7.012.345 m";
        let blocks: Vec<_> = n.extract(text).collect();

        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].block.norte, 7_012_345);
        assert_eq!(blocks[0].block.este, 312_456);
        assert_eq!(blocks[0].block.datum, Datum::Psad56);
        assert_eq!(blocks[0].block.huso, 19);
    }

    #[test]
    fn test_letter_anchors_and_wgs84() {
        let n = normalizer();
        let blocks: Vec<_> = n.extract("N 7012345 E 312456 Huso 19 Datum WGS84").collect();

        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].block.datum, Datum::Wgs84);
        assert_eq!(blocks[0].confidence, 0.75);
    }

    #[test]
    fn test_suffix_form() {
        let n = normalizer();
        let blocks: Vec<_> = n.extract("Coordenadas UTM huso 18: 6.345.210 N 345.210 E").collect();

        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].block.norte, 6_345_210);
        assert_eq!(blocks[0].block.este, 345_210);
        assert_eq!(blocks[0].block.huso, 18);
    }

    #[test]
    fn test_multiple_blocks_in_text_order() {
        let n = normalizer();
        let text = "Huso 19. V1 Norte 6.345.210 Este 345.210; V2 Norte 6.346.210 Este 345.210; \
                    V3 Norte 6.346.210 Este 346.210";
        let blocks: Vec<_> = n.extract(text).collect();

        let norths: Vec<u64> = blocks.iter().map(|b| b.block.norte).collect();
        assert_eq!(norths, vec![6_345_210, 6_346_210, 6_346_210]);
        assert_eq!(blocks[2].block.este, 346_210);
    }

    #[test]
    fn test_spelled_out_values() {
        let n = normalizer();
        let text = "Norte seis millones trescientos cuarenta y cinco mil doscientos diez \
                    Este trescientos cuarenta y cinco mil doscientos diez, Huso diecinueve";
        let blocks: Vec<_> = n.extract(text).collect();

        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].block.norte, 6_345_210);
        assert_eq!(blocks[0].block.este, 345_210);
        assert_eq!(blocks[0].block.huso, 19);
        assert_eq!(blocks[0].confidence, 0.8);
    }

    #[test]
    fn test_defaulted_huso_is_capped() {
        let config = CoordinateConfig::default();
        let cap = config.defaulted_huso_cap;
        let n = CoordinateNormalizer::new(config);
        let blocks: Vec<_> = n.extract("Norte 6.345.210 Este 345.210 UTM").collect();

        assert_eq!(blocks.len(), 1);
        assert!(blocks[0].block.huso_defaulted);
        assert_eq!(blocks[0].block.huso, 19);
        assert!(blocks[0].confidence <= cap);
    }

    #[test]
    fn test_out_of_range_block_is_kept_with_low_confidence() {
        let n = normalizer();
        let blocks: Vec<_> = n.extract("Norte 345.210 Este 6.345.210 Huso 19").collect();

        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].issues.len(), 2);
        assert!(blocks[0].confidence <= 0.3);
    }

    #[test]
    fn test_pair_outside_window_is_ignored() {
        let n = CoordinateNormalizer::new(CoordinateConfig { window: 20, ..Default::default() });
        let text = format!("Norte 6.345.210 {} Este 345.210", "texto ".repeat(10));
        assert_eq!(n.extract(&text).count(), 0);
    }

    #[test]
    fn test_extraction_is_idempotent() {
        let n = normalizer();
        let text = "Norte 6.345.210 Este 345.210 Huso 19; Norte 6.340.000 Este 340.000";
        let first: Vec<_> = n.extract(text).collect();
        let second: Vec<_> = n.extract(text).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_span_points_at_original_text() {
        let n = normalizer();
        let text = "Vértice A — NORTE: 6.345.210  ESTE: 345.210 (Huso 19)";
        let block = n.extract(text).next().unwrap();
        assert_eq!(&text[block.span], "NORTE: 6.345.210  ESTE: 345.210 (Huso 19");
    }

    #[test]
    fn test_parse_coordinate_digits() {
        assert_eq!(parse_coordinate_digits("6.345.210"), Some(6_345_210));
        assert_eq!(parse_coordinate_digits("6 345 210"), Some(6_345_210));
        assert_eq!(parse_coordinate_digits("6345210,50"), Some(6_345_210));
        assert_eq!(parse_coordinate_digits("6.345.210,50"), Some(6_345_210));
        assert_eq!(parse_coordinate_digits("6345210.5"), Some(6_345_210));
        assert_eq!(parse_coordinate_digits("345210"), Some(345_210));
    }
}
