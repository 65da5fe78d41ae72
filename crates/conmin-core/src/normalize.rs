//! Text folding for accent- and case-insensitive matching.
//!
//! Patterns run over a folded copy of the page text: lowercase, accents
//! stripped, horizontal whitespace collapsed to one space and any whitespace
//! run containing a newline collapsed to a single `\n`. Every byte of the
//! folded text remembers which original character produced it, so a match can
//! always be reported against the untouched text.

use std::ops::Range;

/// Fold a single character: lowercase, then strip Spanish diacritics.
pub fn fold_char(c: char) -> impl Iterator<Item = char> {
    c.to_lowercase().map(strip_accent)
}

/// Fold a whole string without tracking offsets.
pub fn fold(text: &str) -> String {
    text.chars().flat_map(fold_char).collect()
}

fn strip_accent(c: char) -> char {
    match c {
        'á' | 'à' | 'ä' | 'â' => 'a',
        'é' | 'è' | 'ë' | 'ê' => 'e',
        'í' | 'ì' | 'ï' | 'î' => 'i',
        'ó' | 'ò' | 'ö' | 'ô' => 'o',
        'ú' | 'ù' | 'ü' | 'û' => 'u',
        'ñ' => 'n',
        'ç' => 'c',
        _ => c,
    }
}

/// Page text folded for matching, with an offset map back to the original.
#[derive(Debug, Clone)]
pub struct NormalizedText<'a> {
    original: &'a str,
    normalized: String,
    /// Original byte start of the character behind each normalized byte.
    starts: Vec<usize>,
    /// Original byte end of the character behind each normalized byte.
    ends: Vec<usize>,
}

impl<'a> NormalizedText<'a> {
    pub fn new(original: &'a str) -> Self {
        let mut text = Self {
            original,
            normalized: String::with_capacity(original.len()),
            starts: Vec::with_capacity(original.len()),
            ends: Vec::with_capacity(original.len()),
        };

        // (start, end, contains_newline) of the whitespace run being collapsed
        let mut pending_ws: Option<(usize, usize, bool)> = None;

        for (i, c) in original.char_indices() {
            let end = i + c.len_utf8();

            if c.is_whitespace() {
                pending_ws = Some(match pending_ws {
                    Some((start, _, newline)) => (start, end, newline || c == '\n'),
                    None => (i, end, c == '\n'),
                });
                continue;
            }

            if let Some((start, ws_end, newline)) = pending_ws.take() {
                if !text.normalized.is_empty() {
                    text.push(if newline { '\n' } else { ' ' }, start, ws_end);
                }
            }

            for folded in fold_char(c) {
                text.push(folded, i, end);
            }
        }

        text
    }

    fn push(&mut self, c: char, start: usize, end: usize) {
        self.normalized.push(c);
        for _ in 0..c.len_utf8() {
            self.starts.push(start);
            self.ends.push(end);
        }
    }

    /// The folded text patterns are matched against.
    pub fn as_str(&self) -> &str {
        &self.normalized
    }

    /// The untouched source text.
    pub fn original(&self) -> &'a str {
        self.original
    }

    /// Map a byte range of the folded text to the original text.
    pub fn original_range(&self, range: Range<usize>) -> Range<usize> {
        if range.start >= range.end {
            let pos = self
                .starts
                .get(range.start)
                .copied()
                .unwrap_or(self.original.len());
            return pos..pos;
        }

        let start = self.starts.get(range.start).copied().unwrap_or(self.original.len());
        let end = self
            .ends
            .get(range.end - 1)
            .copied()
            .unwrap_or(self.original.len());
        start..end
    }

    /// Original slice behind a byte range of the folded text.
    pub fn original_slice(&self, range: Range<usize>) -> &'a str {
        let range = self.original_range(range);
        &self.original[range]
    }
}

/// Collapse internal whitespace and trim surrounding punctuation from a value
/// read out of the original text.
pub fn clean_value(raw: &str) -> String {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut value = collapsed.as_str();

    loop {
        let trimmed = value.trim_matches(|c: char| {
            c.is_whitespace() || matches!(c, ',' | ';' | ':' | '"' | '\'' | '“' | '”' | '«' | '»')
        });
        let trimmed = trimmed.trim_start_matches('.');
        // keep the final dot of initialisms such as "S.A."
        let trimmed = if trimmed.ends_with('.') && !ends_with_initialism(trimmed) {
            trimmed.trim_end_matches('.')
        } else {
            trimmed
        };

        if trimmed.len() == value.len() {
            return trimmed.to_string();
        }
        value = trimmed;
    }
}

fn ends_with_initialism(value: &str) -> bool {
    let bytes = value.as_bytes();
    bytes.len() >= 3 && bytes[bytes.len() - 3] == b'.'
}
