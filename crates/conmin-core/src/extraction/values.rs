//! Conversion of matched text into typed field values.

use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::patterns::FECHA_PARTES;
use crate::models::concession::{ConcessionType, FieldValue};
use crate::normalize::clean_value;
use crate::numeral;

/// Years accepted for inscriptions.
pub const YEAR_RANGE: std::ops::RangeInclusive<u64> = 1850..=2100;

/// How a rule turns its capture into a [`FieldValue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    /// Original text, whitespace collapsed and punctuation trimmed.
    Text,
    /// Registry identifier: no whitespace, uppercase check digit.
    Identifier,
    /// Digits, thousands dots allowed.
    Integer,
    /// Four-digit year.
    Year,
    /// Chilean decimal notation ("1.250,5").
    HectaresDecimal,
    /// Spelled-out hectares ("cien").
    HectaresNumeral,
    /// Spelled-out integer.
    IntegerNumeral,
    /// Spelled-out year ("mil novecientos noventa y ocho").
    YearNumeral,
    /// "15 de marzo de 2010", reduced to its year.
    LongDate,
    /// Concession type keyword.
    Tipo,
}

impl ValueKind {
    /// Convert a capture. `folded` is the normalized capture, `original` the
    /// same range of the untouched text.
    pub fn convert(self, folded: &str, original: &str) -> Option<FieldValue> {
        match self {
            ValueKind::Text => {
                let value = clean_value(original);
                (!value.is_empty()).then_some(FieldValue::Text(value))
            }
            ValueKind::Identifier => {
                let value: String = folded
                    .chars()
                    .filter(|c| !c.is_whitespace())
                    .collect::<String>()
                    .to_uppercase();
                (!value.is_empty()).then_some(FieldValue::Text(value))
            }
            ValueKind::Integer => parse_integer(folded)
                .filter(|n| *n > 0)
                .map(FieldValue::Integer),
            ValueKind::Year => parse_integer(folded).and_then(year).map(FieldValue::Integer),
            ValueKind::HectaresDecimal => parse_chilean_decimal(folded)
                .filter(|d| d.is_sign_positive() && !d.is_zero())
                .map(FieldValue::Hectares),
            ValueKind::HectaresNumeral => spelled(folded)
                .filter(|n| *n > 0)
                .map(|n| FieldValue::Hectares(Decimal::from(n))),
            ValueKind::IntegerNumeral => spelled(folded)
                .filter(|n| *n > 0)
                .map(FieldValue::Integer),
            ValueKind::YearNumeral => spelled(folded).and_then(year).map(FieldValue::Integer),
            ValueKind::LongDate => parse_long_date(folded)
                .and_then(|date| u64::try_from(date.year()).ok())
                .and_then(year)
                .map(FieldValue::Integer),
            ValueKind::Tipo => ConcessionType::from_str(folded).map(FieldValue::Tipo),
        }
    }
}

fn spelled(folded: &str) -> Option<u64> {
    match numeral::parse(folded) {
        Ok(n) => Some(n),
        Err(e) => {
            debug!("numeral branch rejected: {}", e);
            None
        }
    }
}

fn year(n: u64) -> Option<u64> {
    if YEAR_RANGE.contains(&n) {
        Some(n)
    } else {
        debug!("year {} outside {:?}", n, YEAR_RANGE);
        None
    }
}

/// Parse digits with optional thousands dots ("1.234").
pub fn parse_integer(s: &str) -> Option<u64> {
    let digits: String = s.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() || s.contains(',') {
        return None;
    }
    digits.parse().ok()
}

/// Parse a Chilean-formatted decimal ("1.250,5", "100,25", "1.250", "12.5").
///
/// A dot followed by exactly three digits is a thousands separator; any
/// other single dot is a decimal point.
pub fn parse_chilean_decimal(s: &str) -> Option<Decimal> {
    let cleaned: String = s
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == ',' || *c == '.')
        .collect();

    let normalized = if cleaned.contains(',') {
        cleaned.replace('.', "").replace(',', ".")
    } else if is_thousands_grouped(&cleaned) {
        cleaned.replace('.', "")
    } else {
        cleaned
    };

    Decimal::from_str(&normalized).ok()
}

fn is_thousands_grouped(s: &str) -> bool {
    let mut parts = s.split('.');
    let head = parts.next().unwrap_or_default();
    let tail: Vec<&str> = parts.collect();
    !tail.is_empty()
        && (1..=3).contains(&head.len())
        && tail.iter().all(|p| p.len() == 3)
}

/// Parse "15 de marzo de 2010" (folded).
pub fn parse_long_date(folded: &str) -> Option<NaiveDate> {
    let caps = FECHA_PARTES.captures(folded.trim())?;
    let day: u32 = caps[1].parse().ok()?;
    let month = spanish_month_to_number(&caps[2])?;
    let year: i32 = caps[3].parse().ok()?;

    let date = NaiveDate::from_ymd_opt(year, month, day);
    if date.is_none() {
        debug!("invalid calendar date: {}", folded);
    }
    date
}

fn spanish_month_to_number(month: &str) -> Option<u32> {
    let number = match month {
        "enero" => 1,
        "febrero" => 2,
        "marzo" => 3,
        "abril" => 4,
        "mayo" => 5,
        "junio" => 6,
        "julio" => 7,
        "agosto" => 8,
        "septiembre" | "setiembre" => 9,
        "octubre" => 10,
        "noviembre" => 11,
        "diciembre" => 12,
        _ => return None,
    };
    Some(number)
}
