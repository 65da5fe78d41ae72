//! Spanish cardinal numerals written in words.
//!
//! Legal inscriptions spell out surfaces, folios and years, e.g.
//! "cinco millones doscientos mil" or "mil novecientos noventa y ocho".
//! The grammar is deliberately closed: anything outside it is rejected with
//! [`NumeralError::NotANumeral`] instead of being guessed.

use tracing::trace;

use crate::error::NumeralError;
use crate::normalize::fold;

/// Result type for numeral parsing.
pub type Result<T> = std::result::Result<T, NumeralError>;

/// Regex fragment matching one numeral word in folded text (the conjunction
/// "y" excluded). Longer alternatives come first.
pub const NUMERAL_WORD: &str = concat!(
    "(?:cero|veintiuno|veintiuna|veintiun|veintidos|veintitres|veinticuatro|",
    "veinticinco|veintiseis|veintisiete|veintiocho|veintinueve|veinte|",
    "dieciseis|diecisiete|dieciocho|diecinueve|diez|once|doce|trece|catorce|quince|",
    "treinta|cuarenta|cincuenta|sesenta|setenta|ochenta|noventa|",
    "doscient[oa]s|trescient[oa]s|cuatrocient[oa]s|quinient[oa]s|seiscient[oa]s|",
    "setecient[oa]s|ochocient[oa]s|novecient[oa]s|ciento|cien|",
    "millones|millon|billones|billon|mil|",
    "uno|una|un|dos|tres|cuatro|cinco|seis|siete|ocho|nueve)"
);

/// Regex fragment matching a whole numeral phrase; "y" only between words.
pub fn numeral_phrase_pattern() -> String {
    format!(r"\b{w}(?:(?:\s+y)?\s+{w})*\b", w = NUMERAL_WORD)
}

/// A classified numeral word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumeralToken {
    Zero,
    /// 1..=9
    Unit(u64),
    /// Closed forms 10..=19 and 21..=29 that accept nothing after them.
    Teen(u64),
    /// 20, 30, ... 90; may be followed by a unit.
    Ten(u64),
    /// "ciento", "doscientos" ... "novecientos".
    Hundred(u64),
    /// Bare "cien", which closes its group.
    Cien,
    /// Scale word; `plural` is `None` for the invariable "mil".
    Scale { value: u64, plural: Option<bool> },
    And,
}

impl NumeralToken {
    /// Classify one folded word.
    pub fn classify(word: &str) -> Option<Self> {
        use NumeralToken::*;

        let token = match word {
            "cero" => Zero,
            "un" | "uno" | "una" => Unit(1),
            "dos" => Unit(2),
            "tres" => Unit(3),
            "cuatro" => Unit(4),
            "cinco" => Unit(5),
            "seis" => Unit(6),
            "siete" => Unit(7),
            "ocho" => Unit(8),
            "nueve" => Unit(9),
            "diez" => Teen(10),
            "once" => Teen(11),
            "doce" => Teen(12),
            "trece" => Teen(13),
            "catorce" => Teen(14),
            "quince" => Teen(15),
            "dieciseis" => Teen(16),
            "diecisiete" => Teen(17),
            "dieciocho" => Teen(18),
            "diecinueve" => Teen(19),
            "veinte" => Ten(20),
            "veintiun" | "veintiuno" | "veintiuna" => Teen(21),
            "veintidos" => Teen(22),
            "veintitres" => Teen(23),
            "veinticuatro" => Teen(24),
            "veinticinco" => Teen(25),
            "veintiseis" => Teen(26),
            "veintisiete" => Teen(27),
            "veintiocho" => Teen(28),
            "veintinueve" => Teen(29),
            "treinta" => Ten(30),
            "cuarenta" => Ten(40),
            "cincuenta" => Ten(50),
            "sesenta" => Ten(60),
            "setenta" => Ten(70),
            "ochenta" => Ten(80),
            "noventa" => Ten(90),
            "cien" => Cien,
            "ciento" => Hundred(100),
            "doscientos" | "doscientas" => Hundred(200),
            "trescientos" | "trescientas" => Hundred(300),
            "cuatrocientos" | "cuatrocientas" => Hundred(400),
            "quinientos" | "quinientas" => Hundred(500),
            "seiscientos" | "seiscientas" => Hundred(600),
            "setecientos" | "setecientas" => Hundred(700),
            "ochocientos" | "ochocientas" => Hundred(800),
            "novecientos" | "novecientas" => Hundred(900),
            "mil" => Scale { value: 1_000, plural: None },
            "millon" => Scale { value: 1_000_000, plural: Some(false) },
            "millones" => Scale { value: 1_000_000, plural: Some(true) },
            "billon" => Scale { value: 1_000_000_000_000, plural: Some(false) },
            "billones" => Scale { value: 1_000_000_000_000, plural: Some(true) },
            "y" => And,
            _ => return None,
        };
        Some(token)
    }
}

/// Position inside a group below one thousand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Empty,
    Hundreds,
    Tens,
    Closed,
}

/// Parse a Spanish cardinal phrase into an integer.
///
/// ```
/// use conmin_core::numeral::parse;
///
/// assert_eq!(parse("cinco millones doscientos mil"), Ok(5_200_000));
/// assert!(parse("mil mil").is_err());
/// ```
pub fn parse(text: &str) -> Result<u64> {
    let folded = fold(text);
    let words: Vec<&str> = folded
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|w| !w.is_empty())
        .collect();

    if words.is_empty() {
        return Err(NumeralError::new(text, "empty phrase"));
    }

    let tokens = words
        .iter()
        .map(|w| {
            NumeralToken::classify(w)
                .ok_or_else(|| NumeralError::new(text, format!("unknown word {w:?}")))
        })
        .collect::<Result<Vec<_>>>()?;

    trace!("numeral tokens for {:?}: {:?}", text, tokens);

    if tokens.contains(&NumeralToken::Zero) {
        return if tokens.len() == 1 {
            Ok(0)
        } else {
            Err(NumeralError::new(text, "\"cero\" cannot be combined"))
        };
    }

    if tokens.first() == Some(&NumeralToken::And) || tokens.last() == Some(&NumeralToken::And) {
        return Err(NumeralError::new(text, "dangling \"y\""));
    }

    let mut total: u64 = 0;
    let mut group: u64 = 0;
    let mut stage = Stage::Empty;
    let mut last_scale: Option<u64> = None;
    let mut previous: Option<NumeralToken> = None;

    for token in tokens {
        match token {
            NumeralToken::And => {
                if previous == Some(NumeralToken::And) {
                    return Err(NumeralError::new(text, "repeated \"y\""));
                }
            }
            NumeralToken::Hundred(value) => {
                if stage != Stage::Empty {
                    return Err(NumeralError::new(text, "hundreds out of order"));
                }
                group += value;
                stage = Stage::Hundreds;
            }
            NumeralToken::Cien => {
                if stage != Stage::Empty {
                    return Err(NumeralError::new(text, "\"cien\" out of order"));
                }
                group = 100;
                stage = Stage::Closed;
            }
            NumeralToken::Ten(value) => {
                if !matches!(stage, Stage::Empty | Stage::Hundreds) {
                    return Err(NumeralError::new(text, "tens out of order"));
                }
                group += value;
                stage = Stage::Tens;
            }
            NumeralToken::Teen(value) => {
                if !matches!(stage, Stage::Empty | Stage::Hundreds) {
                    return Err(NumeralError::new(text, "teen out of order"));
                }
                group += value;
                stage = Stage::Closed;
            }
            NumeralToken::Unit(value) => {
                if stage == Stage::Closed {
                    return Err(NumeralError::new(text, "unit out of order"));
                }
                group += value;
                stage = Stage::Closed;
            }
            NumeralToken::Scale { value, plural } => {
                if matches!(previous, Some(NumeralToken::Scale { .. })) {
                    return Err(NumeralError::new(text, "consecutive scale words"));
                }
                if last_scale.is_some_and(|last| value >= last) {
                    return Err(NumeralError::new(text, "scale words out of order"));
                }

                // "mil" and "millón" carry an implicit one
                let multiplier = if stage == Stage::Empty { 1 } else { group };
                match plural {
                    Some(false) if multiplier != 1 => {
                        return Err(NumeralError::new(text, "singular scale after plural count"));
                    }
                    Some(true) if multiplier == 1 => {
                        return Err(NumeralError::new(text, "plural scale after \"un\""));
                    }
                    _ => {}
                }

                total += multiplier * value;
                group = 0;
                stage = Stage::Empty;
                last_scale = Some(value);
            }
            NumeralToken::Zero => unreachable!("handled above"),
        }
        previous = Some(token);
    }

    Ok(total + group)
}
