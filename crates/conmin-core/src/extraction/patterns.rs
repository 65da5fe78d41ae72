//! Regex tables for the built-in rules.
//!
//! Every pattern runs over folded text (see [`crate::normalize`]): lowercase,
//! no accents, one space between words and `\n` between lines. Capture group 1
//! is the value; the whole match is the audit span.

use lazy_static::lazy_static;
use regex::Regex;

use crate::numeral::numeral_phrase_pattern;

/// Month names as written in inscriptions (folded).
pub const MESES: &str =
    "enero|febrero|marzo|abril|mayo|junio|julio|agosto|septiembre|setiembre|octubre|noviembre|diciembre";

/// ROL nacional value, e.g. "12345-7" or "02201-0380-3".
const ROL_VALUE: &str = r"(\d[\d.]*(?:-[\d.]+)*-[\dk])\b";

/// Hectares in Chilean notation: "1.250,5", "100,25", "100".
const HECTARES_VALUE: &str = r"(\d{1,3}(?:\.\d{3})+(?:,\d+)?|\d+(?:[.,]\d+)?)";

const HECTARES_UNIT: &str = r"(?:ha|has|hectareas?)\b";

/// Folio or inscription number, thousands dots allowed: "1.234", "456".
const FOLIO_VALUE: &str = r"(\d{1,3}(?:\.\d{3})+|\d{1,6})\b";

/// Same shape as [`FOLIO_VALUE`], without the capture.
const FOLIO_SKIP: &str = r"(?:\d{1,3}(?:\.\d{3})+|\d{1,6})";

/// Number reference: "numero", "nro.", "n°".
const NUMERO_LABEL: &str = r"(?:numero|nro\.?|n\s?[°º]|no\.)";

/// City name up to a clause boundary.
const CITY_VALUE: &str = r"([a-z][a-z\- ]{1,40}?)\s*(?:[,.;:(\n]|$|\s(?:a\s+fojas|fojas|con|bajo|se|que|del|en|inscrit[ao])\b)";

/// Person or company name up to a clause boundary; keeps company suffixes.
const NAME_VALUE: &str = r"([^\n,;]{3,80}?(?:\s(?:s\.a|s\.p\.a|ltda|spa|limitada)\.?)?)\s*(?:[,;\n]|$|\.\s|\s+rut\b|\s+domiciliad[ao]\b)";

lazy_static! {
    static ref PHRASE: String = numeral_phrase_pattern();

    // ROL nacional
    pub static ref ROL_ETIQUETA: Regex = Regex::new(&format!(
        r"\brol\s+(?:unico\s+)?nac(?:ional|\.)?\s*(?:{NUMERO_LABEL}\s*)?[:.]?\s*{ROL_VALUE}"
    )).unwrap();

    pub static ref ROL_ABREVIADO: Regex = Regex::new(&format!(
        r"\brol\s*(?:{NUMERO_LABEL}\s*)?[:.]?\s*{ROL_VALUE}"
    )).unwrap();

    // Concession name
    pub static ref NOMBRE_ETIQUETA: Regex = Regex::new(
        r#"\bnombre(?:\s+de\s+la\s+(?:concesion|pertenencia|mina))?\s*:\s*["“«']?([^\n"“”«»,;]{2,80}?)\s*(?:["”»',;\n]|$)"#
    ).unwrap();

    pub static ref NOMBRE_COMILLAS: Regex = Regex::new(
        r#"\b(?:concesion|pertenencia|manifestacion|pedimento)(?:\s+minera)?(?:\s+de\s+(?:explotacion|exploracion))?\s+(?:denominada\s+)?["“«']([^\n"“”«»']{2,80})["”»']"#
    ).unwrap();

    pub static ref NOMBRE_DENOMINADA: Regex = Regex::new(
        r"\bdenominad[ao]s?\s+([^\n,;.]{2,60}?)\s*(?:[,;.\n]|$)"
    ).unwrap();

    // Concession type
    pub static ref TIPO_ETIQUETA: Regex = Regex::new(
        r"\btipo(?:\s+de\s+concesion)?\s*:\s*(?:concesion\s+(?:minera\s+)?(?:de\s+)?)?(explotacion|exploracion|manifestacion|pedimento)\b"
    ).unwrap();

    pub static ref TIPO_CONCESION: Regex = Regex::new(
        r"\bconcesion(?:\s+minera)?\s+de\s+(explotacion|exploracion)\b"
    ).unwrap();

    pub static ref TIPO_CONTEXTO: Regex = Regex::new(
        r"\b(manifestacion|pedimento)(?:\s+miner[ao])?\b"
    ).unwrap();

    // Surface
    pub static ref SUPERFICIE_DECIMAL: Regex = Regex::new(&format!(
        r"\bsuperficie(?:\s+total)?(?:\s+de)?\s*[:=]?\s*{HECTARES_VALUE}\s*(?:{HECTARES_UNIT})?"
    )).unwrap();

    pub static ref SUPERFICIE_FRASE_NUMERAL: Regex = Regex::new(&format!(
        r"\bsuperficie(?:\s+total)?(?:\s+de)?\s*[:=]?\s*({})\s+{HECTARES_UNIT}",
        *PHRASE
    )).unwrap();

    pub static ref SUPERFICIE_SUELTA: Regex = Regex::new(&format!(
        r"\b{HECTARES_VALUE}\s*{HECTARES_UNIT}"
    )).unwrap();

    // Folio
    pub static ref FOJAS_ETIQUETA: Regex = Regex::new(&format!(
        r"\bfojas?\s*[:.]?\s*{FOLIO_VALUE}"
    )).unwrap();

    pub static ref FOJAS_FRASE_NUMERAL: Regex = Regex::new(&format!(
        r"\bfojas?\s+({})", *PHRASE
    )).unwrap();

    pub static ref FOJAS_ABREVIADA: Regex = Regex::new(&format!(
        r"\b(?:fs|fjs)\.?\s*{FOLIO_VALUE}"
    )).unwrap();

    // Inscription number
    pub static ref NUMERO_TRAS_FOJAS: Regex = Regex::new(&format!(
        r"\bfojas?\s*[:.]?\s*{FOLIO_SKIP}(?:\s*(?:vta|vuelta)\.?)?\s*,?\s*(?:(?:bajo|con)\s+el\s+)?{NUMERO_LABEL}\s*[:.]?\s*{FOLIO_VALUE}"
    )).unwrap();

    pub static ref NUMERO_ETIQUETA: Regex = Regex::new(&format!(
        r"\b{NUMERO_LABEL}\s*[:.]?\s*{FOLIO_VALUE}"
    )).unwrap();

    /// Veto for `numero.etiqueta`: the number belongs to a ROL.
    pub static ref NUMERO_VETO_ROL: Regex = Regex::new(
        r"\brol\b[^\n]{0,20}$"
    ).unwrap();

    // Inscription year
    pub static ref ANIO_TRAS_NUMERO: Regex = Regex::new(&format!(
        r"\b{NUMERO_LABEL}\s*[:.]?\s*{FOLIO_SKIP}\s*,?\s*(?:del?\s+)?(?:registro\s+de\s+[a-z]+\s+(?:del?\s+)?)?ano\s*[:.]?\s*(\d{{4}})\b"
    )).unwrap();

    pub static ref ANIO_ETIQUETA: Regex = Regex::new(
        r"\bano\s*[:.]?\s*(\d{4})\b"
    ).unwrap();

    pub static ref ANIO_FRASE_NUMERAL: Regex = Regex::new(&format!(
        r"\bano\s+({})", *PHRASE
    )).unwrap();

    pub static ref ANIO_FECHA: Regex = Regex::new(&format!(
        r"\b(\d{{1,2}}\s+de\s+(?:{MESES})\s+(?:de|del)\s+\d{{4}})\b"
    )).unwrap();

    /// Pieces of a long date, applied to the `anio.fecha` capture.
    pub static ref FECHA_PARTES: Regex = Regex::new(&format!(
        r"^(\d{{1,2}})\s+de\s+({MESES})\s+(?:de|del)\s+(\d{{4}})$"
    )).unwrap();

    // Registrar
    pub static ref CONSERVADOR_MINAS: Regex = Regex::new(&format!(
        r"\bconservador\s+de\s+minas\s+de(?:\s+la\s+ciudad\s+de)?\s+{CITY_VALUE}"
    )).unwrap();

    pub static ref CONSERVADOR_BIENES_RAICES: Regex = Regex::new(&format!(
        r"\bconservador\s+de\s+bienes\s+raices\s+de(?:\s+la\s+ciudad\s+de)?\s+{CITY_VALUE}"
    )).unwrap();

    // Holder
    pub static ref TITULAR_ETIQUETA: Regex = Regex::new(&format!(
        r"\b(?:titular(?:es)?|concesionari[oa]|propietari[oa])(?:\s+de\s+la\s+concesion)?\s*:\s*{NAME_VALUE}"
    )).unwrap();

    pub static ref TITULAR_CONTEXTO: Regex = Regex::new(&format!(
        r"\b(?:a\s+nombre\s+de|solicitad[ao]\s+por|a\s+favor\s+de|de\s+propiedad\s+de)\s+{NAME_VALUE}"
    )).unwrap();
}
