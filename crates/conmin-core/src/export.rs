//! Flat export row for auditors' spreadsheets.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::models::concession::{DocumentRecord, FieldName, TextSource};

/// Separator between audit spans in `texto_bruto`.
pub const SPAN_SEPARATOR: &str = " | ";

/// One row per document. Only accepted or ambiguous values are filled in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportRow {
    pub archivo: String,
    /// Pages that contributed exported values, e.g. "1;3".
    pub pagina: String,
    pub rol_nacional: Option<String>,
    pub nombre_concesion: Option<String>,
    pub titular: Option<String>,
    pub superficie: Option<String>,
    pub fojas: Option<String>,
    pub numero: Option<String>,
    pub anio: Option<String>,
    pub conservador: Option<String>,
    /// "digital", "ocr" or "mixto".
    pub tipo_fuente: String,
    /// Lowest confidence among exported fields; 0 when nothing was exported.
    pub confianza: f32,
    pub texto_bruto: String,
}

impl ExportRow {
    /// Column names, in file order.
    pub const HEADERS: [&'static str; 13] = [
        "archivo",
        "pagina",
        "rol_nacional",
        "nombre_concesion",
        "titular",
        "superficie",
        "fojas",
        "numero",
        "anio",
        "conservador",
        "tipo_fuente",
        "confianza",
        "texto_bruto",
    ];

    pub fn from_record(record: &DocumentRecord) -> Self {
        let cell = |field: FieldName| {
            let slot = record.slot(field);
            if slot.status.is_exported() {
                slot.value().map(|v| v.to_string())
            } else {
                None
            }
        };

        let mut pages = BTreeSet::new();
        let mut spans: Vec<&str> = Vec::new();
        let mut confianza: Option<f32> = None;

        for (_, slot) in record.fields.iter().filter(|(_, s)| s.status.is_exported()) {
            confianza = Some(confianza.map_or(slot.confidence, |c| c.min(slot.confidence)));
            for span in &slot.spans {
                pages.insert(span.page);
                if !spans.contains(&span.text.as_str()) {
                    spans.push(span.text.as_str());
                }
            }
        }

        Self {
            archivo: record.document_id.clone(),
            pagina: pages
                .iter()
                .map(|p| p.to_string())
                .collect::<Vec<_>>()
                .join(";"),
            rol_nacional: cell(FieldName::RolNacional),
            nombre_concesion: cell(FieldName::NombreConcesion),
            titular: cell(FieldName::Titular),
            superficie: cell(FieldName::SuperficieHa),
            fojas: cell(FieldName::Fojas),
            numero: cell(FieldName::Numero),
            anio: cell(FieldName::Anio),
            conservador: cell(FieldName::Conservador),
            tipo_fuente: source_kind(record).to_string(),
            confianza: confianza.unwrap_or(0.0),
            texto_bruto: spans.join(SPAN_SEPARATOR),
        }
    }
}

fn source_kind(record: &DocumentRecord) -> &'static str {
    let has_ocr = record.page_sources.values().any(|s| *s == TextSource::Ocr);
    let has_digital = record.page_sources.values().any(|s| *s == TextSource::TextLayer);
    match (has_digital, has_ocr) {
        (true, true) => "mixto",
        (false, true) => "ocr",
        _ => "digital",
    }
}
