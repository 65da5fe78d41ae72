use conmin_core::{
    ConminConfig, CoordinateBlock, Datum, Document, ExportRow, FieldName, FieldStatus,
    FieldValue, PageText, Pipeline, RecordAssembler, TextSource,
};
use pretty_assertions::assert_eq;
use rust_decimal::Decimal;

const INSCRIPCION: &str = "\
CONSERVADOR DE MINAS DE COPIAPÓ
ROL NACIONAL N° 12345-7
Concesión de explotación denominada \"LA ESPERANZA 1 AL 20\"
SUPERFICIE: cien hectáreas
Titular: Compañía Minera Los Andes S.A. RUT 76.123.456-7
Inscrita a fojas 123 número 456 del año 1998 del Registro de Propiedad.
Coordenadas UTM, Datum PSAD-56:
Norte: 6.345.210 Este: 345.210 Huso 19
Norte: 6.346.210 Este: 345.210 Huso 19
";

#[test]
fn test_rol_and_numeral_surface() {
    let document = Document::from_text(
        "rol.txt",
        "ROL NACIONAL N° 12345-7\nSUPERFICIE: cien hectáreas",
    );
    let record = Pipeline::default().process(&document);

    let rol = record.slot(FieldName::RolNacional);
    assert_eq!(rol.value(), Some(&FieldValue::Text("12345-7".to_string())));
    assert!(rol.confidence >= 0.9);
    assert_eq!(rol.status, FieldStatus::Accepted);

    let superficie = record.slot(FieldName::SuperficieHa);
    assert_eq!(superficie.value(), Some(&FieldValue::Hectares(Decimal::from(100))));
    assert!(superficie.confidence >= 0.7);
    assert_eq!(superficie.rule_ids, vec!["superficie.frase_numeral".to_string()]);
}

#[test]
fn test_coordinate_block() {
    let document = Document::from_text("utm.txt", "Norte: 6.345.210 Este: 345.210 Huso 19");
    let record = Pipeline::default().process(&document);

    assert_eq!(
        record.coordinates(),
        vec![CoordinateBlock::new(6_345_210, 345_210, 19, Datum::Unknown)]
    );
    assert_eq!(record.slot(FieldName::Coordenadas).status, FieldStatus::Accepted);
}

#[test]
fn test_conflicting_years_across_pages() {
    // page 2 cites a different year with a strong label
    let document = Document::new(
        "anio.pdf",
        vec![
            PageText::new(1, "a fojas 10 número 20 del año 1998", TextSource::TextLayer),
            PageText::new(2, "Inscripción del año 1999", TextSource::TextLayer),
        ],
    );

    let mut config = ConminConfig::default();
    config.rules.confidence_overrides.insert("anio.etiqueta".to_string(), 0.85);
    let pipeline = Pipeline::from_config(&config).unwrap();
    let record = pipeline.process(&document);

    let anio = record.slot(FieldName::Anio);
    assert_eq!(anio.value(), Some(&FieldValue::Integer(1998)));
    assert_eq!(anio.status, FieldStatus::Ambiguous);
    assert_eq!(anio.confidence, 0.85);

    let row = ExportRow::from_record(&record);
    assert_eq!(row.anio.as_deref(), Some("1998"));
    assert!(row.confianza <= 0.85);
}

#[test]
fn test_full_inscription() {
    let document = Document::from_text("esperanza.txt", INSCRIPCION);
    let record = Pipeline::default().process(&document);

    assert_eq!(
        record.value(FieldName::Conservador),
        Some(&FieldValue::Text("COPIAPÓ".to_string()))
    );
    assert_eq!(
        record.value(FieldName::NombreConcesion),
        Some(&FieldValue::Text("LA ESPERANZA 1 AL 20".to_string()))
    );
    assert_eq!(
        record.value(FieldName::Titular),
        Some(&FieldValue::Text("Compañía Minera Los Andes S.A.".to_string()))
    );
    assert_eq!(record.value(FieldName::Fojas), Some(&FieldValue::Integer(123)));
    assert_eq!(record.value(FieldName::Numero), Some(&FieldValue::Integer(456)));
    assert_eq!(record.value(FieldName::Anio), Some(&FieldValue::Integer(1998)));

    let blocks = record.coordinates();
    assert_eq!(blocks.len(), 2);
    assert!(blocks.iter().all(|b| b.datum == Datum::Psad56 && b.huso == 19));

    let row = ExportRow::from_record(&record);
    assert_eq!(row.archivo, "esperanza.txt");
    assert_eq!(row.pagina, "1");
    assert_eq!(row.tipo_fuente, "digital");
    assert_eq!(row.rol_nacional.as_deref(), Some("12345-7"));
    assert_eq!(row.superficie.as_deref(), Some("100"));
    assert!(row.texto_bruto.contains("ROL NACIONAL N° 12345-7"));
    assert!(row.confianza >= 0.7);
}

#[test]
fn test_defaulted_huso_is_never_accepted() {
    let document = Document::from_text("sin_huso.txt", "Norte: 6.345.210 Este: 345.210");
    let record = Pipeline::default().process(&document);

    let slot = record.slot(FieldName::Coordenadas);
    assert_eq!(slot.status, FieldStatus::LowConfidence);
    assert!(slot.confidence < 0.7);
    assert_eq!(ExportRow::from_record(&record).confianza, 0.0);
}

#[test]
fn test_defaulted_huso_is_marked_per_block() {
    let document = Document::new(
        "vertices.pdf",
        vec![
            PageText::new(1, "Norte: 6.345.210 Este: 345.210 Huso 18", TextSource::TextLayer),
            PageText::new(2, "Norte: 6.346.210 Este: 345.210", TextSource::TextLayer),
        ],
    );
    let record = Pipeline::default().process(&document);

    let blocks = record.coordinates();
    assert_eq!(blocks.len(), 2);
    assert_eq!((blocks[0].huso, blocks[0].huso_defaulted), (18, false));
    assert_eq!((blocks[1].huso, blocks[1].huso_defaulted), (19, true));

    let json = serde_json::to_value(&record).unwrap();
    let values = &json["fields"]["COORDENADAS"]["values"];
    assert_eq!(values[0]["value"]["huso_defaulted"], false);
    assert_eq!(values[1]["value"]["huso_defaulted"], true);
}

#[test]
fn test_processing_is_deterministic() {
    let document = Document::from_text("esperanza.txt", INSCRIPCION);
    let pipeline = Pipeline::default();
    assert_eq!(pipeline.process(&document), pipeline.process(&document));
}

#[test]
fn test_assembler_reports_every_field() {
    let record = RecordAssembler::default().assemble(&[], "nada");
    for field in FieldName::ALL {
        assert_eq!(record.slot(field).status, FieldStatus::Absent);
    }
}
