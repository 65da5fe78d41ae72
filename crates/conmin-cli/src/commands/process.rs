//! Process command - extract the record of a single document.

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use clap::Args;
use console::style;
use serde::Serialize;
use tracing::{debug, info};

use conmin_core::{Document, DocumentRecord, ExportRow, FieldName, FieldStatus, Pipeline};

use super::load_config;

/// Arguments for the process command.
#[derive(Args)]
pub struct ProcessArgs {
    /// Input file (PDF, JSON page dump or plain text)
    #[arg(required = true)]
    input: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Directory holding OCR sidecars for scanned PDFs
    #[arg(long)]
    ocr_dir: Option<PathBuf>,

    /// Print the flagged fields after the output
    #[arg(long)]
    show_flagged: bool,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// Full record and export row as JSON
    Json,
    /// Export row as CSV
    Csv,
    /// Plain text summary
    Text,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Csv => "csv",
            OutputFormat::Text => "txt",
        }
    }
}

/// Per-document JSON output.
#[derive(Serialize)]
pub struct DocumentReport<'a> {
    pub record: &'a DocumentRecord,
    pub row: ExportRow,
}

impl<'a> DocumentReport<'a> {
    pub fn new(record: &'a DocumentRecord) -> Self {
        Self {
            record,
            row: ExportRow::from_record(record),
        }
    }
}

pub async fn run(args: ProcessArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let config = load_config(config_path)?;
    let pipeline = Pipeline::from_config(&config)?;

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    info!("Processing file: {}", args.input.display());

    let document = Document::load(&args.input, &config.pdf, args.ocr_dir.as_deref())?;
    if document.pages.iter().all(|p| p.is_blank()) {
        anyhow::bail!("No text could be read from {}", args.input.display());
    }

    let record = pipeline.process(&document);
    let output = format_record(&record, args.format)?;

    if let Some(output_path) = &args.output {
        fs::write(output_path, &output)?;
        println!(
            "{} Output written to {}",
            style("✓").green(),
            output_path.display()
        );
    } else {
        println!("{}", output);
    }

    if args.show_flagged {
        let flagged = record.flagged_fields();
        eprintln!();
        if flagged.is_empty() {
            eprintln!("{} No fields need review", style("ℹ").blue());
        } else {
            eprintln!("{}", style("Fields needing review:").yellow());
            for field in flagged {
                let slot = record.slot(field);
                eprintln!("  - {} ({:?}, {:.2})", field.as_str(), slot.status, slot.confidence);
            }
        }
    }

    debug!("Total processing time: {:?}", start.elapsed());

    Ok(())
}

pub fn format_record(record: &DocumentRecord, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(&DocumentReport::new(record))?),
        OutputFormat::Csv => format_csv(&[ExportRow::from_record(record)]),
        OutputFormat::Text => Ok(format_text(record)),
    }
}

/// Export rows as CSV, header included.
pub fn format_csv(rows: &[ExportRow]) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    for row in rows {
        wtr.serialize(row)?;
    }
    let data = String::from_utf8(wtr.into_inner()?)?;
    Ok(data)
}

fn format_text(record: &DocumentRecord) -> String {
    let mut output = String::new();

    output.push_str(&format!("Documento: {}\n\n", record.document_id));

    for field in FieldName::ALL {
        let slot = record.slot(field);
        let value = match slot.status {
            FieldStatus::Absent => "-".to_string(),
            _ => slot
                .values
                .iter()
                .map(|v| v.to_string())
                .collect::<Vec<_>>()
                .join("; "),
        };
        let marker = match slot.status {
            FieldStatus::Accepted => style("✓").green(),
            FieldStatus::Ambiguous => style("?").yellow(),
            FieldStatus::LowConfidence => style("!").red(),
            FieldStatus::Absent => style("·").dim(),
        };
        output.push_str(&format!(
            "{} {:<17} {} ({:.2})\n",
            marker,
            field.as_str(),
            value,
            slot.confidence
        ));
        if let Some(other) = &slot.runner_up {
            output.push_str(&format!("  {:<17} alternativa: {}\n", "", other));
        }
    }

    let row = ExportRow::from_record(record);
    output.push_str(&format!(
        "\nFuente: {}  Confianza: {:.2}\n",
        row.tipo_fuente, row.confianza
    ));

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_csv_has_header_and_row() {
        let document = Document::from_text("a.txt", "ROL NACIONAL N° 12345-7");
        let record = Pipeline::default().process(&document);
        let csv = format_record(&record, OutputFormat::Csv).unwrap();

        let mut lines = csv.lines();
        assert_eq!(lines.next(), Some(ExportRow::HEADERS.join(",").as_str()));
        assert!(lines.next().unwrap().starts_with("a.txt,1,12345-7,"));
    }

    #[test]
    fn test_text_lists_every_field() {
        let record = Pipeline::default().process(&Document::from_text("a.txt", "nada"));
        let text = format_record(&record, OutputFormat::Text).unwrap();
        for field in FieldName::ALL {
            assert!(text.contains(field.as_str()));
        }
    }
}
