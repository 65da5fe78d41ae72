//! Inspect command - show every candidate a document produced.

use std::path::PathBuf;

use clap::Args;
use console::style;

use conmin_core::{Document, FieldCandidate, FieldName, Pipeline};

use super::load_config;

/// Arguments for the inspect command.
#[derive(Args)]
pub struct InspectArgs {
    /// Input file (PDF, JSON page dump or plain text)
    #[arg(required = true)]
    input: PathBuf,

    /// Only show candidates for this field (e.g. ANIO)
    #[arg(long)]
    field: Option<String>,

    /// Directory holding OCR sidecars for scanned PDFs
    #[arg(long)]
    ocr_dir: Option<PathBuf>,

    /// Print candidates as JSON
    #[arg(long)]
    json: bool,
}

pub async fn run(args: InspectArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let pipeline = Pipeline::from_config(&config)?;

    let field = match &args.field {
        Some(name) => Some(
            FieldName::from_str(name)
                .ok_or_else(|| anyhow::anyhow!("Unknown field: {}", name))?,
        ),
        None => None,
    };

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    let document = Document::load(&args.input, &config.pdf, args.ocr_dir.as_deref())?;
    let candidates: Vec<FieldCandidate> = pipeline
        .candidates(&document)
        .into_iter()
        .filter(|c| field.is_none_or(|f| c.field == f))
        .collect();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&candidates)?);
        return Ok(());
    }

    if candidates.is_empty() {
        println!("{} No candidates found", style("ℹ").blue());
        return Ok(());
    }

    let threshold = pipeline.assembler().acceptance_threshold();
    let mut current_page = None;
    for candidate in &candidates {
        let span = &candidate.source_span;
        if current_page != Some(span.page) {
            println!();
            println!(
                "{}",
                style(format!("Página {} ({})", span.page, span.source.as_str())).bold()
            );
            current_page = Some(span.page);
        }

        let confidence = format!("{:.2}", candidate.confidence);
        let confidence = if candidate.confidence >= threshold {
            style(confidence).green()
        } else {
            style(confidence).yellow()
        };
        println!(
            "  {:<17} {:<30} {} {:<26} [{}..{}] {:?}",
            candidate.field.as_str(),
            candidate.value.to_string(),
            confidence,
            candidate.rule_id,
            span.start,
            span.end,
            span.text
        );
    }

    Ok(())
}
