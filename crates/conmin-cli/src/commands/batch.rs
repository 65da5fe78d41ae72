//! Batch processing command for a folder of mining titles.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use clap::Args;
use console::style;
use futures_util::stream::{self, StreamExt};
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, error, warn};

use conmin_core::models::config::PdfConfig;
use conmin_core::{Document, DocumentRecord, ExportRow, Pipeline};

use super::process::{format_csv, format_record, OutputFormat};
use super::{is_supported_input, load_config};

/// Summary file names, without extension.
const SUMMARY_STEM: &str = "auditoria_resultados";
const ERRORS_FILE: &str = "auditoria_errores.csv";

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Input directory or glob pattern
    #[arg(required = true)]
    input: String,

    /// Output directory for the summary files
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// Also write one output file per document, in this format
    #[arg(short, long, value_enum)]
    format: Option<OutputFormat>,

    /// Directory holding OCR sidecars for scanned PDFs
    #[arg(long)]
    ocr_dir: Option<PathBuf>,

    /// Number of parallel workers
    #[arg(short = 'j', long, default_value = "4")]
    jobs: usize,

    /// Continue on error
    #[arg(long)]
    continue_on_error: bool,
}

/// Result of processing a single file.
struct ProcessResult {
    index: usize,
    path: PathBuf,
    record: Option<DocumentRecord>,
    error: Option<String>,
    processing_time_ms: u64,
}

#[derive(serde::Serialize)]
struct FailedFile<'a> {
    archivo: &'a str,
    error: &'a str,
}

pub async fn run(args: BatchArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let config = load_config(config_path)?;
    let pipeline = Arc::new(Pipeline::from_config(&config)?);
    let pdf_config = Arc::new(config.pdf.clone());

    let files = collect_inputs(&args.input, &config.pdf.ocr_sidecar_suffix)?;
    if files.is_empty() {
        anyhow::bail!("No matching files found for: {}", args.input);
    }

    println!(
        "{} Found {} files to process",
        style("ℹ").blue(),
        files.len()
    );

    fs::create_dir_all(&args.output_dir)?;

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files")?
            .progress_chars("=>-"),
    );

    let mut pending = stream::iter(files.into_iter().enumerate())
        .map(|(index, path)| {
            let pipeline = Arc::clone(&pipeline);
            let pdf_config = Arc::clone(&pdf_config);
            let ocr_dir = args.ocr_dir.clone();
            async move {
                let file_start = Instant::now();
                let task_path = path.clone();
                let outcome = tokio::task::spawn_blocking(move || {
                    process_single_file(&task_path, &pipeline, &pdf_config, ocr_dir.as_deref())
                })
                .await;

                let processing_time_ms = file_start.elapsed().as_millis() as u64;
                let (record, error) = match outcome {
                    Ok(Ok(record)) => (Some(record), None),
                    Ok(Err(e)) => (None, Some(e.to_string())),
                    Err(e) => (None, Some(format!("worker failed: {e}"))),
                };
                ProcessResult {
                    index,
                    path,
                    record,
                    error,
                    processing_time_ms,
                }
            }
        })
        .buffer_unordered(args.jobs.max(1));

    let mut results = Vec::new();
    while let Some(result) = pending.next().await {
        pb.inc(1);
        if let Some(error_msg) = &result.error {
            if args.continue_on_error {
                warn!("Failed to process {}: {}", result.path.display(), error_msg);
            } else {
                error!("Failed to process {}: {}", result.path.display(), error_msg);
                pb.abandon();
                anyhow::bail!("Processing failed for {}: {}", result.path.display(), error_msg);
            }
        } else {
            debug!(
                "Processed {} in {}ms",
                result.path.display(),
                result.processing_time_ms
            );
        }
        results.push(result);
    }

    pb.finish_with_message("Complete");

    // Workers finish out of order
    results.sort_by_key(|r| r.index);

    let successful: Vec<_> = results.iter().filter(|r| r.record.is_some()).collect();
    let failed: Vec<_> = results.iter().filter(|r| r.error.is_some()).collect();

    if let Some(format) = args.format {
        for result in &successful {
            if let Some(record) = &result.record {
                let output_path = args.output_dir.join(output_name(&result.path, format));
                fs::write(&output_path, format_record(record, format)?)?;
                debug!("Wrote output to {}", output_path.display());
            }
        }
    }

    let rows: Vec<ExportRow> = successful
        .iter()
        .filter_map(|r| r.record.as_ref())
        .map(ExportRow::from_record)
        .collect();

    if rows.is_empty() {
        warn!("No records to export");
    } else {
        let (csv_path, json_path) = write_summary(&args.output_dir, &rows)?;
        println!(
            "{} Results written to {} and {}",
            style("✓").green(),
            csv_path.display(),
            json_path.display()
        );
    }

    if !failed.is_empty() {
        let errors_path = args.output_dir.join(ERRORS_FILE);
        write_failures(&errors_path, &failed)?;
    }

    println!();
    println!(
        "{} Processed {} files in {:?}",
        style("✓").green(),
        results.len(),
        start.elapsed()
    );
    println!(
        "   {} successful, {} failed",
        style(successful.len()).green(),
        style(failed.len()).red()
    );

    let flagged: usize = successful
        .iter()
        .filter_map(|r| r.record.as_ref())
        .filter(|record| !record.flagged_fields().is_empty())
        .count();
    if flagged > 0 {
        println!(
            "   {} documents have fields needing review",
            style(flagged).yellow()
        );
    }

    if !failed.is_empty() {
        println!();
        println!("{}", style("Failed files:").red());
        for result in &failed {
            println!(
                "  - {}: {}",
                result.path.display(),
                result.error.as_deref().unwrap_or("unknown error")
            );
        }
    }

    Ok(())
}

/// Expand a directory or glob pattern into supported inputs, skipping OCR
/// sidecars. Sorted, so batch output order does not depend on the filesystem.
fn collect_inputs(input: &str, sidecar_suffix: &str) -> anyhow::Result<Vec<PathBuf>> {
    let pattern = if Path::new(input).is_dir() {
        Path::new(input).join("*").to_string_lossy().into_owned()
    } else {
        input.to_string()
    };

    let mut files: Vec<PathBuf> = glob(&pattern)?
        .filter_map(|r| r.ok())
        .filter(|p| p.is_file() && is_supported_input(p))
        .filter(|p| {
            let name = p.file_name().and_then(|n| n.to_str()).unwrap_or("");
            !name.ends_with(sidecar_suffix) && !is_batch_output(name)
        })
        .collect();
    files.sort();
    Ok(files)
}

/// Files a previous run may have left in the input directory: the summaries,
/// the error report, and per-document outputs such as `a.pdf.json`.
fn is_batch_output(name: &str) -> bool {
    let summary = name
        .strip_prefix(SUMMARY_STEM)
        .is_some_and(|ext| ext == ".csv" || ext == ".json");
    let per_document = Path::new(name)
        .file_stem()
        .is_some_and(|stem| is_supported_input(Path::new(stem)));
    name == ERRORS_FILE || summary || per_document
}

/// Per-document output file name. The input's own extension is kept so
/// `a.pdf` and `a.txt` do not overwrite each other.
fn output_name(path: &Path, format: OutputFormat) -> String {
    let name = path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("documento");
    format!("{}.{}", name, format.extension())
}

fn process_single_file(
    path: &Path,
    pipeline: &Pipeline,
    pdf_config: &PdfConfig,
    ocr_dir: Option<&Path>,
) -> anyhow::Result<DocumentRecord> {
    let document = Document::load(path, pdf_config, ocr_dir)?;
    if document.pages.iter().all(|p| p.is_blank()) {
        anyhow::bail!("No text could be read");
    }
    Ok(pipeline.process(&document))
}

/// Write `auditoria_resultados.csv` and `auditoria_resultados.json`.
fn write_summary(output_dir: &Path, rows: &[ExportRow]) -> anyhow::Result<(PathBuf, PathBuf)> {
    let csv_path = output_dir.join(format!("{SUMMARY_STEM}.csv"));
    fs::write(&csv_path, format_csv(rows)?)?;

    let json_path = output_dir.join(format!("{SUMMARY_STEM}.json"));
    fs::write(&json_path, serde_json::to_string_pretty(rows)?)?;

    Ok((csv_path, json_path))
}

fn write_failures(path: &Path, failed: &[&ProcessResult]) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    for result in failed {
        let archivo = result
            .path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("");
        wtr.serialize(FailedFile {
            archivo,
            error: result.error.as_deref().unwrap_or(""),
        })?;
    }
    wtr.flush()?;
    Ok(())
}
