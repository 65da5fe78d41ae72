//! Rules command - list the active extraction rules.

use clap::Args;
use console::style;
use serde::Serialize;

use conmin_core::{FieldName, Pipeline, Rule};

use super::load_config;

/// Arguments for the rules command.
#[derive(Args)]
pub struct RulesArgs {
    /// Only list rules for this field (e.g. FOJAS)
    #[arg(long)]
    field: Option<String>,

    /// Include the match patterns
    #[arg(long)]
    patterns: bool,

    /// Print rules as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct RuleListing<'a> {
    id: &'a str,
    field: FieldName,
    base_confidence: f32,
    matcher: String,
}

impl<'a> From<&'a Rule> for RuleListing<'a> {
    fn from(rule: &'a Rule) -> Self {
        Self {
            id: &rule.id,
            field: rule.field,
            base_confidence: rule.base_confidence,
            matcher: rule.matcher_description(),
        }
    }
}

pub async fn run(args: RulesArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let pipeline = Pipeline::from_config(&config)?;

    let field = match &args.field {
        Some(name) => Some(
            FieldName::from_str(name).ok_or_else(|| anyhow::anyhow!("Unknown field: {}", name))?,
        ),
        None => None,
    };

    let listings: Vec<RuleListing> = pipeline
        .extractor()
        .rules()
        .iter()
        .filter(|rule| field.is_none_or(|f| rule.field == f))
        .map(RuleListing::from)
        .collect();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&listings)?);
        return Ok(());
    }

    println!("{}", style("Active rules").bold());
    println!();

    let threshold = pipeline.assembler().acceptance_threshold();
    for listing in &listings {
        let marker = if listing.base_confidence >= threshold {
            style("●").green()
        } else {
            style("○").yellow()
        };
        println!(
            "  {} {:<26} {:<17} {:.2}",
            marker,
            listing.id,
            listing.field.as_str(),
            listing.base_confidence
        );
        if args.patterns {
            println!("      {}", style(&listing.matcher).dim());
        }
    }

    println!();
    println!(
        "{} rules, acceptance threshold {:.2}",
        listings.len(),
        threshold
    );
    println!("{}", style("○ cannot be accepted on its own").dim());

    Ok(())
}
