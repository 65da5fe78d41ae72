//! Document pages in, one record out.

use std::time::Instant;

use tracing::{debug, info, warn};

use crate::assembler::RecordAssembler;
use crate::error::ConfigError;
use crate::extraction::FieldExtractor;
use crate::models::concession::{DocumentRecord, FieldCandidate};
use crate::models::config::ConminConfig;
use crate::models::document::Document;

/// Extraction plus assembly, configured once and shared across documents.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    extractor: FieldExtractor,
    assembler: RecordAssembler,
}

impl Pipeline {
    /// Pair an extractor with an assembler. A block with a defaulted huso must
    /// stay below the acceptance threshold, so the coordinate cap is checked
    /// against the assembler here as well as in [`ConminConfig::validate`].
    pub fn new(extractor: FieldExtractor, assembler: RecordAssembler) -> Result<Self, ConfigError> {
        let cap = extractor.coordinates().config().defaulted_huso_cap;
        let threshold = assembler.acceptance_threshold();
        if cap >= threshold {
            return Err(ConfigError::InvalidValue {
                key: "coordinates.defaulted_huso_cap".to_string(),
                reason: format!("{cap} must be below the acceptance threshold ({threshold})"),
            });
        }
        Ok(Self { extractor, assembler })
    }

    /// Validate the configuration and compile its rule set.
    pub fn from_config(config: &ConminConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Self::new(
            FieldExtractor::from_config(config)?,
            RecordAssembler::new(config.extraction.acceptance_threshold),
        )
    }

    pub fn extractor(&self) -> &FieldExtractor {
        &self.extractor
    }

    pub fn assembler(&self) -> &RecordAssembler {
        &self.assembler
    }

    /// Candidates from every page, in page order.
    pub fn candidates(&self, document: &Document) -> Vec<FieldCandidate> {
        let mut candidates = Vec::new();
        for page in &document.pages {
            if page.is_blank() {
                warn!("{}: page {} has no text", document.archivo, page.number);
                continue;
            }
            let found = self.extractor.extract_page(page);
            debug!(
                "{}: page {} ({}) gave {} candidates",
                document.archivo,
                page.number,
                page.source.as_str(),
                found.len()
            );
            candidates.extend(found);
        }
        candidates
    }

    /// Extract and assemble one document.
    pub fn process(&self, document: &Document) -> DocumentRecord {
        let start = Instant::now();

        let candidates = self.candidates(document);
        let mut record = self.assembler.assemble(&candidates, &document.archivo);
        record.page_sources = document
            .pages
            .iter()
            .map(|page| (page.number, page.source))
            .collect();

        info!(
            "{}: {} pages, {} candidates, {} flagged fields in {}ms",
            document.archivo,
            document.pages.len(),
            candidates.len(),
            record.flagged_fields().len(),
            start.elapsed().as_millis()
        );

        record
    }
}
