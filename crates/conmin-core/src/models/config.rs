//! Configuration structures for the extraction pipeline.
//!
//! Confidence weights, the acceptance threshold and the rule grammar are
//! calibration parameters, so all of them live here rather than in code.
//! A configuration is loaded once and then treated as immutable.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::concession::FieldName;
use crate::error::{ConfigError, Result};
use crate::extraction::ValueKind;

/// Main configuration for the conmin pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConminConfig {
    /// Field extraction and record assembly.
    pub extraction: ExtractionConfig,

    /// UTM coordinate block detection.
    pub coordinates: CoordinateConfig,

    /// Rule overrides and custom rules.
    pub rules: RuleConfig,

    /// PDF page loading.
    pub pdf: PdfConfig,
}

/// Extraction and assembly thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Minimum confidence for a field to be accepted (0.0 - 1.0).
    pub acceptance_threshold: f32,

    /// Multiplier applied to every candidate found on an OCR page.
    pub ocr_confidence_factor: f32,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            acceptance_threshold: 0.7,
            ocr_confidence_factor: 0.85,
        }
    }
}

/// Coordinate normalizer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinateConfig {
    /// Maximum distance (in characters) between Norte and Este anchors, and
    /// between the pair and its huso/datum.
    pub window: usize,

    /// Huso assumed when none is written next to the block.
    pub fallback_huso: u8,

    /// Confidence ceiling for blocks whose huso was defaulted. Must stay below
    /// the acceptance threshold.
    pub defaulted_huso_cap: f32,

    /// Confidence ceiling for blocks outside plausible Chilean ranges.
    pub malformed_cap: f32,
}

impl Default for CoordinateConfig {
    fn default() -> Self {
        Self {
            window: 200,
            fallback_huso: 19, // most common zone for northern Chile
            defaulted_huso_cap: 0.6,
            malformed_cap: 0.3,
        }
    }
}

/// Adjustments to the built-in rule set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleConfig {
    /// Base confidence per rule id.
    pub confidence_overrides: BTreeMap<String, f32>,

    /// Rule ids to skip.
    pub disabled: Vec<String>,

    /// Additional pattern rules, evaluated after the built-in ones.
    pub custom: Vec<CustomRule>,
}

/// A rule supplied through configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomRule {
    /// Unique rule id, reported on every candidate it produces.
    pub id: String,

    /// Field the rule fills.
    pub field: FieldName,

    /// Regex over folded text (lowercase, no accents). Capture group 1 is the value.
    pub pattern: String,

    /// Base confidence (0.0 - 1.0).
    pub confidence: f32,

    /// How to convert the captured text.
    pub value: ValueKind,

    /// Optional regex; a match in the text just before the hit discards it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub veto: Option<String>,
}

/// PDF loading configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PdfConfig {
    /// Pages with fewer non-whitespace characters are treated as scanned.
    pub min_text_length: usize,

    /// Suffix of the OCR sidecar file next to a PDF (`<name>.pdf` -> `<name><suffix>`).
    pub ocr_sidecar_suffix: String,
}

impl Default for PdfConfig {
    fn default() -> Self {
        Self {
            min_text_length: 20,
            ocr_sidecar_suffix: ".ocr.json".to_string(),
        }
    }
}

impl ConminConfig {
    /// Load configuration from a JSON file and validate it.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Check thresholds and weights. Rule ids and patterns are checked when the
    /// rule set is compiled.
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        check_unit("extraction.acceptance_threshold", self.extraction.acceptance_threshold)?;
        check_unit("extraction.ocr_confidence_factor", self.extraction.ocr_confidence_factor)?;
        check_unit("coordinates.defaulted_huso_cap", self.coordinates.defaulted_huso_cap)?;
        check_unit("coordinates.malformed_cap", self.coordinates.malformed_cap)?;

        if self.coordinates.defaulted_huso_cap >= self.extraction.acceptance_threshold {
            return Err(ConfigError::InvalidValue {
                key: "coordinates.defaulted_huso_cap".to_string(),
                reason: format!(
                    "must be below extraction.acceptance_threshold ({})",
                    self.extraction.acceptance_threshold
                ),
            });
        }

        if self.coordinates.window == 0 {
            return Err(ConfigError::InvalidValue {
                key: "coordinates.window".to_string(),
                reason: "must be positive".to_string(),
            });
        }

        if !(17..=19).contains(&self.coordinates.fallback_huso) {
            return Err(ConfigError::InvalidValue {
                key: "coordinates.fallback_huso".to_string(),
                reason: "continental Chile uses husos 17 to 19".to_string(),
            });
        }

        for (id, confidence) in &self.rules.confidence_overrides {
            check_unit(&format!("rules.confidence_overrides.{id}"), *confidence)?;
        }
        for rule in &self.rules.custom {
            check_unit(&format!("rules.custom.{}.confidence", rule.id), rule.confidence)?;
        }

        Ok(())
    }
}

fn check_unit(key: &str, value: f32) -> std::result::Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue {
            key: key.to_string(),
            reason: format!("{value} is outside 0.0 - 1.0"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(ConminConfig::default().validate().is_ok());
    }

    #[test]
    fn test_defaulted_huso_cap_must_stay_below_threshold() {
        let mut config = ConminConfig::default();
        config.coordinates.defaulted_huso_cap = 0.7;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { key, .. }) if key == "coordinates.defaulted_huso_cap"
        ));
    }

    #[test]
    fn test_rejects_out_of_range_weights() {
        let mut config = ConminConfig::default();
        config.rules.confidence_overrides.insert("rol.etiqueta".to_string(), 1.5);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: ConminConfig =
            serde_json::from_str(r#"{"extraction": {"acceptance_threshold": 0.8}}"#).unwrap();
        assert_eq!(config.extraction.acceptance_threshold, 0.8);
        assert_eq!(config.extraction.ocr_confidence_factor, 0.85);
        assert_eq!(config.coordinates.fallback_huso, 19);
    }

    #[test]
    fn test_custom_rule_deserialization() {
        let json = r#"{"rules": {"custom": [{
            "id": "rol.cabecera",
            "field": "ROL_NACIONAL",
            "pattern": "rol minero\\s+(\\d+-\\d)",
            "confidence": 0.8,
            "value": "identifier"
        }]}}"#;
        let config: ConminConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.rules.custom[0].field, FieldName::RolNacional);
        assert_eq!(config.rules.custom[0].value, ValueKind::Identifier);
    }
}
