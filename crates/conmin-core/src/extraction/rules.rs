//! The ordered rule set.
//!
//! A rule binds one matcher to one field with a base confidence and a value
//! conversion. Built-in rules come first in a fixed order; configured custom
//! rules follow. The set is compiled once and never changes afterwards.

use std::collections::HashSet;

use regex::Regex;
use tracing::debug;

use super::patterns::*;
use super::values::ValueKind;
use crate::error::ConfigError;
use crate::models::concession::FieldName;
use crate::models::config::RuleConfig;

/// What a rule looks for.
#[derive(Debug, Clone)]
pub enum Matcher {
    /// Regex over folded text; group 1 (or the whole match) is the value.
    Pattern(Regex),
    /// UTM blocks found by the coordinate normalizer.
    Coordinates,
}

/// One named extraction rule.
#[derive(Debug, Clone)]
pub struct Rule {
    /// Stable audit id, e.g. `rol.etiqueta`.
    pub id: String,
    pub field: FieldName,
    pub matcher: Matcher,
    /// Confidence (0.0 - 1.0) given to every hit. For coordinate rules this is
    /// a ceiling on the normalizer's own score.
    pub base_confidence: f32,
    pub value: ValueKind,
    /// Discards a hit when it matches the text just before it.
    pub veto: Option<Regex>,
}

impl Rule {
    fn pattern(
        id: &str,
        field: FieldName,
        re: &Regex,
        base_confidence: f32,
        value: ValueKind,
    ) -> Self {
        Self {
            id: id.to_string(),
            field,
            matcher: Matcher::Pattern(re.clone()),
            base_confidence,
            value,
            veto: None,
        }
    }

    fn with_veto(mut self, veto: &Regex) -> Self {
        self.veto = Some(veto.clone());
        self
    }

    /// Short description of the matcher, for listings.
    pub fn matcher_description(&self) -> String {
        match &self.matcher {
            Matcher::Pattern(re) => re.as_str().to_string(),
            Matcher::Coordinates => "<coordinate normalizer>".to_string(),
        }
    }
}

/// Immutable, ordered collection of rules.
#[derive(Debug, Clone)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::builtin()
    }
}

impl RuleSet {
    /// The built-in rules, strongest label first within each field.
    pub fn builtin() -> Self {
        use FieldName::*;
        use ValueKind as V;

        let rules = vec![
            Rule::pattern("rol.etiqueta", RolNacional, &ROL_ETIQUETA, 0.95, V::Identifier),
            Rule::pattern("rol.abreviado", RolNacional, &ROL_ABREVIADO, 0.6, V::Identifier),
            Rule::pattern("nombre.etiqueta", NombreConcesion, &NOMBRE_ETIQUETA, 0.9, V::Text),
            Rule::pattern("nombre.comillas", NombreConcesion, &NOMBRE_COMILLAS, 0.85, V::Text),
            Rule::pattern("nombre.denominada", NombreConcesion, &NOMBRE_DENOMINADA, 0.55, V::Text),
            Rule::pattern("tipo.etiqueta", Tipo, &TIPO_ETIQUETA, 0.95, V::Tipo),
            Rule::pattern("tipo.concesion", Tipo, &TIPO_CONCESION, 0.9, V::Tipo),
            Rule::pattern("tipo.contexto", Tipo, &TIPO_CONTEXTO, 0.5, V::Tipo),
            Rule::pattern("superficie.decimal", SuperficieHa, &SUPERFICIE_DECIMAL, 0.9, V::HectaresDecimal),
            Rule::pattern(
                "superficie.frase_numeral",
                SuperficieHa,
                &SUPERFICIE_FRASE_NUMERAL,
                0.8,
                V::HectaresNumeral,
            ),
            Rule::pattern("superficie.suelta", SuperficieHa, &SUPERFICIE_SUELTA, 0.45, V::HectaresDecimal),
            Rule::pattern("fojas.etiqueta", Fojas, &FOJAS_ETIQUETA, 0.9, V::Integer),
            Rule::pattern("fojas.frase_numeral", Fojas, &FOJAS_FRASE_NUMERAL, 0.75, V::IntegerNumeral),
            Rule::pattern("fojas.abreviada", Fojas, &FOJAS_ABREVIADA, 0.6, V::Integer),
            Rule::pattern("numero.tras_fojas", Numero, &NUMERO_TRAS_FOJAS, 0.9, V::Integer),
            Rule::pattern("numero.etiqueta", Numero, &NUMERO_ETIQUETA, 0.55, V::Integer)
                .with_veto(&NUMERO_VETO_ROL),
            Rule::pattern("anio.tras_numero", Anio, &ANIO_TRAS_NUMERO, 0.9, V::Year),
            Rule::pattern("anio.etiqueta", Anio, &ANIO_ETIQUETA, 0.7, V::Year),
            Rule::pattern("anio.frase_numeral", Anio, &ANIO_FRASE_NUMERAL, 0.7, V::YearNumeral),
            Rule::pattern("anio.fecha", Anio, &ANIO_FECHA, 0.5, V::LongDate),
            Rule::pattern("conservador.minas", Conservador, &CONSERVADOR_MINAS, 0.9, V::Text),
            Rule::pattern(
                "conservador.bienes_raices",
                Conservador,
                &CONSERVADOR_BIENES_RAICES,
                0.7,
                V::Text,
            ),
            Rule::pattern("titular.etiqueta", Titular, &TITULAR_ETIQUETA, 0.85, V::Text),
            Rule::pattern("titular.contexto", Titular, &TITULAR_CONTEXTO, 0.5, V::Text),
            Rule {
                id: "coordenadas.utm".to_string(),
                field: Coordenadas,
                matcher: Matcher::Coordinates,
                base_confidence: 1.0,
                value: V::Text,
                veto: None,
            },
        ];

        Self { rules }
    }

    /// Built-in rules adjusted by configuration: custom rules appended,
    /// disabled ids removed, confidence overrides applied.
    pub fn from_config(config: &RuleConfig) -> Result<Self, ConfigError> {
        let mut rules = Self::builtin().rules;
        let mut ids: HashSet<String> = rules.iter().map(|r| r.id.clone()).collect();

        for custom in &config.custom {
            if !ids.insert(custom.id.clone()) {
                return Err(ConfigError::DuplicateRule(custom.id.clone()));
            }
            if custom.field.is_multi_valued() {
                return Err(ConfigError::InvalidValue {
                    key: format!("rules.custom.{}.field", custom.id),
                    reason: format!("{} is only produced by the coordinate normalizer", custom.field),
                });
            }

            let pattern = compile(&custom.id, &custom.pattern)?;
            let veto = custom
                .veto
                .as_deref()
                .map(|v| compile(&custom.id, v))
                .transpose()?;

            rules.push(Rule {
                id: custom.id.clone(),
                field: custom.field,
                matcher: Matcher::Pattern(pattern),
                base_confidence: custom.confidence,
                value: custom.value,
                veto,
            });
        }

        for id in config.disabled.iter().chain(config.confidence_overrides.keys()) {
            if !ids.contains(id) {
                return Err(ConfigError::UnknownRule(id.clone()));
            }
        }

        rules.retain(|rule| {
            let keep = !config.disabled.contains(&rule.id);
            if !keep {
                debug!("rule {} disabled", rule.id);
            }
            keep
        });

        for rule in &mut rules {
            if let Some(confidence) = config.confidence_overrides.get(&rule.id) {
                debug!("rule {} confidence {} -> {}", rule.id, rule.base_confidence, confidence);
                rule.base_confidence = *confidence;
            }
        }

        Ok(Self { rules })
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Rule> {
        self.rules.iter()
    }

    pub fn get(&self, id: &str) -> Option<&Rule> {
        self.rules.iter().find(|r| r.id == id)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

fn compile(rule_id: &str, pattern: &str) -> Result<Regex, ConfigError> {
    Regex::new(pattern).map_err(|source| ConfigError::InvalidPattern {
        rule_id: rule_id.to_string(),
        source,
    })
}
