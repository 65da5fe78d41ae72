//! Merges field candidates into one record per document.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use tracing::debug;

use crate::models::concession::{
    DocumentRecord, FieldCandidate, FieldName, FieldSlot, FieldStatus,
};

/// Picks one value per field (all distinct blocks for COORDENADAS) and flags
/// fields that need review.
#[derive(Debug, Clone)]
pub struct RecordAssembler {
    acceptance_threshold: f32,
}

impl Default for RecordAssembler {
    fn default() -> Self {
        Self::new(0.7)
    }
}

impl RecordAssembler {
    /// Values at or above `acceptance_threshold` are accepted. Pairing with the
    /// coordinate caps is checked by [`crate::Pipeline::new`].
    pub fn new(acceptance_threshold: f32) -> Self {
        Self { acceptance_threshold }
    }

    pub fn acceptance_threshold(&self) -> f32 {
        self.acceptance_threshold
    }

    /// Build the record. The result does not depend on candidate order.
    pub fn assemble(&self, candidates: &[FieldCandidate], document_id: &str) -> DocumentRecord {
        let mut by_field: BTreeMap<FieldName, Vec<&FieldCandidate>> = BTreeMap::new();
        for candidate in candidates {
            by_field.entry(candidate.field).or_default().push(candidate);
        }

        let mut record = DocumentRecord::empty(document_id);
        for (field, mut group) in by_field {
            group.sort_by(|a, b| rank(a, b));

            let slot = if field.is_multi_valued() {
                self.multi_valued(&group)
            } else {
                self.single_valued(field, &group)
            };
            record.fields.insert(field, slot);
        }

        record
    }

    fn status(&self, confidence: f32) -> FieldStatus {
        if confidence >= self.acceptance_threshold {
            FieldStatus::Accepted
        } else {
            FieldStatus::LowConfidence
        }
    }

    /// `ranked` is non-empty and sorted by [`rank`].
    fn single_valued(&self, field: FieldName, ranked: &[&FieldCandidate]) -> FieldSlot {
        let top = ranked[0];
        let top_key = top.value.comparison_key();

        let mut rule_ids: Vec<String> = Vec::new();
        for candidate in ranked.iter().filter(|c| c.value.comparison_key() == top_key) {
            if !rule_ids.contains(&candidate.rule_id) {
                rule_ids.push(candidate.rule_id.clone());
            }
        }

        let runner_up = ranked
            .iter()
            .find(|c| c.value.comparison_key() != top_key)
            .copied();

        let mut slot = FieldSlot {
            values: vec![top.value.clone()],
            confidence: top.confidence,
            status: self.status(top.confidence),
            rule_ids,
            spans: vec![top.source_span.clone()],
            runner_up: None,
        };

        if let Some(second) = runner_up {
            if top.confidence >= self.acceptance_threshold
                && second.confidence >= self.acceptance_threshold
            {
                debug!(
                    "{} ambiguous: {} ({}) vs {} ({})",
                    field, top.value, top.confidence, second.value, second.confidence
                );
                slot.status = FieldStatus::Ambiguous;
                slot.confidence = second.confidence;
                slot.runner_up = Some(second.value.clone());
            }
        }

        slot
    }

    fn multi_valued(&self, ranked: &[&FieldCandidate]) -> FieldSlot {
        // `ranked` is best-first, so the first occurrence of each block wins
        let mut kept: Vec<&FieldCandidate> = Vec::new();
        for &candidate in ranked {
            let duplicate = kept.iter().any(|k| same_block(k, candidate));
            if !duplicate {
                kept.push(candidate);
            }
        }

        kept.sort_by(|a, b| {
            a.source_span
                .page
                .cmp(&b.source_span.page)
                .then(a.source_span.start.cmp(&b.source_span.start))
                .then_with(|| rank(a, b))
        });

        let confidence = kept
            .iter()
            .map(|c| c.confidence)
            .fold(f32::INFINITY, f32::min);

        let mut rule_ids: Vec<String> = Vec::new();
        for candidate in &kept {
            if !rule_ids.contains(&candidate.rule_id) {
                rule_ids.push(candidate.rule_id.clone());
            }
        }

        FieldSlot {
            values: kept.iter().map(|c| c.value.clone()).collect(),
            confidence,
            status: self.status(confidence),
            rule_ids,
            spans: kept.iter().map(|c| c.source_span.clone()).collect(),
            runner_up: None,
        }
    }
}

fn same_block(a: &FieldCandidate, b: &FieldCandidate) -> bool {
    match (a.value.as_coordinates(), b.value.as_coordinates()) {
        (Some(x), Some(y)) => x.key() == y.key(),
        _ => a.value.comparison_key() == b.value.comparison_key(),
    }
}

/// Total order over candidates: confidence desc, page asc, offset asc, then
/// rule id and value so equal-scored candidates never depend on input order.
fn rank(a: &FieldCandidate, b: &FieldCandidate) -> Ordering {
    b.confidence
        .total_cmp(&a.confidence)
        .then(a.source_span.page.cmp(&b.source_span.page))
        .then(a.source_span.start.cmp(&b.source_span.start))
        .then_with(|| a.rule_id.cmp(&b.rule_id))
        .then_with(|| a.value.comparison_key().cmp(&b.value.comparison_key()))
        .then_with(|| a.value.to_string().cmp(&b.value.to_string()))
        .then(a.source_span.end.cmp(&b.source_span.end))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::concession::{CoordinateBlock, Datum, FieldValue, RawSpan, TextSource};
    use pretty_assertions::assert_eq;

    pub(super) fn candidate(
        field: FieldName,
        value: FieldValue,
        confidence: f32,
        page: u32,
        start: usize,
        rule_id: &str,
    ) -> FieldCandidate {
        FieldCandidate {
            field,
            value,
            source_span: RawSpan {
                page,
                start,
                end: start + 4,
                text: "....".to_string(),
                source: TextSource::TextLayer,
            },
            confidence,
            rule_id: rule_id.to_string(),
        }
    }

    fn block(norte: u64, este: u64) -> FieldValue {
        FieldValue::Coordinates(CoordinateBlock::new(norte, este, 19, Datum::Unknown))
    }

    #[test]
    fn test_every_field_has_a_slot() {
        let record = RecordAssembler::default().assemble(&[], "vacio.pdf");
        assert_eq!(record.fields.len(), FieldName::ALL.len());
        assert!(record
            .fields
            .values()
            .all(|slot| slot.status == FieldStatus::Absent && slot.confidence == 0.0));
    }

    #[test]
    fn test_conflicting_years_are_ambiguous() {
        let candidates = vec![
            candidate(FieldName::Anio, FieldValue::Integer(1999), 0.85, 2, 10, "anio.etiqueta"),
            candidate(FieldName::Anio, FieldValue::Integer(1998), 0.9, 1, 40, "anio.tras_numero"),
        ];
        let record = RecordAssembler::new(0.7).assemble(&candidates, "doc");
        let slot = record.slot(FieldName::Anio);

        assert_eq!(slot.value(), Some(&FieldValue::Integer(1998)));
        assert_eq!(slot.status, FieldStatus::Ambiguous);
        assert_eq!(slot.confidence, 0.85);
        assert_eq!(slot.runner_up, Some(FieldValue::Integer(1999)));
    }

    #[test]
    fn test_weak_disagreement_is_not_ambiguous() {
        let candidates = vec![
            candidate(FieldName::Anio, FieldValue::Integer(1998), 0.9, 1, 0, "anio.tras_numero"),
            candidate(FieldName::Anio, FieldValue::Integer(2001), 0.5, 1, 80, "anio.fecha"),
        ];
        let slot = RecordAssembler::new(0.7).assemble(&candidates, "doc").slot(FieldName::Anio).clone();

        assert_eq!(slot.status, FieldStatus::Accepted);
        assert_eq!(slot.confidence, 0.9);
    }

    #[test]
    fn test_agreeing_candidates_merge_rule_ids() {
        let candidates = vec![
            candidate(FieldName::Fojas, FieldValue::Integer(123), 0.9, 1, 5, "fojas.etiqueta"),
            candidate(FieldName::Fojas, FieldValue::Integer(123), 0.6, 1, 5, "fojas.abreviada"),
        ];
        let slot = RecordAssembler::default().assemble(&candidates, "doc").slot(FieldName::Fojas).clone();

        assert_eq!(slot.status, FieldStatus::Accepted);
        assert_eq!(slot.rule_ids, vec!["fojas.etiqueta".to_string(), "fojas.abreviada".to_string()]);
    }

    #[test]
    fn test_ties_prefer_earliest_page_then_offset() {
        let candidates = vec![
            candidate(FieldName::Titular, FieldValue::Text("B".into()), 0.5, 2, 0, "titular.contexto"),
            candidate(FieldName::Titular, FieldValue::Text("A".into()), 0.5, 1, 90, "titular.contexto"),
            candidate(FieldName::Titular, FieldValue::Text("C".into()), 0.5, 1, 30, "titular.contexto"),
        ];
        let slot = RecordAssembler::default().assemble(&candidates, "doc").slot(FieldName::Titular).clone();

        assert_eq!(slot.value(), Some(&FieldValue::Text("C".into())));
        assert_eq!(slot.status, FieldStatus::LowConfidence);
    }

    #[test]
    fn test_coordinates_are_deduplicated_in_document_order() {
        let candidates = vec![
            candidate(FieldName::Coordenadas, block(6_346_000, 345_000), 0.9, 1, 80, "coordenadas.utm"),
            candidate(FieldName::Coordenadas, block(6_345_000, 345_000), 0.75, 2, 0, "coordenadas.utm"),
            candidate(FieldName::Coordenadas, block(6_345_000, 345_000), 0.95, 1, 10, "coordenadas.utm"),
        ];
        let record = RecordAssembler::default().assemble(&candidates, "doc");
        let slot = record.slot(FieldName::Coordenadas);

        let norths: Vec<u64> = record.coordinates().iter().map(|b| b.norte).collect();
        assert_eq!(norths, vec![6_345_000, 6_346_000]);
        assert_eq!(slot.spans[0].page, 1);
        assert_eq!(slot.confidence, 0.9);
        assert_eq!(slot.status, FieldStatus::Accepted);
    }
}

#[cfg(test)]
mod proptests {
    use super::tests::candidate;
    use super::*;
    use crate::models::concession::FieldValue;
    use proptest::prelude::*;

    fn arb_candidate() -> impl Strategy<Value = FieldCandidate> {
        (
            prop::sample::select(vec![FieldName::Anio, FieldName::Fojas, FieldName::Titular]),
            0u64..4,
            0u8..=20,
            1u32..=3,
            0usize..50,
            prop::sample::select(vec!["r.a", "r.b", "r.c"]),
        )
            .prop_map(|(field, value, score, page, start, rule)| {
                let value = match field {
                    FieldName::Titular => FieldValue::Text(format!("titular {value}")),
                    _ => FieldValue::Integer(1990 + value),
                };
                candidate(field, value, f32::from(score) / 20.0, page, start, rule)
            })
    }

    proptest! {
        /// Property: shuffling the candidates never changes the record
        #[test]
        fn test_assembly_is_order_independent(
            (original, shuffled) in prop::collection::vec(arb_candidate(), 0..16)
                .prop_flat_map(|v| (Just(v.clone()), Just(v).prop_shuffle()))
        ) {
            let assembler = RecordAssembler::new(0.7);
            prop_assert_eq!(
                assembler.assemble(&original, "doc"),
                assembler.assemble(&shuffled, "doc")
            );
        }

        /// Property: an ambiguous slot reports the best confidence among values
        /// other than the chosen one, and names that value as the runner-up
        #[test]
        fn test_ambiguous_confidence_is_runner_up(
            candidates in prop::collection::vec(arb_candidate(), 1..16)
        ) {
            let record = RecordAssembler::new(0.7).assemble(&candidates, "doc");
            for (field, slot) in &record.fields {
                if slot.status != FieldStatus::Ambiguous {
                    continue;
                }
                let chosen = slot.values[0].comparison_key();
                let competing: Vec<&FieldCandidate> = candidates
                    .iter()
                    .filter(|c| c.field == *field && c.value.comparison_key() != chosen)
                    .collect();
                let best = competing
                    .iter()
                    .map(|c| c.confidence)
                    .fold(f32::NEG_INFINITY, f32::max);

                prop_assert!(best >= 0.7);
                prop_assert_eq!(slot.confidence, best);

                let runner_up = slot.runner_up.as_ref().map(FieldValue::comparison_key);
                prop_assert!(competing
                    .iter()
                    .any(|c| c.confidence == best && Some(c.value.comparison_key()) == runner_up));
            }
        }
    }
}
