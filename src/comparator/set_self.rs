//! Self-set cohesion.
//!
//! The worked definition nets out to the mean pairwise distance over a
//! target's `m*(m-1)/2` pairs, treating any pair absent from the store as
//! distance `1` (maximally dissimilar) and any stored value as `1 -
//! similarity`. Lower scores are more cohesive.

use crate::comparator::{CompareContext, ComparisonOutcome, Metric};
use crate::core::errors::{CoherenceError, Result};
use crate::domain::{Category, EntityIndex};
use crate::registry::IdentifierRegistry;

pub(super) fn compare(
    ctx: &CompareContext<'_>,
    ids: &[String],
    id_type: &str,
) -> Result<ComparisonOutcome> {
    let namespace = IdentifierRegistry::resolve_namespace(id_type)?;
    let domain = namespace.domain();
    let entities = ctx.registry.canonicalize_all(ids, namespace)?;
    if entities.is_empty() {
        return Err(CoherenceError::no_mapping(format!(
            "none of the {} supplied ids resolved to a known {domain} entity",
            ids.len()
        )));
    }

    let mut outcome = ComparisonOutcome::default();
    for &category in crate::domain::Category::all_for(domain) {
        ctx.check_cancelled()?;
        let score = cohesion_score(ctx, category, &entities);
        let missing = entities
            .iter()
            .filter(|&&e| !ctx.annotations.has_annotation(e, category))
            .count();
        let mapped_ids: Vec<String> = entities
            .iter()
            .filter(|&&e| ctx.annotations.has_annotation(e, category))
            .flat_map(|&e| ctx.registry.external_of(e, namespace))
            .collect();
        outcome.record(Metric::Cohesion, category, score);
        outcome.mapped_ids.insert(category, mapped_ids);
        outcome.missing_counts.insert(category, missing);
    }
    Ok(outcome)
}

fn cohesion_score(ctx: &CompareContext<'_>, category: Category, entities: &[EntityIndex]) -> f64 {
    let m = entities.len();
    if m <= 1 {
        return 0.0;
    }

    ctx.extender.extend(
        ctx.distances,
        ctx.annotations,
        category.domain(),
        ctx.coefficient,
        category,
        entities,
    );

    let mut sum_distance = 0.0;
    for i in 0..entities.len() {
        for j in (i + 1)..entities.len() {
            let similarity = ctx.distances.get(category, ctx.coefficient, entities[i], entities[j]);
            sum_distance += 1.0 - similarity;
        }
    }

    let pairs = (m * (m - 1)) as f64 / 2.0;
    sum_distance / pairs
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;
    use crate::annotation::{AnnotationStore, TermSet};
    use crate::comparator::Comparator;
    use crate::core::cancel::CancelToken;
    use crate::core::interning::StringInterner;
    use crate::distance::extender::DistanceExtender;
    use crate::distance::{Coefficient, SparseDistanceStore};
    use crate::domain::{GeneCategory, Namespace};

    fn terms(interner: &StringInterner, words: &[&str]) -> TermSet {
        TermSet::from_terms(words.iter().map(|w| interner.get_or_intern(w)))
    }

    #[test]
    fn matches_worked_example_for_three_entities() {
        let interner = StringInterner::new();
        let mut registry = IdentifierRegistry::new();
        let a = registry.intern(Namespace::Entrez, "1");
        let b = registry.intern(Namespace::Entrez, "2");
        let c = registry.intern(Namespace::Entrez, "3");

        let category = Category::Gene(GeneCategory::GoBiologicalProcess);
        let mut annotations = AnnotationStore::new();
        annotations.extend([
            (a, category, terms(&interner, &["x", "y"])),
            (b, category, terms(&interner, &["x", "y", "z"])),
            (c, category, TermSet::empty()),
        ]);

        let distances = SparseDistanceStore::new();
        let cancel = CancelToken::new();
        let ctx = CompareContext {
            registry: &registry,
            annotations: &annotations,
            distances: &distances,
            extender: DistanceExtender::default(),
            coefficient: Coefficient::Jaccard,
            threshold: 0.5,
            enriched: false,
            cancel: &cancel,
        };

        let outcome = Comparator::SetSelf
            .compare(
                &ctx,
                &crate::comparator::TargetInput::SingleSet {
                    ids: vec!["1".into(), "2".into(), "3".into()],
                    id_type: "entrez".into(),
                },
            )
            .unwrap();

        let score = outcome.scores[&Metric::Cohesion][&category];
        // jaccard(a,b)=2/3 -> d=1/3; c is unannotated so (a,c),(b,c) are absent -> d=1 each.
        // mean over 3 pairs = (1/3 + 1 + 1) / 3 = 7/9, matching the worked example's shape.
        assert_abs_diff_eq!(score, 7.0 / 9.0, epsilon = 1e-9);
        assert_eq!(outcome.missing_counts[&category], 1);
    }

    #[test]
    fn singleton_set_scores_zero() {
        let mut registry = IdentifierRegistry::new();
        registry.intern(Namespace::Entrez, "1");
        let annotations = AnnotationStore::new();
        let distances = SparseDistanceStore::new();
        let cancel = CancelToken::new();
        let ctx = CompareContext {
            registry: &registry,
            annotations: &annotations,
            distances: &distances,
            extender: DistanceExtender::default(),
            coefficient: Coefficient::Jaccard,
            threshold: 0.5,
            enriched: false,
            cancel: &cancel,
        };
        let outcome = Comparator::SetSelf
            .compare(
                &ctx,
                &crate::comparator::TargetInput::SingleSet {
                    ids: vec!["1".into()],
                    id_type: "entrez".into(),
                },
            )
            .unwrap();
        for (_, per_category) in outcome.scores {
            for (_, score) in per_category {
                assert_eq!(score, 0.0);
            }
        }
    }

    #[test]
    fn mapped_ids_excludes_unannotated_entities_per_category() {
        let interner = StringInterner::new();
        let mut registry = IdentifierRegistry::new();
        let a = registry.intern(Namespace::Entrez, "1");
        let b = registry.intern(Namespace::Entrez, "2");

        let annotated = Category::Gene(GeneCategory::GoBiologicalProcess);
        let unannotated = Category::Gene(GeneCategory::GoMolecularFunction);
        let mut annotations = AnnotationStore::new();
        annotations.extend([
            (a, annotated, terms(&interner, &["x", "y"])),
            (b, annotated, terms(&interner, &["x", "z"])),
        ]);

        let distances = SparseDistanceStore::new();
        let cancel = CancelToken::new();
        let ctx = CompareContext {
            registry: &registry,
            annotations: &annotations,
            distances: &distances,
            extender: DistanceExtender::default(),
            coefficient: Coefficient::Jaccard,
            threshold: 0.5,
            enriched: false,
            cancel: &cancel,
        };

        let outcome = Comparator::SetSelf
            .compare(
                &ctx,
                &crate::comparator::TargetInput::SingleSet {
                    ids: vec!["1".into(), "2".into()],
                    id_type: "entrez".into(),
                },
            )
            .unwrap();

        // Both entities are annotated for `annotated`, so both show up.
        let mut mapped = outcome.mapped_ids[&annotated].clone();
        mapped.sort();
        assert_eq!(mapped, vec!["1".to_string(), "2".to_string()]);

        // Neither entity has an annotation in `unannotated`: mapped_ids
        // must be empty and the score must report maximum dissimilarity.
        assert!(outcome.mapped_ids[&unannotated].is_empty());
        assert_eq!(outcome.missing_counts[&unannotated], 2);
        assert_abs_diff_eq!(outcome.scores[&Metric::Cohesion][&unannotated], 1.0, epsilon = 1e-9);
    }

    #[test]
    fn unmapped_set_is_no_mapping() {
        let registry = IdentifierRegistry::new();
        let annotations = AnnotationStore::new();
        let distances = SparseDistanceStore::new();
        let cancel = CancelToken::new();
        let ctx = CompareContext {
            registry: &registry,
            annotations: &annotations,
            distances: &distances,
            extender: DistanceExtender::default(),
            coefficient: Coefficient::Jaccard,
            threshold: 0.5,
            enriched: false,
            cancel: &cancel,
        };
        let err = Comparator::SetSelf
            .compare(
                &ctx,
                &crate::comparator::TargetInput::SingleSet {
                    ids: vec!["unknown".into()],
                    id_type: "entrez".into(),
                },
            )
            .unwrap_err();
        assert!(matches!(err, CoherenceError::NoMapping { .. }));
    }
}
