//! Id-vs-set match fraction, including the two defined cross-domain
//! pathway substitutions.

use crate::annotation::TermSet;
use crate::comparator::set_ref::match_fraction;
use crate::comparator::{CompareContext, ComparisonOutcome, Metric};
use crate::core::errors::{CoherenceError, Result};
use crate::domain::{Category, Domain, DiseaseCategory, GeneCategory};
use crate::registry::IdentifierRegistry;

pub(super) fn compare(
    ctx: &CompareContext<'_>,
    ref_id: &str,
    ref_id_type: &str,
    tar_ids: &[String],
    tar_id_type: &str,
) -> Result<ComparisonOutcome> {
    let ref_namespace = IdentifierRegistry::resolve_namespace(ref_id_type)?;
    let tar_namespace = IdentifierRegistry::resolve_namespace(tar_id_type)?;

    let ref_entities = ctx.registry.canonicalize(ref_id, ref_namespace)?;
    if ref_entities.is_empty() {
        return Err(CoherenceError::no_mapping(format!(
            "reference id {ref_id} did not resolve to a known entity"
        )));
    }
    let tar_entities = ctx.registry.canonicalize_all(tar_ids, tar_namespace)?;
    if tar_entities.is_empty() {
        return Err(CoherenceError::no_mapping(
            "none of the supplied target ids resolved to a known entity",
        ));
    }

    let mapped_ids: Vec<String> = tar_entities
        .iter()
        .flat_map(|&e| ctx.registry.external_of(e, tar_namespace))
        .collect();

    let mut outcome = ComparisonOutcome::default();

    if ref_namespace.domain() == tar_namespace.domain() {
        let domain = ref_namespace.domain();
        for &category in Category::all_for(domain) {
            ctx.check_cancelled()?;
            let score = match_fraction(ctx, category, &ref_entities, &tar_entities, false);
            let missing = tar_entities
                .iter()
                .filter(|&&e| !ctx.annotations.has_annotation(e, category))
                .count();
            outcome.record(Metric::MatchFraction, category, score);
            outcome.mapped_ids.insert(category, mapped_ids.clone());
            outcome.missing_counts.insert(category, missing);
        }
        return Ok(outcome);
    }

    let (ref_category, tar_category) = match (ref_namespace.domain(), tar_namespace.domain()) {
        (Domain::Disease, Domain::Gene) => (
            Category::Disease(DiseaseCategory::RelatedPathways),
            Category::Gene(GeneCategory::PathwayKegg),
        ),
        (Domain::Gene, Domain::Disease) => (
            Category::Gene(GeneCategory::PathwayKegg),
            Category::Disease(DiseaseCategory::RelatedPathways),
        ),
        _ => {
            return Err(CoherenceError::unsupported_cross_domain(
                ref_namespace.domain(),
                tar_namespace.domain(),
            ))
        }
    };

    ctx.check_cancelled()?;
    let mut ref_terms = TermSet::empty();
    for &r in &ref_entities {
        let terms = ctx.annotations.get_terms(r, ref_category);
        ref_terms = TermSet::from_terms(ref_terms.iter().chain(terms.iter()));
    }

    let hits = tar_entities
        .iter()
        .filter(|&&t| {
            let target_terms = ctx.annotations.get_terms(t, tar_category);
            !target_terms.is_empty() && ctx.coefficient.evaluate(&target_terms, &ref_terms) > ctx.threshold
        })
        .count();
    let score = hits as f64 / tar_entities.len() as f64;
    let missing = tar_entities
        .iter()
        .filter(|&&e| !ctx.annotations.has_annotation(e, tar_category))
        .count();

    outcome.record(Metric::MatchFraction, tar_category, score);
    outcome.mapped_ids.insert(tar_category, mapped_ids);
    outcome.missing_counts.insert(tar_category, missing);
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::AnnotationStore;
    use crate::comparator::Comparator;
    use crate::core::cancel::CancelToken;
    use crate::core::interning::StringInterner;
    use crate::distance::extender::DistanceExtender;
    use crate::distance::{Coefficient, SparseDistanceStore};
    use crate::domain::Namespace;

    fn terms(interner: &StringInterner, words: &[&str]) -> TermSet {
        TermSet::from_terms(words.iter().map(|w| interner.get_or_intern(w)))
    }

    #[test]
    fn disease_reference_substitutes_pathway_kegg_for_gene_target() {
        let interner = StringInterner::new();
        let mut registry = IdentifierRegistry::new();
        let disease = registry.intern(Namespace::Mondo, "0001");
        let gene_hit = registry.intern(Namespace::Entrez, "1");
        let gene_miss = registry.intern(Namespace::Entrez, "2");

        let mut annotations = AnnotationStore::new();
        annotations.extend([
            (
                disease,
                Category::Disease(DiseaseCategory::RelatedPathways),
                terms(&interner, &["hsa:04110"]),
            ),
            (
                gene_hit,
                Category::Gene(GeneCategory::PathwayKegg),
                terms(&interner, &["hsa:04110"]),
            ),
            (
                gene_miss,
                Category::Gene(GeneCategory::PathwayKegg),
                terms(&interner, &["hsa:00010"]),
            ),
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

        let outcome = Comparator::IdRef
            .compare(
                &ctx,
                &crate::comparator::TargetInput::IdRef {
                    ref_id: "0001".into(),
                    ref_id_type: "mondo".into(),
                    tar_ids: vec!["1".into(), "2".into()],
                    tar_id_type: "entrez".into(),
                },
            )
            .unwrap();

        let category = Category::Gene(GeneCategory::PathwayKegg);
        assert_eq!(outcome.scores[&Metric::MatchFraction][&category], 0.5);
    }

    #[test]
    fn unknown_reference_id_is_no_mapping() {
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
        let err = Comparator::IdRef
            .compare(
                &ctx,
                &crate::comparator::TargetInput::IdRef {
                    ref_id: "missing".into(),
                    ref_id_type: "entrez".into(),
                    tar_ids: vec!["1".into()],
                    tar_id_type: "entrez".into(),
                },
            )
            .unwrap_err();
        assert!(matches!(err, CoherenceError::NoMapping { .. }));
    }
}
