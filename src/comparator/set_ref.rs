//! Set-vs-set match fraction.

use std::collections::HashMap;

use crate::annotation::TermSet;
use crate::comparator::enrichment::restrict_to_enriched;
use crate::comparator::{CompareContext, ComparisonOutcome, Metric};
use crate::core::errors::{CoherenceError, Result};
use crate::domain::{Category, EntityIndex};
use crate::registry::IdentifierRegistry;

pub(super) fn compare(
    ctx: &CompareContext<'_>,
    ref_ids: &[String],
    ref_id_type: &str,
    tar_ids: &[String],
    tar_id_type: &str,
    enriched: bool,
) -> Result<ComparisonOutcome> {
    let ref_namespace = IdentifierRegistry::resolve_namespace(ref_id_type)?;
    let tar_namespace = IdentifierRegistry::resolve_namespace(tar_id_type)?;
    if ref_namespace.domain() != tar_namespace.domain() {
        return Err(CoherenceError::unsupported_cross_domain(
            ref_namespace.domain(),
            tar_namespace.domain(),
        ));
    }
    let domain = ref_namespace.domain();

    let ref_entities = ctx.registry.canonicalize_all(ref_ids, ref_namespace)?;
    let tar_entities = ctx.registry.canonicalize_all(tar_ids, tar_namespace)?;
    if ref_entities.is_empty() || tar_entities.is_empty() {
        return Err(CoherenceError::no_mapping(
            "neither the reference nor the target set may be empty after canonicalization",
        ));
    }

    let mapped_ids: Vec<String> = tar_entities
        .iter()
        .flat_map(|&e| ctx.registry.external_of(e, tar_namespace))
        .collect();

    let mut outcome = ComparisonOutcome::default();
    for &category in Category::all_for(domain) {
        ctx.check_cancelled()?;
        let score = match_fraction(ctx, category, &ref_entities, &tar_entities, enriched);
        let missing = tar_entities
            .iter()
            .filter(|&&e| !ctx.annotations.has_annotation(e, category))
            .count();
        outcome.record(Metric::MatchFraction, category, score);
        outcome.mapped_ids.insert(category, mapped_ids.clone());
        outcome.missing_counts.insert(category, missing);
    }
    Ok(outcome)
}

/// Build `⋃_r terms(r, category)`, optionally restricted to the
/// over-represented subset, and score every target entity's similarity to
/// it against `ctx.threshold`.
pub(super) fn match_fraction(
    ctx: &CompareContext<'_>,
    category: Category,
    ref_entities: &[EntityIndex],
    tar_entities: &[EntityIndex],
    enriched: bool,
) -> f64 {
    let mut union_terms: HashMap<_, ()> = HashMap::new();
    for &r in ref_entities {
        for term in ctx.annotations.get_terms(r, category).iter() {
            union_terms.insert(term, ());
        }
    }
    let ref_terms = TermSet::from_terms(union_terms.into_keys());
    let ref_terms = if enriched {
        restrict_to_enriched(ctx.annotations, category, ref_entities, &ref_terms)
    } else {
        ref_terms
    };

    if tar_entities.is_empty() {
        return 0.0;
    }
    let hits = tar_entities
        .iter()
        .filter(|&&t| {
            let target_terms = ctx.annotations.get_terms(t, category);
            if target_terms.is_empty() {
                return false;
            }
            ctx.coefficient.evaluate(&target_terms, &ref_terms) > ctx.threshold
        })
        .count();
    hits as f64 / tar_entities.len() as f64
}
