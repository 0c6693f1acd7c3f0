//! Over-representation restriction for `SetRef`/`IdRef`'s `enriched` flag.
//!
//! A full over-representation test against a third-party ontology-enrichment
//! service is out of scope for this engine (external collaborator). This
//! module implements the restriction locally with a one-sided hypergeometric
//! test: a reference term is kept when it is significantly enriched in `R`
//! versus the full annotated population for the category, computed from
//! `statrs`'s log-gamma rather than a hosted distribution type so the tail
//! sum is explicit and auditable.

use std::collections::HashMap;

use statrs::function::gamma::ln_gamma;

use crate::annotation::{AnnotationStore, TermSet};
use crate::core::interning::InternedString;
use crate::domain::{Category, EntityIndex};

/// Reference entities are kept significant at this one-sided p-value.
const SIGNIFICANCE_ALPHA: f64 = 0.05;

/// Restrict `ref_terms` to the subset significantly over-represented among
/// `ref_entities` relative to every entity annotated for `category`.
pub(super) fn restrict_to_enriched(
    annotations: &AnnotationStore,
    category: Category,
    ref_entities: &[EntityIndex],
    ref_terms: &TermSet,
) -> TermSet {
    if ref_entities.is_empty() || ref_terms.is_empty() {
        return TermSet::empty();
    }

    let population: Vec<(EntityIndex, &TermSet)> = annotations.iter_all(category).collect();
    let total_population = population.len() as u64;
    if total_population == 0 {
        return TermSet::empty();
    }
    let sample_size = ref_entities.len() as u64;

    let mut term_population_count: HashMap<InternedString, u64> = HashMap::new();
    for (_, terms) in &population {
        for term in ref_terms.iter() {
            if terms.contains(term) {
                *term_population_count.entry(term).or_insert(0) += 1;
            }
        }
    }

    let ref_terms_by_entity: Vec<TermSet> = ref_entities
        .iter()
        .map(|&e| annotations.get_terms(e, category))
        .collect();

    let kept = ref_terms.iter().filter(|&term| {
        let successes_in_population = *term_population_count.get(&term).unwrap_or(&0);
        if successes_in_population == 0 {
            return false;
        }
        let successes_in_sample = ref_terms_by_entity
            .iter()
            .filter(|terms| terms.contains(term))
            .count() as u64;
        if successes_in_sample == 0 {
            return false;
        }
        let p = hypergeometric_sf(
            total_population,
            successes_in_population,
            sample_size,
            successes_in_sample,
        );
        p < SIGNIFICANCE_ALPHA
    });

    TermSet::from_terms(kept)
}

/// `P(X >= observed)` for `X ~ Hypergeometric(population, successes, draws)`,
/// computed as a direct tail sum over log-space combinations.
fn hypergeometric_sf(population: u64, successes: u64, draws: u64, observed: u64) -> f64 {
    if observed == 0 {
        return 1.0;
    }
    let upper = draws.min(successes);
    if observed > upper {
        return 0.0;
    }

    let ln_choose = |n: u64, k: u64| -> f64 {
        if k > n {
            return f64::NEG_INFINITY;
        }
        ln_gamma(n as f64 + 1.0) - ln_gamma(k as f64 + 1.0) - ln_gamma((n - k) as f64 + 1.0)
    };

    let ln_denominator = ln_choose(population, draws);
    let mut total = 0.0;
    for i in observed..=upper {
        let failures_needed = draws - i;
        let failures_available = population - successes;
        if failures_needed > failures_available {
            continue;
        }
        let ln_p = ln_choose(successes, i) + ln_choose(failures_available, failures_needed) - ln_denominator;
        total += ln_p.exp();
    }
    total.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;
    use crate::core::interning::StringInterner;
    use crate::domain::GeneCategory;

    fn terms(interner: &StringInterner, words: &[&str]) -> TermSet {
        TermSet::from_terms(words.iter().map(|w| interner.get_or_intern(w)))
    }

    #[test]
    fn tail_sum_matches_full_population_sanity() {
        // Drawing everyone from the population, the tail probability of
        // seeing at least `successes` hits among `population` draws is 1.
        let p = hypergeometric_sf(10, 4, 10, 4);
        assert_abs_diff_eq!(p, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn impossible_observation_has_zero_probability() {
        // Cannot observe 5 successes when only 3 exist in the population.
        assert_eq!(hypergeometric_sf(10, 3, 5, 5), 0.0);
    }

    #[test]
    fn enrichment_drops_terms_absent_from_reference() {
        let interner = StringInterner::new();
        let category = Category::Gene(GeneCategory::GoBiologicalProcess);
        let mut annotations = AnnotationStore::new();
        for e in 0..20u32 {
            annotations.extend([(e, category, terms(&interner, &["common"]))]);
        }
        annotations.extend([(0, category, terms(&interner, &["common", "rare"]))]);

        let ref_terms = terms(&interner, &["common", "rare"]);
        let restricted = restrict_to_enriched(&annotations, category, &[0], &ref_terms);
        // "common" is present in the whole population, so it is not
        // enriched in a reference of size 1; "rare" is unique to entity 0.
        assert!(!restricted.contains(interner.get_or_intern("common")));
    }

    #[test]
    fn empty_reference_restricts_to_empty() {
        let interner = StringInterner::new();
        let category = Category::Gene(GeneCategory::GoCellularComponent);
        let annotations = AnnotationStore::new();
        let ref_terms = terms(&interner, &["x"]);
        let restricted = restrict_to_enriched(&annotations, category, &[], &ref_terms);
        assert!(restricted.is_empty());
    }
}
