//! Annotation-size-preserving background sampler.
//!
//! Candidate annotation size is the sum of the per-category term-set sizes
//! rather than a literal `⋃_k terms(·,k)` union: term ids are interned
//! independently per category, so there is no cross-category identity to
//! union over without an extra global term namespace the rest of the store
//! does not otherwise need. The sum tracks the same "how broadly annotated
//! is this candidate" signal the widening step cares about.

use std::collections::{BTreeMap, HashSet};

use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;

use crate::core::errors::{CoherenceError, Result};
use crate::domain::{Category, EntityIndex};
use crate::sampler::SamplerContext;

/// Precomputed candidate pool bucketed by total annotation size.
pub struct TermPreservingState<'a> {
    buckets: BTreeMap<usize, Vec<EntityIndex>>,
    size_of: std::collections::HashMap<EntityIndex, usize>,
    _marker: std::marker::PhantomData<&'a ()>,
}

pub(super) fn prepare<'a>(ctx: &SamplerContext<'a>, _original: &[EntityIndex]) -> TermPreservingState<'a> {
    let categories = Category::all_for(ctx.domain);
    let candidates = ctx.registry.entities_with_namespace(ctx.domain, ctx.namespace);

    let mut buckets: BTreeMap<usize, Vec<EntityIndex>> = BTreeMap::new();
    let mut size_of = std::collections::HashMap::new();
    for entity in candidates {
        let size: usize = categories
            .iter()
            .map(|&category| ctx.annotations.get_terms(entity, category).len())
            .sum();
        size_of.insert(entity, size);
        buckets.entry(size).or_default().push(entity);
    }

    TermPreservingState {
        buckets,
        size_of,
        _marker: std::marker::PhantomData,
    }
}

pub(super) fn draw(
    ctx: &SamplerContext<'_>,
    state: &TermPreservingState<'_>,
    original: &[EntityIndex],
    keepers: &[EntityIndex],
    n_replace: usize,
    rng: &mut ChaCha8Rng,
) -> Result<Vec<EntityIndex>> {
    let kept: HashSet<EntityIndex> = keepers.iter().copied().collect();
    let removed: Vec<EntityIndex> = original.iter().copied().filter(|e| !kept.contains(e)).collect();
    debug_assert_eq!(removed.len(), n_replace, "keepers/original mismatch with requested replacement count");

    let mut used: HashSet<EntityIndex> = kept;
    let mut replacements = Vec::with_capacity(n_replace);

    let max_radius = state
        .buckets
        .keys()
        .next_back()
        .zip(state.buckets.keys().next())
        .map(|(max, min)| max - min + 1)
        .unwrap_or(0);

    for &o in &removed {
        let center = *state.size_of.get(&o).unwrap_or(&0);
        let mut radius = 0usize;
        let mut window = window_population(&state.buckets, center, radius, &used);

        while window.len() <= ctx.term_bucket_threshold && radius < max_radius {
            radius += 1;
            window = window_population(&state.buckets, center, radius, &used);
        }

        if window.len() <= ctx.term_bucket_threshold {
            tracing::warn!(
                entity = o,
                center_size = center,
                window_size = window.len(),
                "term-preserving sampler exhausted widening without reaching the bucket threshold, falling back to the widest available window"
            );
        }

        let Some(&pick) = window.choose(rng) else {
            return Err(CoherenceError::insufficient_background(n_replace, replacements.len()));
        };
        used.insert(pick);
        replacements.push(pick);
    }

    Ok(replacements)
}

fn window_population(
    buckets: &BTreeMap<usize, Vec<EntityIndex>>,
    center: usize,
    radius: usize,
    excluded: &HashSet<EntityIndex>,
) -> Vec<EntityIndex> {
    let lo = center.saturating_sub(radius);
    let hi = center + radius;
    buckets
        .range(lo..=hi)
        .flat_map(|(_, entities)| entities.iter().copied())
        .filter(|e| !excluded.contains(e))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::{AnnotationStore, TermSet};
    use crate::core::interning::StringInterner;
    use crate::core::rng::child_rng;
    use crate::domain::{Domain, GeneCategory, Namespace};
    use crate::registry::IdentifierRegistry;

    fn terms(interner: &StringInterner, n: usize) -> TermSet {
        TermSet::from_terms((0..n).map(|i| interner.get_or_intern(format!("t{i}"))))
    }

    #[test]
    fn widens_until_threshold_reached() {
        let interner = StringInterner::new();
        let mut registry = IdentifierRegistry::new();
        let mut annotations = AnnotationStore::new();
        let category = Category::Gene(GeneCategory::GoBiologicalProcess);

        // Original entity has size 17; candidates 0..120 span sizes 10..20 so a
        // narrow window around 17 is thin but a few widenings clear threshold 30.
        let original_entity = registry.intern(Namespace::Entrez, "original");
        annotations.extend([(original_entity, category, terms(&interner, 17))]);

        for i in 0..120u32 {
            let e = registry.intern(Namespace::Entrez, &format!("cand{i}"));
            let size = 10 + (i as usize % 11);
            annotations.extend([(e, category, terms(&interner, size))]);
        }

        let ctx = SamplerContext {
            registry: &registry,
            annotations: &annotations,
            domain: Domain::Gene,
            namespace: Namespace::Entrez,
            replace_pct: 100,
            term_bucket_threshold: 30,
        };
        let state = prepare(&ctx, &[original_entity]);

        let mut rng = child_rng(7, 0);
        let drawn = draw(&ctx, &state, &[original_entity], &[], 1, &mut rng).unwrap();
        assert_eq!(drawn.len(), 1);
        assert_ne!(drawn[0], original_entity);
    }
}
