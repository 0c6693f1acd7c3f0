//! Uniform background sampler.

use std::collections::HashSet;

use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;

use crate::core::errors::{CoherenceError, Result};
use crate::domain::EntityIndex;
use crate::sampler::SamplerContext;

pub(super) fn draw(
    ctx: &SamplerContext<'_>,
    excluded: &HashSet<EntityIndex>,
    n_replace: usize,
    rng: &mut ChaCha8Rng,
) -> Result<Vec<EntityIndex>> {
    let mut candidates: Vec<EntityIndex> = ctx
        .registry
        .entities_with_namespace(ctx.domain, ctx.namespace)
        .into_iter()
        .filter(|e| !excluded.contains(e))
        .collect();

    if candidates.len() < n_replace {
        return Err(CoherenceError::insufficient_background(n_replace, candidates.len()));
    }

    candidates.shuffle(rng);
    candidates.truncate(n_replace);
    Ok(candidates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::rng::child_rng;
    use crate::domain::{Domain, Namespace};
    use crate::registry::IdentifierRegistry;

    fn registry_with(n: u32) -> IdentifierRegistry {
        let mut registry = IdentifierRegistry::new();
        for i in 0..n {
            registry.intern(Namespace::Entrez, &i.to_string());
        }
        registry
    }

    #[test]
    fn draws_requested_count_excluding_keepers() {
        let registry = registry_with(10);
        let annotations = crate::annotation::AnnotationStore::new();
        let ctx = SamplerContext {
            registry: &registry,
            annotations: &annotations,
            domain: Domain::Gene,
            namespace: Namespace::Entrez,
            replace_pct: 50,
            term_bucket_threshold: 100,
        };
        let excluded: HashSet<EntityIndex> = [0, 1].into_iter().collect();
        let mut rng = child_rng(1, 0);
        let drawn = draw(&ctx, &excluded, 3, &mut rng).unwrap();
        assert_eq!(drawn.len(), 3);
        assert!(drawn.iter().all(|e| !excluded.contains(e)));
    }

    #[test]
    fn insufficient_pool_is_an_error() {
        let registry = registry_with(2);
        let annotations = crate::annotation::AnnotationStore::new();
        let ctx = SamplerContext {
            registry: &registry,
            annotations: &annotations,
            domain: Domain::Gene,
            namespace: Namespace::Entrez,
            replace_pct: 50,
            term_bucket_threshold: 100,
        };
        let excluded = HashSet::new();
        let mut rng = child_rng(1, 0);
        let err = draw(&ctx, &excluded, 5, &mut rng).unwrap_err();
        assert!(matches!(err, CoherenceError::InsufficientBackground { .. }));
    }
}
