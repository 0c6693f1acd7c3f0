//! Distance Extender: the performance-critical inner loop that computes and
//! inserts new rows/columns into the Sparse Distance Store on demand.
//!
//! Given a domain, coefficient, category, and a set of entity indices drawn
//! from the current target, the extender assigns matrix rows to any
//! not-yet-indexed entities and computes their pairwise coefficient against
//! every previously known entity plus every other newly added one, skipping
//! pairs that would evaluate to zero. Extension runs once per category
//! independently, so an entity added while extending under one category
//! still triggers extension the first time it's queried under another.

use rayon::prelude::*;

use crate::annotation::AnnotationStore;
use crate::distance::{Coefficient, SparseDistanceStore};
use crate::domain::{Category, Domain, EntityIndex};

/// Extends a [`SparseDistanceStore`] with newly seen entities, reading term
/// sets from an [`AnnotationStore`].
#[derive(Debug, Clone, Copy)]
pub struct DistanceExtender {
    /// Entity count above which the all-pairs scan runs on `rayon`'s pool
    /// instead of serially. Mirrors [`crate::core::config::EngineConfig::parallel_extension_threshold`].
    pub parallel_threshold: usize,
}

impl Default for DistanceExtender {
    fn default() -> Self {
        Self {
            parallel_threshold: 64,
        }
    }
}

impl DistanceExtender {
    /// Construct an extender with an explicit parallelization threshold.
    pub fn new(parallel_threshold: usize) -> Self {
        Self { parallel_threshold }
    }

    /// Ensure every pairwise distance between entities in `targets` (and
    /// between `targets` and the previously indexed population) is present
    /// in `store` for `(category, coef)`. Idempotent: a second call with the
    /// same or a subset of `targets` makes no further change.
    pub fn extend(
        &self,
        store: &SparseDistanceStore,
        annotations: &AnnotationStore,
        domain: Domain,
        coef: Coefficient,
        category: Category,
        targets: &[EntityIndex],
    ) {
        debug_assert_eq!(category.domain(), domain, "category must belong to domain");

        // The shared domain/coefficient directory tells us which rows exist
        // at all; whether *this category* has already computed a row for an
        // entity is tracked independently, because another category may have
        // caused the entity to be indexed first. Filtering `targets` against
        // the directory alone would wrongly treat an entity as "already
        // extended" for a category it has never actually been compared
        // under.
        let already_indexed: Vec<EntityIndex> = (0..store.directory_len(domain, coef))
            .filter_map(|row| store.entity_at_row(domain, coef, row as u32))
            .collect();

        let mut dedup: std::collections::HashSet<EntityIndex> = std::collections::HashSet::new();
        let new_entities: Vec<EntityIndex> = targets
            .iter()
            .copied()
            .filter(|&e| dedup.insert(e) && !store.has_extended(category, coef, e))
            .collect();

        if new_entities.is_empty() {
            return;
        }

        tracing::debug!(
            domain = %domain,
            category = %category,
            new_count = new_entities.len(),
            known_count = already_indexed.len(),
            "extending distance store"
        );

        store.append_entities(domain, coef, &new_entities);

        // Every entity the new rows must be compared against: entities known
        // before this call, plus the other newly added entities themselves.
        // An entity can appear in both halves (indexed earlier under another
        // category but only now extended for this one), so dedupe.
        let mut universe = already_indexed;
        universe.extend(new_entities.iter().copied());
        universe.sort_unstable();
        universe.dedup();

        let compute_row = |&entity: &EntityIndex| -> Vec<(u32, u32, f32)> {
            let terms = annotations.get_terms(entity, category);
            if terms.is_empty() {
                return Vec::new();
            }
            let Some(row) = store.row_of(domain, coef, entity) else {
                return Vec::new();
            };
            let mut triples = Vec::new();
            for &other in &universe {
                if other == entity {
                    continue;
                }
                let other_terms = annotations.get_terms(other, category);
                if other_terms.is_empty() {
                    continue;
                }
                let Some(other_row) = store.row_of(domain, coef, other) else {
                    continue;
                };
                if row == other_row {
                    continue;
                }
                let value = coef.evaluate(&terms, &other_terms);
                if value <= 0.0 {
                    continue;
                }
                let (r, c) = (row.min(other_row), row.max(other_row));
                triples.push((r, c, value as f32));
            }
            triples
        };

        let triples: Vec<(u32, u32, f32)> = if new_entities.len() >= self.parallel_threshold {
            new_entities
                .par_iter()
                .flat_map_iter(|entity| compute_row(entity))
                .collect()
        } else {
            new_entities.iter().flat_map(compute_row).collect()
        };

        store.insert_triples(category, coef, &triples);
        store.mark_extended(category, coef, &new_entities);
    }
}
