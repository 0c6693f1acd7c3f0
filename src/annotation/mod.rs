//! Annotation Store: per-(domain, category) maps from entity-index to term set.
//!
//! The store is append-only. `extend` takes a batch of `(entity, category,
//! term-set)` rows and unions each row's terms into whatever is already
//! recorded for that key, so re-extending with a row already seen is a
//! no-op — the same idempotence guarantee the Identifier Registry and
//! Sparse Distance Store make.

use std::collections::HashMap;

use smallvec::SmallVec;

use crate::core::interning::{InternedString, StringInterner};
use crate::domain::{Category, Domain, EntityIndex};

/// A set of opaque term ids.
///
/// Backed by a sorted, deduplicated `SmallVec` rather than a `HashSet`: term
/// sets are small in the common case (a handful of GO terms), and keeping
/// them sorted turns intersection counting into a linear merge instead of a
/// hash probe per element.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TermSet {
    terms: SmallVec<[InternedString; 8]>,
}

impl TermSet {
    /// An empty term set.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a term set from an iterator of interned terms, sorting and
    /// deduplicating them.
    pub fn from_terms(terms: impl IntoIterator<Item = InternedString>) -> Self {
        let mut terms: SmallVec<[InternedString; 8]> = terms.into_iter().collect();
        terms.sort_unstable_by_key(interned_sort_key);
        terms.dedup();
        Self { terms }
    }

    /// Number of terms in the set.
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    /// Whether the set has no terms.
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Iterate the set's terms in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = InternedString> + '_ {
        self.terms.iter().copied()
    }

    /// Whether `term` is a member of this set.
    pub fn contains(&self, term: InternedString) -> bool {
        self.terms
            .binary_search_by_key(&interned_sort_key(&term), interned_sort_key)
            .is_ok()
    }

    /// Count of terms shared between `self` and `other`, via a sorted merge.
    pub fn intersection_count(&self, other: &TermSet) -> usize {
        let mut count = 0;
        let (mut i, mut j) = (0, 0);
        while i < self.terms.len() && j < other.terms.len() {
            let (a, b) = (
                interned_sort_key(&self.terms[i]),
                interned_sort_key(&other.terms[j]),
            );
            match a.cmp(&b) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    count += 1;
                    i += 1;
                    j += 1;
                }
            }
        }
        count
    }

    /// Union `other`'s terms into `self`, returning whether anything new was added.
    fn union_extend(&mut self, other: &TermSet) -> bool {
        if other.terms.is_empty() {
            return false;
        }
        let before = self.terms.len();
        self.terms.extend(other.terms.iter().copied());
        self.terms.sort_unstable_by_key(interned_sort_key);
        self.terms.dedup();
        self.terms.len() != before
    }
}

/// `InternedString` (lasso's `Spur`) has no guaranteed ordering relationship
/// to anything but itself; sort on its `usize` representation so term sets
/// have a stable canonical order independent of interning order.
fn interned_sort_key(key: &InternedString) -> usize {
    use lasso::Key;
    (*key).into_usize()
}

/// Per-domain annotation table: `entity-index -> { category -> TermSet }`.
#[derive(Debug, Default)]
struct DomainAnnotations {
    rows: HashMap<EntityIndex, HashMap<Category, TermSet>>,
}

/// Append-only store of per-entity, per-category term sets.
#[derive(Debug, Default)]
pub struct AnnotationStore {
    gene: DomainAnnotations,
    disease: DomainAnnotations,
}

impl AnnotationStore {
    /// Construct an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn table(&self, domain: Domain) -> &DomainAnnotations {
        match domain {
            Domain::Gene => &self.gene,
            Domain::Disease => &self.disease,
        }
    }

    fn table_mut(&mut self, domain: Domain) -> &mut DomainAnnotations {
        match domain {
            Domain::Gene => &mut self.gene,
            Domain::Disease => &mut self.disease,
        }
    }

    /// Get the term set recorded for `entity` under `category`.
    ///
    /// Returns a borrowed empty set for entities with no row at all, which
    /// is indistinguishable from an explicitly empty term set from the
    /// caller's perspective; use [`AnnotationStore::has_annotation`] to tell
    /// the two apart.
    pub fn get_terms(&self, entity: EntityIndex, category: Category) -> TermSet {
        self.table(category.domain())
            .rows
            .get(&entity)
            .and_then(|by_category| by_category.get(&category))
            .cloned()
            .unwrap_or_default()
    }

    /// Whether `entity` has an explicit (possibly empty) annotation row for `category`.
    pub fn has_annotation(&self, entity: EntityIndex, category: Category) -> bool {
        self.table(category.domain())
            .rows
            .get(&entity)
            .is_some_and(|by_category| by_category.contains_key(&category))
    }

    /// Extend the store with new rows, unioning into whatever is already present.
    ///
    /// Idempotent: calling `extend` twice with the same rows makes no
    /// further change on the second call.
    pub fn extend(
        &mut self,
        rows: impl IntoIterator<Item = (EntityIndex, Category, TermSet)>,
    ) {
        for (entity, category, terms) in rows {
            let table = self.table_mut(category.domain());
            let by_category = table.rows.entry(entity).or_default();
            by_category
                .entry(category)
                .or_insert_with(TermSet::empty)
                .union_extend(&terms);
        }
    }

    /// Iterate all `(entity, term-set)` pairs recorded under `category`.
    pub fn iter_all(&self, category: Category) -> impl Iterator<Item = (EntityIndex, &TermSet)> {
        self.table(category.domain())
            .rows
            .iter()
            .filter_map(move |(&entity, by_category)| {
                by_category.get(&category).map(|terms| (entity, terms))
            })
    }

    /// All entities with at least one annotation row in `domain`.
    pub fn known_entities(&self, domain: Domain) -> impl Iterator<Item = EntityIndex> + '_ {
        self.table(domain).rows.keys().copied()
    }

    /// Every `(entity, category, term strings)` row recorded for `domain`,
    /// with terms resolved back to their external strings via `interner`.
    ///
    /// Used by [`crate::io::persistence`] to snapshot the store without
    /// depending on which interner instance it was built against.
    pub fn dump(&self, domain: Domain, interner: &StringInterner) -> Vec<(EntityIndex, Category, Vec<String>)> {
        self.table(domain)
            .rows
            .iter()
            .flat_map(|(&entity, by_category)| {
                by_category.iter().map(move |(&category, terms)| {
                    let strings = terms.iter().map(|t| interner.resolve(t).to_string()).collect();
                    (entity, category, strings)
                })
            })
            .collect()
    }

    /// Load a persisted dump, interning each row's terms with `interner` and
    /// merging via the same idempotent union [`Self::extend`] uses.
    pub fn load(&mut self, interner: &StringInterner, rows: Vec<(EntityIndex, Category, Vec<String>)>) {
        let rows = rows.into_iter().map(|(entity, category, terms)| {
            let term_set = TermSet::from_terms(terms.iter().map(|t| interner.get_or_intern(t)));
            (entity, category, term_set)
        });
        self.extend(rows);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::interning::StringInterner;
    use crate::domain::GeneCategory;

    fn terms(interner: &StringInterner, words: &[&str]) -> TermSet {
        TermSet::from_terms(words.iter().map(|w| interner.get_or_intern(w)))
    }

    #[test]
    fn extend_is_idempotent_union() {
        let interner = StringInterner::new();
        let mut store = AnnotationStore::new();
        let category = Category::Gene(GeneCategory::GoBiologicalProcess);

        store.extend([(1, category, terms(&interner, &["a", "b"]))]);
        store.extend([(1, category, terms(&interner, &["b", "c"]))]);
        store.extend([(1, category, terms(&interner, &["a", "b"]))]);

        let merged = store.get_terms(1, category);
        assert_eq!(merged.len(), 3);
    }

    #[test]
    fn missing_vs_present_but_empty() {
        let category = Category::Gene(GeneCategory::PathwayKegg);
        let mut store = AnnotationStore::new();

        assert!(!store.has_annotation(5, category));
        store.extend([(5, category, TermSet::empty())]);
        assert!(store.has_annotation(5, category));
        assert!(store.get_terms(5, category).is_empty());
    }

    #[test]
    fn unknown_entity_yields_empty_term_set() {
        let category = Category::Gene(GeneCategory::GoMolecularFunction);
        let store = AnnotationStore::new();
        assert!(store.get_terms(999, category).is_empty());
    }

    #[test]
    fn dump_and_load_round_trips_through_a_different_interner() {
        let source_interner = StringInterner::new();
        let mut store = AnnotationStore::new();
        let category = Category::Gene(GeneCategory::GoBiologicalProcess);
        store.extend([(1, category, terms(&source_interner, &["a", "b"]))]);

        let dumped = store.dump(Domain::Gene, &source_interner);
        assert_eq!(dumped.len(), 1);

        let target_interner = StringInterner::new();
        let mut restored = AnnotationStore::new();
        restored.load(&target_interner, dumped);

        let round_tripped = restored.get_terms(1, category);
        assert_eq!(round_tripped.len(), 2);
        assert!(round_tripped.contains(target_interner.get_or_intern("a")));
    }
}
