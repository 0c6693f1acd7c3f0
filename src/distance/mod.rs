//! Sparse Distance Store: per-(domain, category, coefficient) pairwise similarity matrices.
//!
//! Logically a symmetric `|E|×|E|` matrix per (domain, category, coefficient)
//! triple; physically stored as three parallel `(row, col, value)` vectors
//! sorted by `(row, col)`, with zero entries omitted. A single *index
//! directory* per (domain, coefficient) pair maps entity indices to dense
//! matrix rows and is shared across every category in that domain, so one
//! row insertion extends every category's matrix consistently.
//!
//! Reads never block: each category/coefficient matrix is published behind
//! an [`arc_swap::ArcSwap`], so a reader holds a stable snapshot for the
//! duration of its query while a writer builds and swaps in a new one. A
//! `parking_lot::Mutex` per (category, coefficient) serializes writers
//! against each other without blocking readers.

pub mod coefficient;
pub mod extender;

use std::collections::HashSet;
use std::sync::Arc;

use arc_swap::ArcSwap;
use dashmap::DashMap;
use indexmap::IndexSet;
use parking_lot::{Mutex, RwLock};

pub use coefficient::Coefficient;

use crate::domain::{Category, Domain, EntityIndex};

/// Sorted coordinate-form storage for one (category, coefficient) matrix.
#[derive(Debug, Default, Clone)]
struct MatrixData {
    /// Parallel, `(row, col)`-sorted triples. `rows[i] < cols[i]` always holds.
    rows: Vec<u32>,
    cols: Vec<u32>,
    values: Vec<f32>,
}

impl MatrixData {
    fn find(&self, row: u32, col: u32) -> Option<f32> {
        // Rows repeat (one per stored column), so binary search only to the
        // start of the row's run, then scan its (typically short) window.
        let start = self.rows.partition_point(|&r| r < row);
        let mut i = start;
        while i < self.rows.len() && self.rows[i] == row {
            if self.cols[i] == col {
                return Some(self.values[i]);
            }
            i += 1;
        }
        None
    }

    fn merge_insert(&self, triples: &[(u32, u32, f32)]) -> MatrixData {
        let mut combined: Vec<(u32, u32, f32)> = self
            .rows
            .iter()
            .zip(&self.cols)
            .zip(&self.values)
            .map(|((&r, &c), &v)| (r, c, v))
            .collect();

        for &(row, col, value) in triples {
            debug_assert!(row < col, "insert_triples requires row < col");
            debug_assert!(value > 0.0 && value <= 1.0, "insert_triples requires 0 < value <= 1");
            if self.find(row, col).is_some() {
                continue; // first-seen value wins
            }
            combined.push((row, col, value));
        }

        combined.sort_unstable_by_key(|&(r, c, _)| (r, c));
        combined.dedup_by_key(|&mut (r, c, _)| (r, c)); // first occurrence kept after stable sort

        let mut rows = Vec::with_capacity(combined.len());
        let mut cols = Vec::with_capacity(combined.len());
        let mut values = Vec::with_capacity(combined.len());
        for (r, c, v) in combined {
            rows.push(r);
            cols.push(c);
            values.push(v);
        }
        MatrixData { rows, cols, values }
    }
}

/// A read-only view over the triples of a matrix restricted to a set of entities.
pub type SparseView = Vec<(EntityIndex, EntityIndex, f64)>;

/// Shared pairwise-distance storage for every (domain, category, coefficient) triple.
#[derive(Debug, Default)]
pub struct SparseDistanceStore {
    directories: DashMap<(Domain, Coefficient), Arc<RwLock<IndexSet<EntityIndex>>>>,
    matrices: DashMap<(Category, Coefficient), Arc<ArcSwap<MatrixData>>>,
    writer_tokens: DashMap<(Category, Coefficient), Arc<Mutex<()>>>,
    /// Entities the [`extender::DistanceExtender`] has already computed a
    /// row for, per (category, coefficient). Extension runs once per
    /// category independently of the shared domain/coefficient directory, so
    /// an entity first indexed while extending one category still triggers
    /// extension the first time a different category is extended against it.
    extended: DashMap<(Category, Coefficient), Arc<RwLock<HashSet<EntityIndex>>>>,
}

impl SparseDistanceStore {
    /// Construct an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn directory(&self, domain: Domain, coef: Coefficient) -> Arc<RwLock<IndexSet<EntityIndex>>> {
        self.directories
            .entry((domain, coef))
            .or_insert_with(|| Arc::new(RwLock::new(IndexSet::new())))
            .clone()
    }

    fn matrix(&self, category: Category, coef: Coefficient) -> Arc<ArcSwap<MatrixData>> {
        self.matrices
            .entry((category, coef))
            .or_insert_with(|| Arc::new(ArcSwap::from_pointee(MatrixData::default())))
            .clone()
    }

    fn extended_set(&self, category: Category, coef: Coefficient) -> Arc<RwLock<HashSet<EntityIndex>>> {
        self.extended
            .entry((category, coef))
            .or_insert_with(|| Arc::new(RwLock::new(HashSet::new())))
            .clone()
    }

    /// `true` if the Distance Extender has already computed `entity`'s row
    /// for `(category, coef)`, independently of whether `entity` is present
    /// in the shared domain/coefficient directory via some other category.
    pub fn has_extended(&self, category: Category, coef: Coefficient, entity: EntityIndex) -> bool {
        self.extended_set(category, coef).read().contains(&entity)
    }

    /// Record that `entities` have had their `(category, coef)` row computed.
    pub fn mark_extended(&self, category: Category, coef: Coefficient, entities: &[EntityIndex]) {
        let set = self.extended_set(category, coef);
        let mut guard = set.write();
        guard.extend(entities.iter().copied());
    }

    fn writer_token(&self, category: Category, coef: Coefficient) -> Arc<Mutex<()>> {
        self.writer_tokens
            .entry((category, coef))
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Row assigned to `entity` in the shared (domain, coefficient) directory, if any.
    pub fn row_of(&self, domain: Domain, coef: Coefficient, entity: EntityIndex) -> Option<u32> {
        self.directory(domain, coef)
            .read()
            .get_index_of(&entity)
            .map(|i| i as u32)
    }

    /// Entity assigned to `row` in the shared (domain, coefficient) directory, if any.
    pub fn entity_at_row(&self, domain: Domain, coef: Coefficient, row: u32) -> Option<EntityIndex> {
        self.directory(domain, coef)
            .read()
            .get_index(row as usize)
            .copied()
    }

    /// Number of entities currently indexed for (domain, coefficient).
    pub fn directory_len(&self, domain: Domain, coef: Coefficient) -> usize {
        self.directory(domain, coef).read().len()
    }

    /// Extend the shared directory for `domain`/`coef` with `new_entities`,
    /// returning the matrix row assigned to each, in input order.
    ///
    /// Entities already present keep their existing row; rows already
    /// assigned are never renumbered.
    pub fn append_entities(
        &self,
        domain: Domain,
        coef: Coefficient,
        new_entities: &[EntityIndex],
    ) -> Vec<u32> {
        let directory = self.directory(domain, coef);
        let mut guard = directory.write();
        new_entities
            .iter()
            .map(|&entity| {
                let (row, _inserted) = guard.insert_full(entity);
                row as u32
            })
            .collect()
    }

    /// `0.0` if either index is missing from the directory, if `(i, j)` is
    /// unset, or if `i == j`; otherwise the stored coefficient value.
    pub fn get(&self, category: Category, coef: Coefficient, i: EntityIndex, j: EntityIndex) -> f64 {
        if i == j {
            return 0.0;
        }
        let domain = category.domain();
        let (Some(ri), Some(rj)) = (self.row_of(domain, coef, i), self.row_of(domain, coef, j))
        else {
            return 0.0;
        };
        if ri == rj {
            return 0.0;
        }
        let (row, col) = (ri.min(rj), ri.max(rj));
        self.matrix(category, coef)
            .load()
            .find(row, col)
            .map(f64::from)
            .unwrap_or(0.0)
    }

    /// Triples of the store whose both endpoints lie in `rows`, translated
    /// back to entity indices.
    pub fn get_submatrix(
        &self,
        category: Category,
        coef: Coefficient,
        rows: &[EntityIndex],
    ) -> SparseView {
        let domain = category.domain();
        let directory = self.directory(domain, coef);
        let guard = directory.read();

        let mut matrix_rows: Vec<u32> = rows
            .iter()
            .filter_map(|entity| guard.get_index_of(entity).map(|i| i as u32))
            .collect();
        matrix_rows.sort_unstable();
        matrix_rows.dedup();

        let snapshot = self.matrix(category, coef).load();
        let mut out = Vec::new();
        for i in 0..snapshot.rows.len() {
            let (r, c) = (snapshot.rows[i], snapshot.cols[i]);
            if matrix_rows.binary_search(&r).is_ok() && matrix_rows.binary_search(&c).is_ok() {
                let (Some(er), Some(ec)) = (guard.get_index(r as usize), guard.get_index(c as usize))
                else {
                    continue;
                };
                out.push((*er, *ec, f64::from(snapshot.values[i])));
            }
        }
        out
    }

    /// Every entity currently present in the shared (domain, coefficient)
    /// directory, in row order. Used by [`crate::io::persistence`] to
    /// snapshot a directory without exposing its `IndexSet` internals.
    pub fn dump_directory(&self, domain: Domain, coef: Coefficient) -> Vec<EntityIndex> {
        self.directory(domain, coef).read().iter().copied().collect()
    }

    /// Every stored `(row, col, value)` triple for a (category, coefficient) matrix.
    pub fn dump_triples(&self, category: Category, coef: Coefficient) -> Vec<(u32, u32, f32)> {
        let snapshot = self.matrix(category, coef).load();
        snapshot
            .rows
            .iter()
            .zip(&snapshot.cols)
            .zip(&snapshot.values)
            .map(|((&r, &c), &v)| (r, c, v))
            .collect()
    }

    /// Every category with at least one matrix entry for `(domain, coef)`.
    pub fn categories_present(&self, domain: Domain, coef: Coefficient) -> Vec<Category> {
        self.matrices
            .iter()
            .filter(|entry| {
                let (category, c) = *entry.key();
                category.domain() == domain && c == coef
            })
            .map(|entry| entry.key().0)
            .collect()
    }

    /// Merge new `(row, col, value)` triples into a (category, coefficient)
    /// matrix. Requires `row < col` and `0 < value <= 1`; a duplicate insert
    /// keeps the first-seen value.
    pub fn insert_triples(
        &self,
        category: Category,
        coef: Coefficient,
        triples: &[(u32, u32, f32)],
    ) {
        if triples.is_empty() {
            return;
        }
        let token = self.writer_token(category, coef);
        let _guard = token.lock();

        let cell = self.matrix(category, coef);
        let current = cell.load();
        let merged = current.merge_insert(triples);
        cell.store(Arc::new(merged));
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;
    use crate::domain::GeneCategory;

    fn category() -> Category {
        Category::Gene(GeneCategory::GoBiologicalProcess)
    }

    #[test]
    fn append_then_get_round_trips() {
        let store = SparseDistanceStore::new();
        let domain = Domain::Gene;
        let coef = Coefficient::Jaccard;
        let rows = store.append_entities(domain, coef, &[10, 20, 30]);
        assert_eq!(rows, vec![0, 1, 2]);

        store.insert_triples(category(), coef, &[(0, 1, 0.667)]);
        assert_abs_diff_eq!(store.get(category(), coef, 10, 20), 0.667, epsilon = 1e-6);
        assert_eq!(store.get(category(), coef, 10, 30), 0.0);
        assert_eq!(store.get(category(), coef, 10, 10), 0.0);
    }

    #[test]
    fn append_existing_entity_does_not_renumber() {
        let store = SparseDistanceStore::new();
        let (domain, coef) = (Domain::Gene, Coefficient::Jaccard);
        store.append_entities(domain, coef, &[1, 2]);
        let rows = store.append_entities(domain, coef, &[2, 3]);
        assert_eq!(rows, vec![1, 2]); // entity 2 keeps row 1, entity 3 gets a new row 2
    }

    #[test]
    fn duplicate_insert_keeps_first_value() {
        let store = SparseDistanceStore::new();
        store.append_entities(Domain::Gene, Coefficient::Jaccard, &[1, 2]);
        store.insert_triples(category(), Coefficient::Jaccard, &[(0, 1, 0.5)]);
        store.insert_triples(category(), Coefficient::Jaccard, &[(0, 1, 0.9)]);
        assert_eq!(store.get(category(), Coefficient::Jaccard, 1, 2), 0.5);
    }

    #[test]
    fn submatrix_returns_exactly_triples_with_both_endpoints_in_rows() {
        let store = SparseDistanceStore::new();
        let coef = Coefficient::Jaccard;
        store.append_entities(Domain::Gene, coef, &[0, 1, 2]); // entities 0,1,2 -> rows 0,1,2
        store.insert_triples(category(), coef, &[(0, 1, 0.667)]);

        let full = store.get_submatrix(category(), coef, &[0, 1, 2]);
        assert_eq!(full.len(), 1);

        // Matches the concrete scenario: submatrix over {0,2} is empty.
        let partial = store.get_submatrix(category(), coef, &[0, 2]);
        assert!(partial.is_empty());
    }

    #[test]
    fn dump_directory_and_triples_round_trip_into_a_fresh_store() {
        let store = SparseDistanceStore::new();
        let (domain, coef) = (Domain::Gene, Coefficient::Jaccard);
        store.append_entities(domain, coef, &[10, 20, 30]);
        store.insert_triples(category(), coef, &[(0, 1, 0.667), (1, 2, 0.5)]);

        let directory = store.dump_directory(domain, coef);
        let triples = store.dump_triples(category(), coef);
        assert_eq!(directory, vec![10, 20, 30]);
        assert_eq!(triples.len(), 2);
        assert_eq!(store.categories_present(domain, coef), vec![category()]);

        let restored = SparseDistanceStore::new();
        restored.append_entities(domain, coef, &directory);
        restored.insert_triples(category(), coef, &triples);
        assert_abs_diff_eq!(restored.get(category(), coef, 10, 20), 0.667, epsilon = 1e-6);
        assert_abs_diff_eq!(restored.get(category(), coef, 20, 30), 0.5, epsilon = 1e-6);
    }
}
