//! Identifier Registry: interns external ids into dense, domain-scoped entity indices.
//!
//! Each domain has exactly one canonical namespace (Entrez for genes, MONDO
//! for diseases). Every other namespace is an alias that may resolve to
//! several canonical entities and vice versa — most visibly for ICD-10,
//! whose ranges are expanded at ingest (see [`icd10`]) into children that
//! all alias back to whichever disease entities they were ingested against.

pub mod icd10;

use std::collections::HashMap;

use smallvec::SmallVec;

use crate::core::errors::{CoherenceError, Result};
use crate::core::interning::{InternedString, StringInterner};
use crate::domain::{Domain, EntityIndex, Namespace};

#[derive(Debug, Default)]
struct DomainTable {
    next_index: EntityIndex,
    canonical_index: HashMap<InternedString, EntityIndex>,
    alias_index: HashMap<(Namespace, InternedString), SmallVec<[EntityIndex; 2]>>,
    reverse: HashMap<(Namespace, EntityIndex), SmallVec<[InternedString; 2]>>,
}

fn canonical_namespace(domain: Domain) -> Namespace {
    match domain {
        Domain::Gene => Namespace::Entrez,
        Domain::Disease => Namespace::Mondo,
    }
}

impl DomainTable {
    fn allocate(&mut self) -> EntityIndex {
        let index = self.next_index;
        self.next_index += 1;
        index
    }

    fn record_reverse(&mut self, namespace: Namespace, entity: EntityIndex, id: InternedString) {
        let aliases = self.reverse.entry((namespace, entity)).or_default();
        if !aliases.contains(&id) {
            aliases.push(id);
        }
    }
}

/// Monotonic, append-only interning of external biomedical identifiers into
/// dense per-domain entity indices.
#[derive(Debug)]
pub struct IdentifierRegistry {
    interner: StringInterner,
    gene: DomainTable,
    disease: DomainTable,
}

impl Default for IdentifierRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentifierRegistry {
    /// Construct an empty registry using the global string interner.
    pub fn new() -> Self {
        Self {
            interner: crate::core::interning::global_interner().clone(),
            gene: DomainTable::default(),
            disease: DomainTable::default(),
        }
    }

    /// Construct an empty registry using a caller-supplied interner.
    pub fn with_interner(interner: StringInterner) -> Self {
        Self {
            interner,
            gene: DomainTable::default(),
            disease: DomainTable::default(),
        }
    }

    fn table(&self, domain: Domain) -> &DomainTable {
        match domain {
            Domain::Gene => &self.gene,
            Domain::Disease => &self.disease,
        }
    }

    fn table_mut(&mut self, domain: Domain) -> &mut DomainTable {
        match domain {
            Domain::Gene => &mut self.gene,
            Domain::Disease => &mut self.disease,
        }
    }

    /// Intern `id` under `namespace`, returning its entity index.
    ///
    /// For the domain's canonical namespace this creates the entity on
    /// first sight and returns the same index on every subsequent call with
    /// the same id. For an alias namespace, the first id seen under a given
    /// alias string allocates a fresh entity (so every external id still
    /// resolves to *some* index); callers that later learn the alias in
    /// fact denotes an already-known entity should use [`Self::add_alias`]
    /// to link them, at which point [`Self::canonicalize`] starts returning
    /// both.
    pub fn intern(&mut self, namespace: Namespace, id: &str) -> EntityIndex {
        let key = self.interner.get_or_intern(id);
        let domain = namespace.domain();

        if namespace.is_canonical() {
            let table = self.table_mut(domain);
            if let Some(&existing) = table.canonical_index.get(&key) {
                return existing;
            }
            let index = table.allocate();
            table.canonical_index.insert(key, index);
            table.record_reverse(namespace, index, key);
            return index;
        }

        let table = self.table_mut(domain);
        if let Some(existing) = table.alias_index.get(&(namespace, key)) {
            if let Some(&first) = existing.first() {
                return first;
            }
        }
        let index = table.allocate();
        table
            .alias_index
            .entry((namespace, key))
            .or_default()
            .push(index);
        table.record_reverse(namespace, index, key);
        index
    }

    /// Associate `id` under `namespace` with an already-known `entity`,
    /// in addition to whatever it may already resolve to.
    pub fn add_alias(&mut self, namespace: Namespace, id: &str, entity: EntityIndex) {
        let key = self.interner.get_or_intern(id);
        let table = self.table_mut(namespace.domain());
        let bucket = table.alias_index.entry((namespace, key)).or_default();
        if !bucket.contains(&entity) {
            bucket.push(entity);
        }
        table.record_reverse(namespace, entity, key);
    }

    /// Ingest an ICD-10 code (possibly a range) as an alias of `entity`,
    /// expanding ranges into their enumerated children and linking each
    /// child's three-character parent as well.
    pub fn ingest_icd10(&mut self, entity: EntityIndex, code: &str) {
        for child in icd10::expand_range(code) {
            self.add_alias(Namespace::Icd10, &child, entity);
            let parent = icd10::parent_of(&child);
            if parent != child {
                self.add_alias(Namespace::Icd10, &parent, entity);
            }
        }
    }

    /// Look up the (first) entity index for `id` under `namespace`.
    pub fn lookup(&self, namespace: Namespace, id: &str) -> Option<EntityIndex> {
        let key = self.interner.get(id)?;
        let table = self.table(namespace.domain());
        if namespace.is_canonical() {
            return table.canonical_index.get(&key).copied();
        }
        table
            .alias_index
            .get(&(namespace, key))
            .and_then(|indices| indices.first().copied())
    }

    /// Resolve `id` under `namespace` to every entity it denotes.
    ///
    /// May return more than one entity when `namespace` is an alias
    /// namespace with a many-to-one mapping (e.g. an ICD-10 parent code
    /// shared by several diseases).
    pub fn canonicalize(&self, id: &str, namespace: Namespace) -> Result<Vec<EntityIndex>> {
        let Some(key) = self.interner.get(id) else {
            return Ok(Vec::new());
        };
        let table = self.table(namespace.domain());
        if namespace.is_canonical() {
            return Ok(table
                .canonical_index
                .get(&key)
                .copied()
                .into_iter()
                .collect());
        }
        Ok(table
            .alias_index
            .get(&(namespace, key))
            .map(|indices| indices.to_vec())
            .unwrap_or_default())
    }

    /// Canonicalize a batch of external ids under the same namespace,
    /// deduplicating the resulting entity indices while preserving first-seen order.
    pub fn canonicalize_all(
        &self,
        ids: &[String],
        namespace: Namespace,
    ) -> Result<Vec<EntityIndex>> {
        let mut seen = std::collections::HashSet::new();
        let mut out = Vec::new();
        for id in ids {
            for entity in self.canonicalize(id, namespace)? {
                if seen.insert(entity) {
                    out.push(entity);
                }
            }
        }
        Ok(out)
    }

    /// Reverse-lookup `entity`'s external ids under `namespace`.
    pub fn external_of(&self, entity: EntityIndex, namespace: Namespace) -> Vec<String> {
        self.table(namespace.domain())
            .reverse
            .get(&(namespace, entity))
            .map(|ids| ids.iter().map(|&id| self.interner.resolve(id).to_string()).collect())
            .unwrap_or_default()
    }

    /// Resolve a namespace name string, surfacing `InvalidRequest` for anything unknown.
    pub fn resolve_namespace(name: &str) -> Result<Namespace> {
        Namespace::parse(name).ok_or_else(|| CoherenceError::unknown_id_type(name))
    }

    /// Every namespace defined for `domain`, canonical namespace first.
    ///
    /// A thin instance-method wrapper over [`Namespace::all_for`], kept
    /// alongside the rest of the registry's lookup surface so callers
    /// working against a registry value don't need a separate import.
    pub fn namespaces(&self, domain: Domain) -> &'static [Namespace] {
        Namespace::all_for(domain)
    }

    /// The domain `entity` belongs to.
    ///
    /// Entity indices are domain-scoped (a gene index and a disease index
    /// may share the same numeric value), so this can only answer relative
    /// to a domain the caller already knows or is checking; returns `None`
    /// if `entity` has never been interned in that domain.
    pub fn domain_of(&self, domain: Domain, entity: EntityIndex) -> Option<Domain> {
        if entity < self.table(domain).next_index {
            Some(domain)
        } else {
            None
        }
    }

    /// Number of entities interned so far in `domain`.
    pub fn entity_count(&self, domain: Domain) -> usize {
        self.table(domain).next_index as usize
    }

    /// Every canonical id recorded for `domain`, as `(external id, entity)` pairs.
    ///
    /// Used by [`crate::io::persistence`] to snapshot a domain's canonical
    /// table without exposing the interner or the table's internal layout.
    pub fn dump_canonical(&self, domain: Domain) -> Vec<(String, EntityIndex)> {
        self.table(domain)
            .canonical_index
            .iter()
            .map(|(&key, &entity)| (self.interner.resolve(key).to_string(), entity))
            .collect()
    }

    /// Every alias id recorded for `domain`, as `(namespace, external id, entity)` triples.
    pub fn dump_aliases(&self, domain: Domain) -> Vec<(Namespace, String, EntityIndex)> {
        self.table(domain)
            .alias_index
            .iter()
            .flat_map(|(&(namespace, key), entities)| {
                let id = self.interner.resolve(key).to_string();
                entities
                    .iter()
                    .map(move |&entity| (namespace, id.clone(), entity))
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    /// Rebuild a domain's canonical table from a persisted dump.
    ///
    /// Entity indices are taken as-is rather than reallocated, and the
    /// allocator is advanced past the highest index restored, so indices
    /// assigned in a future `intern` call never collide with restored ones.
    pub fn restore_canonical(&mut self, domain: Domain, entries: Vec<(String, EntityIndex)>) {
        let namespace = canonical_namespace(domain);
        for (id, entity) in entries {
            let key = self.interner.get_or_intern(&id);
            let table = self.table_mut(domain);
            table.canonical_index.insert(key, entity);
            table.record_reverse(namespace, entity, key);
            table.next_index = table.next_index.max(entity + 1);
        }
    }

    /// Rebuild a domain's alias table from a persisted dump.
    pub fn restore_aliases(&mut self, domain: Domain, entries: Vec<(Namespace, String, EntityIndex)>) {
        for (namespace, id, entity) in entries {
            let key = self.interner.get_or_intern(&id);
            let table = self.table_mut(domain);
            let bucket = table.alias_index.entry((namespace, key)).or_default();
            if !bucket.contains(&entity) {
                bucket.push(entity);
            }
            table.record_reverse(namespace, entity, key);
            table.next_index = table.next_index.max(entity + 1);
        }
    }

    /// Entities in `domain` that have at least one id recorded under `namespace`.
    ///
    /// Used by the Background Sampler family to build the candidate pool a
    /// replacement draw is restricted to: all entities in the domain with a
    /// non-empty id in the given namespace.
    pub fn entities_with_namespace(&self, domain: Domain, namespace: Namespace) -> Vec<EntityIndex> {
        let table = self.table(domain);
        if namespace.is_canonical() {
            table.canonical_index.values().copied().collect()
        } else {
            table
                .reverse
                .keys()
                .filter(|(ns, _)| *ns == namespace)
                .map(|&(_, entity)| entity)
                .collect()
        }
    }
}


#[cfg(test)]
mod property_tests {
    use proptest::prelude::*;

    use super::*;

    fn entrez_id() -> impl Strategy<Value = String> {
        (1u32..1_000_000).prop_map(|n| n.to_string())
    }

    proptest! {
        #[test]
        fn canonicalize_then_external_of_recovers_the_interned_id(id in entrez_id()) {
            let mut registry = IdentifierRegistry::new();
            let entity = registry.intern(Namespace::Entrez, &id);

            let resolved = registry.canonicalize(&id, Namespace::Entrez).unwrap();
            prop_assert_eq!(resolved, vec![entity]);

            let external = registry.external_of(entity, Namespace::Entrez);
            prop_assert_eq!(external, vec![id]);
        }

        #[test]
        fn interning_the_same_id_twice_never_allocates_a_second_entity(id in entrez_id()) {
            let mut registry = IdentifierRegistry::new();
            let first = registry.intern(Namespace::Entrez, &id);
            let second = registry.intern(Namespace::Entrez, &id);
            prop_assert_eq!(first, second);
        }
    }
}
