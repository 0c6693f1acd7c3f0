//! Binary snapshot format for the registry, distance, and annotation stores.
//!
//! Each snapshot is a length-prefixed signature followed by a bincode-encoded
//! payload: `[u32 sig_len][sig_len bytes of hex signature][payload bytes]`.
//! The signature is a SHA-256 digest of the payload, checked on load so a
//! truncated or hand-edited snapshot file fails closed with
//! [`CoherenceError::StoreInconsistent`] instead of deserializing into
//! garbage. Every payload also carries its own `version` field so a future
//! format change can be detected before bincode attempts to decode it.

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::annotation::AnnotationStore;
use crate::core::errors::{CoherenceError, Result};
use crate::core::interning::StringInterner;
use crate::distance::{Coefficient, SparseDistanceStore};
use crate::domain::{Category, Domain, EntityIndex, Namespace};
use crate::registry::IdentifierRegistry;

const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct RegistrySnapshot {
    version: u32,
    domain: Domain,
    canonical: Vec<(String, EntityIndex)>,
    aliases: Vec<(Namespace, String, EntityIndex)>,
}

#[derive(Debug, Serialize, Deserialize)]
struct DistanceSnapshot {
    version: u32,
    domain: Domain,
    coefficient: Coefficient,
    directory: Vec<EntityIndex>,
    matrices: Vec<(Category, Vec<(u32, u32, f32)>)>,
}

#[derive(Debug, Serialize, Deserialize)]
struct AnnotationSnapshot {
    version: u32,
    domain: Domain,
    rows: Vec<(EntityIndex, Category, Vec<String>)>,
}

fn digest(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

fn write_signed(path: &Path, payload: &[u8]) -> Result<()> {
    let sig = digest(payload);
    let mut file = File::create(path)?;
    file.write_all(&(sig.len() as u32).to_le_bytes())?;
    file.write_all(sig.as_bytes())?;
    file.write_all(payload)?;
    Ok(())
}

fn read_signed(path: &Path) -> Result<Vec<u8>> {
    let mut file = File::open(path)?;
    let mut len_buf = [0u8; 4];
    file.read_exact(&mut len_buf)?;
    let sig_len = u32::from_le_bytes(len_buf) as usize;
    let mut sig_buf = vec![0u8; sig_len];
    file.read_exact(&mut sig_buf)?;
    let expected = String::from_utf8(sig_buf).map_err(|e| CoherenceError::Serialization {
        message: "snapshot signature is not valid UTF-8".to_string(),
        source: Some(Box::new(e)),
    })?;

    let mut payload = Vec::new();
    file.read_to_end(&mut payload)?;
    let actual = digest(&payload);
    if actual != expected {
        return Err(CoherenceError::store_inconsistent(format!(
            "snapshot at {} failed its signature check (expected {expected}, got {actual})",
            path.display()
        )));
    }
    Ok(payload)
}

fn check_version(found: u32, path: &Path) -> Result<()> {
    if found != FORMAT_VERSION {
        return Err(CoherenceError::store_inconsistent(format!(
            "snapshot at {} has format version {found}, expected {FORMAT_VERSION}",
            path.display()
        )));
    }
    Ok(())
}

/// Persist one domain's identifier registry table to `path`.
pub fn save_registry(registry: &IdentifierRegistry, domain: Domain, path: impl AsRef<Path>) -> Result<()> {
    let snapshot = RegistrySnapshot {
        version: FORMAT_VERSION,
        domain,
        canonical: registry.dump_canonical(domain),
        aliases: registry.dump_aliases(domain),
    };
    let payload = bincode::serialize(&snapshot)?;
    tracing::info!(
        domain = ?domain,
        entities = snapshot.canonical.len(),
        aliases = snapshot.aliases.len(),
        path = %path.as_ref().display(),
        "saving identifier registry snapshot"
    );
    write_signed(path.as_ref(), &payload)
}

/// Load a previously persisted registry table, merging into whatever
/// entities `registry` already holds for that domain.
///
/// Restored entity indices are preserved exactly, so a snapshot saved from
/// one registry and loaded into a fresh one reproduces the same
/// external-id-to-index assignment it was saved with.
pub fn load_registry(registry: &mut IdentifierRegistry, domain: Domain, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let payload = read_signed(path)?;
    let snapshot: RegistrySnapshot = bincode::deserialize(&payload)?;
    check_version(snapshot.version, path)?;
    if snapshot.domain != domain {
        return Err(CoherenceError::store_inconsistent(format!(
            "snapshot at {} was saved for a different domain",
            path.display()
        )));
    }
    tracing::info!(
        domain = ?domain,
        entities = snapshot.canonical.len(),
        aliases = snapshot.aliases.len(),
        path = %path.display(),
        "loading identifier registry snapshot"
    );
    registry.restore_canonical(domain, snapshot.canonical);
    registry.restore_aliases(domain, snapshot.aliases);
    Ok(())
}

/// Persist a (domain, coefficient) distance matrix family: the shared entity
/// directory plus every category currently populated under it.
pub fn save_distance(
    store: &SparseDistanceStore,
    domain: Domain,
    coefficient: Coefficient,
    path: impl AsRef<Path>,
) -> Result<()> {
    let directory = store.dump_directory(domain, coefficient);
    let matrices = store
        .categories_present(domain, coefficient)
        .into_iter()
        .map(|category| (category, store.dump_triples(category, coefficient)))
        .collect();
    let snapshot = DistanceSnapshot {
        version: FORMAT_VERSION,
        domain,
        coefficient,
        directory,
        matrices,
    };
    tracing::info!(
        domain = ?snapshot.domain,
        coefficient = ?snapshot.coefficient,
        entities = snapshot.directory.len(),
        categories = snapshot.matrices.len(),
        path = %path.as_ref().display(),
        "saving distance store snapshot"
    );
    let payload = bincode::serialize(&snapshot)?;
    write_signed(path.as_ref(), &payload)
}

/// Load a previously persisted distance matrix family into `store`.
///
/// The directory is restored first so every matrix's row indices land on
/// the same entities they were saved against, then each category's triples
/// are merged in via the normal first-seen-value-wins insert path.
pub fn load_distance(store: &SparseDistanceStore, path: impl AsRef<Path>) -> Result<(Domain, Coefficient)> {
    let path = path.as_ref();
    let payload = read_signed(path)?;
    let snapshot: DistanceSnapshot = bincode::deserialize(&payload)?;
    check_version(snapshot.version, path)?;
    tracing::info!(
        domain = ?snapshot.domain,
        coefficient = ?snapshot.coefficient,
        entities = snapshot.directory.len(),
        categories = snapshot.matrices.len(),
        path = %path.display(),
        "loading distance store snapshot"
    );

    store.append_entities(snapshot.domain, snapshot.coefficient, &snapshot.directory);
    for (category, triples) in snapshot.matrices {
        store.insert_triples(category, snapshot.coefficient, &triples);
    }
    Ok((snapshot.domain, snapshot.coefficient))
}

/// Persist one domain's annotation rows to `path`, resolving terms back to
/// external strings with `interner` so the snapshot carries no dependency on
/// any one process's interning order.
pub fn save_annotations(
    store: &AnnotationStore,
    domain: Domain,
    interner: &StringInterner,
    path: impl AsRef<Path>,
) -> Result<()> {
    let snapshot = AnnotationSnapshot {
        version: FORMAT_VERSION,
        domain,
        rows: store.dump(domain, interner),
    };
    let payload = bincode::serialize(&snapshot)?;
    write_signed(path.as_ref(), &payload)
}

/// Load a previously persisted annotation table, interning its term strings
/// with `interner` and merging via the store's normal idempotent union.
pub fn load_annotations(
    store: &mut AnnotationStore,
    interner: &StringInterner,
    path: impl AsRef<Path>,
) -> Result<Domain> {
    let path = path.as_ref();
    let payload = read_signed(path)?;
    let snapshot: AnnotationSnapshot = bincode::deserialize(&payload)?;
    check_version(snapshot.version, path)?;
    store.load(interner, snapshot.rows);
    Ok(snapshot.domain)
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;
    use crate::domain::GeneCategory;

    #[test]
    fn registry_round_trips_through_a_temp_file() {
        let mut original = IdentifierRegistry::new();
        let tp53 = original.intern(Namespace::Entrez, "7157");
        original.add_alias(Namespace::Symbol, "TP53", tp53);

        let file = tempfile::NamedTempFile::new().unwrap();
        save_registry(&original, Domain::Gene, file.path()).unwrap();

        let mut restored = IdentifierRegistry::new();
        load_registry(&mut restored, Domain::Gene, file.path()).unwrap();

        assert_eq!(restored.lookup(Namespace::Entrez, "7157"), Some(tp53));
        assert_eq!(restored.lookup(Namespace::Symbol, "TP53"), Some(tp53));
    }

    #[test]
    fn registry_load_rejects_domain_mismatch() {
        let registry = IdentifierRegistry::new();
        let file = tempfile::NamedTempFile::new().unwrap();
        save_registry(&registry, Domain::Gene, file.path()).unwrap();

        let mut target = IdentifierRegistry::new();
        let err = load_registry(&mut target, Domain::Disease, file.path()).unwrap_err();
        assert!(matches!(err, CoherenceError::StoreInconsistent { .. }));
    }

    #[test]
    fn distance_round_trips_through_a_temp_file() {
        let category = Category::Gene(GeneCategory::GoBiologicalProcess);
        let store = SparseDistanceStore::new();
        let (domain, coef) = (Domain::Gene, Coefficient::Jaccard);
        store.append_entities(domain, coef, &[10, 20, 30]);
        store.insert_triples(category, coef, &[(0, 1, 0.667)]);

        let file = tempfile::NamedTempFile::new().unwrap();
        save_distance(&store, domain, coef, file.path()).unwrap();

        let restored = SparseDistanceStore::new();
        let (loaded_domain, loaded_coef) = load_distance(&restored, file.path()).unwrap();
        assert_eq!(loaded_domain, domain);
        assert_eq!(loaded_coef, coef);
        assert_abs_diff_eq!(restored.get(category, coef, 10, 20), 0.667, epsilon = 1e-6);
    }

    #[test]
    fn annotations_round_trip_through_a_temp_file_with_a_fresh_interner() {
        let category = Category::Gene(GeneCategory::GoMolecularFunction);
        let source_interner = StringInterner::new();
        let mut store = AnnotationStore::new();
        let terms = crate::annotation::TermSet::from_terms(
            ["GO:1", "GO:2"].iter().map(|t| source_interner.get_or_intern(t)),
        );
        store.extend([(7, category, terms)]);

        let file = tempfile::NamedTempFile::new().unwrap();
        save_annotations(&store, Domain::Gene, &source_interner, file.path()).unwrap();

        let target_interner = StringInterner::new();
        let mut restored = AnnotationStore::new();
        let loaded_domain = load_annotations(&mut restored, &target_interner, file.path()).unwrap();
        assert_eq!(loaded_domain, Domain::Gene);
        assert_eq!(restored.get_terms(7, category).len(), 2);
    }

    #[test]
    fn tampered_payload_fails_the_signature_check() {
        let registry = IdentifierRegistry::new();
        let file = tempfile::NamedTempFile::new().unwrap();
        save_registry(&registry, Domain::Gene, file.path()).unwrap();

        let mut bytes = std::fs::read(file.path()).unwrap();
        *bytes.last_mut().unwrap() ^= 0xFF;
        std::fs::write(file.path(), bytes).unwrap();

        let mut target = IdentifierRegistry::new();
        let err = load_registry(&mut target, Domain::Gene, file.path()).unwrap_err();
        assert!(matches!(err, CoherenceError::StoreInconsistent { .. }));
    }
}
