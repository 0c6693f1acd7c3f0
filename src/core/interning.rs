//! String interning infrastructure for memory-efficient identifier handling.
//!
//! External ids (entrez/mondo numbers, GO term accessions, KEGG pathway ids)
//! repeat constantly across a validation run: the same term set is looked up
//! for every candidate in a background draw, and the same external id is
//! resolved back out of the registry for every reported category. Interning
//! them once with `lasso` turns every subsequent comparison into an integer
//! comparison instead of a string comparison.
//!
//! # Usage
//!
//! ```ignore
//! use coherence_engine::core::interning::{intern, resolve};
//!
//! let key = intern("GO:0006915");
//! assert_eq!(resolve(key), "GO:0006915");
//! ```

use lasso::{Capacity, Spur, ThreadedRodeo};
use std::sync::Arc;

/// A lightweight key representing an interned string.
pub type InternedString = Spur;

/// Thread-safe string interner shared across the registry, annotation store,
/// and comparators.
#[derive(Clone)]
pub struct StringInterner {
    inner: Arc<ThreadedRodeo>,
}

/// Factory, interning, and lookup methods for [`StringInterner`].
impl StringInterner {
    /// Create a new string interner with default capacity.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(ThreadedRodeo::default()),
        }
    }

    /// Create a new string interner with specified capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Arc::new(ThreadedRodeo::with_capacity(Capacity::for_strings(
                capacity,
            ))),
        }
    }

    /// Intern a string and return its key, or return the existing key if already interned.
    pub fn get_or_intern<S: AsRef<str>>(&self, string: S) -> InternedString {
        self.inner.get_or_intern(string.as_ref())
    }

    /// Batch intern multiple strings, e.g. a term set read off an annotation source.
    pub fn batch_intern<S: AsRef<str>>(&self, strings: &[S]) -> Vec<InternedString> {
        strings
            .iter()
            .map(|s| self.inner.get_or_intern(s.as_ref()))
            .collect()
    }

    /// Get the key for an already-interned string, returns `None` if not found.
    pub fn get<S: AsRef<str>>(&self, string: S) -> Option<InternedString> {
        self.inner.get(string.as_ref())
    }

    /// Resolve an interned string key back to the original string.
    pub fn resolve(&self, key: InternedString) -> &str {
        self.inner.resolve(&key)
    }

    /// Check if a string is already interned.
    pub fn contains<S: AsRef<str>>(&self, string: S) -> bool {
        self.inner.contains(string.as_ref())
    }

    /// Get the number of interned strings.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Check if the interner is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

/// Default implementation for [`StringInterner`].
impl Default for StringInterner {
    fn default() -> Self {
        Self::new()
    }
}

/// [`Debug`] implementation for [`StringInterner`].
impl std::fmt::Debug for StringInterner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StringInterner")
            .field("len", &self.len())
            .finish()
    }
}

/// Global string interner instance, shared by default-constructed stores
/// that do not explicitly wire their own interner.
static GLOBAL_INTERNER: once_cell::sync::Lazy<StringInterner> =
    once_cell::sync::Lazy::new(|| StringInterner::with_capacity(100_000));

/// Get a reference to the global string interner.
pub fn global_interner() -> &'static StringInterner {
    &GLOBAL_INTERNER
}

/// Convenience function to intern a string using the global interner.
pub fn intern<S: AsRef<str>>(string: S) -> InternedString {
    global_interner().get_or_intern(string)
}

/// Convenience function to resolve an interned string using the global interner.
pub fn resolve(key: InternedString) -> &'static str {
    global_interner().resolve(key)
}
