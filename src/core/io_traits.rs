//! Collaborator traits the core depends on but never implements itself.
//!
//! `AnnotationSource` and `EntityNetwork` are the external seams: the
//! one-off setup job that populates the [`crate::annotation::AnnotationStore`]
//! implements the former, and an embedder wanting `NetworkPreserving`
//! sampling implements the latter against whatever graph representation it
//! already has (a PPI network loaded from IID, say). The core never reaches
//! out to a network or a file system through either trait; it only calls
//! through them when the embedder hands it an implementation.

use crate::domain::{Category, EntityIndex};
use crate::annotation::TermSet;

/// Fetches a term set for one entity/category pair from an external
/// annotation service (e.g. a gene/disease ontology API).
///
/// Used by the setup job that populates an [`crate::annotation::AnnotationStore`]
/// before a validation run; the Distance Extender and comparators never call
/// this directly, they only read what has already been stored.
pub trait AnnotationSource {
    /// Fetch the term set recorded externally for `entity` under `category`.
    fn fetch(&self, entity: EntityIndex, category: Category) -> TermSet;
}

/// An undirected entity network, used by the `NetworkPreserving` background
/// sampler to generate degree-matched random walks.
///
/// The core models only unweighted adjacency; a weighted or directed graph
/// is out of scope.
pub trait EntityNetwork {
    /// Iterator over the neighbors of `entity` in the network.
    fn neighbors(&self, entity: EntityIndex) -> Box<dyn Iterator<Item = EntityIndex> + '_>;

    /// Iterator over every vertex present in the network.
    fn vertices(&self) -> Box<dyn Iterator<Item = EntityIndex> + '_>;

    /// Degree of `entity` in the network (`0` if absent).
    fn degree(&self, entity: EntityIndex) -> usize {
        self.neighbors(entity).count()
    }
}
