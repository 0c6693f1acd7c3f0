//! # coherence-engine: empirical functional-coherence validation
//!
//! Evaluates whether a user-supplied collection of biomedical identifiers
//! (genes or diseases) is *functionally coherent* — more internally similar,
//! or more similar to a reference, than random draws from a background
//! population would be. Given a set, a set-vs-set pair, an id-vs-set pair, or
//! a clustering, the engine emits an empirical p-value per annotation
//! category by comparing an observed similarity statistic against the
//! distribution of the same statistic over many randomized inputs.
//!
//! This crate is the validation engine only: the command-line front-end,
//! result-file and plot emission, remote attribute look-ups against
//! third-party annotation services, and the setup jobs that build the
//! initial distance files are external collaborators. The engine consumes an
//! [`annotation::AnnotationStore`] plus a [`distance::SparseDistanceStore`]
//! (together a [`validation::CoherenceStore`]) and a random number generator;
//! it exposes a single [`validation::ValidationDriver::validate`] entry point.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                      ValidationDriver::validate                  │
//! ├───────────────┬───────────────┬───────────────┬──────────────────┤
//! │  Comparator   │   Sampler     │  Score        │  Registry /      │
//! │  family       │   family      │  Calculator   │  Annotation /    │
//! │               │               │  (SS/DI/DBI)  │  Distance stores │
//! │ SetSelf       │ Uniform       │               │                  │
//! │ SetRef        │ TermPres      │               │ Identifier       │
//! │ IdRef         │ NetworkPres   │               │ registry, term   │
//! │ Clustering    │               │               │ sets, sparse     │
//! │               │               │               │ distance matrix  │
//! └───────────────┴───────────────┴───────────────┴──────────────────┘
//! ```
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use coherence_engine::core::config::{EngineConfig, ValidationRequest};
//! use coherence_engine::core::cancel::CancelToken;
//! use coherence_engine::comparator::{Comparator, TargetInput};
//! use coherence_engine::distance::coefficient::Coefficient;
//! use coherence_engine::sampler::SamplerKind;
//! use coherence_engine::validation::{CoherenceStore, ValidationDriver};
//!
//! # async fn run() -> coherence_engine::core::errors::Result<()> {
//! let store = CoherenceStore::new();
//! let engine_config = EngineConfig::default();
//! let driver = ValidationDriver::new(&store, &engine_config);
//!
//! let target = TargetInput::SingleSet {
//!     ids: vec!["7157".into(), "672".into(), "675".into()],
//!     id_type: "entrez".into(),
//! };
//! let request = ValidationRequest {
//!     n_random: 999,
//!     coefficient: Coefficient::Jaccard,
//!     sampler: SamplerKind::Uniform,
//!     replace_pct: 100,
//!     threshold: 0.5,
//!     enriched: false,
//!     seed: 42,
//! };
//! let cancel = CancelToken::new();
//! let report = driver
//!     .validate(&request, Comparator::SetSelf, &target, None, &cancel)
//!     .await?;
//! println!("status: {:?}", report.status);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(unsafe_code)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::similar_names)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::too_many_arguments)]
#![allow(clippy::type_complexity)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

/// Closed enumerations for entity domains, id namespaces, and attribute
/// categories shared by every other module.
pub mod domain;

/// Ambient engineering: error taxonomy, string interning, configuration, and
/// the collaborator traits the core is built against but does not itself
/// implement (`AnnotationSource`, `EntityNetwork`).
pub mod core;

/// Identifier Registry: interns external ids into dense entity indices per
/// namespace, including ICD-10 range expansion.
pub mod registry;

/// Annotation Store: per-(domain, category) maps from entity-index to term set.
pub mod annotation;

/// Sparse Distance Store and the Distance Extender that fills it on demand.
pub mod distance;

/// The four comparator strategies (`SetSelf`, `SetRef`, `IdRef`, `Clustering`)
/// plus enrichment filtering for reference term sets.
pub mod comparator;

/// Cluster-validity score calculator (Silhouette, Dunn, Davies-Bouldin).
pub mod score;

/// The three background-sampling strategies (`Uniform`, `TermPreserving`,
/// `NetworkPreserving`).
pub mod sampler;

/// The Validation Driver: composes a comparator and a sampler, runs `N`
/// randomized repetitions, and derives empirical p-values.
pub mod validation;

/// On-disk snapshot persistence for the registry, distance, and annotation
/// stores.
pub mod io;

// Re-export the primary entry points for convenience.
pub use comparator::{Comparator, TargetInput};
pub use core::errors::{CoherenceError, Result};
pub use validation::{CoherenceStore, Report, ValidationDriver};

/// Library version, taken from `Cargo.toml` at build time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
