//! External persistence for the long-lived stores: the identifier registry,
//! the sparse distance store, and the annotation store.
//!
//! None of the three stores owns a file format of its own; each exposes
//! plain `dump_*`/`restore_*`/`load` accessors over its in-memory layout, and
//! [`persistence`] is the only place that turns those accessors into bytes
//! on disk.

pub mod persistence;
