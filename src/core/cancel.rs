//! Cooperative cancellation signal for the Validation Driver.
//!
//! A plain `Arc<AtomicBool>` rather than a channel or `tokio_util`'s
//! `CancellationToken`: the driver only ever needs a flag an embedder can
//! flip from another thread, checked at well-defined suspension points
//! (before each randomized run, before each per-category comparator loop).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A cheaply cloned cancellation flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Construct a token that has not been cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
