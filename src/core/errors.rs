//! Error types for the coherence-engine library.
//!
//! This module provides the error taxonomy used across the validation engine,
//! with structured error types that preserve context and enable proper error
//! propagation from comparators and samplers up through the Validation Driver.

use std::fmt;
use std::io;
use std::num::{ParseFloatError, ParseIntError};

use thiserror::Error;

/// Main result type for coherence-engine operations.
pub type Result<T> = std::result::Result<T, CoherenceError>;

/// Comprehensive error type for the validation engine.
///
/// Each variant corresponds to one of the failure kinds named in the error
/// handling design: malformed requests, failed canonicalization, an
/// exhausted background pool, a broken store invariant, cooperative
/// cancellation, and I/O failures during load/persist.
#[derive(Error, Debug)]
pub enum CoherenceError {
    /// Malformed target, unknown id-type, or unsupported cross-domain pairing.
    #[error("invalid request: {message}")]
    InvalidRequest {
        /// Human-readable description.
        message: String,
        /// Request field that caused the error, if known.
        field: Option<String>,
    },

    /// Canonicalization yielded no known entities for every category.
    #[error("no mapping: {message}")]
    NoMapping {
        /// Human-readable description.
        message: String,
    },

    /// The background sampler could not meet the required replacement count.
    #[error("insufficient background: {message}")]
    InsufficientBackground {
        /// Human-readable description.
        message: String,
        /// Number of candidates required.
        required: usize,
        /// Number of candidates available.
        available: usize,
    },

    /// A store invariant was violated (e.g. a matrix row outside directory bounds).
    ///
    /// Fatal: callers should treat this as unrecoverable and abort the
    /// surrounding process rather than attempt to continue against a store
    /// that has already violated its own invariants.
    #[error("store inconsistent: {message}")]
    StoreInconsistent {
        /// Human-readable description.
        message: String,
    },

    /// Cooperative cancellation was observed.
    #[error("cancelled: {message}")]
    Cancelled {
        /// Human-readable description.
        message: String,
    },

    /// I/O failure during load or persist.
    #[error("I/O error: {message}")]
    Io {
        /// Human-readable description.
        message: String,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Serialization/deserialization failure during load or persist.
    #[error("serialization error: {message}")]
    Serialization {
        /// Human-readable description.
        message: String,
        /// Underlying error, if any.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl CoherenceError {
    /// Create a new invalid-request error.
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
            field: None,
        }
    }

    /// Create a new invalid-request error naming the offending field.
    pub fn invalid_request_field(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Create a new unknown-id-namespace error.
    pub fn unknown_id_type(namespace: impl fmt::Display) -> Self {
        Self::InvalidRequest {
            message: format!("unknown id namespace: {namespace}"),
            field: Some("id_type".to_string()),
        }
    }

    /// Create a new unsupported-cross-domain error.
    pub fn unsupported_cross_domain(reference: impl fmt::Display, target: impl fmt::Display) -> Self {
        Self::InvalidRequest {
            message: format!("unsupported cross-domain pairing: {reference} vs {target}"),
            field: None,
        }
    }

    /// Create a new no-mapping error.
    pub fn no_mapping(message: impl Into<String>) -> Self {
        Self::NoMapping {
            message: message.into(),
        }
    }

    /// Create a new insufficient-background error.
    pub fn insufficient_background(required: usize, available: usize) -> Self {
        Self::InsufficientBackground {
            message: format!(
                "background pool has {available} candidates, need {required}"
            ),
            required,
            available,
        }
    }

    /// Create a new store-inconsistency error.
    pub fn store_inconsistent(message: impl Into<String>) -> Self {
        Self::StoreInconsistent {
            message: message.into(),
        }
    }

    /// Create a new cancellation error.
    pub fn cancelled(message: impl Into<String>) -> Self {
        Self::Cancelled {
            message: message.into(),
        }
    }

    /// Create a new I/O error with context.
    pub fn io(message: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source,
        }
    }
}

impl From<io::Error> for CoherenceError {
    fn from(err: io::Error) -> Self {
        Self::io("I/O operation failed", err)
    }
}

impl From<bincode::Error> for CoherenceError {
    fn from(err: bincode::Error) -> Self {
        Self::Serialization {
            message: format!("bincode (de)serialization failed: {err}"),
            source: Some(Box::new(err)),
        }
    }
}

impl From<ParseIntError> for CoherenceError {
    fn from(err: ParseIntError) -> Self {
        Self::invalid_request(format!("invalid integer: {err}"))
    }
}

impl From<ParseFloatError> for CoherenceError {
    fn from(err: ParseFloatError) -> Self {
        Self::invalid_request(format!("invalid float: {err}"))
    }
}

/// Result extension trait for attaching stage context to a propagating error.
pub trait ResultExt<T> {
    /// Prefix the error's message with `context` without changing its kind.
    fn context(self, context: &'static str) -> Result<T>;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<CoherenceError>,
{
    fn context(self, context: &'static str) -> Result<T> {
        self.map_err(|e| {
            let err = e.into();
            match err {
                CoherenceError::InvalidRequest { message, field } => CoherenceError::InvalidRequest {
                    message: format!("{context}: {message}"),
                    field,
                },
                CoherenceError::NoMapping { message } => CoherenceError::NoMapping {
                    message: format!("{context}: {message}"),
                },
                CoherenceError::InsufficientBackground {
                    message,
                    required,
                    available,
                } => CoherenceError::InsufficientBackground {
                    message: format!("{context}: {message}"),
                    required,
                    available,
                },
                CoherenceError::StoreInconsistent { message } => CoherenceError::StoreInconsistent {
                    message: format!("{context}: {message}"),
                },
                CoherenceError::Cancelled { message } => CoherenceError::Cancelled {
                    message: format!("{context}: {message}"),
                },
                CoherenceError::Io { message, source } => CoherenceError::Io {
                    message: format!("{context}: {message}"),
                    source,
                },
                CoherenceError::Serialization { message, source } => CoherenceError::Serialization {
                    message: format!("{context}: {message}"),
                    source,
                },
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_creation() {
        let err = CoherenceError::no_mapping("empty category");
        assert!(matches!(err, CoherenceError::NoMapping { .. }));

        let err = CoherenceError::insufficient_background(10, 3);
        assert!(matches!(err, CoherenceError::InsufficientBackground { .. }));
    }

    #[test]
    fn context_prefixes_message() {
        let result: std::result::Result<(), io::Error> =
            Err(io::Error::new(io::ErrorKind::NotFound, "missing file"));
        let err = result.context("loading directory").unwrap_err();
        assert!(err.to_string().contains("loading directory"));
    }
}
