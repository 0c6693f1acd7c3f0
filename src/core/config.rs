//! Configuration types for the validation engine.
//!
//! Mirrors the `serde`-derived, field-default configuration style used
//! throughout this codebase: every tunable carries a `#[serde(default =
//! ...)]` constant so a caller's partial YAML/JSON config still deserializes,
//! and a `validate()` pass rejects out-of-range values before they reach the
//! driver.

use serde::{Deserialize, Serialize};

use crate::core::errors::Result;
use crate::distance::coefficient::Coefficient;
use crate::sampler::SamplerKind;

/// Top-level performance tuning knobs, independent of any single request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Entities-to-extend threshold above which the Distance Extender
    /// parallelizes its all-pairs scan with `rayon` instead of running serially.
    #[serde(default = "EngineConfig::default_parallel_extension_threshold")]
    pub parallel_extension_threshold: usize,

    /// Minimum cumulative population a widened term-size bucket must reach
    /// before the term-preserving sampler draws from it.
    #[serde(default = "EngineConfig::default_term_bucket_threshold")]
    pub term_bucket_threshold: usize,
}

impl EngineConfig {
    const fn default_parallel_extension_threshold() -> usize {
        64
    }

    const fn default_term_bucket_threshold() -> usize {
        100
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            parallel_extension_threshold: Self::default_parallel_extension_threshold(),
            term_bucket_threshold: Self::default_term_bucket_threshold(),
        }
    }
}

/// A single `validate()` request, corresponding to one report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationRequest {
    /// Number of randomized background repetitions.
    pub n_random: u32,
    /// Similarity coefficient used by every comparator invocation.
    pub coefficient: Coefficient,
    /// Background sampling strategy.
    pub sampler: SamplerKind,
    /// Percentage of the original id-set replaced per randomized run, `0..=100`.
    pub replace_pct: u8,
    /// Similarity threshold used by `SetRef`/`IdRef`, `0.0..=1.0`.
    pub threshold: f64,
    /// Whether `SetRef`/`IdRef` restrict the reference term set to
    /// significantly over-represented terms.
    pub enriched: bool,
    /// Seed the driver derives per-run child RNGs from.
    pub seed: u64,
}

/// Validate a usize value is greater than zero.
pub fn validate_positive_usize(value: usize, field: &str) -> Result<()> {
    if value == 0 {
        return Err(crate::core::errors::CoherenceError::invalid_request_field(
            format!("{field} must be greater than 0"),
            field,
        ));
    }
    Ok(())
}

/// Validate a percentage value lies in `0..=100`.
pub fn validate_percentage(value: u8, field: &str) -> Result<()> {
    if value > 100 {
        return Err(crate::core::errors::CoherenceError::invalid_request_field(
            format!("{field} must be between 0 and 100"),
            field,
        ));
    }
    Ok(())
}

/// Validate an f64 value lies in the unit range `[0.0, 1.0]`.
pub fn validate_unit_range(value: f64, field: &str) -> Result<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(crate::core::errors::CoherenceError::invalid_request_field(
            format!("{field} must be between 0.0 and 1.0"),
            field,
        ));
    }
    Ok(())
}

impl ValidationRequest {
    /// Validate every field, returning the first violation found.
    pub fn validate(&self) -> Result<()> {
        validate_positive_usize(self.n_random as usize, "n_random")?;
        validate_percentage(self.replace_pct, "replace_pct")?;
        validate_unit_range(self.threshold, "threshold")?;
        Ok(())
    }
}
