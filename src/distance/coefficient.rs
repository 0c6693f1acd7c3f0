//! Similarity coefficients over term sets.

use serde::{Deserialize, Serialize};

use crate::annotation::TermSet;

/// A similarity coefficient over two term sets.
///
/// Both variants return `0.0` if either set is empty or if the intersection
/// is empty; otherwise the value lies in `(0, 1]`. The stored/returned value
/// is the coefficient itself (higher means more similar), never a distance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Coefficient {
    /// `|A∩B| / |A∪B|`.
    Jaccard,
    /// `|A∩B| / min(|A|, |B|)`.
    Overlap,
}

impl Coefficient {
    /// Evaluate the coefficient over two term sets.
    pub fn evaluate(&self, a: &TermSet, b: &TermSet) -> f64 {
        match self {
            Coefficient::Jaccard => jaccard(a, b),
            Coefficient::Overlap => overlap(a, b),
        }
    }
}

/// Jaccard similarity: `|A∩B| / |A∪B|`. `0.0` if both sets are empty.
pub fn jaccard(a: &TermSet, b: &TermSet) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection_count(b);
    if intersection == 0 {
        return 0.0;
    }
    let union = a.len() + b.len() - intersection;
    intersection as f64 / union as f64
}

/// Overlap coefficient: `|A∩B| / min(|A|, |B|)`. `0.0` if either set is empty.
pub fn overlap(a: &TermSet, b: &TermSet) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection_count(b);
    if intersection == 0 {
        return 0.0;
    }
    intersection as f64 / a.len().min(b.len()) as f64
}
