//! Background Sampler family: produces replacement id-sets of a requested
//! size for the Validation Driver's randomized runs.
//!
//! As with [`crate::comparator::Comparator`], this is a tagged enum over
//! free functions rather than a trait object: `SamplerKind` names the three
//! implemented strategies, and [`SamplerKind::draw`] is the single dispatch
//! point the driver calls once per randomized run.

mod network_preserving;
mod term_preserving;
mod uniform;

use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::core::errors::Result;
use crate::core::io_traits::EntityNetwork;
use crate::domain::{Domain, EntityIndex, Namespace};
use crate::registry::IdentifierRegistry;

pub use network_preserving::NetworkPreservingState;
pub use term_preserving::TermPreservingState;

/// The three background-sampling strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SamplerKind {
    /// Each replacement drawn independently and uniformly from the candidate pool.
    Uniform,
    /// Replacements drawn to approximate the original's per-entity annotation size.
    TermPreserving,
    /// Replacements drawn as a degree-matched random walk over an entity network.
    NetworkPreserving,
}

/// Precomputed state a sampler may need across every randomized run of one
/// request. `Uniform` needs none; `TermPreserving` precomputes a size
/// lookup; `NetworkPreserving` generates every run's replacement module up
/// front in one precomputation phase.
pub enum SamplerState<'a> {
    /// No precomputation required.
    Uniform,
    /// See [`TermPreservingState`].
    TermPreserving(TermPreservingState<'a>),
    /// See [`NetworkPreservingState`].
    NetworkPreserving(NetworkPreservingState),
}

/// Immutable references and parameters a sampler draw needs.
pub struct SamplerContext<'a> {
    /// Identifier registry, used to enumerate the domain-wide candidate pool.
    pub registry: &'a IdentifierRegistry,
    /// Annotation store, used by `TermPreserving` to size candidates.
    pub annotations: &'a crate::annotation::AnnotationStore,
    /// Entity domain the draw is restricted to.
    pub domain: Domain,
    /// Namespace the original id-set (and its replacements) are expressed in.
    pub namespace: Namespace,
    /// Percentage of the original set replaced per run, `0..=100`.
    pub replace_pct: u8,
    /// Minimum cumulative bucket population before `TermPreserving` stops widening.
    pub term_bucket_threshold: usize,
}

impl SamplerKind {
    /// Precompute whatever state this sampler needs once per request, ahead
    /// of `n_random` calls to [`Self::draw`].
    pub fn prepare<'a>(
        &self,
        ctx: &SamplerContext<'a>,
        original: &[EntityIndex],
        n_random: u32,
        network: Option<&'a dyn EntityNetwork>,
        seed: u64,
    ) -> Result<SamplerState<'a>> {
        match self {
            SamplerKind::Uniform => Ok(SamplerState::Uniform),
            SamplerKind::TermPreserving => Ok(SamplerState::TermPreserving(
                term_preserving::prepare(ctx, original),
            )),
            SamplerKind::NetworkPreserving => {
                let network = network.ok_or_else(|| {
                    crate::core::errors::CoherenceError::invalid_request(
                        "network-preserving sampler requires an EntityNetwork",
                    )
                })?;
                Ok(SamplerState::NetworkPreserving(network_preserving::prepare(
                    network, original, n_random, seed,
                )?))
            }
        }
    }

    /// Draw replacement set `run` of `original`'s size, keeping `original`'s
    /// un-replaced members fixed for this run.
    pub fn draw(
        &self,
        ctx: &SamplerContext<'_>,
        state: &SamplerState<'_>,
        original: &[EntityIndex],
        run: u32,
        rng: &mut ChaCha8Rng,
    ) -> Result<Vec<EntityIndex>> {
        let (keepers, n_replace) = select_keepers(original, ctx.replace_pct, rng);
        if n_replace == 0 {
            return Ok(original.to_vec());
        }

        let excluded: std::collections::HashSet<EntityIndex> = keepers.iter().copied().collect();

        let replacements = match (self, state) {
            (SamplerKind::Uniform, SamplerState::Uniform) => {
                uniform::draw(ctx, &excluded, n_replace, rng)?
            }
            (SamplerKind::TermPreserving, SamplerState::TermPreserving(state)) => {
                term_preserving::draw(ctx, state, original, &keepers, n_replace, rng)?
            }
            (SamplerKind::NetworkPreserving, SamplerState::NetworkPreserving(state)) => {
                network_preserving::draw(state, run)?
            }
            _ => {
                return Err(crate::core::errors::CoherenceError::invalid_request(
                    "sampler state does not match the requested sampler kind",
                ))
            }
        };

        let mut out = keepers;
        out.extend(replacements);
        Ok(out)
    }
}

/// Split `original` into `(keepers, n_to_replace)`: `original.len() -
/// floor(len*pct/100)` elements kept via an unbiased partial shuffle, the
/// remainder left for the caller to replace.
fn select_keepers(
    original: &[EntityIndex],
    replace_pct: u8,
    rng: &mut ChaCha8Rng,
) -> (Vec<EntityIndex>, usize) {
    let m = original.len();
    let n_replace = (m * replace_pct as usize) / 100;
    let n_keep = m - n_replace;

    let mut shuffled = original.to_vec();
    shuffled.shuffle(rng);
    shuffled.truncate(n_keep);
    (shuffled, n_replace)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::rng::child_rng;

    #[test]
    fn zero_percent_replacement_keeps_every_original_entity() {
        let original = vec![1, 2, 3, 4];
        let mut rng = child_rng(1, 0);
        let (keepers, n_replace) = select_keepers(&original, 0, &mut rng);
        assert_eq!(n_replace, 0);
        assert_eq!(keepers.len(), 4);
    }

    #[test]
    fn full_replacement_keeps_nothing() {
        let original = vec![1, 2, 3, 4];
        let mut rng = child_rng(1, 0);
        let (keepers, n_replace) = select_keepers(&original, 100, &mut rng);
        assert_eq!(n_replace, 4);
        assert!(keepers.is_empty());
    }

    #[test]
    fn partial_replacement_splits_by_floor() {
        let original = vec![1, 2, 3, 4, 5];
        let mut rng = child_rng(1, 0);
        let (keepers, n_replace) = select_keepers(&original, 40, &mut rng); // floor(5*0.4)=2
        assert_eq!(n_replace, 2);
        assert_eq!(keepers.len(), 3);
    }
}
