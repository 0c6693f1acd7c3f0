//! Validation Driver: composes a comparator and a background sampler, runs
//! `n_random` randomized repetitions, and derives empirical p-values.
//!
//! `validate` is declared `async` so that its suspension points
//! (cancellation, backpressure between random runs) are real `.await`
//! points for an embedder to build on. The work itself is CPU-bound and
//! runs synchronously in the calling task: it does not hop onto
//! `tokio::task::block_in_place` (which panics outside a multi-thread
//! runtime) or `spawn_blocking` (which would force the borrowed store
//! references below to be `'static`). An embedder driving many concurrent
//! `validate` calls on a single-threaded executor is expected to dispatch
//! each one via its own task/thread.

use std::collections::HashMap;

use rayon::prelude::*;

use crate::annotation::AnnotationStore;
use crate::comparator::{CompareContext, Comparator, ComparisonOutcome, Metric, TargetInput};
use crate::core::cancel::CancelToken;
use crate::core::config::{EngineConfig, ValidationRequest};
use crate::core::errors::{CoherenceError, Result};
use crate::core::io_traits::EntityNetwork;
use crate::core::rng::child_rng;
use crate::distance::extender::DistanceExtender;
use crate::distance::SparseDistanceStore;
use crate::domain::{Category, EntityIndex};
use crate::registry::IdentifierRegistry;
use crate::sampler::{SamplerContext, SamplerState};

/// Outcome discriminant carried by a [`Report`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportStatus {
    /// Every requested run completed.
    Ok,
    /// Canonicalization yielded no known entities; no randomized runs were attempted.
    NoMapping,
    /// Cooperative cancellation was observed; `random_scores` holds only completed runs.
    Cancelled,
}

/// The result of one `validate()` call.
#[derive(Debug, Clone, Default)]
pub struct Report {
    /// Observed statistic, per metric per category.
    pub input_scores: HashMap<Metric, HashMap<Category, f64>>,
    /// One entry per completed randomized run, per metric per category.
    pub random_scores: HashMap<Metric, Vec<HashMap<Category, f64>>>,
    /// Empirical p-value, per metric per category.
    pub p_values: HashMap<Metric, HashMap<Category, f64>>,
    /// External ids actually scored, per category.
    pub mapped_ids: HashMap<Category, Vec<String>>,
    /// Outcome discriminant.
    pub status: ReportStatus,
}

impl Default for ReportStatus {
    fn default() -> Self {
        ReportStatus::Ok
    }
}

/// Empirical add-one p-value estimator.
///
/// Never returns 0; the result is always a multiple of `1/(n+1)` where `n =
/// randoms.len()`.
pub fn empirical_p_value(observed: f64, randoms: &[f64], maximizing: bool) -> f64 {
    let at_least_as_extreme = randoms
        .iter()
        .filter(|&&x| if maximizing { x >= observed } else { x <= observed })
        .count();
    (1.0 + at_least_as_extreme as f64) / (randoms.len() as f64 + 1.0)
}

/// Bundles the three append-only stores a validation run reads from.
pub struct CoherenceStore {
    /// Identifier registry.
    pub registry: IdentifierRegistry,
    /// Annotation store.
    pub annotations: AnnotationStore,
    /// Sparse distance store.
    pub distances: SparseDistanceStore,
}

impl CoherenceStore {
    /// Construct an empty store triple sharing one string interner.
    pub fn new() -> Self {
        Self {
            registry: IdentifierRegistry::new(),
            annotations: AnnotationStore::new(),
            distances: SparseDistanceStore::new(),
        }
    }
}

impl Default for CoherenceStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Composes a [`Comparator`] and the sampler named in a [`ValidationRequest`]
/// over a [`CoherenceStore`] to produce a [`Report`].
pub struct ValidationDriver<'a> {
    store: &'a CoherenceStore,
    engine_config: &'a EngineConfig,
}

impl<'a> ValidationDriver<'a> {
    /// Construct a driver over `store`, tuned by `engine_config`.
    pub fn new(store: &'a CoherenceStore, engine_config: &'a EngineConfig) -> Self {
        Self { store, engine_config }
    }

    /// Run one validation request to completion.
    ///
    /// `network` is required only when `request.sampler` is
    /// [`crate::sampler::SamplerKind::NetworkPreserving`].
    ///
    /// This does CPU-bound work directly on the calling task rather than
    /// yielding to a blocking-pool thread, so it carries no requirement on
    /// the embedder's tokio runtime flavor; it runs equally well on a
    /// current-thread or multi-thread runtime.
    pub async fn validate(
        &self,
        request: &ValidationRequest,
        comparator: Comparator,
        target: &TargetInput,
        network: Option<&dyn EntityNetwork>,
        cancel: &CancelToken,
    ) -> Result<Report> {
        self.validate_blocking(request, comparator, target, network, cancel)
    }

    fn compare_context(&self, request: &ValidationRequest, cancel: &'a CancelToken) -> CompareContext<'a> {
        CompareContext {
            registry: &self.store.registry,
            annotations: &self.store.annotations,
            distances: &self.store.distances,
            extender: DistanceExtender::new(self.engine_config.parallel_extension_threshold),
            coefficient: request.coefficient,
            threshold: request.threshold,
            enriched: request.enriched,
            cancel,
        }
    }

    fn validate_blocking(
        &self,
        request: &ValidationRequest,
        comparator: Comparator,
        target: &TargetInput,
        network: Option<&dyn EntityNetwork>,
        cancel: &CancelToken,
    ) -> Result<Report> {
        request.validate()?;
        tracing::debug!(
            n_random = request.n_random,
            coefficient = ?request.coefficient,
            sampler = ?request.sampler,
            "starting validation run"
        );
        let ctx = self.compare_context(request, cancel);

        let input_outcome = match comparator.compare(&ctx, target) {
            Ok(outcome) => outcome,
            Err(CoherenceError::NoMapping { message }) => {
                tracing::warn!(%message, "target did not canonicalize to any known entity");
                return Ok(Report {
                    status: ReportStatus::NoMapping,
                    ..Report::default()
                })
            }
            Err(other) => return Err(other),
        };

        let (original_ids, namespace_name) = target.resampled_ids();
        let namespace = IdentifierRegistry::resolve_namespace(namespace_name)?;
        let domain = namespace.domain();
        let original_entities = self.store.registry.canonicalize_all(&original_ids, namespace)?;

        let sampler_ctx = SamplerContext {
            registry: &self.store.registry,
            annotations: &self.store.annotations,
            domain,
            namespace,
            replace_pct: request.replace_pct,
            term_bucket_threshold: self.engine_config.term_bucket_threshold,
        };

        let state = request.sampler.prepare(
            &sampler_ctx,
            &original_entities,
            request.n_random,
            network,
            request.seed,
        )?;

        if cancel.is_cancelled() {
            return Ok(partial_report(input_outcome, Vec::new(), ReportStatus::Cancelled));
        }

        let run_outcomes = self.run_randomized(
            request,
            comparator,
            target,
            &ctx,
            &sampler_ctx,
            &state,
            &original_entities,
            cancel,
        )?;

        let status = if cancel.is_cancelled() {
            ReportStatus::Cancelled
        } else {
            ReportStatus::Ok
        };
        tracing::debug!(
            completed_runs = run_outcomes.len(),
            requested_runs = request.n_random,
            status = ?status,
            "validation run finished"
        );
        Ok(partial_report(input_outcome, run_outcomes, status))
    }

    fn run_randomized(
        &self,
        request: &ValidationRequest,
        comparator: Comparator,
        target: &TargetInput,
        ctx: &CompareContext<'_>,
        sampler_ctx: &SamplerContext<'_>,
        state: &SamplerState<'_>,
        original_entities: &[EntityIndex],
        cancel: &CancelToken,
    ) -> Result<Vec<ComparisonOutcome>> {
        let namespace = sampler_ctx.namespace;
        let runs: Vec<u32> = (0..request.n_random).collect();
        let outcomes: Vec<Option<Result<ComparisonOutcome>>> = runs
            .into_par_iter()
            .map(|run| -> Option<Result<ComparisonOutcome>> {
                if cancel.is_cancelled() {
                    return None;
                }
                let mut rng = child_rng(request.seed, run);
                let result = (|| -> Result<ComparisonOutcome> {
                    let replacement_entities =
                        request.sampler.draw(sampler_ctx, state, original_entities, run, &mut rng)?;
                    let replacement_ids: Vec<String> = replacement_entities
                        .iter()
                        .map(|&e| {
                            self.store
                                .registry
                                .external_of(e, namespace)
                                .into_iter()
                                .next()
                                .unwrap_or_default()
                        })
                        .collect();
                    let run_target = target.with_resampled_ids(replacement_ids);
                    comparator.compare(ctx, &run_target)
                })();
                Some(result)
            })
            .collect();

        let mut completed = Vec::with_capacity(outcomes.len());
        for outcome in outcomes {
            match outcome {
                Some(Ok(outcome)) => completed.push(outcome),
                Some(Err(err)) => return Err(err),
                None => break,
            }
        }
        Ok(completed)
    }
}

fn partial_report(input: ComparisonOutcome, randoms: Vec<ComparisonOutcome>, status: ReportStatus) -> Report {
    let mut random_scores: HashMap<Metric, Vec<HashMap<Category, f64>>> = HashMap::new();
    for outcome in &randoms {
        for (&metric, per_category) in &outcome.scores {
            random_scores.entry(metric).or_default().push(per_category.clone());
        }
    }

    let mut p_values: HashMap<Metric, HashMap<Category, f64>> = HashMap::new();
    for (&metric, per_category) in &input.scores {
        let maximizing = metric.is_maximizing();
        let mut per_category_p = HashMap::new();
        for (&category, &observed) in per_category {
            let randoms_for: Vec<f64> = random_scores
                .get(&metric)
                .map(|runs| runs.iter().filter_map(|run| run.get(&category).copied()).collect())
                .unwrap_or_default();
            if randoms_for.is_empty() {
                continue;
            }
            per_category_p.insert(category, empirical_p_value(observed, &randoms_for, maximizing));
        }
        p_values.insert(metric, per_category_p);
    }

    Report {
        input_scores: input.scores,
        random_scores,
        p_values,
        mapped_ids: input.mapped_ids,
        status,
    }
}


#[cfg(test)]
mod property_tests {
    use approx::assert_abs_diff_eq;
    use proptest::collection::vec as vec_of;
    use proptest::prelude::*;

    use super::*;

    proptest! {
        #[test]
        fn p_value_is_always_in_the_half_open_unit_interval_and_a_multiple_of_the_step(
            observed in -10.0f64..10.0,
            randoms in vec_of(-10.0f64..10.0, 1..50),
            maximizing in any::<bool>(),
        ) {
            let p = empirical_p_value(observed, &randoms, maximizing);
            prop_assert!(p > 0.0 && p <= 1.0);

            let step = 1.0 / (randoms.len() as f64 + 1.0);
            let ratio = p / step;
            assert_abs_diff_eq!(ratio, ratio.round(), epsilon = 1e-9);
        }
    }
}
