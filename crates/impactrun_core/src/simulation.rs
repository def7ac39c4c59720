//! Sampled batch evaluation.
//!
//! Points are drawn in fixed-size batches, each with its own generator seeded
//! from the top-level seed, so a batch result depends only on the seed and
//! not on how the work was scheduled.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use rand::rngs::{SmallRng, StdRng};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::config::{SamplingConfig, SamplingStrategy};
use crate::error::{EvaluationError, SamplingError};
use crate::evaluate::evaluate_tree;
use crate::model::{
    BatchResult, EvaluationResult, ImpactTree, ParameterPoint, ParameterRegistry, SampleFailure,
    Sampler,
};

const MAX_BATCH_SIZE: usize = 100;

/// Progress tracking for a running batch
#[derive(Debug, Clone)]
pub struct BatchProgress {
    completed: Arc<AtomicUsize>,
    total: Arc<AtomicUsize>,
    cancelled: Arc<AtomicBool>,
}

impl BatchProgress {
    #[must_use]
    pub fn new() -> Self {
        Self {
            completed: Arc::new(AtomicUsize::new(0)),
            total: Arc::new(AtomicUsize::new(0)),
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    #[must_use]
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.total.load(Ordering::Relaxed)
    }

    pub fn increment(&self) {
        self.completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn reset(&self, total: usize) {
        self.completed.store(0, Ordering::Relaxed);
        self.total.store(total, Ordering::Relaxed);
    }

    /// Stop the batch at the next sample boundary
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

impl Default for BatchProgress {
    fn default() -> Self {
        Self::new()
    }
}

/// Draw `config.samples` parameter points.
///
/// Every sampling law is prepared before the first draw, so a bad
/// distribution fails the whole batch up front.
pub fn sample_points(
    registry: &ParameterRegistry,
    config: &SamplingConfig,
) -> Result<Vec<ParameterPoint>, SamplingError> {
    let samplers = registry.samplers()?;
    let points = match config.strategy {
        SamplingStrategy::MonteCarlo => monte_carlo_points(&samplers, config.samples, config.seed),
        SamplingStrategy::LatinHypercube => {
            latin_hypercube_points(&samplers, config.samples, config.seed)
        }
    };
    Ok(points)
}

fn draw_point<R: Rng + ?Sized>(samplers: &[Sampler], rng: &mut R) -> ParameterPoint {
    ParameterPoint::new(samplers.iter().map(|s| Some(s.draw(rng))).collect())
}

/// Generator seed of one batch; splitmix64 finalizer over the seed and batch
/// index, so neighbouring seeds do not share batch streams.
fn batch_seed(seed: u64, batch: usize) -> u64 {
    let mut z = seed ^ (batch as u64).wrapping_add(1).wrapping_mul(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

fn monte_carlo_batch(
    samplers: &[Sampler],
    batch: usize,
    size: usize,
    seed: u64,
) -> Vec<ParameterPoint> {
    let mut rng = SmallRng::seed_from_u64(batch_seed(seed, batch));
    (0..size).map(|_| draw_point(samplers, &mut rng)).collect()
}

fn monte_carlo_points(samplers: &[Sampler], count: usize, seed: u64) -> Vec<ParameterPoint> {
    let num_batches = count.div_ceil(MAX_BATCH_SIZE);
    let batch_size = |i: usize| {
        if i == num_batches - 1 {
            count - i * MAX_BATCH_SIZE
        } else {
            MAX_BATCH_SIZE
        }
    };

    #[cfg(feature = "parallel")]
    let points = (0..num_batches)
        .into_par_iter()
        .flat_map_iter(|i| monte_carlo_batch(samplers, i, batch_size(i), seed))
        .collect();

    #[cfg(not(feature = "parallel"))]
    let points = (0..num_batches)
        .flat_map(|i| monte_carlo_batch(samplers, i, batch_size(i), seed))
        .collect();

    points
}

/// One draw per equal-probability stratum of every parameter
fn latin_hypercube_points(samplers: &[Sampler], count: usize, seed: u64) -> Vec<ParameterPoint> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut columns = Vec::with_capacity(samplers.len());
    for sampler in samplers {
        let mut strata: Vec<usize> = (0..count).collect();
        strata.shuffle(&mut rng);
        let column: Vec<_> = strata
            .into_iter()
            .map(|k| {
                let u = (k as f64 + rng.random::<f64>()) / count as f64;
                sampler.quantile(u)
            })
            .collect();
        columns.push(column);
    }

    (0..count)
        .map(|row| ParameterPoint::new(columns.iter().map(|c| Some(c[row])).collect()))
        .collect()
}

pub(crate) fn evaluate_point(
    registry: &ParameterRegistry,
    tree: &ImpactTree,
    point: &ParameterPoint,
) -> Result<EvaluationResult, EvaluationError> {
    let bindings = registry.bindings(point);
    Ok(evaluate_tree(tree, &bindings)?)
}

/// Evaluate a list of points, checking for cancellation before each one.
///
/// Per-point failures are returned in place; only cancellation aborts.
pub(crate) fn evaluate_points(
    registry: &ParameterRegistry,
    tree: &ImpactTree,
    points: &[ParameterPoint],
    progress: &BatchProgress,
) -> Result<Vec<Result<EvaluationResult, EvaluationError>>, SamplingError> {
    let run = |point: &ParameterPoint| {
        if progress.is_cancelled() {
            return Err(SamplingError::Cancelled);
        }
        let outcome = evaluate_point(registry, tree, point);
        progress.increment();
        Ok(outcome)
    };

    #[cfg(feature = "parallel")]
    let outcomes = points.par_iter().map(run).collect();

    #[cfg(not(feature = "parallel"))]
    let outcomes = points.iter().map(run).collect();

    outcomes
}

/// Sample parameter points and evaluate the tree for each of them.
///
/// Samples that fail to evaluate are listed in [`BatchResult::failures`]
/// and leave a `None` in the results; the rest of the batch carries on.
pub fn sample_and_evaluate(
    registry: &ParameterRegistry,
    tree: &ImpactTree,
    config: &SamplingConfig,
    progress: &BatchProgress,
) -> Result<BatchResult, SamplingError> {
    let points = sample_points(registry, config)?;
    progress.reset(points.len());
    tracing::info!(
        samples = points.len(),
        strategy = ?config.strategy,
        seed = config.seed,
        "starting batch evaluation"
    );

    let outcomes = evaluate_points(registry, tree, &points, progress)?;

    let mut results = Vec::with_capacity(outcomes.len());
    let mut failures = Vec::new();
    for (index, outcome) in outcomes.into_iter().enumerate() {
        match outcome {
            Ok(result) => results.push(Some(result)),
            Err(error) => {
                tracing::warn!(sample = index, %error, "sample failed to evaluate");
                failures.push(SampleFailure { index, error });
                results.push(None);
            }
        }
    }

    tracing::info!(
        samples = points.len(),
        failed = failures.len(),
        "finished batch evaluation"
    );

    Ok(BatchResult {
        indicators: tree.indicators().to_vec(),
        samples: points.iter().map(|p| registry.to_assignment(p)).collect(),
        results,
        failures,
    })
}
