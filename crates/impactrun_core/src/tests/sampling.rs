//! Tests for sampled batch evaluation
//!
//! These tests verify:
//! - A fixed seed reproduces the batch exactly
//! - Invalid sampling laws abort before any evaluation
//! - Perturbation envelopes are centred on the default whatever its sign
//! - Per-sample failures are collected while the batch carries on
//! - Cancellation stops the batch

use crate::ImpactModel;
use crate::config::{
    ImpactModelBuilder, NodeBuilder, ParameterBuilder, SamplingConfig, SamplingStrategy,
};
use crate::error::{EvalError, EvaluationError, NumericError, SamplingError};
use crate::metrics::uncertainty_stats;
use crate::model::IndicatorId;
use crate::simulation::BatchProgress;

fn model(sqrt_offset: f64) -> ImpactModel {
    let definition = ImpactModelBuilder::new()
        .parameter(ParameterBuilder::float("x", 5.0).bounds(0.0, 10.0))
        .parameter(ParameterBuilder::float("y", 1.0).normal(0.1).pm(0.5))
        .tree(
            NodeBuilder::new("root")
                .child(NodeBuilder::new("a").amount("y").impact("gwp", "x * 2"))
                .child(NodeBuilder::new("b").impact("gwp", format!("sqrt(x - {sqrt_offset})"))),
        )
        .build();
    ImpactModel::from_definition(&definition).unwrap()
}

#[test]
fn test_fixed_seed_reproduces_batch() {
    let model = model(0.0);
    for strategy in [SamplingStrategy::MonteCarlo, SamplingStrategy::LatinHypercube] {
        let config = SamplingConfig {
            samples: 350,
            seed: 11,
            strategy,
            ..Default::default()
        };
        let first = model.sample_and_evaluate(&config, &BatchProgress::new()).unwrap();
        let second = model.sample_and_evaluate(&config, &BatchProgress::new()).unwrap();
        assert_eq!(first.samples, second.samples);
        assert_eq!(first.results, second.results);
    }
}

#[test]
fn test_different_seeds_differ() {
    let model = model(0.0);
    let a = model.sample(50, 1).unwrap();
    let b = model.sample(50, 2).unwrap();
    assert_ne!(a.samples, b.samples);
}

#[test]
fn test_batch_keeps_samples_in_order() {
    let model = model(0.0);
    let batch = model.sample(120, 3).unwrap();
    assert_eq!(batch.len(), 120);
    assert_eq!(batch.results.len(), 120);
    assert_eq!(batch.indicators, vec!["gwp"]);

    // Re-evaluating a raw sample gives the stored result
    let again = model.evaluate(&batch.samples[17]).unwrap();
    assert_eq!(Some(again), batch.results[17]);
}

#[test]
fn test_failures_collected() {
    let model = model(5.0);
    let batch = model.sample(400, 5).unwrap();
    assert!(!batch.failures.is_empty());
    assert!(batch.failures.len() < batch.len());
    for failure in &batch.failures {
        assert!(batch.results[failure.index].is_none());
        let EvaluationError::Tree(err) = &failure.error else {
            panic!("unexpected failure {:?}", failure.error);
        };
        assert_eq!(err.path, vec!["root", "b"]);
        assert!(matches!(
            err.source,
            EvalError::Numeric(NumericError::Domain { function: "sqrt", .. })
        ));
    }
    assert_eq!(
        batch.successful().count() + batch.failures.len(),
        batch.len()
    );
}

#[test]
fn test_invalid_weights_abort_batch() {
    let definition = ImpactModelBuilder::new()
        .parameter(
            ParameterBuilder::enumeration("mode", "a", ["a", "b"])
                .weight("a", -1.0)
                .weight("b", 2.0),
        )
        .tree(NodeBuilder::new("root").impact("gwp", "mode_a"))
        .build();
    let model = ImpactModel::from_definition(&definition).unwrap();
    let progress = BatchProgress::new();
    let config = SamplingConfig {
        samples: 10,
        ..Default::default()
    };
    let err = model.sample_and_evaluate(&config, &progress).unwrap_err();
    assert!(matches!(err, SamplingError::InvalidWeight { .. }));
    assert_eq!(progress.completed(), 0);
}

#[test]
fn test_inverted_bounds_abort_batch() {
    let definition = ImpactModelBuilder::new()
        .parameter(ParameterBuilder::float("x", 2.0).bounds(3.0, 1.0))
        .tree(NodeBuilder::new("root").impact("gwp", "x"))
        .build();
    let model = ImpactModel::from_definition(&definition).unwrap();
    assert!(matches!(
        model.sample(10, 1).unwrap_err(),
        SamplingError::InvalidBounds { .. }
    ));
}

#[test]
fn test_overflowing_envelope_aborts_batch() {
    let definition = ImpactModelBuilder::new()
        .parameter(ParameterBuilder::float("x", 0.0).bounds(-1e308, 1e308))
        .tree(NodeBuilder::new("root").impact("gwp", "x"))
        .build();
    let model = ImpactModel::from_definition(&definition).unwrap();
    let progress = BatchProgress::new();
    let config = SamplingConfig {
        samples: 5,
        seed: 1,
        ..Default::default()
    };
    assert!(matches!(
        model.sample_and_evaluate(&config, &progress).unwrap_err(),
        SamplingError::InvalidDistributionParameters { .. }
    ));
    assert_eq!(progress.completed(), 0);
}

#[test]
fn test_pm_perc_with_negative_default() {
    let definition = ImpactModelBuilder::new()
        .parameter(ParameterBuilder::float("x", -10.0).pm_perc(0.2))
        .tree(NodeBuilder::new("root").impact("gwp", "x"))
        .build();
    let model = ImpactModel::from_definition(&definition).unwrap();
    for strategy in [SamplingStrategy::MonteCarlo, SamplingStrategy::LatinHypercube] {
        let config = SamplingConfig {
            samples: 400,
            strategy,
            ..Default::default()
        };
        let batch = model.sample_and_evaluate(&config, &BatchProgress::new()).unwrap();
        let totals = batch.root_totals(IndicatorId(0));
        assert_eq!(totals.len(), 400);
        assert!(totals.iter().all(|v| (-12.0..=-8.0).contains(v)), "{totals:?}");
        assert!(totals.iter().any(|v| *v < -11.0));
        assert!(totals.iter().any(|v| *v > -9.0));
    }
}

#[test]
fn test_cancelled_batch() {
    let model = model(0.0);
    let progress = BatchProgress::new();
    progress.cancel();
    let config = SamplingConfig {
        samples: 100,
        ..Default::default()
    };
    assert_eq!(
        model.sample_and_evaluate(&config, &progress).unwrap_err(),
        SamplingError::Cancelled
    );
}

#[test]
fn test_progress_reaches_total() {
    let model = model(0.0);
    let progress = BatchProgress::new();
    let config = SamplingConfig {
        samples: 64,
        ..Default::default()
    };
    model.sample_and_evaluate(&config, &progress).unwrap();
    assert_eq!(progress.total(), 64);
    assert_eq!(progress.completed(), 64);
}

#[test]
fn test_uncertainty_over_batch() {
    let model = model(0.0);
    let config = SamplingConfig {
        samples: 2000,
        ..Default::default()
    };
    let batch = model.sample_and_evaluate(&config, &BatchProgress::new()).unwrap();
    let stats = uncertainty_stats(&batch, &config.percentiles);
    assert_eq!(stats.len(), 1);
    let gwp = &stats[0];
    assert_eq!(gwp.count, 2000);
    assert_eq!(gwp.percentiles.len(), 5);
    assert!(gwp.min <= gwp.percentile(0.05).unwrap());
    assert!(gwp.percentile(0.05).unwrap() <= gwp.percentile(0.5).unwrap());
    assert!(gwp.percentile(0.95).unwrap() <= gwp.max);
    assert!(gwp.std_dev > 0.0);

    let direct = model.uncertainty(&config, &BatchProgress::new()).unwrap();
    assert_eq!(direct, stats);
}
