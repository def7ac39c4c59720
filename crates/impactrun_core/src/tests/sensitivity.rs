//! Tests for Sobol sensitivity analysis on compiled models
//!
//! These tests verify:
//! - Indices are reproducible for a fixed seed
//! - An additive model splits variance by coefficient
//! - Failed samples drop their group instead of aborting

use crate::ImpactModel;
use crate::analysis::SensitivityConfig;
use crate::config::{ImpactModelBuilder, NodeBuilder, ParameterBuilder};
use crate::error::SamplingError;
use crate::simulation::BatchProgress;

fn additive() -> ImpactModel {
    let definition = ImpactModelBuilder::new()
        .parameter(ParameterBuilder::float("x", 0.5).bounds(0.0, 1.0))
        .parameter(ParameterBuilder::float("y", 0.5).bounds(0.0, 1.0))
        .parameter(ParameterBuilder::float("fixed", 3.0))
        .tree(
            NodeBuilder::new("root")
                .child(NodeBuilder::new("a").impact("gwp", "x * fixed"))
                .child(NodeBuilder::new("b").amount("y").impact("gwp", 6.0)),
        )
        .build();
    ImpactModel::from_definition(&definition).unwrap()
}

#[test]
fn test_reproducible_indices() {
    let model = additive();
    let config = SensitivityConfig {
        base_samples: 256,
        seed: 99,
        ..Default::default()
    };
    let first = model.run_sensitivity(&config, &BatchProgress::new()).unwrap();
    let second = model.run_sensitivity(&config, &BatchProgress::new()).unwrap();
    assert_eq!(first.root, second.root);
    assert_eq!(first.evaluations, 256 * 5);
}

#[test]
fn test_additive_model_indices() {
    let model = additive();
    let config = SensitivityConfig {
        base_samples: 131072,
        ..Default::default()
    };
    let result = model.run_sensitivity(&config, &BatchProgress::new()).unwrap();
    assert_eq!(result.parameters, vec!["x", "y", "fixed"]);

    // gwp = 3x + 6y: variances 9/12 and 36/12, so shares 0.2 and 0.8
    let gwp = result.indicator("gwp").unwrap();
    assert!((gwp.first_order[0] - 0.2).abs() < 0.05, "{gwp:?}");
    assert!((gwp.first_order[1] - 0.8).abs() < 0.05, "{gwp:?}");
    assert!((gwp.total_order[0] - 0.2).abs() < 0.05, "{gwp:?}");
    assert!((gwp.total_order[1] - 0.8).abs() < 0.05, "{gwp:?}");
    // A parameter with no sampling envelope never moves
    assert_eq!(gwp.first_order[2], 0.0);
    assert_eq!(gwp.total_order[2], 0.0);
}

#[test]
fn test_parameter_subset_and_nodes() {
    let model = additive();
    let config = SensitivityConfig {
        base_samples: 64,
        parameters: vec!["y".into()],
        all_nodes: true,
        ..Default::default()
    };
    let result = model.run_sensitivity(&config, &BatchProgress::new()).unwrap();
    assert_eq!(result.parameters, vec!["y"]);
    assert_eq!(result.evaluations, 64 * 3);
    assert_eq!(result.nodes.len(), model.tree().len());
    assert_eq!(result.nodes[1].path, vec!["root", "a"]);

    // Node a does not depend on y
    let a = &result.nodes[1].indices[0];
    assert_eq!(a.variance, 0.0);
    assert!(result.root[0].variance > 0.0);
}

#[test]
fn test_unknown_parameter_in_config() {
    let model = additive();
    let config = SensitivityConfig {
        parameters: vec!["z".into()],
        ..Default::default()
    };
    assert!(matches!(
        model.run_sensitivity(&config, &BatchProgress::new()),
        Err(SamplingError::Config(_))
    ));
}

#[test]
fn test_failed_samples_drop_groups() {
    let definition = ImpactModelBuilder::new()
        .parameter(ParameterBuilder::float("x", 0.5).bounds(0.0, 1.0))
        .tree(NodeBuilder::new("root").impact("gwp", "sqrt(x - 0.2)"))
        .build();
    let model = ImpactModel::from_definition(&definition).unwrap();
    let config = SensitivityConfig {
        base_samples: 200,
        ..Default::default()
    };
    let result = model.run_sensitivity(&config, &BatchProgress::new()).unwrap();
    assert!(!result.failures.is_empty());
    let used = result.root[0].base_rows_used;
    assert!(used > 0 && used < 200);
}

#[test]
fn test_cancelled_analysis() {
    let model = additive();
    let progress = BatchProgress::new();
    progress.cancel();
    let err = model
        .run_sensitivity(&SensitivityConfig::default(), &progress)
        .unwrap_err();
    assert_eq!(err, SamplingError::Cancelled);
}
