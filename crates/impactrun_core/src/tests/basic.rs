//! Tests for core evaluation mechanics
//!
//! These tests verify:
//! - Scaled and total impacts follow the aggregation rules at every node
//! - Missing indicators default to zero
//! - Repeated evaluation is bit-identical
//! - Failures abort the evaluation and name the failing node
//! - Overflow while aggregating is an error, never an infinite total

use crate::ImpactModel;
use crate::config::{ImpactModelBuilder, NodeBuilder, ParameterBuilder};
use crate::error::{
    BindingError, DefinitionError, EvalError, EvaluationError, FormulaTarget, NumericError,
};
use crate::model::{Assignment, IndicatorId, NodeId};

fn laptop() -> ImpactModel {
    let definition = ImpactModelBuilder::new()
        .parameter(ParameterBuilder::float("lifespan", 4.0).bounds(1.0, 10.0))
        .parameter(ParameterBuilder::float("power", 30.0).pm(10.0))
        .tree(
            NodeBuilder::new("laptop")
                .child(
                    NodeBuilder::new("manufacturing")
                        .impact("climate_change", "200 / lifespan")
                        .impact("water", 3.0),
                )
                .child(
                    NodeBuilder::new("use_phase")
                        .amount("lifespan")
                        .impact("climate_change", "power / 10")
                        .child(
                            NodeBuilder::new("charger")
                                .amount(0.5)
                                .impact("climate_change", 2.0),
                        ),
                ),
        )
        .build();
    ImpactModel::from_definition(&definition).unwrap()
}

/// The two-level example from the model documentation
#[test]
fn test_two_level_total() {
    let definition = ImpactModelBuilder::new()
        .tree(
            NodeBuilder::new("root")
                .child(NodeBuilder::new("use_phase").impact("climate_change", 5.0))
                .child(
                    NodeBuilder::new("manufacturing")
                        .amount(2.0)
                        .impact("climate_change", 3.0),
                ),
        )
        .build();
    let model = ImpactModel::from_definition(&definition).unwrap();
    let result = model.evaluate(&Assignment::new()).unwrap();
    assert_eq!(result.totals(), [11.0]);
}

#[test]
fn test_aggregation_invariants_hold_at_every_node() {
    let model = laptop();
    let result = model.evaluate_default().unwrap();
    let tree = model.tree();

    for (index, node) in tree.nodes().iter().enumerate() {
        let values = result.node(NodeId(index as u32));
        for c in 0..tree.indicators().len() {
            assert_eq!(values.scaled_direct[c], values.direct[c] * values.amount);
            let children: f64 = node
                .children
                .iter()
                .map(|child| {
                    let child = result.node(*child);
                    child.total[c] * child.amount
                })
                .sum();
            assert!((values.total[c] - (values.direct[c] + children)).abs() < 1e-12);
        }
    }
}

#[test]
fn test_default_values() {
    let model = laptop();
    let result = model.evaluate_default().unwrap();
    let gwp = model.tree().indicator("climate_change").unwrap();

    // manufacturing: 200 / 4 = 50
    // use_phase per unit: 3 + 0.5 * 2 = 4, times lifespan 4 = 16
    assert_eq!(result.total(gwp), 66.0);

    let charger = model.tree().find("laptop/use_phase/charger").unwrap();
    assert_eq!(result.node(charger).path_amount, 2.0);
    assert_eq!(result.node(charger).contribution[gwp.index()], 4.0);
}

#[test]
fn test_undeclared_indicator_is_zero() {
    let model = laptop();
    let result = model.evaluate_default().unwrap();
    let water = model.tree().indicator("water").unwrap();
    let use_phase = model.tree().find("laptop/use_phase").unwrap();
    assert_eq!(result.node(use_phase).direct[water.index()], 0.0);
    assert_eq!(result.node(use_phase).total[water.index()], 0.0);
    assert_eq!(result.total(water), 3.0);
}

#[test]
fn test_contributions_sum_to_root_total() {
    let model = laptop();
    let result = model.evaluate_default().unwrap();
    for (c, total) in result.totals().iter().enumerate() {
        let sum: f64 = result.nodes.iter().map(|n| n.contribution[c]).sum();
        assert!((sum - total).abs() < 1e-9);
    }
}

#[test]
fn test_repeated_evaluation_is_bit_identical() {
    let model = laptop();
    let assignment = Assignment::new().with("lifespan", 3.3).with("power", 27.1);
    let first = model.evaluate(&assignment).unwrap();
    let second = model.evaluate(&assignment).unwrap();
    for (a, b) in first.nodes.iter().zip(&second.nodes) {
        for (x, y) in a.total.iter().zip(&b.total) {
            assert_eq!(x.to_bits(), y.to_bits());
        }
    }
}

#[test]
fn test_missing_parameter_names_node_path() {
    let model = laptop();
    let err = model
        .evaluate(&Assignment::new().with("power", 30.0))
        .unwrap_err();
    let EvaluationError::Tree(err) = err else {
        panic!("expected a tree evaluation error, got {err:?}");
    };
    // Pre-order reaches manufacturing before use_phase
    assert_eq!(err.path, vec!["laptop", "manufacturing"]);
    assert_eq!(err.target, FormulaTarget::Indicator("climate_change".into()));
    assert_eq!(
        err.source,
        EvalError::Binding(BindingError::MissingBinding("lifespan".into()))
    );
}

#[test]
fn test_out_of_bounds_assignment() {
    let model = laptop();
    let err = model
        .evaluate(&Assignment::new().with("lifespan", 12.0).with("power", 30.0))
        .unwrap_err();
    assert!(matches!(
        err,
        EvaluationError::Binding(BindingError::OutOfBounds { .. })
    ));
}

#[test]
fn test_numeric_failure_is_not_silenced() {
    let definition = ImpactModelBuilder::new()
        .parameter(ParameterBuilder::float("x", 0.0))
        .tree(NodeBuilder::new("root").child(NodeBuilder::new("a").impact("gwp", "sqrt(x - 1)")))
        .build();
    let model = ImpactModel::from_definition(&definition).unwrap();
    let err = model.evaluate_default().unwrap_err();
    let EvaluationError::Tree(err) = err else {
        panic!("expected a tree evaluation error");
    };
    assert_eq!(err.path, vec!["root", "a"]);
    assert!(matches!(
        err.source,
        EvalError::Numeric(NumericError::Domain { function: "sqrt", .. })
    ));
}

#[test]
fn test_aggregate_overflow_is_not_silenced() {
    let definition = ImpactModelBuilder::new()
        .tree(
            NodeBuilder::new("root")
                .child(NodeBuilder::new("a").amount(1e200).impact("gwp", 1e200)),
        )
        .build();
    let model = ImpactModel::from_definition(&definition).unwrap();
    let EvaluationError::Tree(err) = model.evaluate_default().unwrap_err() else {
        panic!("expected a tree evaluation error");
    };
    assert_eq!(err.path, vec!["root"]);
    assert_eq!(err.target, FormulaTarget::Indicator("gwp".into()));
    assert_eq!(
        err.source,
        EvalError::Numeric(NumericError::NonFinite {
            operation: "aggregation"
        })
    );
}

#[test]
fn test_unknown_parameter_fails_construction() {
    let definition = ImpactModelBuilder::new()
        .tree(NodeBuilder::new("root").impact("gwp", "mass * 2"))
        .build();
    let err = ImpactModel::from_definition(&definition).unwrap_err();
    assert_eq!(
        err,
        DefinitionError::UnknownParameter {
            names: vec!["mass".into()]
        }
    );
}

#[test]
fn test_missing_tree() {
    let definition = ImpactModelBuilder::new()
        .parameter(ParameterBuilder::float("x", 1.0))
        .build();
    assert_eq!(
        ImpactModel::from_definition(&definition).unwrap_err(),
        DefinitionError::EmptyTree
    );
}

#[test]
fn test_report_mirrors_tree() {
    let model = laptop();
    let result = model.evaluate_default().unwrap();
    let report = model.report(&result);
    assert_eq!(report.name, "laptop");
    assert_eq!(report.children.len(), 2);
    assert_eq!(report.children[1].children[0].name, "charger");
    assert_eq!(report.scaled_total["climate_change"], result.total(IndicatorId(0)));
}
