//! Tests for formulas inside whole models
//!
//! These tests verify:
//! - Enum indicator variables drive Piecewise branches
//! - Comparisons and functions evaluate per assignment
//! - Compile errors are located at their node and indicator

use crate::ImpactModel;
use crate::config::{ImpactModelBuilder, NodeBuilder, ParameterBuilder};
use crate::error::{DefinitionError, FormulaError, FormulaTarget};
use crate::formula::Formula;
use crate::model::{Assignment, ParameterRegistry};

fn transport_model() -> ImpactModel {
    let definition = ImpactModelBuilder::new()
        .parameter(ParameterBuilder::float("distance", 100.0).bounds(0.0, 1000.0))
        .parameter(ParameterBuilder::enumeration("mode", "truck", ["truck", "train", "boat"]))
        .tree(
            NodeBuilder::new("delivery").child(
                NodeBuilder::new("transport").amount("distance").impact(
                    "climate_change",
                    "Piecewise((0.1, mode_truck), (0.02, mode_train), (0.01, True))",
                ),
            ),
        )
        .build();
    ImpactModel::from_definition(&definition).unwrap()
}

#[test]
fn test_enum_selects_branch() {
    let model = transport_model();
    let truck = model
        .evaluate(&Assignment::new().with("distance", 200.0).with("mode", "truck"))
        .unwrap();
    let train = model
        .evaluate(&Assignment::new().with("distance", 200.0).with("mode", "train"))
        .unwrap();
    let boat = model
        .evaluate(&Assignment::new().with("distance", 200.0).with("mode", "boat"))
        .unwrap();
    assert_eq!(truck.totals(), [20.0]);
    assert_eq!(train.totals(), [4.0]);
    assert_eq!(boat.totals(), [2.0]);
}

#[test]
fn test_comparison_and_functions() {
    let definition = ImpactModelBuilder::new()
        .parameter(ParameterBuilder::float("load", 8.0))
        .tree(
            NodeBuilder::new("root")
                .impact("a", "(load > 5) * 10 + (load <= 5) * 1")
                .impact("b", "max(load, 10) + floor(2.7) + abs(-1)")
                .impact("c", "log(1) + 2 ** 3"),
        )
        .build();
    let model = ImpactModel::from_definition(&definition).unwrap();
    let result = model.evaluate_default().unwrap();
    assert_eq!(result.totals(), [10.0, 13.0, 8.0]);
}

#[test]
fn test_constant_formulas_ignore_assignment() {
    let definition = ImpactModelBuilder::new()
        .parameter(ParameterBuilder::float("unused", 1.0))
        .tree(
            NodeBuilder::new("root")
                .impact("gwp", "0")
                .child(NodeBuilder::new("a").impact("gwp", "1.0")),
        )
        .build();
    let model = ImpactModel::from_definition(&definition).unwrap();
    let a = model.evaluate(&Assignment::new().with("unused", 2.0)).unwrap();
    let b = model.evaluate(&Assignment::new()).unwrap();
    assert_eq!(a.totals(), [1.0]);
    assert_eq!(a, b);
}

#[test]
fn test_compile_against_registry_names_unknown_variable() {
    let registry = ParameterRegistry::new();
    let err = Formula::compile("2 * undeclared", registry.variables()).unwrap_err();
    assert_eq!(
        err,
        FormulaError::UnknownVariable {
            name: "undeclared".into()
        }
    );
}

#[test]
fn test_bad_amount_formula_located() {
    let definition = ImpactModelBuilder::new()
        .parameter(ParameterBuilder::float("x", 1.0))
        .tree(NodeBuilder::new("root").child(NodeBuilder::new("part").amount("x +* 2")))
        .build();
    let err = ImpactModel::from_definition(&definition).unwrap_err();
    let DefinitionError::Formula {
        node_path,
        target,
        source,
    } = err
    else {
        panic!("expected a located formula error, got {err:?}");
    };
    assert_eq!(node_path, vec!["root", "part"]);
    assert_eq!(target, FormulaTarget::Amount);
    assert!(matches!(source, FormulaError::Syntax { .. }));
}

#[test]
fn test_unknown_function_located() {
    let definition = ImpactModelBuilder::new()
        .parameter(ParameterBuilder::float("x", 1.0))
        .tree(NodeBuilder::new("root").impact("gwp", "gamma(x)"))
        .build();
    let err = ImpactModel::from_definition(&definition).unwrap_err();
    assert!(matches!(
        err,
        DefinitionError::Formula {
            source: FormulaError::UnknownFunction { .. },
            ..
        }
    ));
}
