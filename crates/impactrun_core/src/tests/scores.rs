//! Tests for score tables built from model evaluations

use std::collections::BTreeMap;

use crate::ImpactModel;
use crate::config::{ImpactModelBuilder, NodeBuilder, ParameterBuilder};
use crate::model::{LcaScores, ParameterOverrides};

fn model() -> ImpactModel {
    let definition = ImpactModelBuilder::new()
        .parameter(ParameterBuilder::float("units", 1.0).bounds(0.0, 10.0))
        .tree(
            NodeBuilder::new("root")
                .child(
                    NodeBuilder::new("part")
                        .amount("units")
                        .impact("climate_change", 2.0)
                        .impact("water", 10.0),
                ),
        )
        .build();
    ImpactModel::from_definition(&definition).unwrap()
}

#[test]
fn test_scores_over_overrides() {
    let model = model();
    let overrides =
        ParameterOverrides::new().list("units", vec![1.0.into(), 2.0.into(), 4.0.into()]);
    let scores = model.scores(&overrides).unwrap();
    assert_eq!(scores.get("climate_change"), Some(&[2.0, 4.0, 8.0][..]));
    assert_eq!(scores.get("water"), Some(&[10.0, 20.0, 40.0][..]));
}

#[test]
fn test_scores_from_batch_and_result() {
    let model = model();
    let batch = model.sample(30, 4).unwrap();
    let scores = LcaScores::from_batch(&batch);
    assert_eq!(scores.get("water").map(<[f64]>::len), Some(30));

    let single = LcaScores::from_result(model.indicators(), &model.evaluate_default().unwrap());
    assert_eq!(single.get("climate_change"), Some(&[2.0][..]));
}

#[test]
fn test_scores_from_shared_results() {
    let model = model();
    let overrides = ParameterOverrides::new().list("units", vec![1.0.into(), 5.0.into()]);
    let results = model.evaluate_many(&overrides).unwrap();

    let scores = LcaScores::from_results(model.indicators(), &results);
    assert_eq!(scores, model.scores(&overrides).unwrap());
    assert_eq!(scores.get("water"), Some(&[10.0, 50.0][..]));
}

#[test]
fn test_unique_score_of_model() {
    let model = model();
    let overrides = ParameterOverrides::new().list("units", vec![1.0.into(), 3.0.into()]);
    let scores = model.scores(&overrides).unwrap();

    let factors = |gwp: f64, water: f64| -> BTreeMap<String, f64> {
        [("climate_change".to_string(), gwp), ("water".to_string(), water)]
            .into_iter()
            .collect()
    };
    let single = scores
        .unique_score(&factors(2.0, 10.0), &factors(0.75, 0.25))
        .unwrap();
    // per unit: 2/2 * 0.75 + 10/10 * 0.25 = 1
    assert_eq!(single, vec![1.0, 3.0]);
}

#[test]
fn test_difference_between_scenarios() {
    let model = model();
    let base = model
        .scores(&ParameterOverrides::new().single("units", 1.0))
        .unwrap();
    let doubled = model
        .scores(&ParameterOverrides::new().single("units", 2.0))
        .unwrap();
    let delta = doubled.sub(&base).unwrap();
    assert_eq!(delta.get("climate_change"), Some(&[2.0][..]));
    assert_eq!(delta.get("water"), Some(&[10.0][..]));
}
