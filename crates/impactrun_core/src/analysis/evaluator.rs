//! Maps a sensitivity design onto tree evaluations.
//!
//! Unit-hypercube rows become parameter points through the inverse CDF of
//! each varied parameter; parameters outside the analysis keep their default.

use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use crate::error::SamplingError;
use crate::model::{
    EvaluationResult, ImpactTree, NodeId, ParamId, ParameterPoint, ParameterRegistry,
    SampleFailure,
};
use crate::simulation::{BatchProgress, evaluate_points};

use super::config::SensitivityConfig;
use super::sobol::{SensitivityScheme, SobolIndices};

/// Indices of one node, one entry per indicator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSensitivity {
    pub path: Vec<String>,
    pub indices: Vec<SobolIndices>,
}

#[derive(Debug, Clone)]
pub struct SensitivityResult {
    /// Varied parameters, in the order of every index vector
    pub parameters: Vec<String>,
    pub indicators: Vec<String>,
    /// Root indices, one entry per indicator
    pub root: Vec<SobolIndices>,
    /// Per-node indices of each node's scaled total, empty unless requested
    pub nodes: Vec<NodeSensitivity>,
    /// Number of tree evaluations performed
    pub evaluations: usize,
    pub failures: Vec<SampleFailure>,
}

impl SensitivityResult {
    /// Root indices for an indicator by name
    #[must_use]
    pub fn indicator(&self, name: &str) -> Option<&SobolIndices> {
        self.indicators
            .iter()
            .position(|i| i == name)
            .map(|i| &self.root[i])
    }
}

fn selected_parameters(
    registry: &ParameterRegistry,
    names: &[String],
) -> Result<Vec<ParamId>, SamplingError> {
    if names.is_empty() {
        return Ok(registry.iter().map(|(id, _)| id).collect());
    }
    names
        .iter()
        .map(|name| {
            registry
                .id(name)
                .ok_or_else(|| SamplingError::Config(format!("unknown parameter {name:?}")))
        })
        .collect()
}

/// Run a variance-based sensitivity analysis of the tree.
///
/// Every sampling law is prepared before the design is generated. Rows that
/// fail to evaluate are reported in `failures` and their whole group is left
/// out of the estimators. Cancellation is checked before each evaluation.
pub fn run_sensitivity<S: SensitivityScheme>(
    registry: &ParameterRegistry,
    tree: &ImpactTree,
    scheme: &S,
    config: &SensitivityConfig,
    progress: &BatchProgress,
) -> Result<SensitivityResult, SamplingError> {
    let samplers = registry.samplers()?;
    let varied = selected_parameters(registry, &config.parameters)?;
    let dimensions = varied.len();

    let mut rng = StdRng::seed_from_u64(config.seed);
    let rows = scheme.generate(dimensions, config.base_samples, &mut rng);

    let base = registry.default_point();
    let points: Vec<ParameterPoint> = rows
        .iter()
        .map(|row| {
            let mut point = base.clone();
            for (id, u) in varied.iter().zip(row) {
                point.set(*id, samplers[id.index()].quantile(*u));
            }
            point
        })
        .collect();

    progress.reset(points.len());
    tracing::info!(
        parameters = dimensions,
        base_samples = config.base_samples,
        evaluations = points.len(),
        "starting sensitivity analysis"
    );

    let outcomes = evaluate_points(registry, tree, &points, progress)?;

    let mut results: Vec<Option<EvaluationResult>> = Vec::with_capacity(outcomes.len());
    let mut failures = Vec::new();
    for (index, outcome) in outcomes.into_iter().enumerate() {
        match outcome {
            Ok(result) => results.push(Some(result)),
            Err(error) => {
                tracing::warn!(sample = index, %error, "sensitivity sample failed to evaluate");
                failures.push(SampleFailure { index, error });
                results.push(None);
            }
        }
    }

    let indices_of = |node: NodeId| -> Vec<SobolIndices> {
        (0..tree.indicators().len())
            .map(|indicator| {
                let outputs: Vec<Option<f64>> = results
                    .iter()
                    .map(|r| r.as_ref().map(|r| r.node(node).scaled_total[indicator]))
                    .collect();
                scheme.analyze(dimensions, config.base_samples, &outputs)
            })
            .collect()
    };

    let root = indices_of(tree.root());
    let nodes = if config.all_nodes {
        (0..tree.len())
            .map(|i| {
                let id = NodeId(i as u32);
                NodeSensitivity {
                    path: tree.path(id),
                    indices: indices_of(id),
                }
            })
            .collect()
    } else {
        Vec::new()
    };

    tracing::info!(
        evaluations = points.len(),
        failed = failures.len(),
        "finished sensitivity analysis"
    );

    Ok(SensitivityResult {
        parameters: varied
            .iter()
            .map(|id| registry.parameter(*id).name.clone())
            .collect(),
        indicators: tree.indicators().to_vec(),
        root,
        nodes,
        evaluations: points.len(),
        failures,
    })
}
