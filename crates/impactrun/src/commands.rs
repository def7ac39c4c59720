//! Subcommand handlers
//!
//! Each handler takes a compiled model and returns a serializable output
//! value; rendering and file handling stay in `main`.

use std::collections::BTreeMap;

use impactrun_core::analysis::{NodeSensitivity, SensitivityConfig, SobolIndices};
use impactrun_core::config::ModelMetadata;
use impactrun_core::metrics::{UncertaintyStats, uncertainty_stats};
use impactrun_core::model::{
    EfVersion, ImpactMethod, LcaScores, NodeId, NodeReport, ParameterKind, ParameterOverrides,
    SampleFailure, display_name,
};
use impactrun_core::{BatchProgress, ImpactModel, SamplingConfig};
use serde::Serialize;

// ============================================================================
// compute
// ============================================================================

/// Normalisation and weighting tables for a single score
#[derive(Debug, Clone, Default)]
pub struct ScoreFactors {
    pub normalisation: BTreeMap<String, f64>,
    pub weighting: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, Default)]
pub struct ComputeOptions {
    pub overrides: ParameterOverrides,
    /// Include the full node breakdown of every evaluation
    pub report: bool,
    pub factors: Option<ScoreFactors>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ComputeOutput {
    pub scores: LcaScores,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unique_score: Option<Vec<f64>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub reports: Vec<NodeReport>,
}

/// Evaluate the model once per expanded override set
pub fn compute(model: &ImpactModel, options: &ComputeOptions) -> color_eyre::Result<ComputeOutput> {
    let results = model.evaluate_many(&options.overrides)?;
    let scores = LcaScores::from_results(model.indicators(), &results);

    let unique_score = match &options.factors {
        Some(factors) => Some(scores.unique_score(&factors.normalisation, &factors.weighting)?),
        None => None,
    };

    let reports = if options.report {
        results.iter().map(|r| model.report(r)).collect()
    } else {
        Vec::new()
    };

    tracing::info!(indicators = model.indicators().len(), "computed scores");
    Ok(ComputeOutput {
        scores,
        unique_score,
        reports,
    })
}

// ============================================================================
// describe
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct ParameterSummary {
    pub name: String,
    pub kind: &'static str,
    pub default: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub variants: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NodeSummary {
    pub path: String,
    pub children: usize,
    /// Indicators the node has its own formula for
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub impacts: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ModelSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ModelMetadata>,
    pub parameters: Vec<ParameterSummary>,
    /// Indicator name to display name
    pub indicators: BTreeMap<String, String>,
    pub nodes: Vec<NodeSummary>,
}

/// Parameters, indicators and nodes of a compiled model
#[must_use]
pub fn describe(model: &ImpactModel) -> ModelSummary {
    let parameters = model
        .registry()
        .iter()
        .map(|(_, param)| match &param.kind {
            ParameterKind::Float(spec) => ParameterSummary {
                name: param.name.clone(),
                kind: param.kind_name(),
                default: spec.default.to_string(),
                variants: Vec::new(),
            },
            ParameterKind::Enum(spec) => ParameterSummary {
                name: param.name.clone(),
                kind: param.kind_name(),
                default: spec.default.clone(),
                variants: spec.variants.clone(),
            },
        })
        .collect();

    let tree = model.tree();
    let nodes = tree
        .nodes()
        .iter()
        .enumerate()
        .map(|(i, node)| NodeSummary {
            path: tree.path(NodeId(i as u32)).join("/"),
            children: node.children.len(),
            impacts: node
                .direct
                .iter()
                .zip(tree.indicators())
                .filter(|(formula, _)| formula.is_some())
                .map(|(_, name)| name.clone())
                .collect(),
        })
        .collect();

    ModelSummary {
        metadata: model.metadata().cloned(),
        parameters,
        indicators: model
            .indicators()
            .iter()
            .map(|name| (name.clone(), display_name(name)))
            .collect(),
        nodes,
    }
}

// ============================================================================
// uncertainty
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct FailureSummary {
    pub sample: usize,
    pub error: String,
}

impl From<&SampleFailure> for FailureSummary {
    fn from(failure: &SampleFailure) -> Self {
        Self {
            sample: failure.index,
            error: failure.error.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct UncertaintyOutput {
    pub samples: usize,
    pub stats: Vec<UncertaintyStats>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<FailureSummary>,
}

/// Sample the parameter space and summarize each indicator
pub fn uncertainty(
    model: &ImpactModel,
    config: &SamplingConfig,
    progress: &BatchProgress,
) -> color_eyre::Result<UncertaintyOutput> {
    let batch = model.sample_and_evaluate(config, progress)?;
    if !batch.failures.is_empty() {
        tracing::warn!(
            failed = batch.failures.len(),
            samples = batch.len(),
            "some samples failed to evaluate"
        );
    }
    Ok(UncertaintyOutput {
        samples: batch.len(),
        stats: uncertainty_stats(&batch, &config.percentiles),
        failures: batch.failures.iter().map(FailureSummary::from).collect(),
    })
}

// ============================================================================
// sobol
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct SobolOutput {
    pub parameters: Vec<String>,
    pub evaluations: usize,
    /// Root indices keyed by indicator
    pub indices: BTreeMap<String, SobolIndices>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub nodes: Vec<NodeSensitivity>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<FailureSummary>,
}

/// Sobol indices of every indicator
pub fn sobol(
    model: &ImpactModel,
    config: &SensitivityConfig,
    progress: &BatchProgress,
) -> color_eyre::Result<SobolOutput> {
    let result = model.run_sensitivity(config, progress)?;
    Ok(SobolOutput {
        indices: result
            .indicators
            .iter()
            .cloned()
            .zip(result.root.iter().cloned())
            .collect(),
        failures: result.failures.iter().map(FailureSummary::from).collect(),
        parameters: result.parameters,
        evaluations: result.evaluations,
        nodes: result.nodes,
    })
}

// ============================================================================
// methods
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct MethodSummary {
    pub code: String,
    pub version: EfVersion,
    pub category: &'static str,
    pub indicator: &'static str,
    pub name: String,
    pub short_name: &'static str,
}

/// Known impact assessment methods, optionally for one version only
#[must_use]
pub fn methods(version: Option<EfVersion>) -> Vec<MethodSummary> {
    ImpactMethod::all()
        .filter(|m| version.is_none_or(|v| m.version() == v))
        .map(|m| MethodSummary {
            code: m.code(),
            version: m.version(),
            category: m.category(),
            indicator: m.indicator(),
            name: m.full_name(),
            short_name: m.short_name(),
        })
        .collect()
}
