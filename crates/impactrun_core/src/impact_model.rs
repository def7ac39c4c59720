//! Compiled impact model, the entry point for evaluation.

use std::collections::BTreeMap;

use crate::analysis::{Saltelli, SensitivityConfig, SensitivityResult, run_sensitivity};
use crate::config::{ImpactModelDefinition, ModelMetadata, SamplingConfig};
use crate::error::{DefinitionError, EvaluationError, SamplingError};
use crate::evaluate::evaluate_tree;
use crate::metrics::{UncertaintyStats, uncertainty_stats};
use crate::model::{
    Assignment, BatchResult, EvaluationResult, ImpactTree, LcaScores, NodeReport, ParamValue,
    ParameterOverrides, ParameterRegistry, resolve_point,
};
use crate::simulation::{BatchProgress, evaluate_point, sample_and_evaluate};

/// A parameter registry and the impact tree compiled against it.
///
/// Immutable once built; every evaluation allocates its own bindings and
/// result, so one model can be shared across threads.
#[derive(Debug, Clone)]
pub struct ImpactModel {
    registry: ParameterRegistry,
    tree: ImpactTree,
    metadata: Option<ModelMetadata>,
}

impl ImpactModel {
    /// Register every parameter and compile the tree.
    ///
    /// All definition problems surface here, never at evaluation time.
    pub fn from_definition(definition: &ImpactModelDefinition) -> Result<Self, DefinitionError> {
        let mut registry = ParameterRegistry::new();
        for parameter in &definition.parameters {
            registry.register(parameter.to_parameter()?)?;
        }
        let root = definition.tree.as_ref().ok_or(DefinitionError::EmptyTree)?;
        let tree = ImpactTree::compile(root, &registry)?;

        tracing::debug!(
            parameters = registry.len(),
            nodes = tree.len(),
            indicators = tree.indicators().len(),
            "built impact model"
        );

        Ok(Self {
            registry,
            tree,
            metadata: definition.metadata.clone(),
        })
    }

    #[must_use]
    pub fn registry(&self) -> &ParameterRegistry {
        &self.registry
    }

    #[must_use]
    pub fn tree(&self) -> &ImpactTree {
        &self.tree
    }

    #[must_use]
    pub fn indicators(&self) -> &[String] {
        self.tree.indicators()
    }

    #[must_use]
    pub fn metadata(&self) -> Option<&ModelMetadata> {
        self.metadata.as_ref()
    }

    /// Evaluate the tree for exactly the given values.
    ///
    /// Parameters absent from the assignment are not defaulted; a formula
    /// that needs one fails with a missing binding at its node.
    pub fn evaluate(&self, assignment: &Assignment) -> Result<EvaluationResult, EvaluationError> {
        let point = self.registry.resolve(assignment)?;
        let bindings = self.registry.bindings(&point);
        Ok(evaluate_tree(&self.tree, &bindings)?)
    }

    /// Evaluate with every parameter at its default
    pub fn evaluate_default(&self) -> Result<EvaluationResult, EvaluationError> {
        evaluate_point(&self.registry, &self.tree, &self.registry.default_point())
    }

    /// Evaluate with raw override values: numbers, variant names, formulas
    /// or enum-keyed switches. Unspecified parameters take their default.
    pub fn evaluate_values(
        &self,
        values: &BTreeMap<String, ParamValue>,
    ) -> Result<EvaluationResult, EvaluationError> {
        let point = resolve_point(values, &self.registry)?;
        evaluate_point(&self.registry, &self.tree, &point)
    }

    /// Evaluate once per expanded override set, in order
    pub fn evaluate_many(
        &self,
        overrides: &ParameterOverrides,
    ) -> Result<Vec<EvaluationResult>, EvaluationError> {
        overrides
            .expand()?
            .iter()
            .map(|values| self.evaluate_values(values))
            .collect()
    }

    /// Root totals for every expanded override set
    pub fn scores(&self, overrides: &ParameterOverrides) -> Result<LcaScores, EvaluationError> {
        let results = self.evaluate_many(overrides)?;
        Ok(LcaScores::from_results(self.indicators(), &results))
    }

    /// Name-keyed nested view of a result
    #[must_use]
    pub fn report(&self, result: &EvaluationResult) -> NodeReport {
        result.report(&self.tree)
    }

    /// Draw and evaluate a sampled batch, see [`sample_and_evaluate`]
    pub fn sample_and_evaluate(
        &self,
        config: &SamplingConfig,
        progress: &BatchProgress,
    ) -> Result<BatchResult, SamplingError> {
        sample_and_evaluate(&self.registry, &self.tree, config, progress)
    }

    /// Monte Carlo batch of `samples` points with a fixed seed
    pub fn sample(&self, samples: usize, seed: u64) -> Result<BatchResult, SamplingError> {
        let config = SamplingConfig {
            samples,
            seed,
            ..Default::default()
        };
        self.sample_and_evaluate(&config, &BatchProgress::new())
    }

    /// Sampled batch summarized per indicator
    pub fn uncertainty(
        &self,
        config: &SamplingConfig,
        progress: &BatchProgress,
    ) -> Result<Vec<UncertaintyStats>, SamplingError> {
        let batch = self.sample_and_evaluate(config, progress)?;
        Ok(uncertainty_stats(&batch, &config.percentiles))
    }

    /// Sobol indices with the Saltelli design
    pub fn run_sensitivity(
        &self,
        config: &SensitivityConfig,
        progress: &BatchProgress,
    ) -> Result<SensitivityResult, SamplingError> {
        run_sensitivity(&self.registry, &self.tree, &Saltelli, config, progress)
    }
}
