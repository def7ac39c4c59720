//! Impact model definitions
//!
//! `ImpactModelDefinition` is the deserialized shape of a model file: the
//! parameter list, the node tree and optional metadata. It is plain data;
//! compiling it into an evaluable model happens in [`crate::ImpactModel`].
//!
//! # Builder DSL
//!
//! Models can also be assembled in code:
//!
//! ```ignore
//! use impactrun_core::config::{ImpactModelBuilder, NodeBuilder, ParameterBuilder};
//!
//! let definition = ImpactModelBuilder::new()
//!     .parameter(ParameterBuilder::float("lifespan", 5.0).bounds(2.0, 8.0))
//!     .parameter(ParameterBuilder::enumeration("usage_location", "FR", ["FR", "EU"]))
//!     .tree(NodeBuilder::new("laptop")
//!         .child(NodeBuilder::new("manufacturing").impact("climate_change", "120 / lifespan"))
//!         .child(NodeBuilder::new("use_phase")
//!             .impact("climate_change", "Piecewise((8, usage_location_FR), (30, True))")))
//!     .build();
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::DefinitionError;
use crate::formula::FormulaSource;
use crate::model::{EnumParameter, FloatDistribution, FloatParameter, Parameter};

pub mod builder;
pub mod metadata;
mod run;

pub use builder::{ImpactModelBuilder, NodeBuilder, ParameterBuilder};
pub use metadata::{Contact, ModelMetadata, Report};
pub use run::{SamplingConfig, SamplingStrategy};

/// A complete impact model as read from a model file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImpactModelDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ModelMetadata>,
    #[serde(default)]
    pub parameters: Vec<ParameterDefinition>,
    #[serde(default)]
    pub tree: Option<NodeDefinition>,
}

/// One parameter record, tagged by its `type`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ParameterDefinition {
    Float {
        name: String,
        default: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max: Option<f64>,
        #[serde(default)]
        distrib: FloatDistribution,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        std: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pm: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pm_perc: Option<f64>,
    },
    Enum {
        name: String,
        default: String,
        /// Declared variants; taken from `weights` when omitted
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        variants: Vec<String>,
        /// Relative likelihoods, uniform when omitted
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        weights: BTreeMap<String, f64>,
    },
}

impl ParameterDefinition {
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            ParameterDefinition::Float { name, .. } | ParameterDefinition::Enum { name, .. } => {
                name
            }
        }
    }

    /// Convert into a registry parameter
    pub fn to_parameter(&self) -> Result<Parameter, DefinitionError> {
        match self {
            ParameterDefinition::Float {
                name,
                default,
                min,
                max,
                distrib,
                std,
                pm,
                pm_perc,
            } => Ok(Parameter::float(
                name.clone(),
                FloatParameter {
                    default: *default,
                    min: *min,
                    max: *max,
                    distribution: *distrib,
                    std: *std,
                    pm: *pm,
                    pm_perc: *pm_perc,
                },
            )),
            ParameterDefinition::Enum {
                name,
                default,
                variants,
                weights,
            } => {
                let variants: Vec<String> = if variants.is_empty() {
                    weights.keys().cloned().collect()
                } else {
                    variants.clone()
                };
                if let Some(extra) = weights.keys().find(|k| !variants.contains(*k)) {
                    return Err(DefinitionError::InvalidParameter {
                        name: name.clone(),
                        reason: format!("weight given for undeclared variant {extra:?}"),
                    });
                }
                let weights = if weights.is_empty() {
                    vec![1.0; variants.len()]
                } else {
                    variants
                        .iter()
                        .map(|v| {
                            weights.get(v).copied().ok_or_else(|| {
                                DefinitionError::InvalidParameter {
                                    name: name.clone(),
                                    reason: format!("no weight given for variant {v:?}"),
                                }
                            })
                        })
                        .collect::<Result<Vec<_>, _>>()?
                };
                Ok(Parameter::enumeration(
                    name.clone(),
                    EnumParameter {
                        default: default.clone(),
                        variants,
                        weights,
                    },
                ))
            }
        }
    }
}

/// One node of the impact tree
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeDefinition {
    pub name: String,
    /// Functional units of this node consumed per unit of its parent
    #[serde(default)]
    pub amount: FormulaSource,
    /// Unscaled impact formulas per indicator
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub models: BTreeMap<String, FormulaSource>,
    /// The node's own contribution; preferred over `models` when present
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub direct_impacts: BTreeMap<String, FormulaSource>,
    /// Precomputed by model builders; kept for round-tripping, never evaluated
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub scaled_direct_impacts: BTreeMap<String, FormulaSource>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, serde_json::Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NodeDefinition>,
}

impl NodeDefinition {
    /// Formulas giving this node's own, unscaled impact
    #[must_use]
    pub fn direct_formulas(&self) -> &BTreeMap<String, FormulaSource> {
        if self.direct_impacts.is_empty() {
            &self.models
        } else {
            &self.direct_impacts
        }
    }
}
