//! Impact Model Builder
//!
//! Fluent construction of [`ImpactModelDefinition`] records, so tests and
//! embedding code do not need to spell out the serialized shape.
//!
//! # Example
//!
//! ```ignore
//! use impactrun_core::config::{ImpactModelBuilder, NodeBuilder, ParameterBuilder};
//!
//! let definition = ImpactModelBuilder::new()
//!     .parameter(ParameterBuilder::float("mass", 2.0).pm_perc(0.1))
//!     .parameter(ParameterBuilder::enumeration("energy", "grid", ["grid", "solar"])
//!         .weight("grid", 3.0)
//!         .weight("solar", 1.0))
//!     .tree(NodeBuilder::new("product")
//!         .child(NodeBuilder::new("material").amount("mass").impact("gwp", 4.5))
//!         .child(NodeBuilder::new("assembly")
//!             .impact("gwp", "Piecewise((0.9, energy_grid), (0.1, True))")))
//!     .build();
//! ```

use std::collections::BTreeMap;

use super::metadata::ModelMetadata;
use super::{ImpactModelDefinition, NodeDefinition, ParameterDefinition};
use crate::formula::FormulaSource;
use crate::model::FloatDistribution;

/// Builder for a whole model definition
#[derive(Debug, Clone, Default)]
pub struct ImpactModelBuilder {
    metadata: Option<ModelMetadata>,
    parameters: Vec<ParameterDefinition>,
    tree: Option<NodeDefinition>,
}

impl ImpactModelBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn metadata(mut self, metadata: ModelMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    #[must_use]
    pub fn parameter(mut self, parameter: impl Into<ParameterDefinition>) -> Self {
        self.parameters.push(parameter.into());
        self
    }

    #[must_use]
    pub fn tree(mut self, root: NodeBuilder) -> Self {
        self.tree = Some(root.build());
        self
    }

    #[must_use]
    pub fn build(self) -> ImpactModelDefinition {
        ImpactModelDefinition {
            metadata: self.metadata,
            parameters: self.parameters,
            tree: self.tree,
        }
    }
}

/// Builder for one tree node and its subtree
#[derive(Debug, Clone)]
pub struct NodeBuilder {
    node: NodeDefinition,
}

impl NodeBuilder {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            node: NodeDefinition {
                name: name.into(),
                ..NodeDefinition::default()
            },
        }
    }

    /// Units of this node consumed per unit of its parent
    #[must_use]
    pub fn amount(mut self, amount: impl Into<FormulaSource>) -> Self {
        self.node.amount = amount.into();
        self
    }

    /// Own, unscaled impact for one indicator
    #[must_use]
    pub fn impact(
        mut self,
        indicator: impl Into<String>,
        formula: impl Into<FormulaSource>,
    ) -> Self {
        self.node
            .direct_impacts
            .insert(indicator.into(), formula.into());
        self
    }

    #[must_use]
    pub fn property(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.node.properties.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn child(mut self, child: NodeBuilder) -> Self {
        self.node.children.push(child.build());
        self
    }

    #[must_use]
    pub fn build(self) -> NodeDefinition {
        self.node
    }
}

/// Builder for a parameter record
#[derive(Debug, Clone)]
pub struct ParameterBuilder {
    definition: ParameterDefinition,
}

impl ParameterBuilder {
    /// A float parameter with no uncertainty
    #[must_use]
    pub fn float(name: impl Into<String>, default: f64) -> Self {
        Self {
            definition: ParameterDefinition::Float {
                name: name.into(),
                default,
                min: None,
                max: None,
                distrib: FloatDistribution::Linear,
                std: None,
                pm: None,
                pm_perc: None,
            },
        }
    }

    /// An enum parameter with equally likely variants
    #[must_use]
    pub fn enumeration<I, S>(
        name: impl Into<String>,
        default: impl Into<String>,
        variants: I,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            definition: ParameterDefinition::Enum {
                name: name.into(),
                default: default.into(),
                variants: variants.into_iter().map(Into::into).collect(),
                weights: BTreeMap::new(),
            },
        }
    }

    #[must_use]
    pub fn bounds(mut self, low: f64, high: f64) -> Self {
        if let ParameterDefinition::Float { min, max, .. } = &mut self.definition {
            *min = Some(low);
            *max = Some(high);
        }
        self
    }

    #[must_use]
    pub fn pm(mut self, delta: f64) -> Self {
        if let ParameterDefinition::Float { pm, .. } = &mut self.definition {
            *pm = Some(delta);
        }
        self
    }

    #[must_use]
    pub fn pm_perc(mut self, fraction: f64) -> Self {
        if let ParameterDefinition::Float { pm_perc, .. } = &mut self.definition {
            *pm_perc = Some(fraction);
        }
        self
    }

    #[must_use]
    pub fn triangular(mut self) -> Self {
        if let ParameterDefinition::Float { distrib, .. } = &mut self.definition {
            *distrib = FloatDistribution::Triangular;
        }
        self
    }

    #[must_use]
    pub fn normal(mut self, std_dev: f64) -> Self {
        if let ParameterDefinition::Float { distrib, std, .. } = &mut self.definition {
            *distrib = FloatDistribution::Normal;
            *std = Some(std_dev);
        }
        self
    }

    /// Relative likelihood of one enum variant
    #[must_use]
    pub fn weight(mut self, variant: impl Into<String>, weight: f64) -> Self {
        if let ParameterDefinition::Enum { weights, .. } = &mut self.definition {
            weights.insert(variant.into(), weight);
        }
        self
    }

    #[must_use]
    pub fn build(self) -> ParameterDefinition {
        self.definition
    }
}

impl From<ParameterBuilder> for ParameterDefinition {
    fn from(builder: ParameterBuilder) -> Self {
        builder.build()
    }
}
