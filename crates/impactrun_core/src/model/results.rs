use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::EvaluationError;

use super::assignment::Assignment;
use super::ids::{IndicatorId, NodeId};
use super::tree::ImpactTree;

/// Numeric values of one node for one assignment.
///
/// Every vector is indexed by [`IndicatorId`] and covers all indicators of
/// the tree; indicators the node does not declare are zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeResult {
    pub amount: f64,
    /// Product of the amounts from the root down to this node
    pub path_amount: f64,
    /// Own impact per unit of this node
    pub direct: Vec<f64>,
    /// `direct * amount`
    pub scaled_direct: Vec<f64>,
    /// Own impact plus every child's scaled total, per unit of this node
    pub total: Vec<f64>,
    /// `total * amount`
    pub scaled_total: Vec<f64>,
    /// `direct * path_amount`, this node's share of the root total
    pub contribution: Vec<f64>,
}

/// Result of evaluating the whole tree for one assignment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    /// Indexed by [`NodeId`], same layout as the compiled tree
    pub nodes: Vec<NodeResult>,
}

impl EvaluationResult {
    #[must_use]
    pub fn node(&self, id: NodeId) -> &NodeResult {
        &self.nodes[id.index()]
    }

    /// Root total per indicator
    #[must_use]
    pub fn totals(&self) -> &[f64] {
        self.nodes
            .first()
            .map(|root| root.scaled_total.as_slice())
            .unwrap_or(&[])
    }

    #[must_use]
    pub fn total(&self, indicator: IndicatorId) -> f64 {
        self.totals().get(indicator.index()).copied().unwrap_or(0.0)
    }

    /// Name-keyed view mirroring the tree hierarchy
    #[must_use]
    pub fn report(&self, tree: &ImpactTree) -> NodeReport {
        self.report_node(tree, tree.root())
    }

    fn report_node(&self, tree: &ImpactTree, id: NodeId) -> NodeReport {
        let node = tree.node(id);
        let values = self.node(id);
        let named = |v: &[f64]| -> BTreeMap<String, f64> {
            tree.indicators().iter().cloned().zip(v.iter().copied()).collect()
        };
        NodeReport {
            name: node.name.clone(),
            amount: values.amount,
            path_amount: values.path_amount,
            direct: named(&values.direct),
            scaled_direct: named(&values.scaled_direct),
            total: named(&values.total),
            scaled_total: named(&values.scaled_total),
            contribution: named(&values.contribution),
            children: node
                .children
                .iter()
                .map(|child| self.report_node(tree, *child))
                .collect(),
        }
    }
}

/// Evaluated node with indicator names, nested like the model tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeReport {
    pub name: String,
    pub amount: f64,
    pub path_amount: f64,
    pub direct: BTreeMap<String, f64>,
    pub scaled_direct: BTreeMap<String, f64>,
    pub total: BTreeMap<String, f64>,
    pub scaled_total: BTreeMap<String, f64>,
    pub contribution: BTreeMap<String, f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NodeReport>,
}

/// A sample that could not be evaluated
#[derive(Debug, Clone, PartialEq)]
pub struct SampleFailure {
    pub index: usize,
    pub error: EvaluationError,
}

/// Outcome of a sampled batch, in sample order
#[derive(Debug, Clone)]
pub struct BatchResult {
    pub indicators: Vec<String>,
    /// Raw sampled assignments
    pub samples: Vec<Assignment>,
    /// `None` where the sample failed, see `failures`
    pub results: Vec<Option<EvaluationResult>>,
    pub failures: Vec<SampleFailure>,
}

impl BatchResult {
    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn successful(&self) -> impl Iterator<Item = &EvaluationResult> {
        self.results.iter().flatten()
    }

    /// Root totals of one indicator over the successful samples
    #[must_use]
    pub fn root_totals(&self, indicator: IndicatorId) -> Vec<f64> {
        self.successful().map(|r| r.total(indicator)).collect()
    }
}
