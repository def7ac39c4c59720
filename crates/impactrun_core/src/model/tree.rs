//! Compiled impact tree.
//!
//! Nodes live in a flat arena in pre-order, so every child has a larger
//! index than its parent. The evaluator relies on this to fold totals
//! bottom-up with a single reverse pass.

use std::collections::{BTreeMap, BTreeSet};

use crate::config::NodeDefinition;
use crate::error::{DefinitionError, FormulaTarget};
use crate::formula::Formula;

use super::ids::{IndicatorId, NodeId};
use super::registry::ParameterRegistry;

#[derive(Debug, Clone)]
pub struct ImpactNode {
    pub name: String,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub amount: Formula,
    /// Own unscaled impact per indicator, `None` when the node does not declare it
    pub direct: Vec<Option<Formula>>,
    pub properties: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone)]
pub struct ImpactTree {
    nodes: Vec<ImpactNode>,
    indicators: Vec<String>,
}

impl ImpactTree {
    /// Compile a node definition tree against the registry's variables.
    ///
    /// Every free variable of every formula is checked first, so all unknown
    /// names are reported together.
    pub fn compile(
        root: &NodeDefinition,
        registry: &ParameterRegistry,
    ) -> Result<Self, DefinitionError> {
        let mut indicators = BTreeSet::new();
        let mut referenced = Vec::new();
        collect(root, &mut indicators, &mut referenced);
        registry.validate_against(referenced.iter().map(String::as_str))?;

        let mut tree = ImpactTree {
            nodes: Vec::new(),
            indicators: indicators.into_iter().collect(),
        };
        let mut path = Vec::new();
        tree.push(root, None, registry, &mut path)?;

        tracing::debug!(
            nodes = tree.nodes.len(),
            indicators = tree.indicators.len(),
            "compiled impact tree"
        );
        Ok(tree)
    }

    fn push(
        &mut self,
        def: &NodeDefinition,
        parent: Option<NodeId>,
        registry: &ParameterRegistry,
        path: &mut Vec<String>,
    ) -> Result<NodeId, DefinitionError> {
        path.push(def.name.clone());

        let located = |target: FormulaTarget, path: &[String]| {
            let node_path = path.to_vec();
            move |source| DefinitionError::Formula {
                node_path,
                target,
                source,
            }
        };

        let amount = def
            .amount
            .compile(registry.variables())
            .map_err(located(FormulaTarget::Amount, path))?;

        let sources = def.direct_formulas();
        let mut direct = Vec::with_capacity(self.indicators.len());
        for indicator in &self.indicators {
            let formula = match sources.get(indicator) {
                Some(source) => Some(source.compile(registry.variables()).map_err(located(
                    FormulaTarget::Indicator(indicator.clone()),
                    path,
                ))?),
                None => None,
            };
            direct.push(formula);
        }

        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(ImpactNode {
            name: def.name.clone(),
            parent,
            children: Vec::with_capacity(def.children.len()),
            amount,
            direct,
            properties: def.properties.clone(),
        });

        for child in &def.children {
            let child_id = self.push(child, Some(id), registry, path)?;
            self.nodes[id.index()].children.push(child_id);
        }

        path.pop();
        Ok(id)
    }

    #[must_use]
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[must_use]
    pub fn node(&self, id: NodeId) -> &ImpactNode {
        &self.nodes[id.index()]
    }

    #[must_use]
    pub fn nodes(&self) -> &[ImpactNode] {
        &self.nodes
    }

    /// Every indicator declared anywhere in the tree, sorted by name
    #[must_use]
    pub fn indicators(&self) -> &[String] {
        &self.indicators
    }

    #[must_use]
    pub fn indicator(&self, name: &str) -> Option<IndicatorId> {
        self.indicators
            .iter()
            .position(|i| i == name)
            .map(|i| IndicatorId(i as u16))
    }

    /// Names from the root down to `id`
    #[must_use]
    pub fn path(&self, id: NodeId) -> Vec<String> {
        let mut path = Vec::new();
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            let node = &self.nodes[current.index()];
            path.push(node.name.clone());
            cursor = node.parent;
        }
        path.reverse();
        path
    }

    /// First node matching a `/`-separated name path from the root
    #[must_use]
    pub fn find(&self, path: &str) -> Option<NodeId> {
        let mut parts = path.split('/').filter(|p| !p.is_empty());
        let root = self.root();
        if parts.next()? != self.nodes.first()?.name {
            return None;
        }
        parts.try_fold(root, |current, name| {
            self.nodes[current.index()]
                .children
                .iter()
                .copied()
                .find(|c| self.nodes[c.index()].name == name)
        })
    }
}

fn collect(def: &NodeDefinition, indicators: &mut BTreeSet<String>, referenced: &mut Vec<String>) {
    let mut note = |names: Vec<String>| {
        for name in names {
            if !referenced.contains(&name) {
                referenced.push(name);
            }
        }
    };
    // Syntax errors are reported with their node path during compilation
    if let Ok(names) = def.amount.free_variables() {
        note(names);
    }
    for (indicator, source) in def.direct_formulas() {
        indicators.insert(indicator.clone());
        if let Ok(names) = source.free_variables() {
            note(names);
        }
    }
    for child in &def.children {
        collect(child, indicators, referenced);
    }
}
