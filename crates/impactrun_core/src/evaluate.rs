use crate::error::{EvalError, FormulaTarget, NumericError, TreeEvaluationError};
use crate::formula::{Bindings, Formula};
use crate::model::{EvaluationResult, ImpactTree, NodeId, NodeResult};

/// Bind one formula, attaching the node path on failure
fn bind_located(
    formula: &Formula,
    bindings: &Bindings,
    tree: &ImpactTree,
    id: NodeId,
    target: impl FnOnce() -> FormulaTarget,
) -> Result<f64, TreeEvaluationError> {
    formula.bind(bindings).map_err(|source| TreeEvaluationError {
        path: tree.path(id),
        target: target(),
        source,
    })
}

fn indicator_target(tree: &ImpactTree, slot: usize) -> FormulaTarget {
    FormulaTarget::Indicator(tree.indicators()[slot].clone())
}

/// Aggregation overflow at a node
fn non_finite(tree: &ImpactTree, id: NodeId, target: FormulaTarget) -> TreeEvaluationError {
    TreeEvaluationError {
        path: tree.path(id),
        target,
        source: EvalError::Numeric(NumericError::NonFinite {
            operation: "aggregation",
        }),
    }
}

/// Multiply per-indicator values by a factor, rejecting overflow
fn scaled(
    tree: &ImpactTree,
    id: NodeId,
    values: &[f64],
    factor: f64,
) -> Result<Vec<f64>, TreeEvaluationError> {
    values
        .iter()
        .enumerate()
        .map(|(slot, v)| {
            let product = v * factor;
            if product.is_finite() {
                Ok(product)
            } else {
                Err(non_finite(tree, id, indicator_target(tree, slot)))
            }
        })
        .collect()
}

/// Evaluate every node of the tree for one set of bindings.
///
/// Nodes are visited in pre-order and the first failing formula aborts the
/// evaluation, so an error always points at the earliest failing node.
/// Totals are then folded bottom-up: each node's total is its own impact
/// plus the scaled totals of its children.
pub fn evaluate_tree(
    tree: &ImpactTree,
    bindings: &Bindings,
) -> Result<EvaluationResult, TreeEvaluationError> {
    let width = tree.indicators().len();
    let mut amounts = Vec::with_capacity(tree.len());
    let mut directs = Vec::with_capacity(tree.len());

    for (index, node) in tree.nodes().iter().enumerate() {
        let id = NodeId(index as u32);
        amounts.push(bind_located(&node.amount, bindings, tree, id, || {
            FormulaTarget::Amount
        })?);

        let mut direct = vec![0.0; width];
        for (slot, (value, formula)) in direct.iter_mut().zip(&node.direct).enumerate() {
            if let Some(formula) = formula {
                *value = bind_located(formula, bindings, tree, id, || {
                    indicator_target(tree, slot)
                })?;
            }
        }
        directs.push(direct);
    }

    // Children always follow their parent, so a reverse pass sees every
    // child total before the parent consumes it.
    let mut totals = directs.clone();
    for index in (1..tree.len()).rev() {
        let Some(parent) = tree.nodes()[index].parent else {
            continue;
        };
        let amount = amounts[index];
        let (head, tail) = totals.split_at_mut(index);
        for (slot, (acc, child)) in head[parent.index()].iter_mut().zip(&tail[0]).enumerate() {
            *acc += child * amount;
            if !acc.is_finite() {
                return Err(non_finite(tree, parent, indicator_target(tree, slot)));
            }
        }
    }

    let mut path_amounts = vec![0.0; tree.len()];
    for (index, node) in tree.nodes().iter().enumerate() {
        let value = match node.parent {
            Some(parent) => path_amounts[parent.index()] * amounts[index],
            None => amounts[index],
        };
        if !value.is_finite() {
            return Err(non_finite(tree, NodeId(index as u32), FormulaTarget::Amount));
        }
        path_amounts[index] = value;
    }

    let nodes = directs
        .into_iter()
        .zip(totals)
        .enumerate()
        .map(|(index, (direct, total))| {
            let id = NodeId(index as u32);
            let amount = amounts[index];
            let path_amount = path_amounts[index];
            Ok(NodeResult {
                amount,
                path_amount,
                scaled_direct: scaled(tree, id, &direct, amount)?,
                scaled_total: scaled(tree, id, &total, amount)?,
                contribution: scaled(tree, id, &direct, path_amount)?,
                direct,
                total,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(EvaluationResult { nodes })
}
