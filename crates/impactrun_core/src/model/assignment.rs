//! Parameter assignments.
//!
//! [`Assignment`] is the name-keyed, concrete form callers build and read.
//! [`ParameterPoint`] is the dense form the evaluator binds. Raw override
//! values ([`ParamValue`]) may be formulas over other parameters or
//! enum-keyed switches and are resolved into an assignment first.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{BindingError, DefinitionError, EvalError, EvaluationError};
use crate::formula::Formula;

use super::ids::ParamId;
use super::parameters::ParameterKind;
use super::registry::ParameterRegistry;

/// A concrete parameter value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Float(f64),
    Variant(String),
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Variant(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Variant(value)
    }
}

/// Parameter name to concrete value
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Assignment {
    values: BTreeMap<String, Value>,
}

impl Assignment {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(name.into(), value.into());
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Resolve raw values into a complete assignment.
    ///
    /// Expressions are evaluated in dependency order, parameters without a
    /// value take their default, and every result is checked against the
    /// parameter's bounds or declared variants.
    pub fn resolve(
        values: &BTreeMap<String, ParamValue>,
        registry: &ParameterRegistry,
    ) -> Result<Self, EvaluationError> {
        let point = resolve_point(values, registry)?;
        Ok(registry.to_assignment(&point))
    }
}

/// Dense value of one parameter
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointValue {
    Float(f64),
    /// Index into the enum's declared variants
    Variant(u16),
}

/// One value slot per registered parameter, `None` when unset
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterPoint {
    values: Vec<Option<PointValue>>,
}

impl ParameterPoint {
    #[must_use]
    pub fn new(values: Vec<Option<PointValue>>) -> Self {
        Self { values }
    }

    #[must_use]
    pub fn values(&self) -> &[Option<PointValue>] {
        &self.values
    }

    #[must_use]
    pub fn get(&self, id: ParamId) -> Option<PointValue> {
        self.values.get(id.index()).copied().flatten()
    }

    pub fn set(&mut self, id: ParamId, value: PointValue) {
        if let Some(slot) = self.values.get_mut(id.index()) {
            *slot = Some(value);
        }
    }
}

/// A raw parameter value as written in an override file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Number(f64),
    /// A variant name for enum parameters, a formula for float parameters
    Text(String),
    /// `{enum_parameter: {variant: value, ...}}`, one entry per variant
    Switch(BTreeMap<String, BTreeMap<String, ParamValue>>),
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        ParamValue::Number(value)
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Text(value.to_string())
    }
}

/// A single value or a list of values for one parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OverrideValue {
    Single(ParamValue),
    List(Vec<ParamValue>),
}

/// Overrides for several evaluations at once.
///
/// Every list must be non-empty and all lists share one length `n`; single
/// values are repeated, giving `n` value sets.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterOverrides {
    values: BTreeMap<String, OverrideValue>,
}

impl ParameterOverrides {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn single(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.values
            .insert(name.into(), OverrideValue::Single(value.into()));
        self
    }

    #[must_use]
    pub fn list(mut self, name: impl Into<String>, values: Vec<ParamValue>) -> Self {
        self.values.insert(name.into(), OverrideValue::List(values));
        self
    }

    pub fn expand(&self) -> Result<Vec<BTreeMap<String, ParamValue>>, BindingError> {
        let mut len: Option<usize> = None;
        for (name, value) in &self.values {
            if let OverrideValue::List(items) = value {
                if items.is_empty() {
                    return Err(BindingError::EmptyValueList(name.clone()));
                }
                match len {
                    None => len = Some(items.len()),
                    Some(n) if n != items.len() => return Err(BindingError::MismatchedListLengths),
                    Some(_) => {}
                }
            }
        }

        let count = len.unwrap_or(1);
        Ok((0..count)
            .map(|i| {
                self.values
                    .iter()
                    .map(|(name, value)| {
                        let picked = match value {
                            OverrideValue::Single(v) => v.clone(),
                            OverrideValue::List(items) => items[i].clone(),
                        };
                        (name.clone(), picked)
                    })
                    .collect()
            })
            .collect())
    }
}

/// How to compute the value of one parameter
enum Plan {
    Value(PointValue),
    Formula(Formula),
    /// Cases indexed by the selector's variant
    Switch { selector: ParamId, cases: Vec<Plan> },
}

pub(crate) fn resolve_point(
    values: &BTreeMap<String, ParamValue>,
    registry: &ParameterRegistry,
) -> Result<ParameterPoint, EvaluationError> {
    let mut point = registry.default_point();
    let mut pending: Vec<(ParamId, Plan, Vec<ParamId>)> = Vec::new();

    for (name, value) in values {
        let id = registry
            .id(name)
            .ok_or_else(|| BindingError::UnknownParameter(name.clone()))?;
        let mut deps = Vec::new();
        match plan_value(id, value, registry, &mut deps)? {
            Plan::Value(v) => point.set(id, v),
            plan => pending.push((id, plan, deps)),
        }
    }

    for index in evaluation_order(&pending, registry)? {
        let (id, plan, _) = &pending[index];
        let value = run_plan(*id, plan, &point, registry)?;
        point.set(*id, value);
    }

    Ok(point)
}

fn plan_value(
    target: ParamId,
    value: &ParamValue,
    registry: &ParameterRegistry,
    deps: &mut Vec<ParamId>,
) -> Result<Plan, EvaluationError> {
    let param = registry.parameter(target);
    let invalid = |reason: String| DefinitionError::InvalidParameter {
        name: param.name.clone(),
        reason,
    };

    match value {
        ParamValue::Number(v) => Ok(Plan::Value(
            registry.check_value(target, &Value::Float(*v))?,
        )),
        ParamValue::Text(text) => match &param.kind {
            ParameterKind::Enum(_) => Ok(Plan::Value(
                registry.check_value(target, &Value::Variant(text.clone()))?,
            )),
            ParameterKind::Float(_) => {
                if let Ok(v) = text.trim().parse::<f64>() {
                    return Ok(Plan::Value(registry.check_value(target, &Value::Float(v))?));
                }
                let formula = Formula::compile(text, registry.variables())
                    .map_err(|e| invalid(format!("invalid expression {text:?}: {e}")))?;
                for var in formula.variables() {
                    let owner = registry.variables().slot(var).param;
                    if !deps.contains(&owner) {
                        deps.push(owner);
                    }
                }
                Ok(Plan::Formula(formula))
            }
        },
        ParamValue::Switch(map) => {
            let mut entries = map.iter();
            let (Some((selector_name, cases)), None) = (entries.next(), entries.next()) else {
                return Err(invalid(
                    "a value mapping must be keyed by exactly one enum parameter".into(),
                )
                .into());
            };
            let selector = registry
                .id(selector_name)
                .ok_or_else(|| BindingError::UnknownParameter(selector_name.clone()))?;
            let Some(spec) = registry.parameter(selector).as_enum() else {
                return Err(invalid(format!(
                    "values can only be mapped over an enum parameter, {selector_name:?} is not one"
                ))
                .into());
            };
            if let Some(extra) = cases.keys().find(|k| spec.variant_index(k).is_none()) {
                return Err(BindingError::UnknownVariant {
                    parameter: selector_name.clone(),
                    variant: extra.clone(),
                }
                .into());
            }
            if let Some(missing) = spec.variants.iter().find(|v| !cases.contains_key(*v)) {
                return Err(invalid(format!(
                    "no value given for variant {missing:?} of {selector_name:?}"
                ))
                .into());
            }
            if !deps.contains(&selector) {
                deps.push(selector);
            }
            let plans = spec
                .variants
                .iter()
                .map(|variant| plan_value(target, &cases[variant], registry, deps))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Plan::Switch {
                selector,
                cases: plans,
            })
        }
    }
}

fn run_plan(
    target: ParamId,
    plan: &Plan,
    point: &ParameterPoint,
    registry: &ParameterRegistry,
) -> Result<PointValue, EvaluationError> {
    match plan {
        Plan::Value(v) => Ok(*v),
        Plan::Formula(formula) => {
            let name = &registry.parameter(target).name;
            let value = formula
                .bind(&registry.bindings(point))
                .map_err(|source: EvalError| EvaluationError::Parameter {
                    name: name.clone(),
                    source,
                })?;
            Ok(registry.check_value(target, &Value::Float(value))?)
        }
        Plan::Switch { selector, cases } => {
            let index = match point.get(*selector) {
                Some(PointValue::Variant(i)) => i as usize,
                _ => {
                    return Err(BindingError::MissingBinding(
                        registry.parameter(*selector).name.clone(),
                    )
                    .into());
                }
            };
            run_plan(target, &cases[index], point, registry)
        }
    }
}

/// Topological order over pending expressions, depth first
fn evaluation_order(
    pending: &[(ParamId, Plan, Vec<ParamId>)],
    registry: &ParameterRegistry,
) -> Result<Vec<usize>, DefinitionError> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        New,
        Active,
        Done,
    }

    fn visit(
        index: usize,
        pending: &[(ParamId, Plan, Vec<ParamId>)],
        marks: &mut [Mark],
        stack: &mut Vec<usize>,
        order: &mut Vec<usize>,
    ) -> Result<(), Vec<usize>> {
        match marks[index] {
            Mark::Done => return Ok(()),
            Mark::Active => {
                let start = stack.iter().position(|&i| i == index).unwrap_or(0);
                return Err(stack[start..].to_vec());
            }
            Mark::New => {}
        }
        marks[index] = Mark::Active;
        stack.push(index);
        for dep in &pending[index].2 {
            if let Some(next) = pending.iter().position(|(id, _, _)| id == dep) {
                visit(next, pending, marks, stack, order)?;
            }
        }
        stack.pop();
        marks[index] = Mark::Done;
        order.push(index);
        Ok(())
    }

    let mut marks = vec![Mark::New; pending.len()];
    let mut order = Vec::with_capacity(pending.len());
    let mut stack = Vec::new();
    for index in 0..pending.len() {
        visit(index, pending, &mut marks, &mut stack, &mut order).map_err(|cycle| {
            DefinitionError::DependencyCycle(
                cycle
                    .into_iter()
                    .map(|i| registry.parameter(pending[i].0).name.clone())
                    .collect(),
            )
        })?;
    }
    Ok(order)
}
