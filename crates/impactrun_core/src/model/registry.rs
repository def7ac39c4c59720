//! Parameter registry and the formula variables it exposes.

use rustc_hash::FxHashMap;

use crate::error::{BindingError, DefinitionError, SamplingError};
use crate::formula::{Bindings, VariableResolver};

use super::assignment::{Assignment, ParameterPoint, PointValue, Value};
use super::ids::{ParamId, VarId};
use super::parameters::{Parameter, ParameterKind};
use super::sampler::Sampler;

/// What a formula variable stands for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VarSlot {
    pub name: String,
    pub param: ParamId,
    /// Variant index for enum indicator variables
    pub variant: Option<u16>,
}

/// Formula variables of every registered parameter.
///
/// A float parameter owns one variable named after it. An enum parameter
/// owns one indicator per variant, named `{parameter}_{variant}`, created
/// when the parameter is registered.
#[derive(Debug, Clone, Default)]
pub struct VariableTable {
    slots: Vec<VarSlot>,
    by_name: FxHashMap<String, VarId>,
}

impl VariableTable {
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    #[must_use]
    pub fn slot(&self, id: VarId) -> &VarSlot {
        &self.slots[id.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (VarId, &VarSlot)> {
        self.slots
            .iter()
            .enumerate()
            .map(|(i, slot)| (VarId(i as u32), slot))
    }

    fn push(&mut self, name: String, param: ParamId, variant: Option<u16>) -> VarId {
        let id = VarId(self.slots.len() as u32);
        self.by_name.insert(name.clone(), id);
        self.slots.push(VarSlot {
            name,
            param,
            variant,
        });
        id
    }
}

impl VariableResolver for VariableTable {
    fn resolve(&self, name: &str) -> Option<VarId> {
        self.by_name.get(name).copied()
    }
}

/// Variables owned by one parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamSlots {
    Float(VarId),
    /// One indicator per declared variant, in declaration order
    Indicators(Vec<VarId>),
}

#[derive(Debug, Clone, Default)]
pub struct ParameterRegistry {
    params: Vec<Parameter>,
    slots: Vec<ParamSlots>,
    by_name: FxHashMap<String, ParamId>,
    variables: VariableTable,
}

impl ParameterRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a parameter and create its formula variables
    pub fn register(&mut self, param: Parameter) -> Result<ParamId, DefinitionError> {
        if self.by_name.contains_key(&param.name) {
            return Err(DefinitionError::DuplicateParameter(param.name));
        }
        param.validate()?;

        let id = ParamId(self.params.len() as u16);
        let names: Vec<String> = match &param.kind {
            ParameterKind::Float(_) => vec![param.name.clone()],
            ParameterKind::Enum(spec) => spec
                .variants
                .iter()
                .map(|variant| indicator_name(&param.name, variant))
                .collect(),
        };
        if let Some(taken) = names
            .iter()
            .chain(std::iter::once(&param.name))
            .find(|n| self.variables.resolve(n).is_some() || self.by_name.contains_key(*n))
        {
            return Err(DefinitionError::InvalidParameter {
                name: param.name.clone(),
                reason: format!("variable {taken:?} is already defined by another parameter"),
            });
        }

        let slots = match &param.kind {
            ParameterKind::Float(_) => {
                ParamSlots::Float(self.variables.push(param.name.clone(), id, None))
            }
            ParameterKind::Enum(_) => ParamSlots::Indicators(
                names
                    .into_iter()
                    .enumerate()
                    .map(|(i, name)| self.variables.push(name, id, Some(i as u16)))
                    .collect(),
            ),
        };

        tracing::debug!(parameter = %param.name, kind = param.kind_name(), "registered parameter");
        self.by_name.insert(param.name.clone(), id);
        self.params.push(param);
        self.slots.push(slots);
        Ok(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.params.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    #[must_use]
    pub fn id(&self, name: &str) -> Option<ParamId> {
        self.by_name.get(name).copied()
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Parameter> {
        self.id(name).map(|id| &self.params[id.index()])
    }

    #[must_use]
    pub fn parameter(&self, id: ParamId) -> &Parameter {
        &self.params[id.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (ParamId, &Parameter)> {
        self.params
            .iter()
            .enumerate()
            .map(|(i, p)| (ParamId(i as u16), p))
    }

    #[must_use]
    pub fn variables(&self) -> &VariableTable {
        &self.variables
    }

    #[must_use]
    pub fn slots(&self, id: ParamId) -> &ParamSlots {
        &self.slots[id.index()]
    }

    /// Indicator variable names of an enum parameter
    #[must_use]
    pub fn indicator_names(&self, name: &str) -> Option<Vec<&str>> {
        let id = self.id(name)?;
        match &self.slots[id.index()] {
            ParamSlots::Indicators(vars) => Some(
                vars.iter()
                    .map(|v| self.variables.slot(*v).name.as_str())
                    .collect(),
            ),
            ParamSlots::Float(_) => None,
        }
    }

    /// Parameter owning a formula variable, if the name resolves at all
    #[must_use]
    pub fn owner_of(&self, variable: &str) -> Option<ParamId> {
        self.variables
            .resolve(variable)
            .map(|v| self.variables.slot(v).param)
    }

    /// Every parameter at its default value
    #[must_use]
    pub fn resolve_default(&self) -> Assignment {
        self.to_assignment(&self.default_point())
    }

    #[must_use]
    pub fn default_point(&self) -> ParameterPoint {
        ParameterPoint::new(
            self.params
                .iter()
                .map(|p| {
                    Some(match &p.kind {
                        ParameterKind::Float(spec) => PointValue::Float(spec.default),
                        ParameterKind::Enum(spec) => {
                            PointValue::Variant(spec.default_index() as u16)
                        }
                    })
                })
                .collect(),
        )
    }

    /// Fail with every formula variable that no parameter provides
    pub fn validate_against<'a, I>(&self, variable_names: I) -> Result<(), DefinitionError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut unknown: Vec<String> = Vec::new();
        for name in variable_names {
            if self.variables.resolve(name).is_none() && !unknown.iter().any(|n| n == name) {
                unknown.push(name.to_string());
            }
        }
        if unknown.is_empty() {
            Ok(())
        } else {
            Err(DefinitionError::UnknownParameter { names: unknown })
        }
    }

    /// Check an assignment and convert it to dense parameter values.
    ///
    /// Parameters missing from the assignment stay unset; formulas that use
    /// them fail with a missing binding.
    pub fn resolve(&self, assignment: &Assignment) -> Result<ParameterPoint, BindingError> {
        let mut values = vec![None; self.params.len()];
        for (name, value) in assignment.iter() {
            let id = self
                .id(name)
                .ok_or_else(|| BindingError::UnknownParameter(name.to_string()))?;
            values[id.index()] = Some(self.check_value(id, value)?);
        }
        Ok(ParameterPoint::new(values))
    }

    pub(crate) fn check_value(
        &self,
        id: ParamId,
        value: &Value,
    ) -> Result<PointValue, BindingError> {
        let param = &self.params[id.index()];
        match (&param.kind, value) {
            (ParameterKind::Float(spec), Value::Float(v)) => {
                spec.check_value(&param.name, *v)?;
                Ok(PointValue::Float(*v))
            }
            (ParameterKind::Enum(spec), Value::Variant(variant)) => spec
                .variant_index(variant)
                .map(|i| PointValue::Variant(i as u16))
                .ok_or_else(|| BindingError::UnknownVariant {
                    parameter: param.name.clone(),
                    variant: variant.clone(),
                }),
            (ParameterKind::Float(_), Value::Variant(_)) => Err(BindingError::KindMismatch {
                parameter: param.name.clone(),
                expected: "numeric",
            }),
            (ParameterKind::Enum(_), Value::Float(_)) => Err(BindingError::KindMismatch {
                parameter: param.name.clone(),
                expected: "variant name",
            }),
        }
    }

    /// Fill the variable slots for one point; enum indicators are one-hot
    #[must_use]
    pub fn bindings(&self, point: &ParameterPoint) -> Bindings {
        let mut bindings = Bindings::unbound(self.variables.len());
        self.bind_into(point, &mut bindings);
        bindings
    }

    pub(crate) fn bind_into(&self, point: &ParameterPoint, bindings: &mut Bindings) {
        for (slots, value) in self.slots.iter().zip(point.values()) {
            match (slots, value) {
                (ParamSlots::Float(var), Some(PointValue::Float(v))) => bindings.set(*var, *v),
                (ParamSlots::Indicators(vars), Some(PointValue::Variant(selected))) => {
                    for (i, var) in vars.iter().enumerate() {
                        let hot = i == *selected as usize;
                        bindings.set(*var, if hot { 1.0 } else { 0.0 });
                    }
                }
                _ => {}
            }
        }
    }

    /// Name-keyed view of a point
    #[must_use]
    pub fn to_assignment(&self, point: &ParameterPoint) -> Assignment {
        let mut assignment = Assignment::new();
        for (param, value) in self.params.iter().zip(point.values()) {
            let value = match (&param.kind, value) {
                (_, Some(PointValue::Float(v))) => Value::Float(*v),
                (ParameterKind::Enum(spec), Some(PointValue::Variant(i))) => {
                    Value::Variant(spec.variants[*i as usize].clone())
                }
                _ => continue,
            };
            assignment.set(param.name.clone(), value);
        }
        assignment
    }

    /// Prepare the sampling law of every parameter, in registration order
    pub fn samplers(&self) -> Result<Vec<Sampler>, SamplingError> {
        self.params.iter().map(Sampler::prepare).collect()
    }
}

#[must_use]
pub fn indicator_name(parameter: &str, variant: &str) -> String {
    format!("{parameter}_{variant}")
}
