//! Parameter definitions and their declared uncertainty.

use serde::{Deserialize, Serialize};

use crate::error::{BindingError, DefinitionError};

/// Sampling law of a float parameter
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FloatDistribution {
    /// Uniform over the sampling envelope
    #[default]
    Linear,
    /// Triangular over the envelope, peaking at the default
    Triangular,
    /// Normal around the default with standard deviation `std`,
    /// truncated to the envelope when there is one
    Normal,
}

impl FloatDistribution {
    pub fn name(self) -> &'static str {
        match self {
            FloatDistribution::Linear => "linear",
            FloatDistribution::Triangular => "triangular",
            FloatDistribution::Normal => "normal",
        }
    }
}

/// A continuous parameter
#[derive(Debug, Clone, PartialEq)]
pub struct FloatParameter {
    pub default: f64,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub distribution: FloatDistribution,
    pub std: Option<f64>,
    /// Absolute half-width of the sampling envelope around `default`
    pub pm: Option<f64>,
    /// Relative half-width of the sampling envelope (`0.1` = ±10%)
    pub pm_perc: Option<f64>,
}

impl FloatParameter {
    #[must_use]
    pub fn new(default: f64) -> Self {
        Self {
            default,
            min: None,
            max: None,
            distribution: FloatDistribution::Linear,
            std: None,
            pm: None,
            pm_perc: None,
        }
    }

    /// Hard clamp declared through `min`/`max`
    #[must_use]
    pub fn bounds(&self) -> Option<(f64, f64)> {
        match (self.min, self.max) {
            (Some(min), Some(max)) => Some((min, max)),
            _ => None,
        }
    }

    /// The interval values are drawn from.
    ///
    /// `pm` wins over `pm_perc`, and both win over the declared bounds.
    /// `None` means the parameter has no envelope at all.
    #[must_use]
    pub fn envelope(&self) -> Option<(f64, f64)> {
        if let Some(pm) = self.pm {
            return Some((self.default - pm, self.default + pm));
        }
        if let Some(perc) = self.pm_perc {
            let delta = perc * self.default.abs();
            return Some((self.default - delta, self.default + delta));
        }
        self.bounds()
    }

    /// Check an explicit value against the hard clamp
    pub fn check_value(&self, name: &str, value: f64) -> Result<(), BindingError> {
        if !value.is_finite() {
            return Err(BindingError::KindMismatch {
                parameter: name.to_string(),
                expected: "finite numeric",
            });
        }
        let min = self.min.unwrap_or(f64::NEG_INFINITY);
        let max = self.max.unwrap_or(f64::INFINITY);
        if value < min || value > max {
            return Err(BindingError::OutOfBounds {
                parameter: name.to_string(),
                value,
                min,
                max,
            });
        }
        Ok(())
    }

    fn validate(&self, name: &str) -> Result<(), DefinitionError> {
        let invalid = |reason: &str| DefinitionError::InvalidParameter {
            name: name.to_string(),
            reason: reason.to_string(),
        };

        let declared = [
            Some(self.default),
            self.min,
            self.max,
            self.std,
            self.pm,
            self.pm_perc,
        ];
        if declared.iter().flatten().any(|v| !v.is_finite()) {
            return Err(invalid("values must be finite"));
        }
        if self.pm.is_some_and(|pm| pm < 0.0) || self.pm_perc.is_some_and(|p| p < 0.0) {
            return Err(invalid("pm and pm_perc must be non-negative"));
        }
        if self.std.is_some_and(|s| s <= 0.0) {
            return Err(invalid("std must be positive"));
        }
        if self.distribution == FloatDistribution::Normal && self.std.is_none() {
            return Err(invalid("a normal distribution requires std"));
        }
        // Inverted bounds are reported when sampling
        if let Some((min, max)) = self.bounds()
            && min <= max
            && (self.default < min || self.default > max)
        {
            return Err(invalid("default is outside [min, max]"));
        }
        Ok(())
    }
}

/// A categorical parameter
#[derive(Debug, Clone, PartialEq)]
pub struct EnumParameter {
    pub default: String,
    /// Declared variants, in the order their indicator variables are created
    pub variants: Vec<String>,
    /// Relative likelihood of each variant, aligned with `variants`
    pub weights: Vec<f64>,
}

impl EnumParameter {
    /// Variants with equal weights
    #[must_use]
    pub fn uniform(default: impl Into<String>, variants: Vec<String>) -> Self {
        let weights = vec![1.0; variants.len()];
        Self {
            default: default.into(),
            variants,
            weights,
        }
    }

    #[must_use]
    pub fn variant_index(&self, variant: &str) -> Option<usize> {
        self.variants.iter().position(|v| v == variant)
    }

    #[must_use]
    pub fn default_index(&self) -> usize {
        self.variant_index(&self.default).unwrap_or(0)
    }

    fn validate(&self, name: &str) -> Result<(), DefinitionError> {
        let invalid = |reason: String| DefinitionError::InvalidParameter {
            name: name.to_string(),
            reason,
        };

        if self.variants.is_empty() {
            return Err(invalid("an enum parameter needs at least one variant".into()));
        }
        for (i, variant) in self.variants.iter().enumerate() {
            if self.variants[..i].contains(variant) {
                return Err(invalid(format!("variant {variant:?} is declared twice")));
            }
            if variant.is_empty() {
                return Err(invalid("variant names must not be empty".into()));
            }
        }
        if self.weights.len() != self.variants.len() {
            return Err(invalid("every variant needs exactly one weight".into()));
        }
        if self.variant_index(&self.default).is_none() {
            return Err(invalid(format!(
                "default {:?} is not one of the declared variants",
                self.default
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParameterKind {
    Float(FloatParameter),
    Enum(EnumParameter),
}

/// A named model parameter
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub kind: ParameterKind,
}

impl Parameter {
    #[must_use]
    pub fn float(name: impl Into<String>, spec: FloatParameter) -> Self {
        Self {
            name: name.into(),
            kind: ParameterKind::Float(spec),
        }
    }

    #[must_use]
    pub fn enumeration(name: impl Into<String>, spec: EnumParameter) -> Self {
        Self {
            name: name.into(),
            kind: ParameterKind::Enum(spec),
        }
    }

    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self.kind {
            ParameterKind::Float(_) => "float",
            ParameterKind::Enum(_) => "enum",
        }
    }

    #[must_use]
    pub fn as_float(&self) -> Option<&FloatParameter> {
        match &self.kind {
            ParameterKind::Float(spec) => Some(spec),
            ParameterKind::Enum(_) => None,
        }
    }

    #[must_use]
    pub fn as_enum(&self) -> Option<&EnumParameter> {
        match &self.kind {
            ParameterKind::Enum(spec) => Some(spec),
            ParameterKind::Float(_) => None,
        }
    }

    /// Structural checks done at registration.
    ///
    /// Sampling-related problems (inverted bounds, bad weights) are left to
    /// the sampler so they surface as sampling errors.
    pub fn validate(&self) -> Result<(), DefinitionError> {
        if !is_identifier(&self.name) {
            return Err(DefinitionError::InvalidParameter {
                name: self.name.clone(),
                reason: "names must be identifiers usable in formulas".to_string(),
            });
        }
        match &self.kind {
            ParameterKind::Float(spec) => spec.validate(&self.name),
            ParameterKind::Enum(spec) => spec.validate(&self.name),
        }
    }
}

pub(crate) fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
