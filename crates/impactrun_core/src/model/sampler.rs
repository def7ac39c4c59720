//! Prepared sampling laws.
//!
//! A [`Sampler`] is built once per batch from a parameter definition, which
//! is where every distribution problem is reported. Drawing afterwards cannot
//! fail, either from a random generator or from a unit-interval coordinate
//! (used by space-filling and sensitivity designs).

use rand::Rng;
use rand::distr::weighted::WeightedIndex;
use rand_distr::{Distribution, Normal, Triangular};
use statrs::distribution::{ContinuousCDF, Normal as NormalLaw};

use crate::error::SamplingError;

use super::assignment::PointValue;
use super::parameters::{FloatDistribution, FloatParameter, Parameter, ParameterKind};

/// Smallest probability mass a truncated normal may keep inside its envelope
const MIN_TRUNCATED_MASS: f64 = 1e-12;

#[derive(Debug, Clone)]
pub enum Sampler {
    Fixed(f64),
    Uniform {
        low: f64,
        high: f64,
    },
    Triangular {
        dist: Triangular<f64>,
        low: f64,
        high: f64,
        mode: f64,
    },
    Normal {
        dist: Normal<f64>,
        /// Same law, used for its CDF and inverse CDF
        law: NormalLaw,
        /// Truncation interval with its CDF values
        truncation: Option<Truncation>,
    },
    Categorical {
        dist: WeightedIndex<f64>,
        /// Normalized cumulative weights, last entry is 1
        cumulative: Vec<f64>,
    },
}

#[derive(Debug, Clone, Copy)]
pub struct Truncation {
    low: f64,
    high: f64,
    cdf_low: f64,
    cdf_high: f64,
}

impl Sampler {
    /// Validate the declared law of `param` and prepare it for drawing
    pub fn prepare(param: &Parameter) -> Result<Self, SamplingError> {
        match &param.kind {
            ParameterKind::Float(spec) => prepare_float(&param.name, spec),
            ParameterKind::Enum(spec) => prepare_categorical(&param.name, &spec.weights),
        }
    }

    pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> PointValue {
        match self {
            Sampler::Fixed(v) => PointValue::Float(*v),
            Sampler::Uniform { low, high } => {
                if low == high {
                    PointValue::Float(*low)
                } else {
                    PointValue::Float(rng.random_range(*low..=*high))
                }
            }
            Sampler::Triangular { dist, .. } => PointValue::Float(dist.sample(rng)),
            Sampler::Normal {
                dist, truncation, ..
            } => match truncation {
                None => PointValue::Float(dist.sample(rng)),
                // Inverse transform keeps truncated draws exact without rejection
                Some(_) => self.quantile(rng.random::<f64>()),
            },
            Sampler::Categorical { dist, .. } => PointValue::Variant(dist.sample(rng) as u16),
        }
    }

    /// Map `u` in `[0, 1]` through the inverse CDF of the law
    #[must_use]
    pub fn quantile(&self, u: f64) -> PointValue {
        let u = u.clamp(0.0, 1.0);
        match self {
            Sampler::Fixed(v) => PointValue::Float(*v),
            Sampler::Uniform { low, high } => PointValue::Float(low + u * (high - low)),
            Sampler::Triangular {
                low, high, mode, ..
            } => PointValue::Float(triangular_quantile(*low, *high, *mode, u)),
            Sampler::Normal {
                law, truncation, ..
            } => {
                let value = match truncation {
                    None => law.inverse_cdf(u.clamp(1e-12, 1.0 - 1e-12)),
                    Some(t) => {
                        let p = t.cdf_low + u * (t.cdf_high - t.cdf_low);
                        law.inverse_cdf(p.clamp(1e-300, 1.0 - 1e-16))
                            .clamp(t.low, t.high)
                    }
                };
                PointValue::Float(value)
            }
            Sampler::Categorical { cumulative, .. } => {
                let index = cumulative
                    .iter()
                    .position(|&c| u < c)
                    .unwrap_or(cumulative.len() - 1);
                PointValue::Variant(index as u16)
            }
        }
    }
}

fn prepare_float(name: &str, spec: &FloatParameter) -> Result<Sampler, SamplingError> {
    if let Some((min, max)) = spec.bounds()
        && min > max
    {
        return Err(SamplingError::InvalidBounds {
            parameter: name.to_string(),
            min,
            max,
        });
    }

    let invalid = |reason: &'static str| SamplingError::InvalidDistributionParameters {
        parameter: name.to_string(),
        distribution: spec.distribution.name(),
        reason,
    };

    let envelope = spec.envelope();
    if let Some((low, high)) = envelope
        && !(high - low).is_finite()
    {
        return Err(invalid("envelope width is not finite"));
    }

    // A perturbation envelope may not leave the declared hard bounds
    if let (Some((low, high)), Some((min, max))) = (envelope, spec.bounds()) {
        for value in [low, high] {
            if value < min || value > max {
                return Err(SamplingError::OutOfBounds {
                    parameter: name.to_string(),
                    value,
                    min,
                    max,
                });
            }
        }
    }

    match (spec.distribution, envelope) {
        (FloatDistribution::Normal, envelope) => {
            let std = spec.std.ok_or_else(|| invalid("std is required"))?;
            let dist = Normal::new(spec.default, std)
                .map_err(|_| invalid("std must be positive and finite"))?;
            let law = NormalLaw::new(spec.default, std)
                .map_err(|_| invalid("std must be positive and finite"))?;
            let truncation = match envelope {
                None => None,
                Some((low, high)) => {
                    let cdf_low = law.cdf(low);
                    let cdf_high = law.cdf(high);
                    if cdf_high - cdf_low < MIN_TRUNCATED_MASS {
                        return Err(invalid("envelope holds no probability mass"));
                    }
                    Some(Truncation {
                        low,
                        high,
                        cdf_low,
                        cdf_high,
                    })
                }
            };
            Ok(Sampler::Normal {
                dist,
                law,
                truncation,
            })
        }
        (_, None) => Ok(Sampler::Fixed(spec.default)),
        (_, Some((low, high))) if low == high => Ok(Sampler::Fixed(low)),
        (FloatDistribution::Linear, Some((low, high))) => Ok(Sampler::Uniform { low, high }),
        (FloatDistribution::Triangular, Some((low, high))) => {
            let mode = spec.default.clamp(low, high);
            let dist = Triangular::new(low, high, mode)
                .map_err(|_| invalid("mode must lie inside the envelope"))?;
            Ok(Sampler::Triangular {
                dist,
                low,
                high,
                mode,
            })
        }
    }
}

fn prepare_categorical(name: &str, weights: &[f64]) -> Result<Sampler, SamplingError> {
    if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
        return Err(SamplingError::InvalidWeight {
            parameter: name.to_string(),
            reason: "weights must be finite and non-negative",
        });
    }
    let total: f64 = weights.iter().sum();
    if total <= 0.0 {
        return Err(SamplingError::InvalidWeight {
            parameter: name.to_string(),
            reason: "at least one weight must be positive",
        });
    }
    let dist = WeightedIndex::new(weights).map_err(|_| SamplingError::InvalidWeight {
        parameter: name.to_string(),
        reason: "weights cannot be normalized",
    })?;

    let mut running = 0.0;
    let mut cumulative: Vec<f64> = weights
        .iter()
        .map(|w| {
            running += w / total;
            running
        })
        .collect();
    // Guard against rounding leaving the last bucket short of 1
    if let Some(last) = cumulative.last_mut() {
        *last = 1.0;
    }

    Ok(Sampler::Categorical { dist, cumulative })
}

fn triangular_quantile(low: f64, high: f64, mode: f64, u: f64) -> f64 {
    let width = high - low;
    if width <= 0.0 {
        return low;
    }
    let split = (mode - low) / width;
    if u < split {
        low + (u * width * (mode - low)).sqrt()
    } else {
        high - ((1.0 - u) * width * (high - mode)).sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::EnumParameter;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn float(spec: FloatParameter) -> Parameter {
        Parameter::float("x", spec)
    }

    #[test]
    fn test_uniform_within_bounds() {
        let sampler = Sampler::prepare(&float(FloatParameter {
            min: Some(1.0),
            max: Some(3.0),
            ..FloatParameter::new(2.0)
        }))
        .unwrap();
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..1000 {
            let PointValue::Float(v) = sampler.draw(&mut rng) else {
                panic!("expected a float");
            };
            assert!((1.0..=3.0).contains(&v));
        }
    }

    #[test]
    fn test_pm_envelope_without_bounds() {
        let sampler = Sampler::prepare(&float(FloatParameter {
            pm: Some(1.0),
            ..FloatParameter::new(2.0)
        }))
        .unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..1000 {
            let PointValue::Float(v) = sampler.draw(&mut rng) else {
                panic!("expected a float");
            };
            assert!((1.0..=3.0).contains(&v));
        }
    }

    #[test]
    fn test_pm_envelope_outside_bounds_fails() {
        let result = Sampler::prepare(&float(FloatParameter {
            min: Some(1.5),
            max: Some(3.0),
            pm: Some(1.0),
            ..FloatParameter::new(2.0)
        }));
        assert!(matches!(
            result,
            Err(SamplingError::OutOfBounds { value, .. }) if value == 1.0
        ));
    }

    #[test]
    fn test_inverted_bounds_fail() {
        let result = Sampler::prepare(&float(FloatParameter {
            min: Some(3.0),
            max: Some(1.0),
            ..FloatParameter::new(2.0)
        }));
        assert!(matches!(result, Err(SamplingError::InvalidBounds { .. })));
    }

    #[test]
    fn test_no_envelope_is_fixed() {
        let sampler = Sampler::prepare(&float(FloatParameter::new(4.2))).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(sampler.draw(&mut rng), PointValue::Float(4.2));
        assert_eq!(sampler.quantile(0.9), PointValue::Float(4.2));
    }

    #[test]
    fn test_truncated_normal_stays_inside() {
        let sampler = Sampler::prepare(&float(FloatParameter {
            distribution: FloatDistribution::Normal,
            std: Some(5.0),
            min: Some(0.0),
            max: Some(1.0),
            ..FloatParameter::new(0.5)
        }))
        .unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..500 {
            let PointValue::Float(v) = sampler.draw(&mut rng) else {
                panic!("expected a float");
            };
            assert!((0.0..=1.0).contains(&v));
        }
    }

    #[test]
    fn test_triangular_quantile_endpoints() {
        assert_eq!(triangular_quantile(0.0, 2.0, 1.0, 0.0), 0.0);
        assert_eq!(triangular_quantile(0.0, 2.0, 1.0, 1.0), 2.0);
        assert!((triangular_quantile(0.0, 2.0, 1.0, 0.5) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_normal_quantile() {
        let sampler = Sampler::prepare(&float(FloatParameter {
            distribution: FloatDistribution::Normal,
            std: Some(2.0),
            ..FloatParameter::new(10.0)
        }))
        .unwrap();
        let at = |u: f64| match sampler.quantile(u) {
            PointValue::Float(v) => v,
            PointValue::Variant(_) => panic!("expected a float"),
        };
        assert!((at(0.5) - 10.0).abs() < 1e-9);
        assert!((at(0.975) - (10.0 + 2.0 * 1.959_963_985)).abs() < 1e-6);
        assert!((at(0.025) - (10.0 - 2.0 * 1.959_963_985)).abs() < 1e-6);
    }

    #[test]
    fn test_truncated_quantile_spans_envelope() {
        let sampler = Sampler::prepare(&float(FloatParameter {
            distribution: FloatDistribution::Normal,
            std: Some(1.0),
            pm: Some(1.0),
            ..FloatParameter::new(0.0)
        }))
        .unwrap();
        let PointValue::Float(low) = sampler.quantile(0.0) else {
            panic!("expected a float");
        };
        let PointValue::Float(high) = sampler.quantile(1.0) else {
            panic!("expected a float");
        };
        assert!((low + 1.0).abs() < 1e-6, "{low}");
        assert!((high - 1.0).abs() < 1e-6, "{high}");
        let PointValue::Float(mid) = sampler.quantile(0.5) else {
            panic!("expected a float");
        };
        assert!(mid.abs() < 1e-9, "{mid}");
    }

    #[test]
    fn test_envelope_without_mass_fails() {
        let result = Sampler::prepare(&float(FloatParameter {
            distribution: FloatDistribution::Normal,
            std: Some(1e10),
            pm: Some(1e-3),
            ..FloatParameter::new(0.0)
        }));
        assert!(matches!(
            result,
            Err(SamplingError::InvalidDistributionParameters { .. })
        ));
    }

    #[test]
    fn test_overflowing_envelope_width_fails() {
        for distribution in [
            FloatDistribution::Linear,
            FloatDistribution::Triangular,
            FloatDistribution::Normal,
        ] {
            let result = Sampler::prepare(&float(FloatParameter {
                distribution,
                std: Some(1.0),
                min: Some(-1e308),
                max: Some(1e308),
                ..FloatParameter::new(0.0)
            }));
            assert!(
                matches!(
                    result,
                    Err(SamplingError::InvalidDistributionParameters { .. })
                ),
                "{distribution:?}"
            );
        }
    }

    #[test]
    fn test_categorical_weights() {
        let param = Parameter::enumeration(
            "mode",
            EnumParameter {
                default: "A".into(),
                variants: vec!["A".into(), "B".into(), "C".into()],
                weights: vec![1.0, 0.0, 3.0],
            },
        );
        let sampler = Sampler::prepare(&param).unwrap();
        assert_eq!(sampler.quantile(0.1), PointValue::Variant(0));
        assert_eq!(sampler.quantile(0.25), PointValue::Variant(2));
        assert_eq!(sampler.quantile(1.0), PointValue::Variant(2));

        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..200 {
            assert_ne!(sampler.draw(&mut rng), PointValue::Variant(1));
        }
    }

    #[test]
    fn test_invalid_weights() {
        for weights in [vec![1.0, -1.0], vec![0.0, 0.0]] {
            let param = Parameter::enumeration(
                "mode",
                EnumParameter {
                    default: "A".into(),
                    variants: vec!["A".into(), "B".into()],
                    weights,
                },
            );
            assert!(matches!(
                Sampler::prepare(&param),
                Err(SamplingError::InvalidWeight { .. })
            ));
        }
    }
}
