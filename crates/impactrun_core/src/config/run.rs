use serde::{Deserialize, Serialize};

/// How sample points are spread over the parameter space
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SamplingStrategy {
    /// Independent draws from each parameter's law
    #[default]
    MonteCarlo,
    /// One draw per stratum of every parameter, strata shuffled independently
    LatinHypercube,
}

/// Settings for a sampled batch evaluation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    pub samples: usize,
    pub seed: u64,
    pub strategy: SamplingStrategy,
    /// Percentiles reported in uncertainty statistics, as fractions
    pub percentiles: Vec<f64>,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            samples: 1000,
            seed: 42,
            strategy: SamplingStrategy::MonteCarlo,
            percentiles: vec![0.05, 0.25, 0.50, 0.75, 0.95],
        }
    }
}
