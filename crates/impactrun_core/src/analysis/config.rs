//! Configuration for variance-based sensitivity runs.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensitivityConfig {
    /// Base sample count `N`; the design evaluates `N * (d + 2)` points
    pub base_samples: usize,
    pub seed: u64,
    /// Parameters to vary; empty means every parameter. The rest stay at their default.
    pub parameters: Vec<String>,
    /// Also compute indices for every node, not only the root
    pub all_nodes: bool,
}

impl Default for SensitivityConfig {
    fn default() -> Self {
        Self {
            base_samples: 1024,
            seed: 42,
            parameters: Vec::new(),
            all_nodes: false,
        }
    }
}

impl SensitivityConfig {
    /// Number of tree evaluations for `dimensions` varied parameters
    #[must_use]
    pub fn evaluation_count(&self, dimensions: usize) -> usize {
        self.base_samples * (dimensions + 2)
    }
}
