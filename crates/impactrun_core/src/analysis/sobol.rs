//! Saltelli design and Sobol index estimators.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// First-order and total-effect indices of one scalar output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SobolIndices {
    /// Indexed like the varied parameters
    pub first_order: Vec<f64>,
    pub total_order: Vec<f64>,
    /// Output variance the indices are relative to. Zero means the output
    /// did not vary and every index is reported as zero.
    pub variance: f64,
    /// Base rows whose whole group evaluated successfully
    pub base_rows_used: usize,
}

/// Sample design and index estimation for a variance-based analysis.
///
/// `generate` produces rows in the unit hypercube, `analyze` receives one
/// output per generated row, in the same order, with `None` for rows that
/// could not be evaluated.
pub trait SensitivityScheme {
    fn generate<R: Rng + ?Sized>(
        &self,
        dimensions: usize,
        base_samples: usize,
        rng: &mut R,
    ) -> Vec<Vec<f64>>;

    fn analyze(
        &self,
        dimensions: usize,
        base_samples: usize,
        outputs: &[Option<f64>],
    ) -> SobolIndices;
}

/// Saltelli cross-sampling without second-order terms.
///
/// Each base row expands to a group of `d + 2` rows: `A`, then `A` with
/// column `i` taken from `B` for every `i`, then `B`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Saltelli;

impl Saltelli {
    #[must_use]
    pub fn group_size(dimensions: usize) -> usize {
        dimensions + 2
    }
}

impl SensitivityScheme for Saltelli {
    fn generate<R: Rng + ?Sized>(
        &self,
        dimensions: usize,
        base_samples: usize,
        rng: &mut R,
    ) -> Vec<Vec<f64>> {
        let mut rows = Vec::with_capacity(base_samples * Self::group_size(dimensions));
        for _ in 0..base_samples {
            let a: Vec<f64> = (0..dimensions).map(|_| rng.random()).collect();
            let b: Vec<f64> = (0..dimensions).map(|_| rng.random()).collect();
            rows.push(a.clone());
            for i in 0..dimensions {
                let mut ab = a.clone();
                ab[i] = b[i];
                rows.push(ab);
            }
            rows.push(b);
        }
        rows
    }

    fn analyze(
        &self,
        dimensions: usize,
        base_samples: usize,
        outputs: &[Option<f64>],
    ) -> SobolIndices {
        let group = Self::group_size(dimensions);
        let complete: Vec<Vec<f64>> = outputs
            .chunks(group)
            .take(base_samples)
            .filter_map(|chunk| {
                if chunk.len() == group {
                    chunk.iter().copied().collect::<Option<Vec<f64>>>()
                } else {
                    None
                }
            })
            .collect();

        let n = complete.len();
        if n == 0 {
            return SobolIndices {
                first_order: vec![0.0; dimensions],
                total_order: vec![0.0; dimensions],
                variance: 0.0,
                base_rows_used: 0,
            };
        }

        let f_a = |g: &Vec<f64>| g[0];
        let f_b = |g: &Vec<f64>| g[group - 1];

        // Variance over the pooled A and B outputs
        let pooled = complete.iter().flat_map(|g| [f_a(g), f_b(g)]);
        let mean = pooled.clone().sum::<f64>() / (2 * n) as f64;
        let variance = pooled.map(|y| (y - mean).powi(2)).sum::<f64>() / (2 * n) as f64;

        let mut first_order = vec![0.0; dimensions];
        let mut total_order = vec![0.0; dimensions];
        if variance > 0.0 {
            for i in 0..dimensions {
                let mut s1 = 0.0;
                let mut st = 0.0;
                for g in &complete {
                    let f_ab = g[i + 1];
                    s1 += f_b(g) * (f_ab - f_a(g));
                    st += (f_a(g) - f_ab).powi(2);
                }
                first_order[i] = s1 / n as f64 / variance;
                total_order[i] = 0.5 * st / n as f64 / variance;
            }
        }

        SobolIndices {
            first_order,
            total_order,
            variance,
            base_rows_used: n,
        }
    }
}
