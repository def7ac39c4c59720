//! Uncertainty statistics over sampled batches

use serde::{Deserialize, Serialize};

use crate::model::{BatchResult, IndicatorId};

/// Distribution summary of one indicator's root total over a batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UncertaintyStats {
    pub indicator: String,
    /// Number of successful samples the statistics cover
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation (n - 1), zero below two samples
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    /// `(fraction, value)` pairs, linearly interpolated between order statistics
    pub percentiles: Vec<(f64, f64)>,
}

impl UncertaintyStats {
    /// `None` when no value is available
    #[must_use]
    pub fn from_values(
        indicator: impl Into<String>,
        values: &[f64],
        percentiles: &[f64],
    ) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let n = values.len();
        let mean = values.iter().sum::<f64>() / n as f64;
        let std_dev = if n > 1 {
            let ss: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
            (ss / (n - 1) as f64).sqrt()
        } else {
            0.0
        };

        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);

        Some(Self {
            indicator: indicator.into(),
            count: n,
            mean,
            std_dev,
            min: sorted[0],
            max: sorted[n - 1],
            percentiles: percentiles
                .iter()
                .map(|p| (*p, interpolate(&sorted, *p)))
                .collect(),
        })
    }

    /// Value at `fraction`, if it was requested
    #[must_use]
    pub fn percentile(&self, fraction: f64) -> Option<f64> {
        self.percentiles
            .iter()
            .find(|(p, _)| (p - fraction).abs() < 1e-12)
            .map(|(_, v)| *v)
    }
}

fn interpolate(sorted: &[f64], fraction: f64) -> f64 {
    let rank = fraction.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let low = rank.floor() as usize;
    let high = rank.ceil() as usize;
    let weight = rank - low as f64;
    sorted[low] + (sorted[high] - sorted[low]) * weight
}

/// Statistics for every indicator of a batch, in indicator order.
///
/// Failed samples are left out; an indicator with no successful sample is
/// skipped.
#[must_use]
pub fn uncertainty_stats(batch: &BatchResult, percentiles: &[f64]) -> Vec<UncertaintyStats> {
    batch
        .indicators
        .iter()
        .enumerate()
        .filter_map(|(i, name)| {
            let values = batch.root_totals(IndicatorId(i as u16));
            UncertaintyStats::from_values(name.clone(), &values, percentiles)
        })
        .collect()
}
