//! Per-indicator score tables.
//!
//! A single evaluation gives one value per indicator, a batch gives one per
//! sample. [`LcaScores`] keeps both shapes as vectors so they combine the
//! same way.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::ScoreError;

use super::results::{BatchResult, EvaluationResult};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LcaScores {
    scores: BTreeMap<String, Vec<f64>>,
}

impl LcaScores {
    #[must_use]
    pub fn new(scores: BTreeMap<String, Vec<f64>>) -> Self {
        Self { scores }
    }

    /// Root totals of a single evaluation
    #[must_use]
    pub fn from_result(indicators: &[String], result: &EvaluationResult) -> Self {
        Self::from_results(indicators, std::iter::once(result))
    }

    /// Root totals of several evaluations, one value per result in order
    #[must_use]
    pub fn from_results<'a, I>(indicators: &[String], results: I) -> Self
    where
        I: IntoIterator<Item = &'a EvaluationResult>,
    {
        let mut scores: BTreeMap<String, Vec<f64>> = indicators
            .iter()
            .map(|name| (name.clone(), Vec::new()))
            .collect();
        for result in results {
            for (name, value) in indicators.iter().zip(result.totals()) {
                if let Some(values) = scores.get_mut(name) {
                    values.push(*value);
                }
            }
        }
        Self { scores }
    }

    /// Root totals of every successful sample, in sample order
    #[must_use]
    pub fn from_batch(batch: &BatchResult) -> Self {
        Self::from_results(&batch.indicators, batch.successful())
    }

    #[must_use]
    pub fn get(&self, indicator: &str) -> Option<&[f64]> {
        self.scores.get(indicator).map(Vec::as_slice)
    }

    pub fn indicators(&self) -> impl Iterator<Item = &str> {
        self.scores.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[f64])> {
        self.scores.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// Element-wise sum. Indicators missing from `other` are kept unchanged.
    pub fn add(&self, other: &LcaScores) -> Result<LcaScores, ScoreError> {
        self.zip_with(other, |a, b| a + b)
    }

    /// Element-wise difference. Indicators missing from `other` are kept unchanged.
    pub fn sub(&self, other: &LcaScores) -> Result<LcaScores, ScoreError> {
        self.zip_with(other, |a, b| a - b)
    }

    /// Sum of many score tables; empty input gives an empty table
    pub fn sum<'a, I>(tables: I) -> Result<LcaScores, ScoreError>
    where
        I: IntoIterator<Item = &'a LcaScores>,
    {
        let mut tables = tables.into_iter();
        let Some(first) = tables.next() else {
            return Ok(LcaScores::default());
        };
        tables.try_fold(first.clone(), |acc, next| acc.add(next))
    }

    /// Divide each indicator by its normalisation factor
    pub fn normalise(&self, factors: &BTreeMap<String, f64>) -> Result<LcaScores, ScoreError> {
        self.check_factors(factors)?;
        if let Some((indicator, value)) = factors
            .iter()
            .find(|(_, v)| **v == 0.0 || !v.is_finite())
        {
            return Err(ScoreError::InvalidFactor {
                indicator: indicator.clone(),
                value: *value,
            });
        }
        Ok(self.map_with(factors, |score, factor| score / factor))
    }

    /// Multiply each indicator by its weighting factor
    pub fn weight(&self, factors: &BTreeMap<String, f64>) -> Result<LcaScores, ScoreError> {
        self.check_factors(factors)?;
        if let Some((indicator, value)) = factors.iter().find(|(_, v)| !v.is_finite()) {
            return Err(ScoreError::InvalidFactor {
                indicator: indicator.clone(),
                value: *value,
            });
        }
        Ok(self.map_with(factors, |score, factor| score * factor))
    }

    /// Normalised and weighted scores summed over indicators, one value per sample
    pub fn unique_score(
        &self,
        normalisation: &BTreeMap<String, f64>,
        weighting: &BTreeMap<String, f64>,
    ) -> Result<Vec<f64>, ScoreError> {
        let weighted = self.normalise(normalisation)?.weight(weighting)?;
        let mut iter = weighted.scores.iter();
        let Some((first_name, first)) = iter.next() else {
            return Ok(Vec::new());
        };
        let mut total = first.clone();
        for (name, values) in iter {
            if values.len() != total.len() {
                return Err(ScoreError::LengthMismatch {
                    indicator: name.clone(),
                    left: total.len(),
                    right: values.len(),
                });
            }
            for (t, v) in total.iter_mut().zip(values) {
                *t += v;
            }
        }
        tracing::trace!(reference = %first_name, samples = total.len(), "computed unique score");
        Ok(total)
    }

    fn zip_with(
        &self,
        other: &LcaScores,
        op: impl Fn(f64, f64) -> f64,
    ) -> Result<LcaScores, ScoreError> {
        let mut scores = BTreeMap::new();
        for (name, left) in &self.scores {
            let values = match other.scores.get(name) {
                Some(right) if right.len() != left.len() => {
                    return Err(ScoreError::LengthMismatch {
                        indicator: name.clone(),
                        left: left.len(),
                        right: right.len(),
                    });
                }
                Some(right) => left.iter().zip(right).map(|(a, b)| op(*a, *b)).collect(),
                None => left.clone(),
            };
            scores.insert(name.clone(), values);
        }
        Ok(LcaScores { scores })
    }

    fn check_factors(&self, factors: &BTreeMap<String, f64>) -> Result<(), ScoreError> {
        let missing: Vec<String> = self
            .scores
            .keys()
            .filter(|k| !factors.contains_key(*k))
            .cloned()
            .collect();
        let extra: Vec<String> = factors
            .keys()
            .filter(|k| !self.scores.contains_key(*k))
            .cloned()
            .collect();
        if missing.is_empty() && extra.is_empty() {
            Ok(())
        } else {
            Err(ScoreError::FactorMismatch { missing, extra })
        }
    }

    fn map_with(&self, factors: &BTreeMap<String, f64>, op: impl Fn(f64, f64) -> f64) -> LcaScores {
        let scores = self
            .scores
            .iter()
            .map(|(name, values)| {
                let factor = factors[name];
                (name.clone(), values.iter().map(|v| op(*v, factor)).collect())
            })
            .collect();
        LcaScores { scores }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scores(pairs: &[(&str, &[f64])]) -> LcaScores {
        LcaScores::new(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_vec()))
                .collect(),
        )
    }

    fn factors(pairs: &[(&str, f64)]) -> BTreeMap<String, f64> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_add_and_sub() {
        let a = scores(&[("gwp", &[1.0, 2.0]), ("water", &[3.0, 4.0])]);
        let b = scores(&[("gwp", &[0.5, 0.5])]);
        let sum = a.add(&b).unwrap();
        assert_eq!(sum.get("gwp"), Some(&[1.5, 2.5][..]));
        assert_eq!(sum.get("water"), Some(&[3.0, 4.0][..]));
        let diff = a.sub(&b).unwrap();
        assert_eq!(diff.get("gwp"), Some(&[0.5, 1.5][..]));
    }

    #[test]
    fn test_length_mismatch() {
        let a = scores(&[("gwp", &[1.0, 2.0])]);
        let b = scores(&[("gwp", &[1.0])]);
        assert_eq!(
            a.add(&b).unwrap_err(),
            ScoreError::LengthMismatch {
                indicator: "gwp".into(),
                left: 2,
                right: 1
            }
        );
    }

    #[test]
    fn test_sum() {
        let tables = [
            scores(&[("gwp", &[1.0])]),
            scores(&[("gwp", &[2.0])]),
            scores(&[("gwp", &[3.0])]),
        ];
        let total = LcaScores::sum(&tables).unwrap();
        assert_eq!(total.get("gwp"), Some(&[6.0][..]));
        assert!(LcaScores::sum(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_factor_table_must_match() {
        let a = scores(&[("gwp", &[1.0]), ("water", &[1.0])]);
        let err = a.normalise(&factors(&[("gwp", 1.0), ("land", 1.0)])).unwrap_err();
        assert_eq!(
            err,
            ScoreError::FactorMismatch {
                missing: vec!["water".into()],
                extra: vec!["land".into()]
            }
        );
    }

    #[test]
    fn test_zero_normalisation_factor_rejected() {
        let a = scores(&[("gwp", &[1.0])]);
        assert!(matches!(
            a.normalise(&factors(&[("gwp", 0.0)])),
            Err(ScoreError::InvalidFactor { .. })
        ));
    }

    #[test]
    fn test_unique_score() {
        let a = scores(&[("gwp", &[10.0, 20.0]), ("water", &[4.0, 8.0])]);
        let norm = factors(&[("gwp", 10.0), ("water", 2.0)]);
        let weight = factors(&[("gwp", 0.5), ("water", 0.25)]);
        let single = a.unique_score(&norm, &weight).unwrap();
        // gwp: 1*0.5, 2*0.5; water: 2*0.25, 4*0.25
        assert_eq!(single, vec![1.0, 2.0]);
    }
}
