//! Per-group counts and means for a labeled partition of a response.
//!
//! [`GroupStats`] is the leaf of every decomposition path: the sequential
//! route, the permutation null distribution, and the reporting surface all
//! consume its (count, mean) pairs.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::factor::Factor;

/// Observation count and mean response per observed level of one factor.
///
/// Entries are aligned with the factor's level order, so `counts()[i]` and
/// `means()[i]` describe `levels()[i]`. A level appears here only if it was
/// observed; unobserved levels contribute no entry, and downstream
/// degrees-of-freedom bookkeeping uses the observed level count.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GroupStats {
    /// Level labels, in the factor's enumeration order.
    levels: Vec<String>,
    /// Observation count per level.
    counts: Vec<usize>,
    /// Mean response per level.
    means: Vec<f64>,
}

impl GroupStats {
    /// Compute counts and means of `response` grouped by `factor`.
    ///
    /// Pure function of its inputs; the factor may be a main-effect factor
    /// or a crossed (cell) factor.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ShapeMismatch`] if `response` and `factor` cover
    /// different numbers of observations.
    pub fn compute(response: &[f64], factor: &Factor) -> Result<Self> {
        if response.len() != factor.len() {
            return Err(Error::shape_mismatch(
                "group statistics",
                factor.len(),
                response.len(),
            ));
        }

        let n_levels = factor.n_levels();
        let mut sums: Vec<f64> = vec![0.0; n_levels];
        let mut counts: Vec<usize> = vec![0; n_levels];

        for (&y, &code) in response.iter().zip(factor.codes()) {
            sums[code] += y;
            counts[code] += 1;
        }

        // Every observed level has count >= 1, so the division is safe.
        let means: Vec<f64> = sums
            .iter()
            .zip(&counts)
            .map(|(&sum, &count)| sum / count as f64)
            .collect();

        Ok(Self {
            levels: factor.levels().to_vec(),
            counts,
            means,
        })
    }

    /// Level labels, aligned with [`GroupStats::counts`] and
    /// [`GroupStats::means`].
    #[must_use]
    pub fn levels(&self) -> &[String] {
        &self.levels
    }

    /// Observation count per level.
    #[must_use]
    pub fn counts(&self) -> &[usize] {
        &self.counts
    }

    /// Mean response per level.
    #[must_use]
    pub fn means(&self) -> &[f64] {
        &self.means
    }

    /// Number of observed groups.
    #[must_use]
    pub fn n_groups(&self) -> usize {
        self.levels.len()
    }

    /// Total observation count across all groups.
    #[must_use]
    pub fn total_count(&self) -> usize {
        self.counts.iter().sum()
    }

    /// Mean response of the group with the given label, if observed.
    #[must_use]
    pub fn mean_of(&self, label: &str) -> Option<f64> {
        self.levels
            .iter()
            .position(|l| l == label)
            .map(|i| self.means[i])
    }

    /// Observation count of the group with the given label, if observed.
    #[must_use]
    pub fn count_of(&self, label: &str) -> Option<usize> {
        self.levels
            .iter()
            .position(|l| l == label)
            .map(|i| self.counts[i])
    }

    /// Per-group deviation of the group mean from a supplied overall mean.
    ///
    /// This is the reporting surface: plotting collaborators render group
    /// means against the overall mean using exactly these deviations.
    #[must_use]
    pub fn deviations_from(&self, overall_mean: f64) -> Vec<f64> {
        self.means.iter().map(|&m| m - overall_mean).collect()
    }
}

/// Arithmetic mean of a slice.
///
/// Returns NaN for an empty slice; analysis entry points reject empty
/// responses before calling this.
#[must_use]
pub fn overall_mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}
