//! The weighted squared-group-mean-deviation metric.
//!
//! This single function is the canonical explained-variation measure. The
//! equivalent formulations (extra sum of squares via residual differences,
//! the fitted-value dot-product identity) live in [`crate::design`] and are
//! held to agree with it by tests rather than duplicated as production paths.

use super::groups::GroupStats;

/// Between-group sum of squares: `Σ count_i × (mean_i − overall_mean)²`.
///
/// `overall_mean` is an explicit argument; callers working on pre-centered
/// data pass `0.0`.
#[must_use]
pub fn between_group_ss(stats: &GroupStats, overall_mean: f64) -> f64 {
    stats
        .counts()
        .iter()
        .zip(stats.means())
        .map(|(&count, &mean)| count as f64 * (mean - overall_mean).powi(2))
        .sum()
}
