//! Group-mean centering and the sequential adjustment path.
//!
//! Sequential adjustment subtracts one factor's group means, then feeds the
//! result into the next factor's adjustment. Under a balanced design this is
//! order-independent and coincides with the joint least-squares projection.
//! Under an unbalanced design neither holds: adjusting factor A and then
//! factor B drags A's group means away from zero, and the per-factor sums of
//! squares depend on adjustment order. These functions report exactly what
//! sequential subtraction yields; the table construction in
//! [`crate::anova::table`] uses the projector path instead, which is correct
//! regardless of balance.

use super::groups::{overall_mean, GroupStats};
use super::metric::between_group_ss;
use crate::error::Result;
use crate::factor::Factor;

/// Subtract the overall mean from every entry.
#[must_use]
pub fn center(response: &[f64]) -> Vec<f64> {
    let grand = overall_mean(response);
    response.iter().map(|y| y - grand).collect()
}

/// Subtract each entry's own group mean under `factor`.
///
/// Chaining is explicit: feed the returned vector into the next call.
///
/// # Errors
///
/// Returns [`crate::Error::ShapeMismatch`] if `response` and `factor` cover
/// different numbers of observations.
pub fn center_by(response: &[f64], factor: &Factor) -> Result<Vec<f64>> {
    let stats = GroupStats::compute(response, factor)?;
    let means = stats.means();
    Ok(response
        .iter()
        .zip(factor.codes())
        .map(|(&y, &code)| y - means[code])
        .collect())
}

/// Per-factor sums of squares from sequential adjustment, in the given order.
///
/// The response is centered on its overall mean first. Then, for each factor
/// in turn, the between-group sum of squares of the current residuals is
/// recorded and the factor's group means are subtracted before moving on.
/// The result depends on factor order whenever the design is unbalanced.
///
/// # Errors
///
/// Returns [`crate::Error::ShapeMismatch`] if any factor's length differs
/// from the response length.
pub fn sequential_factor_ss(response: &[f64], factors: &[&Factor]) -> Result<Vec<f64>> {
    let mut current = center(response);
    let mut ss = Vec::with_capacity(factors.len());

    for factor in factors {
        let stats = GroupStats::compute(&current, factor)?;
        // Residuals are centered, so the reference mean is exactly zero.
        ss.push(between_group_ss(&stats, 0.0));
        let means = stats.means();
        for (value, &code) in current.iter_mut().zip(factor.codes()) {
            *value -= means[code];
        }
    }

    Ok(ss)
}
