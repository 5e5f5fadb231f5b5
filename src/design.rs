//! Indicator design matrices and least-squares projection.
//!
//! This module provides the exact, unbalanced-safe computation path: factors
//! become indicator (dummy) matrices, and a [`Projector`] fits responses onto
//! their column space through an SVD-based Moore-Penrose pseudo-inverse.
//!
//! Designs built here are rank-deficient on purpose: each factor's indicator
//! block row-sums to the all-ones vector, so concatenating two factors (or
//! appending cell columns) introduces exact collinearity. The pseudo-inverse
//! absorbs this; rank deficiency is never an error.
//!
//! The hat matrix `X · pinv(X)` is applied lazily as two matrix-vector
//! products rather than materialized.

use ndarray::{Array1, Array2, ArrayView1};
use ndarray_linalg::SVD;

use crate::error::{Error, Result};
use crate::factor::Factor;

/// Indicator matrix of a factor: one column per observed level, with a 1.0
/// in the column of the level each observation carries.
///
/// Rows sum to exactly 1.0; there is no separate intercept column.
#[must_use]
pub fn indicator_matrix(factor: &Factor) -> Array2<f64> {
    let mut design = Array2::zeros((factor.len(), factor.n_levels()));
    for (row, &code) in factor.codes().iter().enumerate() {
        design[[row, code]] = 1.0;
    }
    design
}

/// Horizontal concatenation of the factors' indicator blocks.
///
/// # Errors
///
/// Returns [`Error::InvalidParams`] if no factor is given, or
/// [`Error::ShapeMismatch`] if the factors cover different numbers of
/// observations.
pub fn main_effects_matrix(factors: &[&Factor]) -> Result<Array2<f64>> {
    let Some(first) = factors.first() else {
        return Err(Error::invalid_params(
            "main-effects design requires at least one factor",
        ));
    };
    let rows = first.len();
    for factor in factors {
        if factor.len() != rows {
            return Err(Error::shape_mismatch(
                "main-effects design",
                rows,
                factor.len(),
            ));
        }
    }

    let total_cols = factors.iter().map(|f| f.n_levels()).sum();
    let mut design = Array2::zeros((rows, total_cols));
    let mut offset = 0;
    for factor in factors {
        for (row, &code) in factor.codes().iter().enumerate() {
            design[[row, offset + code]] = 1.0;
        }
        offset += factor.n_levels();
    }
    Ok(design)
}

/// Append the columns of `extra` to the right of `base`.
///
/// Used to grow a main-effects design into the full design by appending the
/// cell indicator block.
///
/// # Errors
///
/// Returns [`Error::ShapeMismatch`] if the row counts differ.
pub fn append_columns(base: &Array2<f64>, extra: &Array2<f64>) -> Result<Array2<f64>> {
    if base.nrows() != extra.nrows() {
        return Err(Error::shape_mismatch(
            "column append",
            base.nrows(),
            extra.nrows(),
        ));
    }

    let mut combined = Array2::zeros((base.nrows(), base.ncols() + extra.ncols()));
    combined
        .slice_mut(ndarray::s![.., ..base.ncols()])
        .assign(base);
    combined
        .slice_mut(ndarray::s![.., base.ncols()..])
        .assign(extra);
    Ok(combined)
}

/// Moore-Penrose pseudo-inverse via SVD, with the numerical rank.
///
/// Singular values at or below `σ_max · max(rows, cols) · ε` are treated as
/// zero, so exactly collinear and near-singular designs invert stably.
///
/// # Errors
///
/// Returns [`Error::InvalidParams`] for an empty matrix, or
/// [`Error::Linalg`] if the SVD backend fails.
pub fn pseudo_inverse(matrix: &Array2<f64>) -> Result<(Array2<f64>, usize)> {
    let (rows, cols) = matrix.dim();
    if rows == 0 || cols == 0 {
        return Err(Error::invalid_params("cannot invert an empty matrix"));
    }

    let (u_opt, sigma, vt_opt) = matrix.svd(true, true)?;
    let u = u_opt.ok_or_else(|| Error::Linalg {
        message: "SVD returned no left singular vectors".into(),
    })?;
    let vt = vt_opt.ok_or_else(|| Error::Linalg {
        message: "SVD returned no right singular vectors".into(),
    })?;

    let sigma_max = sigma.iter().fold(0.0_f64, |max, &s| max.max(s));
    let cutoff = sigma_max * rows.max(cols) as f64 * f64::EPSILON;

    // pinv = V · Σ⁺ · Uᵀ, accumulated one retained singular triple at a time.
    let mut pinv = Array2::zeros((cols, rows));
    let mut rank = 0;
    for (k, &s) in sigma.iter().enumerate() {
        if s <= cutoff {
            continue;
        }
        rank += 1;
        let inv_s = 1.0 / s;
        for i in 0..cols {
            let v_ik = vt[[k, i]] * inv_s;
            for j in 0..rows {
                pinv[[i, j]] += v_ik * u[[j, k]];
            }
        }
    }

    Ok((pinv, rank))
}

/// A fitted least-squares projector for one design matrix.
///
/// The pseudo-inverse is computed once and cached, so projecting many
/// responses against the same design (the permutation and extra-sum-of-
/// squares workloads) costs two matrix-vector products per response.
#[derive(Debug, Clone)]
pub struct Projector {
    design: Array2<f64>,
    pinv: Array2<f64>,
    rank: usize,
}

impl Projector {
    /// Fit a projector by computing the design's pseudo-inverse.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParams`] for an empty design, or
    /// [`Error::Linalg`] if the SVD backend fails.
    pub fn fit(design: Array2<f64>) -> Result<Self> {
        let (pinv, rank) = pseudo_inverse(&design)?;
        Ok(Self { design, pinv, rank })
    }

    /// The design matrix.
    #[must_use]
    pub fn design(&self) -> &Array2<f64> {
        &self.design
    }

    /// The cached pseudo-inverse of the design.
    #[must_use]
    pub fn pinv(&self) -> &Array2<f64> {
        &self.pinv
    }

    /// Numerical rank of the design.
    #[must_use]
    pub fn rank(&self) -> usize {
        self.rank
    }

    /// Number of observations the design covers.
    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.design.nrows()
    }

    /// Fitted values `ŷ = X · pinv(X) · y`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ShapeMismatch`] if `response` length differs from
    /// the design's row count.
    pub fn fitted(&self, response: &[f64]) -> Result<Array1<f64>> {
        if response.len() != self.design.nrows() {
            return Err(Error::shape_mismatch(
                "projection",
                self.design.nrows(),
                response.len(),
            ));
        }
        let y = ArrayView1::from(response);
        let coefficients = self.pinv.dot(&y);
        Ok(self.design.dot(&coefficients))
    }

    /// Residuals `y − ŷ`.
    ///
    /// # Errors
    ///
    /// Same conditions as [`Projector::fitted`].
    pub fn residuals(&self, response: &[f64]) -> Result<Array1<f64>> {
        let fitted = self.fitted(response)?;
        Ok(&ArrayView1::from(response) - &fitted)
    }

    /// Residual sum of squares `Σ (y − ŷ)²`.
    ///
    /// # Errors
    ///
    /// Same conditions as [`Projector::fitted`].
    pub fn rss(&self, response: &[f64]) -> Result<f64> {
        let fitted = self.fitted(response)?;
        Ok(response
            .iter()
            .zip(fitted.iter())
            .map(|(&y, &hat)| (y - hat).powi(2))
            .sum())
    }
}

/// Extra sum of squares of `full` over `reduced`: RSS(reduced) − RSS(full).
///
/// # Errors
///
/// Returns [`Error::ShapeMismatch`] if `response` length disagrees with
/// either projector.
pub fn extra_ss(reduced: &Projector, full: &Projector, response: &[f64]) -> Result<f64> {
    Ok(reduced.rss(response)? - full.rss(response)?)
}

/// Extra sum of squares via orthogonalized projection.
///
/// The `added` columns are residualized against the reduced design, the
/// response is projected onto that residualized space, and the result is
/// `ŷ_adj · ŷ_adj`. Agrees with [`extra_ss`] to floating-point tolerance for
/// any inputs; this form avoids subtracting two large residual sums.
///
/// # Errors
///
/// Returns [`Error::ShapeMismatch`] if row counts disagree, or
/// [`Error::Linalg`] if the SVD backend fails on the residualized block.
pub fn extra_ss_projected(
    reduced: &Projector,
    added: &Array2<f64>,
    response: &[f64],
) -> Result<f64> {
    if added.nrows() != reduced.n_rows() {
        return Err(Error::shape_mismatch(
            "orthogonalized projection",
            reduced.n_rows(),
            added.nrows(),
        ));
    }

    // Component of the added columns orthogonal to the reduced column space.
    let hat_added = reduced.design().dot(&reduced.pinv().dot(added));
    let residualized = added - &hat_added;

    let adjusted = Projector::fit(residualized)?;
    let y_adj = adjusted.fitted(response)?;
    Ok(y_adj.dot(&y_adj))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unbalanced_two_factor() -> (Vec<f64>, Factor, Factor) {
        let diet = Factor::from_labels(
            "diet",
            &["A", "A", "A", "B", "B", "C", "C", "C", "C", "A", "B"],
        );
        let gender = Factor::from_labels(
            "gender",
            &["F", "M", "F", "F", "M", "M", "F", "M", "M", "M", "F"],
        );
        let response = vec![2.0, 5.5, 1.5, 4.0, 8.0, 9.5, 6.0, 10.0, 9.0, 4.5, 3.5];
        (response, diet, gender)
    }

    #[test]
    fn test_indicator_matrix_layout() {
        let factor = Factor::from_labels("g", &["a", "b", "a", "c"]);
        let design = indicator_matrix(&factor);

        assert_eq!(design.dim(), (4, 3));
        assert_eq!(design[[0, 0]], 1.0);
        assert_eq!(design[[1, 1]], 1.0);
        assert_eq!(design[[2, 0]], 1.0);
        assert_eq!(design[[3, 2]], 1.0);

        // Every row sums to exactly one.
        for row in design.rows() {
            assert!((row.sum() - 1.0).abs() < 1e-15);
        }
    }

    #[test]
    fn test_main_effects_matrix_blocks() {
        let a = Factor::from_labels("a", &["x", "y", "x"]);
        let b = Factor::from_labels("b", &["u", "u", "v"]);
        let design = main_effects_matrix(&[&a, &b]).unwrap();

        assert_eq!(design.dim(), (3, 4));
        // Each factor block row-sums to one, so full rows sum to two.
        for row in design.rows() {
            assert!((row.sum() - 2.0).abs() < 1e-15);
        }

        let short = Factor::from_labels("c", &["p", "q"]);
        assert!(matches!(
            main_effects_matrix(&[&a, &short]),
            Err(Error::ShapeMismatch { .. })
        ));
        assert!(matches!(
            main_effects_matrix(&[]),
            Err(Error::InvalidParams { .. })
        ));
    }

    #[test]
    fn test_pseudo_inverse_full_rank() {
        let matrix = ndarray::array![[1.0, 0.0], [0.0, 2.0], [0.0, 0.0]];
        let (pinv, rank) = pseudo_inverse(&matrix).unwrap();

        assert_eq!(rank, 2);
        assert_eq!(pinv.dim(), (2, 3));
        assert!((pinv[[0, 0]] - 1.0).abs() < 1e-12);
        assert!((pinv[[1, 1]] - 0.5).abs() < 1e-12);

        // A · A⁺ · A = A.
        let reconstructed = matrix.dot(&pinv).dot(&matrix);
        for (a, b) in reconstructed.iter().zip(matrix.iter()) {
            assert!((a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn test_rank_deficient_projection() {
        // Duplicated column: rank 2 on a 3-column design. The projection is
        // still exact, which is the whole point of the pseudo-inverse route.
        let factor = Factor::from_labels("g", &["a", "a", "b", "b"]);
        let base = indicator_matrix(&factor);
        let dup = base.column(0).to_owned().insert_axis(ndarray::Axis(1));
        let design = append_columns(&base, &dup).unwrap();

        let projector = Projector::fit(design).unwrap();
        assert_eq!(projector.rank(), 2);

        let response = [1.0, 3.0, 10.0, 14.0];
        let fitted = projector.fitted(&response).unwrap();
        // Fitted values are the group means: 2, 2, 12, 12.
        assert!((fitted[0] - 2.0).abs() < 1e-9);
        assert!((fitted[1] - 2.0).abs() < 1e-9);
        assert!((fitted[2] - 12.0).abs() < 1e-9);
        assert!((fitted[3] - 12.0).abs() < 1e-9);
    }

    #[test]
    fn test_fitted_recovers_group_means() {
        let factor = Factor::from_labels(
            "diet",
            &[
                "A", "A", "A", "A", "A", "B", "B", "B", "B", "B", "C", "C", "C", "C", "C",
            ],
        );
        let response = [
            1.0, 2.0, 3.0, 4.0, 5.0, 3.0, 4.0, 5.0, 6.0, 7.0, 5.0, 6.0, 7.0, 8.0, 9.0,
        ];

        let projector = Projector::fit(indicator_matrix(&factor)).unwrap();
        let fitted = projector.fitted(&response).unwrap();
        assert!((fitted[0] - 3.0).abs() < 1e-9);
        assert!((fitted[7] - 5.0).abs() < 1e-9);
        assert!((fitted[14] - 7.0).abs() < 1e-9);

        let rss = projector.rss(&response).unwrap();
        assert!((rss - 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_orthogonality_identities() {
        let (response, diet, gender) = unbalanced_two_factor();
        let design = main_effects_matrix(&[&diet, &gender]).unwrap();
        let projector = Projector::fit(design).unwrap();

        let fitted = projector.fitted(&response).unwrap();
        let residuals = projector.residuals(&response).unwrap();

        let e_dot_hat = residuals.dot(&fitted);
        let y_dot_hat = ArrayView1::from(&response[..]).dot(&fitted);
        let hat_dot_hat = fitted.dot(&fitted);

        let scale = 1.0 + hat_dot_hat.abs();
        assert!(e_dot_hat.abs() < 1e-8 * scale);
        assert!((y_dot_hat - hat_dot_hat).abs() < 1e-8 * scale);
    }

    #[test]
    fn test_extra_ss_paths_agree() {
        // Unbalanced crossing.
        let (response, diet, gender) = unbalanced_two_factor();
        let reduced = Projector::fit(indicator_matrix(&gender)).unwrap();
        let added = indicator_matrix(&diet);
        let full_design = append_columns(reduced.design(), &added).unwrap();
        let full = Projector::fit(full_design).unwrap();

        let direct = extra_ss(&reduced, &full, &response).unwrap();
        let projected = extra_ss_projected(&reduced, &added, &response).unwrap();
        assert!((direct - projected).abs() <= 1e-6 * (1.0 + direct.abs()));

        // Balanced one-factor case against a known value.
        let factor = Factor::from_labels("g", &["a", "a", "b", "b"]);
        let intercept = Array2::ones((4, 1));
        let reduced = Projector::fit(intercept.clone()).unwrap();
        let added = indicator_matrix(&factor);
        let full = Projector::fit(append_columns(&intercept, &added).unwrap()).unwrap();

        let response = [1.0, 3.0, 7.0, 9.0];
        let direct = extra_ss(&reduced, &full, &response).unwrap();
        let projected = extra_ss_projected(&reduced, &added, &response).unwrap();
        // Group means 2 and 8, overall 5: 2*(3^2) + 2*(3^2) = 36.
        assert!((direct - 36.0).abs() < 1e-9);
        assert!((projected - 36.0).abs() < 1e-9);
    }

    #[test]
    fn test_projection_shape_mismatch() {
        let factor = Factor::from_labels("g", &["a", "b", "a"]);
        let projector = Projector::fit(indicator_matrix(&factor)).unwrap();
        assert!(matches!(
            projector.fitted(&[1.0, 2.0]),
            Err(Error::ShapeMismatch { .. })
        ));
    }
}
