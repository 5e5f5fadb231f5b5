//! ANOVA table assembly.
//!
//! Both entry points use the projector path for every sum of squares, which
//! stays correct when group sizes are unequal. Sequential mean subtraction
//! ([`crate::anova::adjust`]) is kept as an illustrative path only.
//!
//! Two-way semantics are Type II: each main effect is the extra sum of
//! squares of its columns over the model containing the other factor, and
//! the interaction is the sequential nested term over both mains. Under a
//! complete balanced crossing these terms sum to the total exactly; under
//! an unbalanced or incomplete crossing they deliberately do not, and the
//! enforced invariant is the partition that holds for every design: total =
//! between-cells + residual, cross-checked between the group-statistics
//! path and the projector path.

use statrs::distribution::{ContinuousCDF, FisherSnedecor};

use super::groups::{overall_mean, GroupStats};
use super::metric::between_group_ss;
use super::types::{AnovaTable, EffectRow};
use crate::design::{append_columns, extra_ss, indicator_matrix, main_effects_matrix, Projector};
use crate::error::{Error, Result};
use crate::factor::Factor;

/// Relative tolerance for the reconciliation gate.
const RECONCILE_RTOL: f64 = 1e-6;

/// One-way decomposition of `response` by `factor`.
///
/// # Errors
///
/// - [`Error::ShapeMismatch`] if `response` and `factor` lengths differ.
/// - [`Error::InvalidParams`] if the response is empty, the factor has fewer
///   than two observed levels, there are no residual degrees of freedom, or
///   the response carries no residual variation (F is undefined).
/// - [`Error::InvariantViolation`] if the between-group sum of squares from
///   the group-statistics path and the projector path disagree.
pub fn one_way(response: &[f64], factor: &Factor) -> Result<AnovaTable> {
    if response.is_empty() {
        return Err(Error::invalid_params("response is empty"));
    }

    let stats = GroupStats::compute(response, factor)?;
    let n = response.len();
    let n_groups = stats.n_groups();
    if n_groups < 2 {
        return Err(Error::invalid_params(format!(
            "factor '{}' has fewer than two observed levels",
            factor.name()
        )));
    }
    let residual_df = n - n_groups;
    if residual_df == 0 {
        return Err(Error::invalid_params(
            "no residual degrees of freedom: every group has a single observation",
        ));
    }

    let grand_mean = overall_mean(response);
    let total_ss: f64 = response.iter().map(|y| (y - grand_mean).powi(2)).sum();

    let projector = Projector::fit(indicator_matrix(factor))?;
    let residual_ss = projector.rss(response)?;
    let between_projector = total_ss - residual_ss;

    // Cross-check the projector against the direct weighted-deviation metric
    // before emitting anything.
    let between_groups = between_group_ss(&stats, grand_mean);
    reconcile(between_groups, between_projector, total_ss)?;

    let residual_ms = residual_mean_square(residual_ss, residual_df, total_ss)?;
    let row = effect_row(
        factor.name().to_string(),
        between_projector,
        n_groups - 1,
        residual_ms,
        residual_df,
        total_ss,
    )?;

    Ok(AnovaTable {
        effects: vec![row],
        residual_ss,
        residual_df,
        residual_ms,
        total_ss,
        total_df: n - 1,
        grand_mean,
    })
}

/// Two-way decomposition of `response` by factors `a` and `b` with their
/// interaction.
///
/// Degrees of freedom: each main factor has (observed levels − 1), the
/// interaction has (observed cells − 1) minus both main dfs, and the
/// residual has N minus the observed cell count.
///
/// # Errors
///
/// - [`Error::ShapeMismatch`] if the input lengths disagree.
/// - [`Error::InvalidParams`] for degenerate designs: empty response, a
///   factor with fewer than two levels, zero interaction or residual
///   degrees of freedom, or a response with no residual variation.
/// - [`Error::InvariantViolation`] if the cell partition fails to reconcile
///   between the group-statistics and projector paths, or (complete
///   balanced crossings only) if the per-term sums fail to reproduce the
///   total.
pub fn two_way(response: &[f64], a: &Factor, b: &Factor) -> Result<AnovaTable> {
    if response.is_empty() {
        return Err(Error::invalid_params("response is empty"));
    }

    let cells = a.cross(b)?;
    let cell_stats = GroupStats::compute(response, &cells)?;

    let n = response.len();
    for factor in [a, b] {
        if factor.n_levels() < 2 {
            return Err(Error::invalid_params(format!(
                "factor '{}' has fewer than two observed levels",
                factor.name()
            )));
        }
    }

    let df_a = a.n_levels() - 1;
    let df_b = b.n_levels() - 1;
    let n_cells = cells.n_levels();
    let df_interaction = (n_cells - 1).checked_sub(df_a + df_b).ok_or_else(|| {
        Error::invalid_params(
            "observed cells are too few to separate main effects from an interaction",
        )
    })?;
    if df_interaction == 0 {
        return Err(Error::invalid_params(
            "interaction has zero degrees of freedom: the observed cells add nothing over the main effects",
        ));
    }
    let residual_df = n - n_cells;
    if residual_df == 0 {
        return Err(Error::invalid_params(
            "no residual degrees of freedom: every cell has a single observation",
        ));
    }

    let grand_mean = overall_mean(response);
    let total_ss: f64 = response.iter().map(|y| (y - grand_mean).powi(2)).sum();

    let proj_a = Projector::fit(indicator_matrix(a))?;
    let proj_b = Projector::fit(indicator_matrix(b))?;
    let mains = main_effects_matrix(&[a, b])?;
    let proj_mains = Projector::fit(mains.clone())?;
    let full = append_columns(&mains, &indicator_matrix(&cells))?;
    let proj_full = Projector::fit(full)?;

    let residual_ss = proj_full.rss(response)?;

    // Type II mains, sequential interaction. Exact arithmetic can leave
    // differences a hair below zero.
    let ss_a = extra_ss(&proj_b, &proj_mains, response)?.max(0.0);
    let ss_b = extra_ss(&proj_a, &proj_mains, response)?.max(0.0);
    let ss_interaction = extra_ss(&proj_mains, &proj_full, response)?.max(0.0);

    // The partition that is exact for every crossed design: total equals
    // between-cells plus residual, with between-cells computed both ways.
    let between_cells_groups = between_group_ss(&cell_stats, grand_mean);
    let between_cells_projector = total_ss - residual_ss;
    reconcile(between_cells_groups, between_cells_projector, total_ss)?;

    // Type II terms telescope only when the crossing is complete and every
    // cell count is equal; a missing combination breaks the identity even
    // with equal observed-cell counts.
    let complete = n_cells == a.n_levels() * b.n_levels();
    if complete && cells.is_balanced() {
        let component_sum = ss_a + ss_b + ss_interaction + residual_ss;
        reconcile(component_sum, total_ss, total_ss)?;
    }

    let residual_ms = residual_mean_square(residual_ss, residual_df, total_ss)?;
    let effects = vec![
        effect_row(
            a.name().to_string(),
            ss_a,
            df_a,
            residual_ms,
            residual_df,
            total_ss,
        )?,
        effect_row(
            b.name().to_string(),
            ss_b,
            df_b,
            residual_ms,
            residual_df,
            total_ss,
        )?,
        effect_row(
            cells.name().to_string(),
            ss_interaction,
            df_interaction,
            residual_ms,
            residual_df,
            total_ss,
        )?,
    ];

    Ok(AnovaTable {
        effects,
        residual_ss,
        residual_df,
        residual_ms,
        total_ss,
        total_df: n - 1,
        grand_mean,
    })
}

/// Abort rather than emit a table whose decomposition does not reconcile.
fn reconcile(components: f64, total: f64, scale: f64) -> Result<()> {
    let tolerance = RECONCILE_RTOL * scale.abs().max(1.0);
    if (components - total).abs() > tolerance {
        return Err(Error::invariant_violation(components, total));
    }
    Ok(())
}

/// A constant response leaves the projector RSS within rounding of zero
/// rather than exactly at it, so the guard compares against the data scale.
/// This also keeps `total_ss` away from zero in the rows built afterwards.
fn residual_mean_square(residual_ss: f64, residual_df: usize, total_ss: f64) -> Result<f64> {
    if residual_ss <= RECONCILE_RTOL * total_ss.max(1.0) {
        return Err(Error::invalid_params(
            "residual variation is zero: F statistics are undefined",
        ));
    }
    Ok(residual_ss / residual_df as f64)
}

fn effect_row(
    source: String,
    sum_of_squares: f64,
    degrees_of_freedom: usize,
    residual_ms: f64,
    residual_df: usize,
    total_ss: f64,
) -> Result<EffectRow> {
    let mean_square = sum_of_squares / degrees_of_freedom as f64;
    let f_ratio = mean_square / residual_ms;
    Ok(EffectRow {
        source,
        sum_of_squares,
        degrees_of_freedom,
        mean_square,
        f_ratio,
        p_value: f_upper_tail(f_ratio, degrees_of_freedom, residual_df)?,
        contribution_percent: 100.0 * sum_of_squares / total_ss,
    })
}

/// Upper-tail probability of the F distribution at the observed statistic.
fn f_upper_tail(f_ratio: f64, df_num: usize, df_den: usize) -> Result<f64> {
    let distribution = FisherSnedecor::new(df_num as f64, df_den as f64)
        .map_err(|err| Error::invalid_params(format!("F distribution: {err}")))?;
    Ok(1.0 - distribution.cdf(f_ratio))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn three_group_data() -> (Vec<f64>, Factor) {
        let response = vec![
            1.0, 2.0, 3.0, 4.0, 5.0, // A
            3.0, 4.0, 5.0, 6.0, 7.0, // B
            5.0, 6.0, 7.0, 8.0, 9.0, // C
        ];
        let labels: Vec<&str> = ["A"; 5]
            .iter()
            .chain(["B"; 5].iter())
            .chain(["C"; 5].iter())
            .copied()
            .collect();
        (response, Factor::from_labels("diet", &labels))
    }

    fn balanced_dataset() -> (Vec<f64>, Factor, Factor) {
        let diet_effects = [0.0, 2.0, 4.0];
        let gender_effects = [0.0, 3.0];

        let mut response = Vec::new();
        let mut diet_labels = Vec::new();
        let mut gender_labels = Vec::new();
        for (i, diet) in ["A", "B", "C"].iter().enumerate() {
            for (j, gender) in ["F", "M"].iter().enumerate() {
                for spread in [-0.5, 0.5] {
                    response.push(diet_effects[i] + gender_effects[j] + spread);
                    diet_labels.push(*diet);
                    gender_labels.push(*gender);
                }
            }
        }
        (
            response,
            Factor::from_labels("diet", &diet_labels),
            Factor::from_labels("gender", &gender_labels),
        )
    }

    fn unbalanced_dataset() -> (Vec<f64>, Factor, Factor) {
        let diet_effects = [0.0, 2.0, 4.0];
        let gender_effects = [0.0, 3.0];
        let counts = [[14, 10], [14, 11], [15, 12]];

        let mut response = Vec::new();
        let mut diet_labels = Vec::new();
        let mut gender_labels = Vec::new();
        for (i, diet) in ["A", "B", "C"].iter().enumerate() {
            for (j, gender) in ["F", "M"].iter().enumerate() {
                let count = counts[i][j];
                for k in 0..count {
                    let spread = (k as f64 - (count - 1) as f64 / 2.0) * 0.5;
                    response.push(diet_effects[i] + gender_effects[j] + spread);
                    diet_labels.push(*diet);
                    gender_labels.push(*gender);
                }
            }
        }
        (
            response,
            Factor::from_labels("diet", &diet_labels),
            Factor::from_labels("gender", &gender_labels),
        )
    }

    #[test]
    fn test_one_way_end_to_end() {
        let (response, factor) = three_group_data();
        let table = one_way(&response, &factor).unwrap();

        assert!((table.grand_mean - 5.0).abs() < 1e-10);
        assert!((table.total_ss - 70.0).abs() < 1e-9);
        assert_eq!(table.total_df, 14);

        let diet = table.effect("diet").unwrap();
        assert!((diet.sum_of_squares - 40.0).abs() < 1e-9);
        assert_eq!(diet.degrees_of_freedom, 2);
        assert!((diet.mean_square - 20.0).abs() < 1e-9);
        assert!((diet.f_ratio - 8.0).abs() < 1e-9);
        // Exact upper tail for F(2, 12) at 8: (3/7)^6.
        assert!((diet.p_value - 0.006_196_4).abs() < 1e-5);
        assert!((diet.contribution_percent - 400.0 / 7.0).abs() < 1e-6);

        assert!((table.residual_ss - 30.0).abs() < 1e-9);
        assert_eq!(table.residual_df, 12);
        assert!((table.residual_ms - 2.5).abs() < 1e-9);
    }

    #[test]
    fn test_one_way_additive() {
        let (response, factor) = three_group_data();
        let table = one_way(&response, &factor).unwrap();
        let component_sum = table.effects[0].sum_of_squares + table.residual_ss;
        assert!((component_sum - table.total_ss).abs() < 1e-6 * table.total_ss);
    }

    #[test]
    fn test_one_way_degenerate_inputs() {
        let single_level = Factor::from_labels("g", &["a", "a", "a"]);
        assert!(matches!(
            one_way(&[1.0, 2.0, 3.0], &single_level),
            Err(Error::InvalidParams { .. })
        ));

        let saturated = Factor::from_labels("g", &["a", "b", "c"]);
        assert!(matches!(
            one_way(&[1.0, 2.0, 3.0], &saturated),
            Err(Error::InvalidParams { .. })
        ));

        let factor = Factor::from_labels("g", &["a", "b"]);
        assert!(matches!(
            one_way(&[1.0, 2.0, 3.0], &factor),
            Err(Error::ShapeMismatch { .. })
        ));

        let no_labels: &[&str] = &[];
        let empty = Factor::from_labels("g", no_labels);
        assert!(matches!(
            one_way(&[], &empty),
            Err(Error::InvalidParams { .. })
        ));

        let constant = Factor::from_labels("g", &["a", "a", "b", "b"]);
        assert!(matches!(
            one_way(&[1.0, 1.0, 1.0, 1.0], &constant),
            Err(Error::InvalidParams { .. })
        ));
    }

    #[test]
    fn test_two_way_balanced_decomposition() {
        let (response, diet, gender) = balanced_dataset();
        let table = two_way(&response, &diet, &gender).unwrap();

        let diet_row = table.effect("diet").unwrap();
        let gender_row = table.effect("gender").unwrap();
        let interaction = table.effect("diet:gender").unwrap();

        assert!((diet_row.sum_of_squares - 32.0).abs() < 1e-8);
        assert!((gender_row.sum_of_squares - 27.0).abs() < 1e-8);
        assert!(interaction.sum_of_squares.abs() < 1e-8);
        assert!((table.residual_ss - 3.0).abs() < 1e-8);
        assert!((table.total_ss - 62.0).abs() < 1e-8);

        assert_eq!(diet_row.degrees_of_freedom, 2);
        assert_eq!(gender_row.degrees_of_freedom, 1);
        assert_eq!(interaction.degrees_of_freedom, 2);
        assert_eq!(table.residual_df, 6);
        assert_eq!(table.total_df, 11);

        assert!((diet_row.f_ratio - 32.0).abs() < 1e-6);
        assert!((gender_row.f_ratio - 54.0).abs() < 1e-6);
        assert!(interaction.f_ratio.abs() < 1e-6);
        assert!((interaction.p_value - 1.0).abs() < 1e-6);

        // Exact additive decomposition under balance.
        let component_sum: f64 =
            table.effects.iter().map(|r| r.sum_of_squares).sum::<f64>() + table.residual_ss;
        assert!((component_sum - table.total_ss).abs() < 1e-6 * table.total_ss);
    }

    #[test]
    fn test_two_way_unbalanced_cell_partition() {
        let (response, diet, gender) = unbalanced_dataset();
        let table = two_way(&response, &diet, &gender).unwrap();

        assert_eq!(table.total_df, 75);
        assert_eq!(table.residual_df, 70);
        assert_eq!(table.effect("diet").unwrap().degrees_of_freedom, 2);
        assert_eq!(table.effect("gender").unwrap().degrees_of_freedom, 1);
        assert_eq!(table.effect("diet:gender").unwrap().degrees_of_freedom, 2);

        // Construction implies the cell partition reconciled across both
        // computation paths; spot-check it here as well.
        let cells = diet.cross(&gender).unwrap();
        let cell_stats = GroupStats::compute(&response, &cells).unwrap();
        let between_cells = between_group_ss(&cell_stats, table.grand_mean);
        assert!(
            ((table.total_ss - table.residual_ss) - between_cells).abs()
                < 1e-6 * table.total_ss
        );

        for row in &table.effects {
            assert!(row.sum_of_squares >= 0.0);
            assert!(row.p_value >= 0.0 && row.p_value <= 1.0);
        }
        // Strong generated effects must be detected.
        assert!(table.effect("diet").unwrap().p_value < 1e-6);
        assert!(table.effect("gender").unwrap().p_value < 1e-6);
    }

    #[test]
    fn test_two_way_incomplete_crossing_equal_counts() {
        // Cell C:M is never observed while every observed cell holds two
        // observations. The per-term telescoping identity does not apply to
        // an incomplete crossing, so the table must still come out.
        let diet_effects = [0.0, 2.0, 4.0];
        let gender_effects = [0.0, 3.0];

        let mut response = Vec::new();
        let mut diet_labels = Vec::new();
        let mut gender_labels = Vec::new();
        for (i, diet) in ["A", "B", "C"].iter().enumerate() {
            for (j, gender) in ["F", "M"].iter().enumerate() {
                if (i, j) == (2, 1) {
                    continue;
                }
                for spread in [-0.5, 0.5] {
                    response.push(diet_effects[i] + gender_effects[j] + spread);
                    diet_labels.push(*diet);
                    gender_labels.push(*gender);
                }
            }
        }
        let diet = Factor::from_labels("diet", &diet_labels);
        let gender = Factor::from_labels("gender", &gender_labels);

        let table = two_way(&response, &diet, &gender).unwrap();

        assert_eq!(table.total_df, 9);
        assert_eq!(table.residual_df, 5);
        assert_eq!(table.effect("diet").unwrap().degrees_of_freedom, 2);
        assert_eq!(table.effect("gender").unwrap().degrees_of_freedom, 1);
        assert_eq!(table.effect("diet:gender").unwrap().degrees_of_freedom, 1);

        assert!((table.total_ss - 32.1).abs() < 1e-9);
        assert!((table.residual_ss - 2.5).abs() < 1e-8);
        assert!((table.effect("diet").unwrap().sum_of_squares - 20.0).abs() < 1e-8);
        assert!((table.effect("gender").unwrap().sum_of_squares - 18.0).abs() < 1e-8);
        assert!(table.effect("diet:gender").unwrap().sum_of_squares.abs() < 1e-8);
        assert!((table.effect("diet").unwrap().f_ratio - 20.0).abs() < 1e-6);
        assert!((table.effect("gender").unwrap().f_ratio - 36.0).abs() < 1e-6);

        // The always-enforced partition: total = between-cells + residual.
        assert!(((table.total_ss - table.residual_ss) - 29.6).abs() < 1e-8);
    }

    #[test]
    fn test_constant_response_rejected() {
        // Group means reproduce a constant response exactly; whatever
        // rounding the projector arithmetic leaves in the residual, the
        // result must be a rejection, not a table.
        let factor = Factor::from_labels("g", &["a", "a", "a", "b", "b", "b"]);
        assert!(matches!(
            one_way(&[1.0; 6], &factor),
            Err(Error::InvalidParams { .. })
        ));

        let a = Factor::from_labels("a", &["x", "x", "x", "x", "y", "y", "y", "y"]);
        let b = Factor::from_labels("b", &["u", "u", "v", "v", "u", "u", "v", "v"]);
        assert!(matches!(
            two_way(&[2.5; 8], &a, &b),
            Err(Error::InvalidParams { .. })
        ));
    }

    #[test]
    fn test_two_way_degenerate_inputs() {
        // Saturated: one observation per cell.
        let a = Factor::from_labels("a", &["x", "x", "y", "y"]);
        let b = Factor::from_labels("b", &["u", "v", "u", "v"]);
        assert!(matches!(
            two_way(&[1.0, 2.0, 3.0, 4.0], &a, &b),
            Err(Error::InvalidParams { .. })
        ));

        // Nested rather than crossed: cells coincide with factor b, so the
        // interaction has nothing left to explain.
        let a = Factor::from_labels("a", &["x", "x", "x", "y", "y", "y"]);
        let b = Factor::from_labels("b", &["u", "u", "u", "v", "v", "v"]);
        assert!(matches!(
            two_way(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &a, &b),
            Err(Error::InvalidParams { .. })
        ));

        // Mismatched lengths.
        let a = Factor::from_labels("a", &["x", "y"]);
        let b = Factor::from_labels("b", &["u", "v", "u"]);
        assert!(matches!(
            two_way(&[1.0, 2.0], &a, &b),
            Err(Error::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_reconcile_gate() {
        assert!(reconcile(70.0, 70.0 + 1e-9, 70.0).is_ok());
        assert!(matches!(
            reconcile(69.0, 70.0, 70.0),
            Err(Error::InvariantViolation { .. })
        ));
    }
}
