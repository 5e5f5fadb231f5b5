//! ANOVA result types.

use std::fmt;

/// One row of the decomposition: a main effect or an interaction.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EffectRow {
    /// Source of variation: a factor name, or `"a:b"` for the interaction.
    pub source: String,
    /// Sum of squares attributed to this source.
    pub sum_of_squares: f64,
    /// Degrees of freedom.
    pub degrees_of_freedom: usize,
    /// Mean square (SS / df).
    pub mean_square: f64,
    /// F statistic (mean square / residual mean square).
    pub f_ratio: f64,
    /// Upper-tail F-distribution probability at the observed statistic.
    pub p_value: f64,
    /// Percent of the total sum of squares attributed to this source.
    pub contribution_percent: f64,
}

/// Complete sum-of-squares decomposition for one analysis.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AnovaTable {
    /// Effect rows: each main factor, then the interaction if present.
    pub effects: Vec<EffectRow>,
    /// Residual sum of squares.
    pub residual_ss: f64,
    /// Residual degrees of freedom.
    pub residual_df: usize,
    /// Residual mean square.
    pub residual_ms: f64,
    /// Total centered sum of squares.
    pub total_ss: f64,
    /// Total degrees of freedom (N − 1).
    pub total_df: usize,
    /// Overall mean of the response.
    pub grand_mean: f64,
}

impl AnovaTable {
    /// Look up an effect row by its source name.
    #[must_use]
    pub fn effect(&self, source: &str) -> Option<&EffectRow> {
        self.effects.iter().find(|row| row.source == source)
    }
}

impl fmt::Display for AnovaTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:<16} {:>12} {:>5} {:>12} {:>10} {:>10} {:>7}",
            "source", "SS", "df", "MS", "F", "p", "%"
        )?;
        for row in &self.effects {
            writeln!(
                f,
                "{:<16} {:>12.4} {:>5} {:>12.4} {:>10.4} {:>10.4} {:>7.2}",
                row.source,
                row.sum_of_squares,
                row.degrees_of_freedom,
                row.mean_square,
                row.f_ratio,
                row.p_value,
                row.contribution_percent
            )?;
        }
        writeln!(
            f,
            "{:<16} {:>12.4} {:>5} {:>12.4}",
            "residual", self.residual_ss, self.residual_df, self.residual_ms
        )?;
        writeln!(
            f,
            "{:<16} {:>12.4} {:>5}",
            "total", self.total_ss, self.total_df
        )
    }
}
