//! ANOVA decomposition for one and two categorical factors.
//!
//! This module partitions the total centered sum of squares of a response
//! into per-factor effects, an interaction (two-way designs), and a
//! residual, then scales each term by its degrees of freedom into an F
//! statistic with an upper-tail p-value.
//!
//! ## Computation paths
//!
//! Two routes to the same quantities are provided on purpose:
//!
//! - **Group statistics** ([`GroupStats`] + [`between_group_ss`]): per-level
//!   counts and means feed the weighted squared-deviation metric
//!   `Σ nᵢ(ȳᵢ − ȳ)²`. Chained group-mean subtraction lives in [`adjust`];
//!   its results depend on adjustment order whenever the design is
//!   unbalanced, and that dependence is reported as-is.
//! - **Least-squares projection** ([`crate::design`]): indicator designs and
//!   an SVD pseudo-inverse. Extra sums of squares computed this way stay
//!   exact when cell counts are unequal.
//!
//! [`one_way`] and [`two_way`] use the projector route for every emitted
//! sum of squares and cross-check it against the group-statistics route
//! before returning; a table that fails to reconcile with the total is
//! never emitted.
//!
//! Two-way sums of squares are Type II: each main effect is the extra sum
//! of squares of its columns over the model holding the other factor, and
//! the interaction is the nested term over both mains.
//!
//! ## Quick Start
//!
//! ```rust
//! use varpart::anova::two_way;
//! use varpart::Factor;
//!
//! // 3x2 crossing with two observations per cell.
//! let response = [
//!     -0.5, 0.5, 2.5, 3.5, // A:F, A:M
//!     1.5, 2.5, 4.5, 5.5, // B:F, B:M
//!     3.5, 4.5, 6.5, 7.5, // C:F, C:M
//! ];
//! let diet = Factor::from_labels(
//!     "diet",
//!     &["A", "A", "A", "A", "B", "B", "B", "B", "C", "C", "C", "C"],
//! );
//! let gender = Factor::from_labels(
//!     "gender",
//!     &["F", "F", "M", "M", "F", "F", "M", "M", "F", "F", "M", "M"],
//! );
//!
//! let table = two_way(&response, &diet, &gender).unwrap();
//!
//! assert!((table.effect("diet").unwrap().sum_of_squares - 32.0).abs() < 1e-8);
//! assert!((table.effect("gender").unwrap().sum_of_squares - 27.0).abs() < 1e-8);
//! assert!((table.residual_ss - 3.0).abs() < 1e-8);
//! assert_eq!(table.residual_df, 6);
//! ```

pub mod adjust;
pub mod groups;
pub mod metric;
pub mod table;
pub mod types;

pub use adjust::{center, center_by, sequential_factor_ss};
pub use groups::{overall_mean, GroupStats};
pub use metric::between_group_ss;
pub use table::{one_way, two_way};
pub use types::{AnovaTable, EffectRow};
