//! # varpart
//!
//! Sum-of-squares decomposition (ANOVA) for one and two categorical factors,
//! with closed-form F-tests and Monte Carlo permutation cross-validation.
//!
//! ## Overview
//!
//! Given a numeric response and one or two categorical factors, the crate
//! partitions the total centered sum of squares into per-factor effects, an
//! interaction, and a residual. Two computation routes are provided:
//!
//! - **Group statistics** ([`anova::GroupStats`], [`anova::between_group_ss`]):
//!   per-level counts and means feeding the weighted squared-deviation
//!   metric. Sequential group-mean subtraction ([`anova::adjust`]) chains
//!   factors one at a time; under an unbalanced design its answers depend on
//!   adjustment order, and that dependence is reported rather than patched
//!   over.
//! - **Least-squares projection** ([`design`]): indicator design matrices
//!   fitted through an SVD-based pseudo-inverse. This route stays exact when
//!   group sizes are unequal and is the one the table constructors use.
//!
//! [`anova::one_way`] and [`anova::two_way`] assemble complete tables (sums
//! of squares, degrees of freedom, F statistics, upper-tail p-values) and
//! refuse to emit any table whose decomposition fails to reconcile with the
//! total. [`permutation`] cross-validates the explained variation against an
//! empirical null built by shuffling labels.
//!
//! ## Quick Start
//!
//! ```rust
//! use varpart::{one_way, Factor};
//!
//! let response = [
//!     1.0, 2.0, 3.0, 4.0, 5.0, // A
//!     3.0, 4.0, 5.0, 6.0, 7.0, // B
//!     5.0, 6.0, 7.0, 8.0, 9.0, // C
//! ];
//! let diet = Factor::from_labels(
//!     "diet",
//!     &["A", "A", "A", "A", "A", "B", "B", "B", "B", "B", "C", "C", "C", "C", "C"],
//! );
//!
//! let table = one_way(&response, &diet).unwrap();
//! let effect = table.effect("diet").unwrap();
//!
//! assert!((effect.sum_of_squares - 40.0).abs() < 1e-9);
//! assert!((effect.f_ratio - 8.0).abs() < 1e-9);
//! assert_eq!(effect.degrees_of_freedom, 2);
//! assert_eq!(table.residual_df, 12);
//! ```
//!
//! Cross-validating the same effect with a permutation test:
//!
//! ```rust
//! use varpart::{permutation_test, Factor, PermutationConfig};
//!
//! let response = [
//!     1.0, 2.0, 3.0, 4.0, 5.0, //
//!     3.0, 4.0, 5.0, 6.0, 7.0, //
//!     5.0, 6.0, 7.0, 8.0, 9.0,
//! ];
//! let diet = Factor::from_labels(
//!     "diet",
//!     &["A", "A", "A", "A", "A", "B", "B", "B", "B", "B", "C", "C", "C", "C", "C"],
//! );
//!
//! let config = PermutationConfig {
//!     iterations: 1_000,
//!     seed: Some(42),
//! };
//! let test = permutation_test(&response, &diet, &config).unwrap();
//!
//! assert!((test.observed - 40.0).abs() < 1e-9);
//! assert!(test.p_value < 0.05);
//! ```
//!
//! ## Features
//!
//! - `serde`: serialization of factors, group statistics, and result types
//! - `parallel`: sharded permutation testing using rayon

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod anova;
pub mod design;
pub mod error;
pub mod factor;
pub mod permutation;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::anova::{
        between_group_ss, center, center_by, one_way, overall_mean, sequential_factor_ss,
        two_way, AnovaTable, EffectRow, GroupStats,
    };
    pub use crate::design::{
        append_columns, extra_ss, extra_ss_projected, indicator_matrix, main_effects_matrix,
        pseudo_inverse, Projector,
    };
    pub use crate::error::{Error, Result};
    pub use crate::factor::Factor;
    pub use crate::permutation::{permutation_test, PermutationConfig, PermutationTest};

    #[cfg(feature = "parallel")]
    pub use crate::permutation::permutation_test_parallel;
}

// Re-export commonly used items at crate root
pub use anova::{one_way, two_way, AnovaTable, EffectRow};
pub use error::{Error, Result};
pub use factor::Factor;
pub use permutation::{permutation_test, PermutationConfig, PermutationTest};

#[cfg(feature = "parallel")]
pub use permutation::permutation_test_parallel;
