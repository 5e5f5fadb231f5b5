//! Error types for the varpart library.
//!
//! This module provides error handling using the `thiserror` crate, with
//! specific variants for input shape validation, degenerate analysis
//! requests, decomposition reconciliation failures, and linear-algebra
//! backend failures.

use thiserror::Error;

/// The main error type for the varpart library.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    // ============ Input Validation Errors ============
    /// Input vectors or matrices disagree in length.
    #[error("shape mismatch in {context}: expected length {expected}, got {actual}")]
    ShapeMismatch {
        /// Where the mismatch was detected.
        context: &'static str,
        /// Expected length.
        expected: usize,
        /// Actual length.
        actual: usize,
    },

    /// Invalid analysis parameters.
    #[error("invalid parameters: {message}")]
    InvalidParams {
        /// Description of what is invalid.
        message: String,
    },

    // ============ Decomposition Errors ============
    /// The sum-of-squares decomposition does not reconcile with the total.
    #[error("sum-of-squares decomposition does not reconcile: components sum to {components}, total is {total}")]
    InvariantViolation {
        /// Sum of the decomposed components.
        components: f64,
        /// Independently computed total.
        total: f64,
    },

    // ============ Backend Errors ============
    /// A linear-algebra routine failed.
    #[error("linear algebra backend error: {message}")]
    Linalg {
        /// Message reported by the backend.
        message: String,
    },
}

/// A specialized `Result` type for varpart operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    /// Create a new `ShapeMismatch` error.
    #[must_use]
    pub fn shape_mismatch(context: &'static str, expected: usize, actual: usize) -> Self {
        Self::ShapeMismatch {
            context,
            expected,
            actual,
        }
    }

    /// Create a new `InvalidParams` error.
    #[must_use]
    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::InvalidParams {
            message: message.into(),
        }
    }

    /// Create a new `InvariantViolation` error.
    #[must_use]
    pub fn invariant_violation(components: f64, total: f64) -> Self {
        Self::InvariantViolation { components, total }
    }
}

impl From<ndarray_linalg::error::LinalgError> for Error {
    fn from(err: ndarray_linalg::error::LinalgError) -> Self {
        Self::Linalg {
            message: err.to_string(),
        }
    }
}
