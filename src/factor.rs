//! Categorical factors and their level structure.
//!
//! A [`Factor`] records, for a fixed set of observations, which level of a
//! categorical variable each observation carries. Levels are identified by
//! label equality and have no inherent order; they are enumerated in
//! first-appearance order so that tables and reports are deterministic.
//!
//! Crossing two factors with [`Factor::cross`] yields the sub-group (cell)
//! factor whose levels are the level combinations actually observed; a
//! combination with zero observations contributes no cell.

use std::collections::HashMap;
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A categorical grouping variable over a fixed set of observations.
///
/// Internally each observation stores a level code: an index into the
/// factor's level table. Codes are dense in `0..n_levels()`, so downstream
/// accumulation loops can index plain vectors instead of hashing labels.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Factor {
    /// Display name of the factor (e.g. "diet").
    name: String,
    /// Distinct level labels in first-appearance order.
    levels: Vec<String>,
    /// Per-observation level code, indexing into `levels`.
    codes: Vec<usize>,
}

impl Factor {
    /// Build a factor from one label per observation.
    ///
    /// Levels are deduplicated by string equality and numbered in the order
    /// they first appear. Any label set is valid, including an empty one.
    pub fn from_labels<S: AsRef<str>>(name: impl Into<String>, labels: &[S]) -> Self {
        let mut levels: Vec<String> = Vec::new();
        let mut seen: HashMap<String, usize> = HashMap::new();
        let mut codes = Vec::with_capacity(labels.len());

        for label in labels {
            let label = label.as_ref();
            let code = if let Some(&code) = seen.get(label) {
                code
            } else {
                let code = levels.len();
                seen.insert(label.to_string(), code);
                levels.push(label.to_string());
                code
            };
            codes.push(code);
        }

        Self {
            name: name.into(),
            levels,
            codes,
        }
    }

    /// Name of the factor.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of observations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.codes.len()
    }

    /// `true` if the factor covers no observations.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// Number of distinct levels observed.
    #[must_use]
    pub fn n_levels(&self) -> usize {
        self.levels.len()
    }

    /// Distinct level labels in first-appearance order.
    #[must_use]
    pub fn levels(&self) -> &[String] {
        &self.levels
    }

    /// Per-observation level codes, each in `0..n_levels()`.
    #[must_use]
    pub fn codes(&self) -> &[usize] {
        &self.codes
    }

    /// Label of the given level code.
    ///
    /// # Panics
    ///
    /// Panics if `code >= n_levels()`.
    #[must_use]
    pub fn level(&self, code: usize) -> &str {
        &self.levels[code]
    }

    /// Observation count per level, aligned with [`Factor::levels`].
    ///
    /// Every entry is at least 1: a level exists only because some
    /// observation carries it.
    #[must_use]
    pub fn level_counts(&self) -> Vec<usize> {
        let mut counts = vec![0usize; self.levels.len()];
        for &code in &self.codes {
            counts[code] += 1;
        }
        counts
    }

    /// `true` if every level has the same observation count.
    ///
    /// Only observed levels are compared; a crossed factor with an
    /// unobserved level combination can still report balance here. A factor
    /// with no observations is trivially balanced.
    #[must_use]
    pub fn is_balanced(&self) -> bool {
        let counts = self.level_counts();
        match counts.first() {
            Some(&first) => counts.iter().all(|&c| c == first),
            None => true,
        }
    }

    /// Cross this factor with another, producing the sub-group (cell) factor.
    ///
    /// The result has one level per combination of levels actually observed,
    /// labeled `"{a}:{b}"`, and is named `"{self}:{other}"`. Combinations
    /// never observed contribute no cell.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ShapeMismatch`] if the factors cover different
    /// numbers of observations.
    pub fn cross(&self, other: &Factor) -> Result<Factor> {
        if self.len() != other.len() {
            return Err(Error::shape_mismatch(
                "factor crossing",
                self.len(),
                other.len(),
            ));
        }

        let mut levels: Vec<String> = Vec::new();
        let mut seen: HashMap<(usize, usize), usize> = HashMap::new();
        let mut codes = Vec::with_capacity(self.len());

        for (&a, &b) in self.codes.iter().zip(&other.codes) {
            let code = if let Some(&code) = seen.get(&(a, b)) {
                code
            } else {
                let code = levels.len();
                seen.insert((a, b), code);
                levels.push(format!("{}:{}", self.levels[a], other.levels[b]));
                code
            };
            codes.push(code);
        }

        Ok(Factor {
            name: format!("{}:{}", self.name, other.name),
            levels,
            codes,
        })
    }
}

impl fmt::Display for Factor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({} levels, {} observations)",
            self.name,
            self.n_levels(),
            self.len()
        )
    }
}
