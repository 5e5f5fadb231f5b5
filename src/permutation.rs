//! Permutation cross-validation of the between-group sum of squares.
//!
//! Each trial uniformly shuffles a private copy of the factor's level codes
//! (the response itself never moves), recomputes the between-group sum of
//! squares against the same overall mean, and records the value. Shuffling
//! labels breaks any real association between label and response while
//! preserving both marginal distributions, so the recorded values form an
//! empirical null distribution for the observed metric. The p-value is the
//! fraction of trials at or above the observed value.
//!
//! Group counts are invariant under label permutation, so the per-trial
//! recomputation only re-accumulates per-level sums into a reused buffer.
//!
//! A fixed seed reproduces the identical distribution; `None` seeds from
//! entropy. No state persists between invocations.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

#[cfg(feature = "parallel")]
use rand_chacha::ChaCha8Rng;
#[cfg(feature = "parallel")]
use rayon::prelude::*;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::anova::{between_group_ss, overall_mean, GroupStats};
use crate::error::{Error, Result};
use crate::factor::Factor;

/// Iterations handled by one worker chunk in the parallel path.
#[cfg(feature = "parallel")]
const CHUNK_ITERATIONS: usize = 1024;

/// Configuration for a permutation test.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PermutationConfig {
    /// Number of label permutations to draw.
    pub iterations: usize,
    /// Seed for the permutation stream; `None` seeds from entropy.
    pub seed: Option<u64>,
}

impl Default for PermutationConfig {
    fn default() -> Self {
        Self {
            iterations: 10_000,
            seed: None,
        }
    }
}

/// Result of a permutation test.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PermutationTest {
    /// Between-group sum of squares of the actual labeling.
    pub observed: f64,
    /// Fraction of permuted values at or above the observed metric.
    pub p_value: f64,
    /// Number of permuted values at or above the observed metric.
    pub exceed_count: usize,
    /// Number of permutations drawn.
    pub iterations: usize,
    /// Every permuted metric value, in draw order.
    pub null_distribution: Vec<f64>,
}

impl PermutationTest {
    /// Empirical quantile of the null distribution, nearest-rank.
    ///
    /// `q` is clamped to `0.0..=1.0`; the distribution always holds at
    /// least one value because zero-iteration tests are rejected.
    #[must_use]
    pub fn null_quantile(&self, q: f64) -> f64 {
        let mut sorted = self.null_distribution.clone();
        sorted.sort_by(f64::total_cmp);
        let position = (sorted.len() - 1) as f64 * q.clamp(0.0, 1.0);
        sorted[position.round() as usize]
    }
}

/// Permutation test of `response` grouped by `factor`.
///
/// Draws `config.iterations` uniform permutations of the level codes from a
/// single random stream and compares the observed between-group sum of
/// squares against the resulting null distribution. The empirical p-value is
/// exactly `exceed_count / iterations`, with ties counted as exceedances.
///
/// # Errors
///
/// - [`Error::ShapeMismatch`] if `response` and `factor` lengths differ.
/// - [`Error::InvalidParams`] if the response is empty, the factor has fewer
///   than two observed levels, or `config.iterations` is zero.
pub fn permutation_test(
    response: &[f64],
    factor: &Factor,
    config: &PermutationConfig,
) -> Result<PermutationTest> {
    validate(response, factor, config)?;

    let stats = GroupStats::compute(response, factor)?;
    let grand_mean = overall_mean(response);
    let observed = between_group_ss(&stats, grand_mean);

    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let counts = factor.level_counts();
    let mut codes = factor.codes().to_vec();
    let mut sums = vec![0.0; factor.n_levels()];

    let mut null_distribution = Vec::with_capacity(config.iterations);
    for _ in 0..config.iterations {
        codes.shuffle(&mut rng);
        null_distribution.push(permuted_metric(
            response, &codes, &counts, grand_mean, &mut sums,
        ));
    }

    Ok(summarize(observed, null_distribution))
}

/// Permutation test with the trial loop sharded across rayon workers.
///
/// Iterations are split into fixed-size chunks; chunk `i` owns an
/// independent `ChaCha8` stream derived from the base seed and a private
/// copy of the code buffer, and chunk results are concatenated in chunk
/// order. A fixed seed therefore reproduces the identical distribution
/// regardless of thread count. The stream layout differs from
/// [`permutation_test`], so serial and parallel runs with the same seed
/// draw different (equally valid) nulls.
///
/// # Errors
///
/// Same conditions as [`permutation_test`].
#[cfg(feature = "parallel")]
pub fn permutation_test_parallel(
    response: &[f64],
    factor: &Factor,
    config: &PermutationConfig,
) -> Result<PermutationTest> {
    validate(response, factor, config)?;

    let stats = GroupStats::compute(response, factor)?;
    let grand_mean = overall_mean(response);
    let observed = between_group_ss(&stats, grand_mean);

    let base_seed = config.seed.unwrap_or_else(rand::random);
    let counts = factor.level_counts();
    let n_chunks = config.iterations.div_ceil(CHUNK_ITERATIONS);

    let chunks: Vec<Vec<f64>> = (0..n_chunks)
        .into_par_iter()
        .map(|chunk| {
            let start = chunk * CHUNK_ITERATIONS;
            let len = CHUNK_ITERATIONS.min(config.iterations - start);
            let mut rng = ChaCha8Rng::seed_from_u64(base_seed.wrapping_add(chunk as u64));
            let mut codes = factor.codes().to_vec();
            let mut sums = vec![0.0; factor.n_levels()];

            (0..len)
                .map(|_| {
                    codes.shuffle(&mut rng);
                    permuted_metric(response, &codes, &counts, grand_mean, &mut sums)
                })
                .collect()
        })
        .collect();

    let null_distribution: Vec<f64> = chunks.into_iter().flatten().collect();
    Ok(summarize(observed, null_distribution))
}

fn validate(response: &[f64], factor: &Factor, config: &PermutationConfig) -> Result<()> {
    if config.iterations == 0 {
        return Err(Error::invalid_params(
            "permutation test requires at least one iteration",
        ));
    }
    if response.is_empty() {
        return Err(Error::invalid_params("response is empty"));
    }
    if response.len() != factor.len() {
        return Err(Error::shape_mismatch(
            "permutation test",
            factor.len(),
            response.len(),
        ));
    }
    if factor.n_levels() < 2 {
        return Err(Error::invalid_params(format!(
            "factor '{}' has fewer than two observed levels",
            factor.name()
        )));
    }
    Ok(())
}

/// Between-group sum of squares of `response` under the given level codes.
///
/// Counts are fixed by the factor, so only the per-level sums change from
/// trial to trial; `sums` is zeroed and refilled here.
fn permuted_metric(
    response: &[f64],
    codes: &[usize],
    counts: &[usize],
    grand_mean: f64,
    sums: &mut [f64],
) -> f64 {
    sums.fill(0.0);
    for (&y, &code) in response.iter().zip(codes) {
        sums[code] += y;
    }
    sums.iter()
        .zip(counts)
        .map(|(&sum, &count)| count as f64 * (sum / count as f64 - grand_mean).powi(2))
        .sum()
}

fn summarize(observed: f64, null_distribution: Vec<f64>) -> PermutationTest {
    let iterations = null_distribution.len();
    let exceed_count = null_distribution.iter().filter(|&&v| v >= observed).count();
    PermutationTest {
        observed,
        p_value: exceed_count as f64 / iterations as f64,
        exceed_count,
        iterations,
        null_distribution,
    }
}
