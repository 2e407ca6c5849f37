//! Mantel test: correlation between two distance matrices.
//!
//! The veridical correlation between the condensed forms of X and Y is
//! compared against a Monte Carlo null distribution obtained by randomly
//! relabeling the objects of Y. The result reports the z-score of the
//! veridical correlation under that distribution together with an upper-tail
//! permutation p-value.
//!
//! # Example
//!
//! ```
//! use mantel_stats::mantel::{mantel_test, MantelConfig};
//!
//! let x = vec![
//!     vec![0.0, 1.0, 2.0, 3.0],
//!     vec![1.0, 0.0, 1.5, 2.5],
//!     vec![2.0, 1.5, 0.0, 1.0],
//!     vec![3.0, 2.5, 1.0, 0.0],
//! ];
//! let y = vec![1.1, 2.2, 2.9, 1.4, 2.4, 0.8];
//!
//! let config = MantelConfig::default().with_permutations(999).with_seed(42);
//! let result = mantel_test(x, y, &config).unwrap();
//! assert!(result.r > 0.9);
//! ```

use mantel_core::{MantelError, Result, Summarizable};
use rand::Rng;

use crate::correlation::{CorrelationMethod, PreparedPair};
use crate::distance::{normalize_pair, DistanceInput};
use crate::permutation::PermutationEngine;

/// Default number of Monte Carlo permutations.
pub const DEFAULT_PERMUTATIONS: usize = 10_000;

/// Configuration for a Mantel test.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MantelConfig {
    /// Number of Monte Carlo permutations.
    pub permutations: usize,
    /// Correlation coefficient.
    pub method: CorrelationMethod,
    /// Random seed; `None` draws one from system entropy.
    pub seed: Option<u64>,
    /// Largest accepted `|d[i][j] - d[j][i]|` for redundant inputs.
    pub symmetry_tolerance: f64,
    /// Retain the Monte Carlo sample correlations in the result.
    pub keep_samples: bool,
}

impl Default for MantelConfig {
    fn default() -> Self {
        Self {
            permutations: DEFAULT_PERMUTATIONS,
            method: CorrelationMethod::Pearson,
            seed: None,
            symmetry_tolerance: 0.0,
            keep_samples: false,
        }
    }
}

impl MantelConfig {
    /// Set the number of permutations.
    pub fn with_permutations(mut self, permutations: usize) -> Self {
        self.permutations = permutations;
        self
    }

    /// Set the correlation method.
    pub fn with_method(mut self, method: CorrelationMethod) -> Self {
        self.method = method;
        self
    }

    /// Fix the random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Set the symmetry tolerance for redundant inputs.
    pub fn with_symmetry_tolerance(mut self, tolerance: f64) -> Self {
        self.symmetry_tolerance = tolerance;
        self
    }

    /// Retain the sample correlations.
    pub fn with_keep_samples(mut self, keep: bool) -> Self {
        self.keep_samples = keep;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.permutations == 0 {
            return Err(MantelError::InvalidInput(
                "mantel: permutations must be > 0".into(),
            ));
        }
        // A single sample always has zero spread.
        if self.permutations == 1 {
            return Err(MantelError::DegenerateDistribution { sd: 0.0 });
        }
        if self.symmetry_tolerance.is_nan() || self.symmetry_tolerance < 0.0 {
            return Err(MantelError::InvalidInput(format!(
                "mantel: symmetry_tolerance must be >= 0, got {}",
                self.symmetry_tolerance
            )));
        }
        Ok(())
    }
}

/// Result of a Mantel test.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MantelResult {
    /// Standard score of `r` under the permutation distribution.
    pub z: f64,
    /// Veridical correlation.
    pub r: f64,
    /// Mean of the Monte Carlo sample correlations.
    pub m: f64,
    /// Population standard deviation of the Monte Carlo sample correlations.
    pub sd: f64,
    /// Upper-tail permutation p-value, `(#{c >= r} + 1) / (perms + 1)`.
    pub p_value: f64,
    /// Number of permutations performed.
    pub n_permutations: usize,
    /// Number of objects in each matrix.
    pub n_objects: usize,
    /// Correlation method used.
    pub method: CorrelationMethod,
    /// Sample correlations, when requested.
    pub samples: Option<Vec<f64>>,
}

impl MantelResult {
    /// The `(z, r, m, sd)` tuple.
    pub fn as_tuple(&self) -> (f64, f64, f64, f64) {
        (self.z, self.r, self.m, self.sd)
    }
}

impl Summarizable for MantelResult {
    fn summary(&self) -> String {
        format!(
            "Mantel ({}, n={}, perms={}): r={:.4}, z={:.4}, p={:.4}",
            self.method, self.n_objects, self.n_permutations, self.r, self.z, self.p_value,
        )
    }
}

/// Mean and population standard deviation of a sample set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonteCarloSummary {
    /// Arithmetic mean.
    pub mean: f64,
    /// Population standard deviation (ddof=0).
    pub sd: f64,
}

impl MonteCarloSummary {
    /// Reduce `samples` to mean and population standard deviation.
    ///
    /// Empty input yields NaN for both.
    pub fn from_samples(samples: &[f64]) -> Self {
        let n = samples.len() as f64;
        let mean = samples.iter().sum::<f64>() / n;
        let ss: f64 = samples.iter().map(|c| (c - mean) * (c - mean)).sum();
        Self {
            mean,
            sd: (ss / n).sqrt(),
        }
    }
}

/// Mantel test with a method given by name and an entropy-seeded generator.
///
/// `method` must be `"pearson"` or `"spearman"`; it is parsed before
/// anything else is looked at.
///
/// # Errors
///
/// See [`mantel_test`]; additionally [`MantelError::UnsupportedMethod`].
pub fn mantel(
    x: impl Into<DistanceInput>,
    y: impl Into<DistanceInput>,
    perms: usize,
    method: &str,
) -> Result<MantelResult> {
    let method: CorrelationMethod = method.parse()?;
    let config = MantelConfig::default()
        .with_permutations(perms)
        .with_method(method);
    mantel_test(x, y, &config)
}

/// Mantel test driven by `config`.
///
/// With `config.seed` set, trial `i` draws its permutation from ChaCha8
/// stream `i` of that seed, so results are reproducible (and identical with
/// or without the `parallel` feature).
///
/// # Errors
///
/// - [`MantelError::InvalidInput`] for zero permutations or a bad tolerance
/// - [`MantelError::InvalidDistanceMatrix`] if X or Y is not a valid
///   condensed vector / symmetric zero-diagonal matrix
/// - [`MantelError::SizeMismatch`] if X and Y describe different numbers of
///   objects
/// - [`MantelError::DegenerateInput`] if X or Y is constant
/// - [`MantelError::DegenerateDistribution`] if the sample correlations have
///   zero spread (always the case for one permutation)
pub fn mantel_test(
    x: impl Into<DistanceInput>,
    y: impl Into<DistanceInput>,
    config: &MantelConfig,
) -> Result<MantelResult> {
    let seed = config.seed.unwrap_or_else(rand::random);
    run(x.into(), y.into(), config, |engine, perms| {
        engine.run_seeded(perms, seed)
    })
}

/// Mantel test drawing every permutation from `rng`, sequentially.
///
/// `config.seed` is ignored.
///
/// # Errors
///
/// Same as [`mantel_test`].
pub fn mantel_test_with_rng<R: Rng + ?Sized>(
    x: impl Into<DistanceInput>,
    y: impl Into<DistanceInput>,
    config: &MantelConfig,
    rng: &mut R,
) -> Result<MantelResult> {
    run(x.into(), y.into(), config, |engine, perms| {
        engine.run_with_rng(perms, rng)
    })
}

fn run<F>(
    x: DistanceInput,
    y: DistanceInput,
    config: &MantelConfig,
    sample: F,
) -> Result<MantelResult>
where
    F: FnOnce(&PermutationEngine<'_>, usize) -> Vec<f64>,
{
    config.validate()?;
    let (x, y) = normalize_pair(x, y, config.symmetry_tolerance)?;
    let prepared = PreparedPair::prepare(x.condensed(), y.condensed(), config.method)?;
    let engine = PermutationEngine::new(&prepared)?;
    let perms = config.permutations;

    log::debug!(
        "mantel: n={}, permutations={}, method={}",
        engine.n_objects(),
        perms,
        config.method
    );

    let samples = sample(&engine, perms);
    let r = prepared.veridical();
    let MonteCarloSummary { mean: m, sd } = MonteCarloSummary::from_samples(&samples);
    if !sd.is_finite() || sd <= 0.0 {
        return Err(MantelError::DegenerateDistribution { sd });
    }
    let z = (r - m) / sd;

    let n_extreme = samples.iter().filter(|&&c| c >= r).count();
    let p_value = (n_extreme as f64 + 1.0) / (perms as f64 + 1.0);

    log::debug!("mantel: r={r:.6}, m={m:.6}, sd={sd:.6}, z={z:.4}, p={p_value:.4}");

    Ok(MantelResult {
        z,
        r,
        m,
        sd,
        p_value,
        n_permutations: perms,
        n_objects: engine.n_objects(),
        method: config.method,
        samples: config.keep_samples.then_some(samples),
    })
}

// ── Tests ──────────────────────────────────────────────────────────────────
