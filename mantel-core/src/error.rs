//! Structured error types for Mantel operations.

use thiserror::Error;

/// Unified error type for distance normalization, correlation and
/// permutation testing.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MantelError {
    /// An input is neither a valid condensed vector nor a valid symmetric,
    /// zero-diagonal square matrix.
    #[error("{name} is not a valid distance matrix: {reason}")]
    InvalidDistanceMatrix {
        /// Argument name (`"X"` or `"Y"`).
        name: String,
        /// What failed the check.
        reason: String,
    },

    /// The two normalized condensed vectors have different lengths.
    #[error("X and Y are not of equal size ({x} vs {y} pairwise distances)")]
    SizeMismatch {
        /// Condensed length of X.
        x: usize,
        /// Condensed length of Y.
        y: usize,
    },

    /// Correlation method outside `pearson` / `spearman`.
    #[error("unsupported correlation method '{0}' (expected 'pearson' or 'spearman')")]
    UnsupportedMethod(String),

    /// Zero or non-finite correlation denominator (a constant input vector).
    #[error("degenerate input: {0}")]
    DegenerateInput(String),

    /// The Monte Carlo sample distribution has zero or non-finite spread, so
    /// no z-score exists.
    #[error("degenerate permutation distribution (sd = {sd})")]
    DegenerateDistribution {
        /// Standard deviation of the sample correlations.
        sd: f64,
    },

    /// Invalid argument (bad counts, out-of-range parameters).
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl MantelError {
    /// Build a [`MantelError::InvalidDistanceMatrix`] for argument `name`.
    pub fn invalid_matrix(name: &str, reason: impl Into<String>) -> Self {
        Self::InvalidDistanceMatrix {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}

/// Convenience alias used throughout the Mantel crates.
pub type Result<T> = std::result::Result<T, MantelError>;
