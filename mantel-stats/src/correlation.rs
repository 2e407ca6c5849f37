//! Correlation coefficients over condensed distance vectors.
//!
//! [`PreparedPair`] holds the parts of the correlation coefficient that do not
//! change under permutation (residuals, sums of squares, denominator), so the
//! permutation engine only has to recompute a dot product per trial.

use std::fmt;
use std::str::FromStr;

use mantel_core::{MantelError, Result};

use crate::rank::fractional_rank;

/// Correlation coefficient used by the Mantel test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum CorrelationMethod {
    /// Linear correlation on raw values.
    #[default]
    Pearson,
    /// Linear correlation on fractional ranks.
    Spearman,
}

impl CorrelationMethod {
    /// Lowercase method name.
    pub fn as_str(&self) -> &'static str {
        match self {
            CorrelationMethod::Pearson => "pearson",
            CorrelationMethod::Spearman => "spearman",
        }
    }
}

impl fmt::Display for CorrelationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CorrelationMethod {
    type Err = MantelError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pearson" => Ok(CorrelationMethod::Pearson),
            "spearman" => Ok(CorrelationMethod::Spearman),
            other => Err(MantelError::UnsupportedMethod(other.to_string())),
        }
    }
}

/// Centered vectors and the correlation denominator for a pair of series.
#[derive(Debug, Clone)]
pub struct PreparedPair {
    /// `X - mean(X)` (after ranking, for Spearman).
    pub x_res: Vec<f64>,
    /// `Y - mean(Y)` (after ranking, for Spearman).
    pub y_res: Vec<f64>,
    /// Sum of squared X residuals.
    pub x_ss: f64,
    /// Sum of squared Y residuals.
    pub y_ss: f64,
    /// `sqrt(x_ss * y_ss)`.
    pub denominator: f64,
}

impl PreparedPair {
    /// Rank (if Spearman), center and compute the sums of squares.
    ///
    /// # Errors
    ///
    /// Returns [`MantelError::InvalidInput`] for mismatched or empty series
    /// and [`MantelError::DegenerateInput`] when either series is constant
    /// (a single observation counts as constant).
    pub fn prepare(x: &[f64], y: &[f64], method: CorrelationMethod) -> Result<Self> {
        validate_paired(x, y)?;
        if is_constant(x) {
            return Err(MantelError::DegenerateInput(
                "X has zero variance; correlation is undefined".into(),
            ));
        }
        if is_constant(y) {
            return Err(MantelError::DegenerateInput(
                "Y has zero variance; correlation is undefined".into(),
            ));
        }

        let (x_res, y_res) = match method {
            CorrelationMethod::Pearson => (residuals(x), residuals(y)),
            CorrelationMethod::Spearman => {
                (residuals(&fractional_rank(x)), residuals(&fractional_rank(y)))
            }
        };

        let x_ss = dot(&x_res, &x_res);
        let y_ss = dot(&y_res, &y_res);
        let denominator = (x_ss * y_ss).sqrt();

        if !denominator.is_finite() || denominator == 0.0 {
            return Err(MantelError::DegenerateInput(format!(
                "correlation denominator is {denominator}"
            )));
        }

        Ok(Self {
            x_res,
            y_res,
            x_ss,
            y_ss,
            denominator,
        })
    }

    /// Number of paired observations.
    pub fn len(&self) -> usize {
        self.x_res.len()
    }

    /// Always false for a prepared pair.
    pub fn is_empty(&self) -> bool {
        self.x_res.is_empty()
    }

    /// Correlation of X against the unpermuted Y.
    pub fn veridical(&self) -> f64 {
        self.correlate(&self.y_res)
    }

    /// Correlation of X against a reordering of the Y residuals.
    pub fn correlate(&self, y_res: &[f64]) -> f64 {
        dot(&self.x_res, y_res) / self.denominator
    }
}

/// Pearson product-moment correlation coefficient between `x` and `y`.
///
/// # Errors
///
/// Fails if the lengths differ, fewer than 2 observations are given, or
/// either series is constant.
pub fn pearson(x: &[f64], y: &[f64]) -> Result<f64> {
    Ok(PreparedPair::prepare(x, y, CorrelationMethod::Pearson)?.veridical())
}

/// Spearman rank correlation coefficient between `x` and `y`.
///
/// Ranks both series with [`fractional_rank`], then computes Pearson
/// correlation on the ranks.
pub fn spearman(x: &[f64], y: &[f64]) -> Result<f64> {
    Ok(PreparedPair::prepare(x, y, CorrelationMethod::Spearman)?.veridical())
}

pub(crate) fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn residuals(data: &[f64]) -> Vec<f64> {
    let mean = data.iter().sum::<f64>() / data.len() as f64;
    data.iter().map(|v| v - mean).collect()
}

fn is_constant(data: &[f64]) -> bool {
    data.iter().all(|&v| v == data[0])
}

fn validate_paired(x: &[f64], y: &[f64]) -> Result<()> {
    if x.len() != y.len() {
        return Err(MantelError::InvalidInput(format!(
            "correlation: x and y must have the same length ({} vs {})",
            x.len(),
            y.len(),
        )));
    }
    if x.is_empty() {
        return Err(MantelError::InvalidInput(
            "correlation: need at least 2 observations".into(),
        ));
    }
    Ok(())
}

// ── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const TOL: f64 = 1e-10;

    #[test]
    fn pearson_perfect_positive() {
        let x = [1.0, 2.0, 3.0, 4.0, 5.0];
        let y = [2.0, 4.0, 6.0, 8.0, 10.0];
        assert!((pearson(&x, &y).unwrap() - 1.0).abs() < TOL);
    }

    #[test]
    fn pearson_perfect_negative() {
        let x = [1.0, 2.0, 3.0, 4.0, 5.0];
        let y = [10.0, 8.0, 6.0, 4.0, 2.0];
        assert!((pearson(&x, &y).unwrap() - (-1.0)).abs() < TOL);
    }

    #[test]
    fn pearson_zero_correlation() {
        // Orthogonal pattern
        let x = [1.0, 0.0, -1.0, 0.0];
        let y = [0.0, 1.0, 0.0, -1.0];
        assert!(pearson(&x, &y).unwrap().abs() < TOL);
    }

    #[test]
    fn pearson_known_value() {
        // Σdxdy = 2, Σdx² = 2, Σdy² = 8 → r = 2 / 4
        let x = [1.0, 2.0, 3.0];
        let y = [1.0, 5.0, 3.0];
        assert!((pearson(&x, &y).unwrap() - 0.5).abs() < TOL);
    }

    #[test]
    fn constant_series_is_degenerate() {
        let err = pearson(&[3.0, 3.0, 3.0], &[1.0, 2.0, 3.0]).unwrap_err();
        assert!(matches!(err, MantelError::DegenerateInput(_)));
        let err = spearman(&[1.0, 2.0, 3.0], &[7.0, 7.0, 7.0]).unwrap_err();
        assert!(matches!(err, MantelError::DegenerateInput(_)));
    }

    #[test]
    fn inexact_constant_series_is_degenerate() {
        // The mean of repeated 0.1 is not exactly 0.1 in binary floating point.
        let err = pearson(&[0.1; 7], &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0]).unwrap_err();
        assert!(matches!(err, MantelError::DegenerateInput(_)));
    }

    #[test]
    fn length_mismatch() {
        assert!(matches!(
            pearson(&[1.0, 2.0], &[1.0]),
            Err(MantelError::InvalidInput(_))
        ));
    }

    #[test]
    fn too_short() {
        assert!(matches!(pearson(&[1.0], &[2.0]), Err(MantelError::DegenerateInput(_))));
        assert!(matches!(pearson(&[], &[]), Err(MantelError::InvalidInput(_))));
    }

    #[test]
    fn spearman_monotonic() {
        let x = [1.0, 2.0, 3.0, 4.0, 5.0];
        let y = [1.0, 8.0, 27.0, 64.0, 125.0]; // x^3, monotonically increasing
        assert!((spearman(&x, &y).unwrap() - 1.0).abs() < TOL);
    }

    #[test]
    fn spearman_reverse() {
        let x = [1.0, 2.0, 3.0, 4.0, 5.0];
        let y = [5.0, 4.0, 3.0, 2.0, 1.0];
        assert!((spearman(&x, &y).unwrap() - (-1.0)).abs() < TOL);
    }

    #[test]
    fn spearman_with_ties_uses_average_ranks() {
        let x = [1.0, 2.0, 2.0, 3.0];
        let y = [10.0, 20.0, 30.0, 40.0];
        let rx = [1.0, 2.5, 2.5, 4.0];
        let ry = [1.0, 2.0, 3.0, 4.0];
        let expected = pearson(&rx, &ry).unwrap();
        assert!((spearman(&x, &y).unwrap() - expected).abs() < TOL);
    }

    #[test]
    fn prepared_pair_parts() {
        let x = [1.0, 2.0, 3.0];
        let y = [2.0, 2.0, 5.0];
        let p = PreparedPair::prepare(&x, &y, CorrelationMethod::Pearson).unwrap();
        assert_eq!(p.x_res, vec![-1.0, 0.0, 1.0]);
        assert_eq!(p.y_res, vec![-1.0, -1.0, 2.0]);
        assert!((p.x_ss - 2.0).abs() < TOL);
        assert!((p.y_ss - 6.0).abs() < TOL);
        assert!((p.denominator - 12f64.sqrt()).abs() < TOL);
        assert_eq!(p.len(), 3);
    }

    #[test]
    fn method_from_str() {
        assert_eq!("pearson".parse::<CorrelationMethod>().unwrap(), CorrelationMethod::Pearson);
        assert_eq!("spearman".parse::<CorrelationMethod>().unwrap(), CorrelationMethod::Spearman);
        assert_eq!(
            "kendall".parse::<CorrelationMethod>().unwrap_err(),
            MantelError::UnsupportedMethod("kendall".into())
        );
        assert!("Pearson".parse::<CorrelationMethod>().is_err());
    }

    #[test]
    fn method_display_round_trips() {
        for m in [CorrelationMethod::Pearson, CorrelationMethod::Spearman] {
            assert_eq!(m.to_string().parse::<CorrelationMethod>().unwrap(), m);
        }
    }
}
