//! Distance matrices in condensed and redundant form.
//!
//! A symmetric zero-diagonal `n×n` matrix is stored as its condensed upper
//! triangle: `n*(n-1)/2` values in row-major, column-increasing order. Inputs
//! arrive as a [`DistanceInput`] (either form) and are normalized into a
//! validated [`DistanceMatrix`].

use mantel_core::{MantelError, Result, Summarizable};

/// Number of pairwise distances for `n` objects: `n*(n-1)/2`.
pub fn condensed_len(n: usize) -> usize {
    n * n.saturating_sub(1) / 2
}

/// Number of objects described by a condensed vector of length `len`.
///
/// Returns `None` if `len` is not a triangular number.
pub fn objects_for_len(len: usize) -> Option<usize> {
    let guess = (2.0 * len as f64).sqrt().ceil() as usize;
    (guess.saturating_sub(1)..=guess + 1).find(|&n| condensed_len(n) == len)
}

/// A distance matrix as supplied by the caller.
#[derive(Debug, Clone, PartialEq)]
pub enum DistanceInput {
    /// Condensed upper-triangle vector of length `n*(n-1)/2`.
    Condensed(Vec<f64>),
    /// Redundant `n×n` symmetric matrix with zero diagonal.
    Redundant(Vec<Vec<f64>>),
}

impl DistanceInput {
    /// Validate and convert to a [`DistanceMatrix`].
    ///
    /// A condensed input is checked only as a vector and a redundant input
    /// only as a matrix. `name` labels the argument in error messages.
    /// `symmetry_tolerance` bounds `|d[i][j] - d[j][i]|` (0.0 demands exact
    /// symmetry).
    ///
    /// # Errors
    ///
    /// Returns [`MantelError::InvalidDistanceMatrix`] if the input is not a
    /// valid distance matrix in its form.
    pub fn normalize(self, name: &str, symmetry_tolerance: f64) -> Result<DistanceMatrix> {
        match self {
            DistanceInput::Condensed(condensed) => {
                let n = check_condensed(name, &condensed)?;
                log::trace!("{name}: condensed input with {n} objects");
                Ok(DistanceMatrix { condensed, n })
            }
            DistanceInput::Redundant(rows) => {
                let n = check_redundant(name, &rows, symmetry_tolerance)?;
                log::trace!("{name}: condensing {n}x{n} redundant matrix");
                Ok(DistanceMatrix {
                    condensed: upper_triangle(&rows, n),
                    n,
                })
            }
        }
    }
}

impl From<Vec<f64>> for DistanceInput {
    fn from(condensed: Vec<f64>) -> Self {
        DistanceInput::Condensed(condensed)
    }
}

impl From<&[f64]> for DistanceInput {
    fn from(condensed: &[f64]) -> Self {
        DistanceInput::Condensed(condensed.to_vec())
    }
}

impl From<Vec<Vec<f64>>> for DistanceInput {
    fn from(rows: Vec<Vec<f64>>) -> Self {
        DistanceInput::Redundant(rows)
    }
}

impl From<&[Vec<f64>]> for DistanceInput {
    fn from(rows: &[Vec<f64>]) -> Self {
        DistanceInput::Redundant(rows.to_vec())
    }
}

impl From<DistanceMatrix> for DistanceInput {
    fn from(dm: DistanceMatrix) -> Self {
        DistanceInput::Condensed(dm.condensed)
    }
}

/// Normalize both inputs of a two-matrix test and check they describe the
/// same number of objects.
///
/// # Errors
///
/// Returns [`MantelError::InvalidDistanceMatrix`] for an invalid input
/// (X is checked first) and [`MantelError::SizeMismatch`] when the condensed
/// lengths differ.
pub fn normalize_pair(
    x: DistanceInput,
    y: DistanceInput,
    symmetry_tolerance: f64,
) -> Result<(DistanceMatrix, DistanceMatrix)> {
    let x = x.normalize("X", symmetry_tolerance)?;
    let y = y.normalize("Y", symmetry_tolerance)?;
    if x.len() != y.len() {
        return Err(MantelError::SizeMismatch {
            x: x.len(),
            y: y.len(),
        });
    }
    Ok((x, y))
}

/// Condense a redundant matrix into its upper-triangle vector.
///
/// Requires exact symmetry and a zero diagonal.
pub fn condense(rows: &[Vec<f64>]) -> Result<Vec<f64>> {
    let n = check_redundant("matrix", rows, 0.0)?;
    Ok(upper_triangle(rows, n))
}

/// Expand a condensed vector into its redundant `n×n` matrix.
pub fn expand(condensed: &[f64]) -> Result<Vec<Vec<f64>>> {
    let n = check_condensed("vector", condensed)?;
    let dm = DistanceMatrix {
        condensed: condensed.to_vec(),
        n,
    };
    Ok(dm.to_rows())
}

/// Symmetric zero-diagonal distance matrix stored in condensed form.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DistanceMatrix {
    condensed: Vec<f64>,
    n: usize,
}

impl DistanceMatrix {
    /// Create from a condensed distance vector, inferring `n`.
    pub fn from_condensed(condensed: Vec<f64>) -> Result<Self> {
        DistanceInput::Condensed(condensed).normalize("condensed", 0.0)
    }

    /// Create from a redundant matrix (exact symmetry required).
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self> {
        let n = check_redundant("matrix", rows, 0.0)?;
        Ok(Self {
            condensed: upper_triangle(rows, n),
            n,
        })
    }

    /// Get the distance between objects `i` and `j`.
    ///
    /// Returns 0.0 when `i == j`.
    pub fn get(&self, i: usize, j: usize) -> f64 {
        if i == j {
            return 0.0;
        }
        let (a, b) = if i < j { (i, j) } else { (j, i) };
        self.condensed[self.index(a, b)]
    }

    /// Number of objects.
    pub fn n(&self) -> usize {
        self.n
    }

    /// Number of pairwise distances.
    pub fn len(&self) -> usize {
        self.condensed.len()
    }

    /// Always false for a validated matrix (at least one pair).
    pub fn is_empty(&self) -> bool {
        self.condensed.is_empty()
    }

    /// Access the raw condensed storage.
    pub fn condensed(&self) -> &[f64] {
        &self.condensed
    }

    /// Consume and return the condensed storage.
    pub fn into_condensed(self) -> Vec<f64> {
        self.condensed
    }

    /// Redundant form as a flat row-major `n*n` buffer.
    pub fn to_square(&self) -> Vec<f64> {
        square_from_condensed(&self.condensed, self.n)
    }

    /// Redundant form as rows.
    pub fn to_rows(&self) -> Vec<Vec<f64>> {
        self.to_square()
            .chunks(self.n)
            .map(|row| row.to_vec())
            .collect()
    }

    /// Map (i, j) where i < j to condensed index.
    fn index(&self, i: usize, j: usize) -> usize {
        // row i starts at position: i*n - i*(i+1)/2
        i * self.n - i * (i + 1) / 2 + (j - i - 1)
    }
}

impl Summarizable for DistanceMatrix {
    fn summary(&self) -> String {
        format!("DistanceMatrix: {}x{}", self.n, self.n)
    }
}

/// Fill a flat row-major `n*n` buffer from a condensed vector.
pub(crate) fn square_from_condensed(condensed: &[f64], n: usize) -> Vec<f64> {
    let mut square = vec![0.0; n * n];
    let mut k = 0;
    for i in 0..n {
        for j in (i + 1)..n {
            square[i * n + j] = condensed[k];
            square[j * n + i] = condensed[k];
            k += 1;
        }
    }
    square
}

fn upper_triangle(rows: &[Vec<f64>], n: usize) -> Vec<f64> {
    let mut v = Vec::with_capacity(condensed_len(n));
    for i in 0..n {
        for j in (i + 1)..n {
            v.push(rows[i][j]);
        }
    }
    v
}

fn check_condensed(name: &str, condensed: &[f64]) -> Result<usize> {
    let n = objects_for_len(condensed.len()).ok_or_else(|| {
        MantelError::invalid_matrix(
            name,
            format!(
                "condensed length {} is not n*(n-1)/2 for any n",
                condensed.len()
            ),
        )
    })?;
    if n < 2 {
        return Err(MantelError::invalid_matrix(
            name,
            "need at least 2 objects (1 pairwise distance)",
        ));
    }
    if let Some(k) = condensed.iter().position(|d| !d.is_finite()) {
        return Err(MantelError::invalid_matrix(
            name,
            format!("non-finite distance at condensed index {k}"),
        ));
    }
    Ok(n)
}

fn check_redundant(name: &str, rows: &[Vec<f64>], symmetry_tolerance: f64) -> Result<usize> {
    let n = rows.len();
    if n < 2 {
        return Err(MantelError::invalid_matrix(
            name,
            "distance matrix must have at least 2 objects",
        ));
    }
    for (i, row) in rows.iter().enumerate() {
        if row.len() != n {
            return Err(MantelError::invalid_matrix(
                name,
                format!(
                    "distance matrix must be square (row {} has {} columns, expected {})",
                    i,
                    row.len(),
                    n
                ),
            ));
        }
    }
    for i in 0..n {
        for j in 0..n {
            let d = rows[i][j];
            if !d.is_finite() {
                return Err(MantelError::invalid_matrix(
                    name,
                    format!("non-finite distance at ({i}, {j})"),
                ));
            }
            if i == j && d != 0.0 {
                return Err(MantelError::invalid_matrix(
                    name,
                    format!("non-zero diagonal at ({i}, {i}): {d}"),
                ));
            }
            if j > i && (d - rows[j][i]).abs() > symmetry_tolerance {
                return Err(MantelError::invalid_matrix(
                    name,
                    format!("not symmetric at ({i}, {j}): {} vs {}", d, rows[j][i]),
                ));
            }
        }
    }
    Ok(n)
}

// ── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn three_by_three() -> Vec<Vec<f64>> {
        vec![
            vec![0.0, 1.0, 2.0],
            vec![1.0, 0.0, 3.0],
            vec![2.0, 3.0, 0.0],
        ]
    }

    #[test]
    fn objects_for_triangular_lengths() {
        assert_eq!(objects_for_len(1), Some(2));
        assert_eq!(objects_for_len(3), Some(3));
        assert_eq!(objects_for_len(6), Some(4));
        assert_eq!(objects_for_len(4950), Some(100));
    }

    #[test]
    fn objects_for_non_triangular_lengths() {
        assert_eq!(objects_for_len(2), None);
        assert_eq!(objects_for_len(4), None);
        assert_eq!(objects_for_len(7), None);
    }

    #[test]
    fn condense_known_matrix() {
        assert_eq!(condense(&three_by_three()).unwrap(), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn expand_known_vector() {
        assert_eq!(expand(&[1.0, 2.0, 3.0]).unwrap(), three_by_three());
    }

    #[test]
    fn get_is_symmetric() {
        let dm = DistanceMatrix::from_condensed(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        assert_eq!(dm.n(), 4);
        assert_eq!(dm.get(0, 0), 0.0);
        assert_eq!(dm.get(0, 3), 3.0);
        assert_eq!(dm.get(3, 0), 3.0);
        assert_eq!(dm.get(1, 2), 4.0);
        assert_eq!(dm.get(2, 3), 6.0);
    }

    #[test]
    fn to_square_matches_get() {
        let dm = DistanceMatrix::from_condensed(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        let sq = dm.to_square();
        for i in 0..4 {
            for j in 0..4 {
                assert_eq!(sq[i * 4 + j], dm.get(i, j));
            }
        }
    }

    #[test]
    fn non_symmetric_matrix_rejected() {
        let mut m = three_by_three();
        m[0][1] = 1.5;
        let err = DistanceInput::from(m).normalize("X", 0.0).unwrap_err();
        assert!(matches!(
            err,
            MantelError::InvalidDistanceMatrix { ref name, .. } if name == "X"
        ));
    }

    #[test]
    fn symmetry_tolerance_accepts_small_noise() {
        let mut m = three_by_three();
        m[1][0] = 1.0 + 1e-12;
        assert!(DistanceInput::from(m.clone()).normalize("X", 0.0).is_err());
        let dm = DistanceInput::from(m).normalize("X", 1e-9).unwrap();
        assert_eq!(dm.condensed(), &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn non_zero_diagonal_rejected() {
        let mut m = three_by_three();
        m[2][2] = 0.1;
        assert!(DistanceMatrix::from_rows(&m).is_err());
    }

    #[test]
    fn non_square_matrix_rejected() {
        let m = vec![vec![0.0, 1.0, 2.0], vec![1.0, 0.0]];
        assert!(DistanceMatrix::from_rows(&m).is_err());
    }

    #[test]
    fn single_object_rejected() {
        assert!(DistanceMatrix::from_rows(&[vec![0.0]]).is_err());
        assert!(DistanceMatrix::from_condensed(vec![]).is_err());
    }

    #[test]
    fn bad_condensed_length_rejected() {
        let err = DistanceMatrix::from_condensed(vec![1.0, 2.0]).unwrap_err();
        assert!(matches!(err, MantelError::InvalidDistanceMatrix { .. }));
    }

    #[test]
    fn nan_rejected_in_both_forms() {
        assert!(DistanceMatrix::from_condensed(vec![1.0, f64::NAN, 3.0]).is_err());
        let mut m = three_by_three();
        m[0][2] = f64::NAN;
        m[2][0] = f64::NAN;
        assert!(DistanceMatrix::from_rows(&m).is_err());
    }

    #[test]
    fn negative_distances_accepted() {
        let dm = DistanceMatrix::from_condensed(vec![-1.0, 2.0, 3.0]).unwrap();
        assert_eq!(dm.get(1, 0), -1.0);
    }

    #[test]
    fn normalize_pair_size_mismatch() {
        let x = DistanceInput::from(vec![1.0; 6]); // n = 4
        let y = DistanceInput::from(vec![1.0; 10]); // n = 5
        let err = normalize_pair(x, y, 0.0).unwrap_err();
        assert_eq!(err, MantelError::SizeMismatch { x: 6, y: 10 });
    }

    #[test]
    fn normalize_pair_mixed_forms() {
        let x = DistanceInput::from(three_by_three());
        let y = DistanceInput::from(vec![3.0, 2.0, 1.0]);
        let (dx, dy) = normalize_pair(x, y, 0.0).unwrap();
        assert_eq!(dx.condensed(), &[1.0, 2.0, 3.0]);
        assert_eq!(dy.condensed(), &[3.0, 2.0, 1.0]);
    }

    #[test]
    fn distance_matrix_summary() {
        let dm = DistanceMatrix::from_rows(&three_by_three()).unwrap();
        assert_eq!(dm.summary(), "DistanceMatrix: 3x3");
    }
}
