//! The input distance matrix `D`.

use crate::error::DomainError;

/// A symmetric, zero-diagonal pairwise distance matrix over `n` taxa.
///
/// Taxa are addressed 0-based here (`0..n`); the rest of the crate works in
/// 1-based taxon ids and converts at the boundary.
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceMatrix {
    n: usize,
    data: Vec<f64>,
}

const SYMMETRY_TOLERANCE: f64 = 1e-6;

impl DistanceMatrix {
    /// Builds a distance matrix from a flattened, row-major `n * n` buffer.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::EmptyInput`] if `n == 0`,
    /// [`DomainError::DimensionMismatch`] if `data.len() != n * n`, or
    /// [`DomainError::AsymmetricMatrix`] if `D[i][j]` and `D[j][i]` disagree
    /// beyond floating-point tolerance.
    pub fn new(n: usize, data: Vec<f64>) -> Result<Self, DomainError> {
        if n == 0 {
            return Err(DomainError::EmptyInput);
        }
        if data.len() != n * n {
            return Err(DomainError::DimensionMismatch { expected: n, found: data.len() });
        }
        let matrix = Self { n, data };
        for i in 0..n {
            for j in (i + 1)..n {
                if (matrix.get(i, j) - matrix.get(j, i)).abs() > SYMMETRY_TOLERANCE {
                    return Err(DomainError::AsymmetricMatrix { i, j });
                }
            }
        }
        Ok(matrix)
    }

    /// Number of taxa.
    #[must_use]
    pub const fn n_tax(&self) -> usize {
        self.n
    }

    /// `D[i][j]`, 0-based.
    #[must_use]
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.data[i * self.n + j]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty() {
        assert_eq!(DistanceMatrix::new(0, vec![]), Err(DomainError::EmptyInput));
    }

    #[test]
    fn rejects_bad_dimension() {
        assert_eq!(
            DistanceMatrix::new(2, vec![0.0, 1.0, 1.0]),
            Err(DomainError::DimensionMismatch { expected: 2, found: 3 })
        );
    }

    #[test]
    fn rejects_asymmetric() {
        let data = vec![0.0, 1.0, 2.0, 0.0];
        assert_eq!(DistanceMatrix::new(2, data), Err(DomainError::AsymmetricMatrix { i: 0, j: 1 }));
    }

    #[test]
    fn accepts_symmetric() {
        let data = vec![0.0, 1.0, 2.0, 1.0, 0.0, 3.0, 2.0, 3.0, 0.0];
        let m = DistanceMatrix::new(3, data).expect("symmetric matrix should be accepted");
        assert_eq!(m.get(0, 2), 2.0);
        assert_eq!(m.get(2, 0), 2.0);
    }
}
