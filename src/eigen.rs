//! Symmetric eigendecomposition.
//!
//! The optimizer only relies on the contract expressed by
//! [`SymmetricEigenSolver`]: a symmetric n×n input yields eigenvalues in
//! ascending order and an orthonormal eigenvector matrix whose column `i`
//! belongs to eigenvalue `i`. Non-convergence is reported as an error,
//! never as silent NaN output.
//!
//! [`NalgebraEigenSolver`] is the default implementation, backed by
//! `nalgebra`'s implicit symmetric QR algorithm.

use crate::error::{CmaError, Result};
use crate::primitives::{Matrix, Vector};
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Eigenvalues (ascending) and matching unit eigenvectors (as columns).
#[derive(Debug, Clone, PartialEq)]
pub struct EigenDecomposition {
    /// Eigenvalues in ascending order.
    pub eigenvalues: Vector<f64>,
    /// Column `i` is the unit eigenvector for `eigenvalues[i]`.
    pub eigenvectors: Matrix<f64>,
}

/// Capability to decompose a symmetric matrix.
pub trait SymmetricEigenSolver: Debug + Send + Sync {
    /// Decomposes `matrix`, which must be square and symmetric.
    ///
    /// # Errors
    ///
    /// Returns [`CmaError::DimensionMismatch`] for a non-square input and
    /// [`CmaError::EigenSolverFailed`] if the iteration does not converge.
    fn decompose(&self, matrix: &Matrix<f64>) -> Result<EigenDecomposition>;
}

/// Symmetric QR eigensolver from `nalgebra`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NalgebraEigenSolver {
    /// Off-diagonal convergence tolerance.
    pub eps: f64,
    /// Iteration cap; exceeding it is reported as a failure.
    pub max_iterations: usize,
}

impl Default for NalgebraEigenSolver {
    fn default() -> Self {
        Self {
            eps: f64::EPSILON,
            max_iterations: 10_000,
        }
    }
}

impl NalgebraEigenSolver {
    /// Creates a solver with the default tolerance and iteration cap.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the iteration cap.
    #[must_use]
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations.max(1);
        self
    }
}

impl SymmetricEigenSolver for NalgebraEigenSolver {
    fn decompose(&self, matrix: &Matrix<f64>) -> Result<EigenDecomposition> {
        let (n, cols) = matrix.shape();
        if n != cols {
            return Err(CmaError::DimensionMismatch {
                expected: format!("{n}x{n}"),
                actual: format!("{n}x{cols}"),
            });
        }

        let dense = DMatrix::from_row_slice(n, n, matrix.as_slice());
        let eigen = dense
            .try_symmetric_eigen(self.eps, self.max_iterations)
            .ok_or(CmaError::EigenSolverFailed {
                max_iterations: self.max_iterations,
            })?;

        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|&a, &b| eigen.eigenvalues[a].total_cmp(&eigen.eigenvalues[b]));

        let eigenvalues: Vector<f64> = order.iter().map(|&k| eigen.eigenvalues[k]).collect();
        let mut eigenvectors = Matrix::zeros(n, n);
        for (col, &k) in order.iter().enumerate() {
            for row in 0..n {
                eigenvectors.set(row, col, eigen.eigenvectors[(row, k)]);
            }
        }

        Ok(EigenDecomposition {
            eigenvalues,
            eigenvectors,
        })
    }
}

#[cfg(test)]
#[path = "eigen_tests.rs"]
mod tests;
