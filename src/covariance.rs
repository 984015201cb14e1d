//! Adapted covariance matrix with a cached eigendecomposition.
//!
//! Sampling needs `B·D` (eigenbasis scaled by √eigenvalues) and cumulation
//! needs `C^{-1/2} = B·D⁻¹·Bᵗ`. Both are derived from one symmetric
//! eigendecomposition which, at O(n³), dominates the per-generation cost
//! in higher dimensions. [`EigenRefresh::Lazy`] amortizes it by reusing the
//! cached factors until enough evaluations have passed.

use crate::eigen::SymmetricEigenSolver;
use crate::error::{CmaError, Result};
use crate::primitives::{Matrix, Vector};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Largest condition number a refreshed eigensystem may have. Smaller
/// eigenvalues are lifted by adding a multiple of the identity to `C`.
pub const MAX_CONDITION_NUMBER: f64 = 1e14;

/// Negative eigenvalues no larger than this fraction of the largest one are
/// rounding noise and get lifted; anything below is a breakdown.
const NEGATIVE_EIGENVALUE_TOLERANCE: f64 = 1e-8;

/// When the cached eigendecomposition is recomputed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EigenRefresh {
    /// Recompute on every request.
    #[default]
    Always,
    /// Recompute only once more than the lazy gap of evaluations has passed
    /// since the last decomposition.
    Lazy,
}

/// Symmetric positive-definite matrix `C` together with its cached
/// eigensystem.
///
/// Invariant: every cached eigenvalue is strictly positive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CovarianceMatrix {
    matrix: Matrix<f64>,
    /// Column `i` is the unit eigenvector for `eigenvalues[i]`.
    eigenbasis: Matrix<f64>,
    /// Ascending.
    eigenvalues: Vector<f64>,
    invsqrt: Matrix<f64>,
    condition_number: f64,
    updated_eval: u64,
}

impl CovarianceMatrix {
    /// Identity covariance of dimension `n`.
    #[must_use]
    pub fn identity(n: usize) -> Self {
        Self {
            matrix: Matrix::eye(n),
            eigenbasis: Matrix::eye(n),
            eigenvalues: Vector::ones(n),
            invsqrt: Matrix::eye(n),
            condition_number: 1.0,
            updated_eval: 0,
        }
    }

    /// Problem dimension.
    #[must_use]
    pub fn dimension(&self) -> usize {
        self.eigenvalues.len()
    }

    /// The adapted matrix `C`.
    #[must_use]
    pub fn matrix(&self) -> &Matrix<f64> {
        &self.matrix
    }

    /// Cached eigenbasis `B` (columns are eigenvectors).
    #[must_use]
    pub fn eigenbasis(&self) -> &Matrix<f64> {
        &self.eigenbasis
    }

    /// Cached eigenvalues, ascending.
    #[must_use]
    pub fn eigenvalues(&self) -> &Vector<f64> {
        &self.eigenvalues
    }

    /// Cached `C^{-1/2}`.
    #[must_use]
    pub fn invsqrt(&self) -> &Matrix<f64> {
        &self.invsqrt
    }

    /// Ratio of largest to smallest cached eigenvalue.
    #[must_use]
    pub fn condition_number(&self) -> f64 {
        self.condition_number
    }

    /// Evaluation counter at the last decomposition.
    #[must_use]
    pub fn updated_eval(&self) -> u64 {
        self.updated_eval
    }

    /// Multiplies `C` by `factor`.
    pub fn scale(&mut self, factor: f64) {
        self.matrix.scale(factor);
    }

    /// Adds `weight · v·vᵗ` to `C`.
    pub fn add_outer_product(&mut self, v: &Vector<f64>, weight: f64) {
        self.matrix.add_outer_product(v, weight);
    }

    /// Multiplies the diagonal entries `indices` of `C` by `factor`.
    ///
    /// # Panics
    ///
    /// Panics if an index is out of range.
    pub fn inflate_diagonal(&mut self, indices: &[usize], factor: f64) {
        for &i in indices {
            let value = self.matrix.get(i, i);
            self.matrix.set(i, i, value * factor);
        }
    }

    /// Divides `C` by `divisor` and updates the cached factors to match,
    /// without a new decomposition. The eigenbasis and condition number do
    /// not change.
    pub fn rescale(&mut self, divisor: f64) {
        let factor = 1.0 / divisor;
        self.matrix.scale(factor);
        self.eigenvalues.scale(factor);
        self.invsqrt.scale(divisor.sqrt());
    }

    /// Averages mirrored off-diagonal entries, undoing the drift that
    /// repeated floating-point rank updates introduce.
    pub fn enforce_symmetry(&mut self) {
        let n = self.matrix.n_rows();
        for i in 0..n {
            for j in 0..i {
                let avg = (self.matrix.get(i, j) + self.matrix.get(j, i)) / 2.0;
                self.matrix.set(i, j, avg);
                self.matrix.set(j, i, avg);
            }
        }
    }

    /// Whether a refresh at `current_eval` would recompute the eigensystem.
    #[must_use]
    pub fn needs_refresh(&self, current_eval: u64, lazy_gap_evals: f64, policy: EigenRefresh) -> bool {
        match policy {
            EigenRefresh::Always => true,
            EigenRefresh::Lazy => current_eval as f64 > self.updated_eval as f64 + lazy_gap_evals,
        }
    }

    /// Recomputes the cached eigensystem and `C^{-1/2}` if the policy asks
    /// for it. Returns whether a decomposition took place.
    ///
    /// On error the cached factors are left untouched.
    ///
    /// # Errors
    ///
    /// [`CmaError::NumericalBreakdown`] if `C` is non-finite or has an
    /// eigenvalue that is clearly negative; solver errors are propagated.
    /// Tiny or slightly negative eigenvalues are lifted so that the
    /// condition number stays at most [`MAX_CONDITION_NUMBER`].
    pub fn refresh_eigendecomposition(
        &mut self,
        current_eval: u64,
        lazy_gap_evals: f64,
        policy: EigenRefresh,
        solver: &dyn SymmetricEigenSolver,
    ) -> Result<bool> {
        if !self.needs_refresh(current_eval, lazy_gap_evals, policy) {
            return Ok(false);
        }

        self.enforce_symmetry();
        if !self.matrix.is_finite() {
            return Err(CmaError::NumericalBreakdown {
                message: format!("covariance matrix has non-finite entries at eval {current_eval}"),
            });
        }

        let eig = solver.decompose(&self.matrix)?;
        let mut eigenvalues = eig.eigenvalues;
        let min = eigenvalues.iter().copied().fold(f64::INFINITY, f64::min);
        let max = eigenvalues.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        if !eigenvalues.is_finite() || !(max > 0.0) || min < -max * NEGATIVE_EIGENVALUE_TOLERANCE {
            return Err(CmaError::NumericalBreakdown {
                message: format!(
                    "covariance lost positive-definiteness at eval {current_eval}: eigenvalues in [{min:e}, {max:e}]"
                ),
            });
        }

        let floor = max / MAX_CONDITION_NUMBER;
        if min < floor {
            let shift = floor - min;
            for i in 0..self.dimension() {
                let value = self.matrix.get(i, i);
                self.matrix.set(i, i, value + shift);
            }
            eigenvalues = eigenvalues.iter().map(|l| l + shift).collect();
            debug!(
                eval = current_eval,
                shift,
                "lifted covariance eigenvalues to bound the condition number"
            );
        }

        let n = self.dimension();
        let inv_sqrt_values: Vec<f64> = eigenvalues.iter().map(|l| 1.0 / l.sqrt()).collect();
        let mut invsqrt = Matrix::zeros(n, n);
        for i in 0..n {
            for j in 0..=i {
                let sum: f64 = (0..n)
                    .map(|k| {
                        eig.eigenvectors.get(i, k) * eig.eigenvectors.get(j, k) * inv_sqrt_values[k]
                    })
                    .sum();
                invsqrt.set(i, j, sum);
                invsqrt.set(j, i, sum);
            }
        }

        self.eigenvalues = eigenvalues;
        self.eigenbasis = eig.eigenvectors;
        self.invsqrt = invsqrt;
        self.condition_number = self.eigenvalues.iter().copied().fold(f64::NEG_INFINITY, f64::max)
            / self.eigenvalues.iter().copied().fold(f64::INFINITY, f64::min);
        self.updated_eval = current_eval;

        debug!(
            eval = current_eval,
            condition_number = self.condition_number,
            "refreshed covariance eigendecomposition"
        );
        Ok(true)
    }

    /// Maps a standard-normal draw `z` to `B·diag(√λ)·z`, a sample from
    /// `N(0, C)` under the cached factors.
    ///
    /// # Panics
    ///
    /// Panics in debug builds unless `z` has the covariance dimension.
    #[must_use]
    pub fn transform_standard_normal(&self, z: &Vector<f64>) -> Vector<f64> {
        debug_assert_eq!(z.len(), self.dimension(), "standard normal draw: dimension mismatch");
        let scaled: Vector<f64> = z
            .iter()
            .zip(self.eigenvalues.iter())
            .map(|(zi, l)| zi * l.sqrt())
            .collect();
        self.eigenbasis.apply(&scaled)
    }

    /// `C^{-1/2}·dx`.
    ///
    /// # Panics
    ///
    /// Panics in debug builds unless `dx` has the covariance dimension.
    #[must_use]
    pub fn whiten(&self, dx: &Vector<f64>) -> Vector<f64> {
        debug_assert_eq!(dx.len(), self.dimension(), "whiten: dimension mismatch");
        self.invsqrt.apply(dx)
    }

    /// Distance of `dx` from the origin in standard deviations of the
    /// current distribution, `‖C^{-1/2}·dx‖`.
    #[must_use]
    pub fn mahalanobis_distance(&self, dx: &Vector<f64>) -> f64 {
        self.whiten(dx).norm()
    }

    /// Checks that every part has dimension `n` and the cached eigenvalues
    /// are positive. Used when state comes from outside, e.g. a checkpoint.
    pub(crate) fn validate(&self, n: usize) -> Result<()> {
        let square = |m: &Matrix<f64>| m.shape() == (n, n);
        if !square(&self.matrix) || !square(&self.eigenbasis) || !square(&self.invsqrt) {
            return Err(CmaError::checkpoint(format!(
                "covariance factors must be {n}x{n}"
            )));
        }
        if self.eigenvalues.len() != n {
            return Err(CmaError::dimension_mismatch(
                "eigenvalues",
                n,
                self.eigenvalues.len(),
            ));
        }
        if self.eigenvalues.iter().any(|&l| !(l > 0.0) || !l.is_finite()) {
            return Err(CmaError::checkpoint(
                "cached eigenvalues must be finite and strictly positive",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "covariance_tests.rs"]
mod tests;
