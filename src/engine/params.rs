//! Selection and adaptation constants, fixed once per run.
//!
//! Reference: Hansen (2016) "The CMA Evolution Strategy: A Tutorial",
//! sections 3 and A.

use crate::error::{CmaError, Result};
use crate::primitives::Vector;
use serde::{Deserialize, Serialize};

/// Default population size for `n` dimensions: `4 + ⌊3·ln n⌋`.
///
/// # Example
/// ```
/// use aprender_cmaes::engine::population_size;
/// assert_eq!(population_size(3), 7);
/// assert_eq!(population_size(10), 10);
/// ```
#[must_use]
pub fn population_size(n: usize) -> usize {
    4 + (3.0 * (n.max(1) as f64).ln()).floor() as usize
}

/// How the recombination weights past μ are assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightScheme {
    /// Log-linear weights on the best μ, zero for the rest.
    #[default]
    Positive,
    /// As `Positive`, plus negative weights on the worst λ−μ that actively
    /// shrink the covariance along unsuccessful directions.
    Active,
}

/// Strategy parameters derived from the dimension and population size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyParameters {
    /// Problem dimension n
    pub dimension: usize,
    /// Population size λ
    pub lambda: usize,
    /// Number of parents μ = ⌊λ/2⌋
    pub mu: usize,
    /// Base recombination weights, one per rank. The first μ sum to 1.
    pub weights: Vector<f64>,
    /// Variance effective selection mass of the positive weights
    pub mueff: f64,
    /// Time constant for cumulation of the rank-one path
    pub cc: f64,
    /// Time constant for cumulation of the step-size path
    pub cs: f64,
    /// Learning rate of the rank-one update
    pub c1: f64,
    /// Learning rate of the rank-μ update
    pub cmu: f64,
    /// Step-size damping
    pub damps: f64,
    /// Evaluations between eigendecompositions under lazy refresh
    pub lazy_gap_evals: f64,
    /// Scheme the weights were built with
    pub scheme: WeightScheme,
}

impl StrategyParameters {
    /// Derives all constants for dimension `n` and population size `lambda`.
    ///
    /// # Errors
    ///
    /// Returns an error if `n == 0` or `lambda < 2` (no parent to recombine).
    pub fn new(n: usize, lambda: usize, scheme: WeightScheme) -> Result<Self> {
        if n == 0 {
            return Err(CmaError::invalid_configuration("dimension", n, ">= 1"));
        }
        if lambda < 2 {
            return Err(CmaError::invalid_configuration(
                "population_size",
                lambda,
                ">= 2 so that mu >= 1",
            ));
        }

        let mu = lambda / 2;
        let nf = n as f64;
        let raw: Vec<f64> = (0..lambda)
            .map(|i| (mu as f64 + 0.5).ln() - ((i + 1) as f64).ln())
            .collect();

        let positive_sum: f64 = raw[..mu].iter().sum();
        let mut weights = Vector::zeros(lambda);
        for i in 0..mu {
            weights[i] = raw[i] / positive_sum;
        }

        let head = &weights.as_slice()[..mu];
        let mueff = head.iter().sum::<f64>().powi(2) / head.iter().map(|w| w * w).sum::<f64>();

        let cc = (4.0 + mueff / nf) / (nf + 4.0 + 2.0 * mueff / nf);
        let cs = (mueff + 2.0) / (nf + mueff + 5.0);
        let c1 = 2.0 / ((nf + 1.3).powi(2) + mueff);
        let cmu = (1.0 - c1).min(2.0 * (mueff - 2.0 + 1.0 / mueff) / ((nf + 2.0).powi(2) + mueff));
        let damps = 2.0 * mueff / lambda as f64 + 0.3 + cs;
        let lazy_gap_evals = 0.5 * nf * lambda as f64 / ((c1 + cmu) * nf * nf);

        if scheme == WeightScheme::Active && cmu > 0.0 && lambda > mu {
            let tail = &raw[mu..];
            let neg_sum: f64 = tail.iter().map(|w| w.abs()).sum();
            if neg_sum > 0.0 {
                let mueff_minus =
                    neg_sum.powi(2) / tail.iter().map(|w| w * w).sum::<f64>();
                let alpha_mu = 1.0 + c1 / cmu;
                let alpha_mueff = 1.0 + 2.0 * mueff_minus / (mueff + 2.0);
                let alpha_posdef = (1.0 - c1 - cmu) / (nf * cmu);
                let scale = alpha_mu.min(alpha_mueff).min(alpha_posdef) / neg_sum;
                for (i, w) in tail.iter().enumerate() {
                    weights[mu + i] = w * scale;
                }
            }
        }

        Ok(Self {
            dimension: n,
            lambda,
            mu,
            weights,
            mueff,
            cc,
            cs,
            c1,
            cmu,
            damps,
            lazy_gap_evals,
            scheme,
        })
    }

    /// Sum over all λ base weights (1 for [`WeightScheme::Positive`]).
    #[must_use]
    pub fn weight_sum(&self) -> f64 {
        self.weights.sum()
    }

    /// Checks internal consistency of parameters that came from outside.
    pub(crate) fn validate(&self) -> Result<()> {
        if self.dimension == 0 || self.lambda < 2 || self.mu != self.lambda / 2 {
            return Err(CmaError::checkpoint(format!(
                "inconsistent population: n={}, lambda={}, mu={}",
                self.dimension, self.lambda, self.mu
            )));
        }
        if self.weights.len() != self.lambda {
            return Err(CmaError::dimension_mismatch(
                "weights",
                self.lambda,
                self.weights.len(),
            ));
        }
        let constants = [
            self.mueff,
            self.cc,
            self.cs,
            self.c1,
            self.cmu,
            self.damps,
            self.lazy_gap_evals,
        ];
        if !self.weights.is_finite() || constants.iter().any(|c| !c.is_finite()) {
            return Err(CmaError::checkpoint("non-finite strategy parameter"));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "params_tests.rs"]
mod tests;
