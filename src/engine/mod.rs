//! The CMA-ES engine.
//!
//! Samples candidates from `N(m, σ²C)` and adapts the mean, the step size
//! and the full covariance `C` from the ranking of their objective values.
//!
//! The engine runs in an ask/tell rhythm. [`CmaEs::sample_generation`]
//! hands out λ candidates, the caller evaluates them however it likes
//! (sequentially, on a worker pool, on remote machines), and
//! [`CmaEs::complete_generation`] takes all λ `(candidate, value)` pairs back
//! in any order. [`CmaEs::epoch`] and [`CmaEs::epoch_with`] bundle the three
//! steps for the common cases.
//!
//! Reference: Hansen (2016) "The CMA Evolution Strategy: A Tutorial"
//!
//! # Example
//!
//! ```
//! use aprender_cmaes::prelude::*;
//! use rand::rngs::StdRng;
//! use rand::SeedableRng;
//!
//! let mut rng = StdRng::seed_from_u64(42);
//! let mean = Vector::from_slice(&[3.0, -2.0, 1.5]);
//! let mut cma = CmaEs::new(mean, population_size(3), 3.0, None).unwrap();
//!
//! let mut sphere = |x: &Vector<f64>| x.squared_magnitude();
//! for _ in 0..300 {
//!     cma.epoch(&mut sphere, &mut rng, |_, _| {}).unwrap();
//! }
//! assert!(cma.best_solution().unwrap().value < 1e-3);
//! ```

mod params;

pub use params::{population_size, StrategyParameters, WeightScheme};

use crate::config::CmaEsConfig;
use crate::covariance::{CovarianceMatrix, EigenRefresh};
use crate::eigen::{NalgebraEigenSolver, SymmetricEigenSolver};
use crate::error::{CmaError, Result};
use crate::evaluator::{EvaluatedSolution, ObjectiveEvaluator};
use crate::primitives::Vector;
use crate::search_space::SearchSpaceConfiguration;
use rand::Rng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Largest diagonal entry of `C` tolerated (and its inverse the smallest)
/// before `C` is renormalized into σ.
const MAX_COVARIANCE_SCALE: f64 = 1e60;

fn default_eigen_solver() -> Arc<dyn SymmetricEigenSolver> {
    Arc::new(NalgebraEigenSolver::default())
}

/// Ascending by value with NaN (of either sign) after every number.
fn by_value(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b)
        .unwrap_or_else(|| a.is_nan().cmp(&b.is_nan()))
}

/// One evaluated offspring in both coordinate systems.
struct Ranked {
    external: Vector<f64>,
    internal: Vector<f64>,
    value: f64,
}

/// CMA-ES engine.
///
/// All state mutates only through [`CmaEs::sample_generation`] (eigensystem
/// refresh) and [`CmaEs::complete_generation`]; one generation must finish
/// before the next is sampled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CmaEs {
    params: StrategyParameters,
    eigen_refresh: EigenRefresh,
    /// Distribution mean, internal coordinates
    mean: Vector<f64>,
    /// Step-size
    sigma: f64,
    /// Evolution path for C
    pc: Vector<f64>,
    /// Evolution path for sigma
    ps: Vector<f64>,
    covariance: CovarianceMatrix,
    eval_count: u64,
    generation: u64,
    best: Option<EvaluatedSolution>,
    last_generation_best: Option<EvaluatedSolution>,
    search_space: Option<SearchSpaceConfiguration>,
    #[serde(skip, default = "default_eigen_solver")]
    eigen_solver: Arc<dyn SymmetricEigenSolver>,
}

impl CmaEs {
    /// Creates an engine around `mean` (external coordinates) with population
    /// size `lambda` and initial step size `sigma` (internal coordinates).
    ///
    /// # Errors
    ///
    /// Returns an error if `mean` is empty or non-finite, `lambda < 2`,
    /// `sigma` is not positive and finite, or the search space does not fit
    /// the dimension of `mean`.
    pub fn new(
        mean: Vector<f64>,
        lambda: usize,
        sigma: f64,
        search_space: Option<SearchSpaceConfiguration>,
    ) -> Result<Self> {
        let config = CmaEsConfig {
            population_size: Some(lambda),
            sigma,
            search_space,
            ..CmaEsConfig::default()
        };
        Self::from_config(mean, &config)
    }

    /// Creates an engine from a configuration value. A missing population
    /// size defaults to [`population_size`] of the dimension.
    ///
    /// # Errors
    ///
    /// Same conditions as [`CmaEs::new`].
    pub fn from_config(mean: Vector<f64>, config: &CmaEsConfig) -> Result<Self> {
        let n = mean.len();
        if n == 0 {
            return Err(CmaError::invalid_configuration("mean", "[]", "at least one coordinate"));
        }
        if !mean.is_finite() {
            return Err(CmaError::invalid_configuration("mean", "non-finite", "finite coordinates"));
        }
        if !(config.sigma > 0.0) || !config.sigma.is_finite() {
            return Err(CmaError::invalid_configuration("sigma", config.sigma, "finite and > 0"));
        }
        if let Some(space) = &config.search_space {
            space.validate(n)?;
        }

        let lambda = config.population_size.unwrap_or_else(|| population_size(n));
        let params = StrategyParameters::new(n, lambda, config.weights)?;
        let mean = match &config.search_space {
            Some(space) => space.encode(&mean),
            None => mean,
        };

        debug!(
            n,
            lambda,
            mu = params.mu,
            mueff = params.mueff,
            cc = params.cc,
            cs = params.cs,
            c1 = params.c1,
            cmu = params.cmu,
            damps = params.damps,
            "initialized CMA-ES"
        );

        Ok(Self {
            params,
            eigen_refresh: config.eigen_refresh,
            mean,
            sigma: config.sigma,
            pc: Vector::zeros(n),
            ps: Vector::zeros(n),
            covariance: CovarianceMatrix::identity(n),
            eval_count: 0,
            generation: 0,
            best: None,
            last_generation_best: None,
            search_space: config.search_space.clone(),
            eigen_solver: default_eigen_solver(),
        })
    }

    /// Set the eigendecomposition refresh policy.
    #[must_use]
    pub fn with_eigen_refresh(mut self, policy: EigenRefresh) -> Self {
        self.eigen_refresh = policy;
        self
    }

    /// Replace the symmetric eigensolver.
    #[must_use]
    pub fn with_eigen_solver(mut self, solver: Arc<dyn SymmetricEigenSolver>) -> Self {
        self.eigen_solver = solver;
        self
    }

    /// Eigensolver used for covariance refreshes.
    #[must_use]
    pub fn eigen_solver(&self) -> Arc<dyn SymmetricEigenSolver> {
        Arc::clone(&self.eigen_solver)
    }

    /// Problem dimension n.
    #[must_use]
    pub fn dimension(&self) -> usize {
        self.params.dimension
    }

    /// Population size λ.
    #[must_use]
    pub fn population_size(&self) -> usize {
        self.params.lambda
    }

    /// Number of parents μ.
    #[must_use]
    pub fn mu(&self) -> usize {
        self.params.mu
    }

    /// Fixed strategy parameters.
    #[must_use]
    pub fn params(&self) -> &StrategyParameters {
        &self.params
    }

    /// Active refresh policy.
    #[must_use]
    pub fn eigen_refresh(&self) -> EigenRefresh {
        self.eigen_refresh
    }

    /// Distribution mean in internal coordinates.
    #[must_use]
    pub fn mean(&self) -> &Vector<f64> {
        &self.mean
    }

    /// Distribution mean in external coordinates.
    #[must_use]
    pub fn external_mean(&self) -> Vector<f64> {
        self.to_external(&self.mean)
    }

    /// Current step size σ.
    #[must_use]
    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    /// Evolution path of the covariance (rank-one) update.
    #[must_use]
    pub fn pc(&self) -> &Vector<f64> {
        &self.pc
    }

    /// Evolution path of step-size control.
    #[must_use]
    pub fn ps(&self) -> &Vector<f64> {
        &self.ps
    }

    /// Adapted covariance with its cached eigensystem.
    #[must_use]
    pub fn covariance(&self) -> &CovarianceMatrix {
        &self.covariance
    }

    /// Objective evaluations consumed so far.
    #[must_use]
    pub fn eval_count(&self) -> u64 {
        self.eval_count
    }

    /// Completed generations.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Best solution seen over the whole run.
    #[must_use]
    pub fn best_solution(&self) -> Option<&EvaluatedSolution> {
        self.best.as_ref()
    }

    /// Best solution of the most recent generation, `None` if every value
    /// in it was NaN.
    #[must_use]
    pub fn last_generation_best(&self) -> Option<&EvaluatedSolution> {
        self.last_generation_best.as_ref()
    }

    /// Search space configuration, if any.
    #[must_use]
    pub fn search_space(&self) -> Option<&SearchSpaceConfiguration> {
        self.search_space.as_ref()
    }

    fn to_internal(&self, external: &Vector<f64>) -> Vector<f64> {
        match &self.search_space {
            Some(space) => space.encode(external),
            None => external.clone(),
        }
    }

    fn to_external(&self, internal: &Vector<f64>) -> Vector<f64> {
        match &self.search_space {
            Some(space) => space.decode(internal),
            None => internal.clone(),
        }
    }

    /// The copy of `candidate` that is handed to the objective: bound
    /// handling applied if a search space is configured.
    #[must_use]
    pub fn evaluation_input(&self, candidate: &Vector<f64>) -> Vector<f64> {
        match &self.search_space {
            Some(space) => space.apply_bounds(candidate),
            None => candidate.clone(),
        }
    }

    /// Draws λ candidates (external coordinates) from the current
    /// distribution, refreshing the eigensystem first if the policy asks.
    ///
    /// # Errors
    ///
    /// Returns a numerical error if the covariance lost positive
    /// definiteness, the step size under- or overflowed, or the eigensolver
    /// failed. The engine is unchanged
    /// apart from symmetrization and may be restored from a checkpoint.
    pub fn sample_generation<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<Vec<Vector<f64>>> {
        if !(self.sigma > 0.0) || !self.sigma.is_finite() {
            return Err(CmaError::NumericalBreakdown {
                message: format!(
                    "step size {:e} is no longer positive and finite at eval {}",
                    self.sigma, self.eval_count
                ),
            });
        }
        self.covariance.refresh_eigendecomposition(
            self.eval_count,
            self.params.lazy_gap_evals,
            self.eigen_refresh,
            self.eigen_solver.as_ref(),
        )?;

        let n = self.dimension();
        let candidates = (0..self.params.lambda)
            .map(|_| {
                let z: Vector<f64> = (0..n).map(|_| rng.sample::<f64, _>(StandardNormal)).collect();
                let mut x = self.covariance.transform_standard_normal(&z);
                x.scale(self.sigma);
                x += &self.mean;
                self.to_external(&x)
            })
            .collect();
        Ok(candidates)
    }

    /// Consumes the evaluated population: recombination, cumulation,
    /// covariance adaptation and step-size control. Pairs may arrive in any
    /// order. Returns the best solution of this generation.
    ///
    /// Candidates enter recombination as sampled. Best solutions record the
    /// bound-handled copy, the point the objective value belongs to.
    ///
    /// # Errors
    ///
    /// Returns [`CmaError::InvalidGeneration`] without touching the engine
    /// if there are not exactly λ pairs or a candidate has the wrong
    /// dimension.
    #[allow(clippy::too_many_lines)]
    pub fn complete_generation(
        &mut self,
        evaluated: Vec<(Vector<f64>, f64)>,
    ) -> Result<EvaluatedSolution> {
        let n = self.dimension();
        let lambda = self.params.lambda;
        if evaluated.len() != lambda {
            return Err(CmaError::InvalidGeneration(format!(
                "expected {lambda} evaluated candidates, got {}",
                evaluated.len()
            )));
        }
        if let Some((i, (x, _))) = evaluated.iter().enumerate().find(|(_, (x, _))| x.len() != n) {
            return Err(CmaError::InvalidGeneration(format!(
                "candidate {i} has dimension {}, expected {n}",
                x.len()
            )));
        }

        let nan_count = evaluated.iter().filter(|(_, v)| v.is_nan()).count();
        if nan_count > 0 {
            warn!(nan_count, generation = self.generation, "objective returned NaN");
        }

        let mut ranked: Vec<Ranked> = evaluated
            .into_iter()
            .map(|(external, value)| Ranked {
                internal: self.to_internal(&external),
                external,
                value,
            })
            .collect();
        ranked.sort_by(|a, b| by_value(a.value, b.value));

        let generation_best =
            EvaluatedSolution::new(self.evaluation_input(&ranked[0].external), ranked[0].value);
        let flat_fitness = ranked[0].value == ranked[(lambda * 7).div_ceil(10) - 1].value;
        let improved = match &self.best {
            Some(best) => generation_best.is_better_than(best),
            None => !generation_best.value.is_nan(),
        };
        if improved {
            self.best = Some(generation_best.clone());
        }

        let p = &self.params;
        let nf = n as f64;
        let sigma = self.sigma;

        // Recombination
        let old_mean = std::mem::replace(&mut self.mean, Vector::zeros(n));
        for (offspring, &w) in ranked.iter().zip(p.weights.iter()).take(p.mu) {
            self.mean.add_scaled(&offspring.internal, w);
        }
        let y_mean = &self.mean - &old_mean;

        // Cumulation
        let csn = (p.cs * (2.0 - p.cs) * p.mueff).sqrt() / sigma;
        self.ps.scale(1.0 - p.cs);
        self.ps.add_scaled(&self.covariance.whiten(&y_mean), csn);

        let evals_after = self.eval_count + lambda as u64;
        let ps_sq = self.ps.squared_magnitude();
        let hsig_denominator = 1.0 - (1.0 - p.cs).powf(2.0 * evals_after as f64 / lambda as f64);
        let hsig = if ps_sq / nf / hsig_denominator < 2.0 + 4.0 / (nf + 1.0) {
            1.0
        } else {
            0.0
        };

        let ccn = (p.cc * (2.0 - p.cc) * p.mueff).sqrt() / sigma;
        self.pc.scale(1.0 - p.cc);
        self.pc.add_scaled(&y_mean, hsig * ccn);

        // Covariance adaptation: decay, rank-one, rank-mu
        let c1a = p.c1 * (1.0 - (1.0 - hsig * hsig) * p.cc * (2.0 - p.cc));
        self.covariance.scale(1.0 - c1a - p.cmu * p.weight_sum());
        self.covariance.add_outer_product(&self.pc, p.c1);

        // Negative weights are rescaled per offspring on a working copy; the
        // base weights stay as constructed.
        let mut working = p.weights.clone();
        for (k, offspring) in ranked.iter().enumerate() {
            let dy = &offspring.internal - &old_mean;
            if working[k] < 0.0 {
                let distance = self.covariance.mahalanobis_distance(&dy);
                working[k] = if distance > 0.0 {
                    working[k] * nf * (sigma / distance).powi(2)
                } else {
                    0.0
                };
            }
            if working[k] != 0.0 {
                self.covariance
                    .add_outer_product(&dy, working[k] * p.cmu / (sigma * sigma));
            }
        }

        // Step-size control
        let cn = p.cs / p.damps;
        self.sigma *= (cn * (ps_sq / nf - 1.0) / 2.0).min(1.0).exp();
        self.keep_distribution_effective(flat_fitness);

        self.eval_count = evals_after;
        self.generation += 1;
        self.last_generation_best = if generation_best.value.is_nan() {
            None
        } else {
            Some(generation_best.clone())
        };

        trace!(
            generation = self.generation,
            evals = self.eval_count,
            sigma = self.sigma,
            hsig,
            best = generation_best.value,
            "completed generation"
        );
        Ok(generation_best)
    }

    /// Counteracts a distribution that has become too narrow to move the
    /// mean in floating point. Selected steps are then exactly zero and `C`
    /// would only decay until its eigendecomposition breaks down.
    ///
    /// Runs after step-size control, before the generation counter advances.
    fn keep_distribution_effective(&mut self, flat_fitness: bool) {
        let n = self.dimension();
        let cn = self.params.cs / self.params.damps;
        let widen = (0.2 + cn).exp();

        if flat_fitness {
            self.sigma *= widen;
            debug!(
                generation = self.generation,
                sigma = self.sigma,
                "flat fitness, widening step size"
            );
        }

        // One principal axis per generation, in turn
        let axis = (self.generation % n as u64) as usize;
        let reach = 0.1 * self.sigma * self.covariance.eigenvalues()[axis].sqrt();
        let basis = self.covariance.eigenbasis();
        if (0..n).all(|i| self.mean[i] + reach * basis.get(i, axis) == self.mean[i]) {
            self.sigma *= widen;
            debug!(
                generation = self.generation,
                axis,
                sigma = self.sigma,
                "principal axis step has no effect, widening step size"
            );
        }

        let diagonal = self.covariance.matrix().diagonal();
        let stuck: Vec<usize> = (0..n)
            .filter(|&i| self.mean[i] + 0.2 * self.sigma * diagonal[i].sqrt() == self.mean[i])
            .collect();
        if !stuck.is_empty() {
            let p = &self.params;
            self.covariance.inflate_diagonal(&stuck, 1.0 + p.c1 + p.cmu);
            self.sigma *= (0.05 + cn).exp();
            debug!(
                generation = self.generation,
                coordinates = ?stuck,
                sigma = self.sigma,
                "coordinate steps have no effect, inflating their variances"
            );
        }

        // (σ, C) and (σ·√s, C/s) describe the same distribution
        let largest = self
            .covariance
            .matrix()
            .diagonal()
            .iter()
            .copied()
            .fold(0.0, f64::max);
        if largest.is_finite()
            && largest > 0.0
            && (largest > MAX_COVARIANCE_SCALE || largest < 1.0 / MAX_COVARIANCE_SCALE)
        {
            let root = largest.sqrt();
            self.covariance.rescale(largest);
            self.pc.scale(1.0 / root);
            self.sigma *= root;
            debug!(
                generation = self.generation,
                divisor = largest,
                "renormalized covariance into step size"
            );
        }
    }

    /// Runs one generation with a per-candidate evaluator.
    ///
    /// Each candidate is evaluated at its bound-handled copy, which is also
    /// what best solutions record; the unreflected candidate is what enters
    /// recombination. Early-stop
    /// requests from the evaluator are passed to `on_solution` and are
    /// otherwise ignored.
    ///
    /// # Errors
    ///
    /// Propagates errors from [`CmaEs::sample_generation`].
    pub fn epoch<E, R, A>(
        &mut self,
        evaluator: &mut E,
        rng: &mut R,
        mut on_solution: A,
    ) -> Result<EvaluatedSolution>
    where
        E: ObjectiveEvaluator + ?Sized,
        R: Rng + ?Sized,
        A: FnMut(&Vector<f64>, f64),
    {
        let candidates = self.sample_generation(rng)?;
        let evaluated = candidates
            .into_iter()
            .map(|candidate| {
                let input = self.evaluation_input(&candidate);
                let value = evaluator.evaluate(&input, &mut on_solution);
                (candidate, value)
            })
            .collect();
        self.complete_generation(evaluated)
    }

    /// Runs one generation, handing all λ bound-handled candidates to
    /// `evaluate_batch` at once. The batch function returns the values in
    /// input order and may evaluate concurrently.
    ///
    /// # Errors
    ///
    /// Returns [`CmaError::InvalidGeneration`] if the batch returns a
    /// different number of values than candidates; sampling errors are
    /// propagated.
    pub fn epoch_with<R, B, A>(
        &mut self,
        rng: &mut R,
        evaluate_batch: B,
        mut on_solution: A,
    ) -> Result<EvaluatedSolution>
    where
        R: Rng + ?Sized,
        B: FnOnce(&[Vector<f64>], &mut dyn FnMut(&Vector<f64>, f64)) -> Vec<f64>,
        A: FnMut(&Vector<f64>, f64),
    {
        let candidates = self.sample_generation(rng)?;
        let inputs: Vec<Vector<f64>> = candidates
            .iter()
            .map(|c| self.evaluation_input(c))
            .collect();
        let values = evaluate_batch(inputs.as_slice(), &mut on_solution);
        if values.len() != candidates.len() {
            return Err(CmaError::InvalidGeneration(format!(
                "batch evaluator returned {} values for {} candidates",
                values.len(),
                candidates.len()
            )));
        }
        self.complete_generation(candidates.into_iter().zip(values).collect())
    }

    /// Checks that every part of the state agrees on the dimension and the
    /// distribution is usable. Run on every loaded checkpoint.
    pub(crate) fn validate(&self) -> Result<()> {
        self.params.validate()?;
        let n = self.params.dimension;
        for (name, v) in [("mean", &self.mean), ("pc", &self.pc), ("ps", &self.ps)] {
            if v.len() != n {
                return Err(CmaError::dimension_mismatch(name, n, v.len()));
            }
            if !v.is_finite() {
                return Err(CmaError::checkpoint(format!("{name} has non-finite entries")));
            }
        }
        if !(self.sigma > 0.0) || !self.sigma.is_finite() {
            return Err(CmaError::checkpoint(format!(
                "sigma must be finite and > 0, got {}",
                self.sigma
            )));
        }
        self.covariance.validate(n)?;
        if let Some(space) = &self.search_space {
            space.validate(n)?;
        }
        for best in self.best.iter().chain(self.last_generation_best.iter()) {
            if best.solution.len() != n {
                return Err(CmaError::dimension_mismatch(
                    "best solution",
                    n,
                    best.solution.len(),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
