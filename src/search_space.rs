//! External ↔ internal coordinate mapping and bound handling.
//!
//! The engine adapts its distribution in an internal space where every
//! coordinate is multiplied by a positive scaling factor, so variables of
//! very different magnitudes start out comparably spread. Candidates are
//! handed to the caller in external space. Bounds are enforced only on the
//! copy sent to the objective; the distribution keeps the unreflected point.

use crate::error::{CmaError, Result};
use crate::primitives::Vector;
use serde::{Deserialize, Serialize};

/// Closed interval `[lower, upper]` for one coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    /// Lower limit (inclusive)
    pub lower: f64,
    /// Upper limit (inclusive)
    pub upper: f64,
}

impl Bounds {
    /// Creates an interval.
    ///
    /// # Errors
    ///
    /// Returns an error unless both limits are finite and `lower <= upper`.
    pub fn new(lower: f64, upper: f64) -> Result<Self> {
        let bounds = Self { lower, upper };
        bounds.check()?;
        Ok(bounds)
    }

    fn check(&self) -> Result<()> {
        if !self.lower.is_finite() || !self.upper.is_finite() || self.lower > self.upper {
            return Err(CmaError::invalid_configuration(
                "bounds",
                format!("[{}, {}]", self.lower, self.upper),
                "finite lower <= upper",
            ));
        }
        Ok(())
    }

    /// Interval width.
    #[must_use]
    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }

    /// True if `x` lies inside the interval.
    #[must_use]
    pub fn contains(&self, x: f64) -> bool {
        x >= self.lower && x <= self.upper
    }

    /// Mirrors `x` across the violated limit. Values on or inside the limits
    /// are returned unchanged.
    #[must_use]
    pub fn reflect(&self, x: f64) -> f64 {
        if x < self.lower {
            2.0 * self.lower - x
        } else if x > self.upper {
            2.0 * self.upper - x
        } else {
            x
        }
    }
}

/// How out-of-bounds candidates are treated before evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundHandling {
    /// Reflect the offending coordinate back across the violated boundary.
    /// Any implicit penalty comes from the objective value of the reflected
    /// point.
    #[default]
    DarwinianReflection,
}

/// Per-dimension bounds, scaling factors and the bound-handling method.
///
/// # Examples
///
/// ```
/// use aprender_cmaes::search_space::{BoundHandling, Bounds, SearchSpaceConfiguration};
/// use aprender_cmaes::primitives::Vector;
///
/// let space = SearchSpaceConfiguration::new(
///     vec![Some(Bounds::new(1.0, 50.0).unwrap()), None],
///     vec![1.0, 10.0],
///     BoundHandling::DarwinianReflection,
/// )
/// .unwrap();
///
/// let x = Vector::from_slice(&[0.5, 3.0]);
/// assert_eq!(space.encode(&x).as_slice(), &[0.5, 30.0]);
/// assert_eq!(space.apply_bounds(&x).as_slice(), &[1.5, 3.0]);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchSpaceConfiguration {
    bounds: Vec<Option<Bounds>>,
    scaling_factors: Vector<f64>,
    method: BoundHandling,
}

impl SearchSpaceConfiguration {
    /// Creates a configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the bounds and scaling factors differ in length,
    /// any interval is malformed, or any scaling factor is not a positive
    /// finite number.
    pub fn new(
        bounds: Vec<Option<Bounds>>,
        scaling_factors: Vec<f64>,
        method: BoundHandling,
    ) -> Result<Self> {
        let config = Self {
            bounds,
            scaling_factors: Vector::from_vec(scaling_factors),
            method,
        };
        config.validate(config.bounds.len())?;
        Ok(config)
    }

    /// Unit scaling with no bounds.
    #[must_use]
    pub fn unbounded(dim: usize) -> Self {
        Self {
            bounds: vec![None; dim],
            scaling_factors: Vector::ones(dim),
            method: BoundHandling::default(),
        }
    }

    /// Unit scaling with the same interval on every coordinate.
    ///
    /// # Errors
    ///
    /// Returns an error if the interval is malformed.
    pub fn uniform_bounds(dim: usize, lower: f64, upper: f64) -> Result<Self> {
        let bounds = Bounds::new(lower, upper)?;
        Ok(Self {
            bounds: vec![Some(bounds); dim],
            scaling_factors: Vector::ones(dim),
            method: BoundHandling::default(),
        })
    }

    /// Replace the scaling factors.
    ///
    /// # Errors
    ///
    /// Returns an error on length mismatch or a non-positive factor.
    pub fn with_scaling_factors(mut self, scaling_factors: Vec<f64>) -> Result<Self> {
        self.scaling_factors = Vector::from_vec(scaling_factors);
        self.validate(self.bounds.len())?;
        Ok(self)
    }

    /// Number of coordinates.
    #[must_use]
    pub fn dimension(&self) -> usize {
        self.bounds.len()
    }

    /// Per-coordinate bounds; `None` means unbounded.
    #[must_use]
    pub fn bounds(&self) -> &[Option<Bounds>] {
        &self.bounds
    }

    /// Per-coordinate scaling factors.
    #[must_use]
    pub fn scaling_factors(&self) -> &Vector<f64> {
        &self.scaling_factors
    }

    /// Bound-handling method.
    #[must_use]
    pub fn method(&self) -> BoundHandling {
        self.method
    }

    /// External → internal: `v ⊙ scaling_factors`.
    #[must_use]
    pub fn encode(&self, external: &Vector<f64>) -> Vector<f64> {
        external.hadamard(&self.scaling_factors)
    }

    /// Internal → external: `v ⊘ scaling_factors`.
    #[must_use]
    pub fn decode(&self, internal: &Vector<f64>) -> Vector<f64> {
        internal.div_elementwise(&self.scaling_factors)
    }

    /// Returns the copy of an external-space candidate that is sent to the
    /// objective. Unbounded coordinates pass through.
    #[must_use]
    pub fn apply_bounds(&self, external: &Vector<f64>) -> Vector<f64> {
        match self.method {
            BoundHandling::DarwinianReflection => external
                .iter()
                .zip(&self.bounds)
                .map(|(&x, b)| b.map_or(x, |b| b.reflect(x)))
                .collect(),
        }
    }

    /// True if every bounded coordinate of `external` is inside its interval.
    #[must_use]
    pub fn is_feasible(&self, external: &Vector<f64>) -> bool {
        external
            .iter()
            .zip(&self.bounds)
            .all(|(&x, b)| b.map_or(true, |b| b.contains(x)))
    }

    /// Checks that this configuration fits a problem of dimension `n`.
    ///
    /// # Errors
    ///
    /// Returns an error on any length mismatch, malformed interval or
    /// non-positive scaling factor.
    pub fn validate(&self, n: usize) -> Result<()> {
        if self.bounds.len() != n {
            return Err(CmaError::dimension_mismatch("bounds", n, self.bounds.len()));
        }
        if self.scaling_factors.len() != n {
            return Err(CmaError::dimension_mismatch(
                "scaling_factors",
                n,
                self.scaling_factors.len(),
            ));
        }
        for b in self.bounds.iter().flatten() {
            b.check()?;
        }
        if let Some((i, s)) = self
            .scaling_factors
            .iter()
            .enumerate()
            .find(|&(_, &s)| !(s > 0.0) || !s.is_finite())
        {
            return Err(CmaError::invalid_configuration(
                &format!("scaling_factors[{i}]"),
                s,
                "finite and > 0",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "search_space_tests.rs"]
mod tests;
