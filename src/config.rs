//! Construction options for [`CmaEs`](crate::engine::CmaEs).
//!
//! A config is plain data: it can be built with the `with_*` methods or read
//! from JSON, where every field is optional.
//!
//! ```
//! use aprender_cmaes::config::CmaEsConfig;
//! use aprender_cmaes::covariance::EigenRefresh;
//!
//! let config = CmaEsConfig::from_json(r#"{ "sigma": 0.5, "eigen_refresh": "lazy" }"#).unwrap();
//! assert_eq!(config.sigma, 0.5);
//! assert_eq!(config.eigen_refresh, EigenRefresh::Lazy);
//! assert_eq!(config.population_size, None);
//! ```

use crate::covariance::EigenRefresh;
use crate::engine::WeightScheme;
use crate::error::Result;
use crate::search_space::SearchSpaceConfiguration;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Initial step size used when none is given.
pub const DEFAULT_SIGMA: f64 = 0.3;

/// Engine construction options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CmaEsConfig {
    /// Population size λ; `None` picks `4 + ⌊3·ln n⌋`
    pub population_size: Option<usize>,
    /// Initial step size σ₀ in internal coordinates
    pub sigma: f64,
    /// Recombination weight scheme
    pub weights: WeightScheme,
    /// When the eigensystem is recomputed
    pub eigen_refresh: EigenRefresh,
    /// Bounds and scaling; `None` optimizes unscaled and unbounded
    pub search_space: Option<SearchSpaceConfiguration>,
}

impl Default for CmaEsConfig {
    fn default() -> Self {
        Self {
            population_size: None,
            sigma: DEFAULT_SIGMA,
            weights: WeightScheme::default(),
            eigen_refresh: EigenRefresh::default(),
            search_space: None,
        }
    }
}

impl CmaEsConfig {
    /// Creates a config with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the population size λ.
    #[must_use]
    pub fn with_population_size(mut self, lambda: usize) -> Self {
        self.population_size = Some(lambda);
        self
    }

    /// Set the initial step size.
    #[must_use]
    pub fn with_sigma(mut self, sigma: f64) -> Self {
        self.sigma = sigma;
        self
    }

    /// Set the recombination weight scheme.
    #[must_use]
    pub fn with_weights(mut self, weights: WeightScheme) -> Self {
        self.weights = weights;
        self
    }

    /// Set the eigendecomposition refresh policy.
    #[must_use]
    pub fn with_eigen_refresh(mut self, policy: EigenRefresh) -> Self {
        self.eigen_refresh = policy;
        self
    }

    /// Set bounds and scaling.
    #[must_use]
    pub fn with_search_space(mut self, space: SearchSpaceConfiguration) -> Self {
        self.search_space = Some(space);
        self
    }

    /// Parses a config from JSON. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`CmaError::Serialization`](crate::error::CmaError::Serialization)
    /// on malformed JSON or unknown enum values.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads a JSON config file.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be read, otherwise as
    /// [`CmaEsConfig::from_json`].
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}
