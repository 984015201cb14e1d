//! Aprender CMA-ES: Covariance Matrix Adaptation Evolution Strategy in pure Rust.
//!
//! A derivative-free optimizer for continuous, possibly non-convex and
//! non-separable objectives. The engine keeps a multivariate normal search
//! distribution (mean, step size, full covariance) and adapts it from ranked
//! samples, so it only ever needs objective values.
//!
//! # Quick Start
//!
//! ```
//! use aprender_cmaes::prelude::*;
//! use rand::rngs::StdRng;
//! use rand::SeedableRng;
//!
//! let mut rng = StdRng::seed_from_u64(7);
//! let config = CmaEsConfig::new().with_sigma(1.0);
//! let mut cma = CmaEs::from_config(Vector::from_slice(&[2.0, -3.0]), &config).unwrap();
//!
//! // Shifted sphere, minimum at (1, 1)
//! let mut objective = |x: &Vector<f64>| (x[0] - 1.0).powi(2) + (x[1] - 1.0).powi(2);
//! for _ in 0..200 {
//!     cma.epoch(&mut objective, &mut rng, |_, _| {}).unwrap();
//! }
//!
//! let best = cma.best_solution().unwrap();
//! assert!((best.solution[0] - 1.0).abs() < 1e-2);
//! assert!((best.solution[1] - 1.0).abs() < 1e-2);
//! ```
//!
//! # Modules
//!
//! - [`engine`]: The [`CmaEs`] engine and its strategy parameters
//! - [`covariance`]: Covariance matrix with cached eigendecomposition
//! - [`eigen`]: Pluggable symmetric eigensolver (nalgebra by default)
//! - [`search_space`]: Scaling factors, bounds and Darwinian reflection
//! - [`evaluator`]: Objective evaluation contract with early accept
//! - [`checkpoint`]: JSON checkpoints of the full engine state
//! - [`config`]: Construction options
//! - [`primitives`]: Core Vector and Matrix types
//! - [`error`]: Error type

pub mod checkpoint;
pub mod config;
pub mod covariance;
pub mod eigen;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod prelude;
pub mod primitives;
pub mod search_space;

pub use config::CmaEsConfig;
pub use engine::CmaEs;
pub use error::{CmaError, Result};
pub use primitives::{Matrix, Vector};
