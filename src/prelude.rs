//! Convenience re-exports for common usage.
//!
//! # Usage
//!
//! ```
//! use aprender_cmaes::prelude::*;
//! ```

pub use crate::config::CmaEsConfig;
pub use crate::covariance::EigenRefresh;
pub use crate::engine::{population_size, CmaEs, WeightScheme};
pub use crate::error::{CmaError, Result};
pub use crate::evaluator::{EvaluatedSolution, ObjectiveEvaluator, TargetValue};
pub use crate::primitives::{Matrix, Vector};
pub use crate::search_space::{BoundHandling, Bounds, SearchSpaceConfiguration};
