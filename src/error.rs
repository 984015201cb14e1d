//! Error types for CMA-ES operations.
//!
//! Configuration problems are reported at construction, numerical breakdown
//! surfaces as a recoverable error so callers can restart from a checkpoint,
//! and checkpoint I/O failures never touch an existing engine.

use thiserror::Error;

/// Main error type for the optimizer.
///
/// # Examples
///
/// ```
/// use aprender_cmaes::error::CmaError;
///
/// let err = CmaError::dimension_mismatch("scaling_factors", 3, 2);
/// assert!(err.to_string().contains("dimension mismatch"));
/// ```
#[derive(Error, Debug)]
pub enum CmaError {
    /// Vector or matrix lengths don't agree with the problem dimension.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected dimensions description
        expected: String,
        /// Actual dimensions found
        actual: String,
    },

    /// Invalid construction parameter.
    #[error("invalid configuration: {param} = {value}, expected {constraint}")]
    InvalidConfiguration {
        /// Parameter name
        param: String,
        /// Provided value
        value: String,
        /// Constraint description
        constraint: String,
    },

    /// The evaluated population handed back does not match the sampled one.
    #[error("invalid generation: {0}")]
    InvalidGeneration(String),

    /// Covariance matrix lost positive-definiteness or became non-finite.
    #[error("numerical breakdown: {message}")]
    NumericalBreakdown {
        /// What went wrong
        message: String,
    },

    /// Symmetric eigensolver did not converge.
    #[error("eigendecomposition failed to converge within {max_iterations} iterations")]
    EigenSolverFailed {
        /// Iteration limit that was exhausted
        max_iterations: usize,
    },

    /// I/O error (file not found, permission denied, etc.).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Checkpoint encoding or decoding failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Checkpoint decoded but its contents are inconsistent.
    #[error("invalid checkpoint: {message}")]
    CheckpointFormat {
        /// Error description
        message: String,
    },

    /// Checkpoint was written by a newer format revision.
    #[error("unsupported checkpoint version: found {found}, max supported {supported}")]
    UnsupportedVersion {
        /// Version found
        found: u32,
        /// Maximum supported version
        supported: u32,
    },
}

impl From<serde_json::Error> for CmaError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl CmaError {
    /// Create a dimension mismatch error with descriptive context
    #[must_use]
    pub fn dimension_mismatch(context: &str, expected: usize, actual: usize) -> Self {
        Self::DimensionMismatch {
            expected: format!("{context}={expected}"),
            actual: format!("{actual}"),
        }
    }

    /// Create an invalid configuration error
    #[must_use]
    pub fn invalid_configuration(
        param: &str,
        value: impl std::fmt::Display,
        constraint: &str,
    ) -> Self {
        Self::InvalidConfiguration {
            param: param.to_string(),
            value: value.to_string(),
            constraint: constraint.to_string(),
        }
    }

    /// Create a checkpoint format error
    #[must_use]
    pub fn checkpoint(message: impl Into<String>) -> Self {
        Self::CheckpointFormat {
            message: message.into(),
        }
    }

    /// True for errors that mean the search distribution itself is invalid.
    #[must_use]
    pub fn is_numerical(&self) -> bool {
        matches!(
            self,
            Self::NumericalBreakdown { .. } | Self::EigenSolverFailed { .. }
        )
    }
}

/// Convenience type alias for Results.
pub type Result<T> = std::result::Result<T, CmaError>;
