//! Objective evaluation contract.
//!
//! An objective maps a candidate to a scalar, lower being better. While
//! evaluating it may call the supplied `accept` callback to report a
//! solution it considers good enough; the engine forwards that signal to the
//! caller untouched and never acts on it.

use crate::primitives::Vector;
use serde::{Deserialize, Serialize};

/// A candidate together with its objective value. Lower is better.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluatedSolution {
    /// Candidate in external coordinates
    pub solution: Vector<f64>,
    /// Objective value. Infinite and NaN values survive checkpoints as the
    /// strings `"inf"`, `"-inf"` and `"NaN"`.
    #[serde(with = "objective_value")]
    pub value: f64,
}

mod objective_value {
    use serde::de::{Error, Unexpected};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Encoded {
        Number(f64),
        Text(String),
    }

    pub fn serialize<S>(value: &f64, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if value.is_finite() {
            value.serialize(serializer)
        } else if value.is_nan() {
            serializer.serialize_str("NaN")
        } else if *value > 0.0 {
            serializer.serialize_str("inf")
        } else {
            serializer.serialize_str("-inf")
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<f64, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Encoded::deserialize(deserializer)? {
            Encoded::Number(value) => Ok(value),
            Encoded::Text(text) => match text.as_str() {
                "inf" => Ok(f64::INFINITY),
                "-inf" => Ok(f64::NEG_INFINITY),
                "NaN" => Ok(f64::NAN),
                other => Err(D::Error::invalid_value(
                    Unexpected::Str(other),
                    &"a number, \"inf\", \"-inf\" or \"NaN\"",
                )),
            },
        }
    }
}

impl EvaluatedSolution {
    /// Pairs a candidate with its value.
    #[must_use]
    pub fn new(solution: Vector<f64>, value: f64) -> Self {
        Self { solution, value }
    }

    /// Strictly lower objective value. NaN is never better.
    #[must_use]
    pub fn is_better_than(&self, other: &Self) -> bool {
        self.value < other.value
    }
}

/// Pluggable objective function.
///
/// Any `FnMut(&Vector<f64>) -> f64` closure is an evaluator that never
/// requests an early stop.
///
/// # Examples
///
/// ```
/// use aprender_cmaes::evaluator::ObjectiveEvaluator;
/// use aprender_cmaes::primitives::Vector;
///
/// struct Sphere;
///
/// impl ObjectiveEvaluator for Sphere {
///     fn evaluate(&mut self, x: &Vector<f64>, accept: &mut dyn FnMut(&Vector<f64>, f64)) -> f64 {
///         let value = x.squared_magnitude();
///         if value < 0.01 {
///             accept(x, value);
///         }
///         value
///     }
/// }
///
/// let mut accepted = None;
/// let value = Sphere.evaluate(&Vector::from_slice(&[0.05, 0.0]), &mut |x, v| {
///     accepted = Some((x.clone(), v));
/// });
/// assert!(value < 0.01);
/// assert!(accepted.is_some());
/// ```
pub trait ObjectiveEvaluator {
    /// Returns the objective value of `candidate`, optionally reporting it
    /// through `accept` to request termination.
    fn evaluate(&mut self, candidate: &Vector<f64>, accept: &mut dyn FnMut(&Vector<f64>, f64))
        -> f64;
}

impl<F> ObjectiveEvaluator for F
where
    F: FnMut(&Vector<f64>) -> f64,
{
    fn evaluate(
        &mut self,
        candidate: &Vector<f64>,
        _accept: &mut dyn FnMut(&Vector<f64>, f64),
    ) -> f64 {
        self(candidate)
    }
}

/// Wraps an objective and reports every candidate whose value falls below
/// `target` through the accept callback.
#[derive(Debug, Clone)]
pub struct TargetValue<F> {
    objective: F,
    target: f64,
}

impl<F> TargetValue<F>
where
    F: FnMut(&Vector<f64>) -> f64,
{
    /// Accept candidates with `objective(x) < target`.
    pub fn new(objective: F, target: f64) -> Self {
        Self { objective, target }
    }

    /// The acceptance threshold.
    #[must_use]
    pub fn target(&self) -> f64 {
        self.target
    }
}

impl<F> ObjectiveEvaluator for TargetValue<F>
where
    F: FnMut(&Vector<f64>) -> f64,
{
    fn evaluate(
        &mut self,
        candidate: &Vector<f64>,
        accept: &mut dyn FnMut(&Vector<f64>, f64),
    ) -> f64 {
        let value = (self.objective)(candidate);
        if value < self.target {
            accept(candidate, value);
        }
        value
    }
}
