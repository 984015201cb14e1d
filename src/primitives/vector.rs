//! Vector type for 1D numeric data.

use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Index, IndexMut, Mul, Sub};

/// A 1D vector of floating-point values with value semantics.
///
/// # Examples
///
/// ```
/// use aprender_cmaes::primitives::Vector;
///
/// let v = Vector::from_slice(&[3.0, 4.0]);
/// assert_eq!(v.len(), 2);
/// assert!((v.norm() - 5.0).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Vector<T> {
    data: Vec<T>,
}

impl<T: Copy> Vector<T> {
    /// Creates a vector that takes ownership of `data`.
    #[must_use]
    pub fn from_vec(data: Vec<T>) -> Self {
        Self { data }
    }

    /// Creates a vector by copying a slice.
    #[must_use]
    pub fn from_slice(data: &[T]) -> Self {
        Self {
            data: data.to_vec(),
        }
    }

    /// Returns the number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the vector has no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns the underlying data as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// Returns the underlying data as a mutable slice.
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// Iterates over the elements.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.data.iter()
    }

    /// Consumes the vector, returning the backing storage.
    #[must_use]
    pub fn into_vec(self) -> Vec<T> {
        self.data
    }
}

impl Vector<f64> {
    /// Creates a vector of zeros.
    #[must_use]
    pub fn zeros(len: usize) -> Self {
        Self {
            data: vec![0.0; len],
        }
    }

    /// Creates a vector of ones.
    #[must_use]
    pub fn ones(len: usize) -> Self {
        Self {
            data: vec![1.0; len],
        }
    }

    /// Sum of all elements.
    #[must_use]
    pub fn sum(&self) -> f64 {
        self.data.iter().sum()
    }

    /// Element-wise square.
    #[must_use]
    pub fn squared(&self) -> Self {
        self.data.iter().map(|x| x * x).collect()
    }

    /// Sum of squared elements, ‖v‖².
    #[must_use]
    pub fn squared_magnitude(&self) -> f64 {
        self.data.iter().map(|x| x * x).sum()
    }

    /// Euclidean norm.
    #[must_use]
    pub fn norm(&self) -> f64 {
        self.squared_magnitude().sqrt()
    }

    /// Returns a unit vector pointing in the same direction.
    ///
    /// The zero vector has no direction; its normalization is all NaN.
    #[must_use]
    pub fn normalized(&self) -> Self {
        self.mul_scalar(1.0 / self.norm())
    }

    /// Dot product.
    ///
    /// # Panics
    ///
    /// Panics in debug builds if the lengths differ.
    #[must_use]
    pub fn dot(&self, other: &Self) -> f64 {
        debug_assert_eq!(self.len(), other.len(), "dot: length mismatch");
        self.data
            .iter()
            .zip(other.data.iter())
            .map(|(a, b)| a * b)
            .sum()
    }

    /// Returns a copy with every element multiplied by `scalar`.
    #[must_use]
    pub fn mul_scalar(&self, scalar: f64) -> Self {
        self.data.iter().map(|x| x * scalar).collect()
    }

    /// Multiplies every element by `scalar` in place.
    pub fn scale(&mut self, scalar: f64) {
        for x in &mut self.data {
            *x *= scalar;
        }
    }

    /// Element-wise product.
    #[must_use]
    pub fn hadamard(&self, other: &Self) -> Self {
        debug_assert_eq!(self.len(), other.len(), "hadamard: length mismatch");
        self.data
            .iter()
            .zip(other.data.iter())
            .map(|(a, b)| a * b)
            .collect()
    }

    /// Element-wise quotient.
    #[must_use]
    pub fn div_elementwise(&self, other: &Self) -> Self {
        debug_assert_eq!(self.len(), other.len(), "div: length mismatch");
        self.data
            .iter()
            .zip(other.data.iter())
            .map(|(a, b)| a / b)
            .collect()
    }

    /// Adds `multiplier * other` to this vector in place (axpy).
    pub fn add_scaled(&mut self, other: &Self, multiplier: f64) {
        debug_assert_eq!(self.len(), other.len(), "axpy: length mismatch");
        for (a, b) in self.data.iter_mut().zip(other.data.iter()) {
            *a += multiplier * b;
        }
    }

    /// Returns true if every element is finite.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.data.iter().all(|x| x.is_finite())
    }
}

impl<T> Index<usize> for Vector<T> {
    type Output = T;

    fn index(&self, idx: usize) -> &T {
        &self.data[idx]
    }
}

impl<T> IndexMut<usize> for Vector<T> {
    fn index_mut(&mut self, idx: usize) -> &mut T {
        &mut self.data[idx]
    }
}

impl<T> FromIterator<T> for Vector<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self {
            data: iter.into_iter().collect(),
        }
    }
}

impl<T> From<Vec<T>> for Vector<T> {
    fn from(data: Vec<T>) -> Self {
        Self { data }
    }
}

impl<'a, T> IntoIterator for &'a Vector<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.data.iter()
    }
}

impl Add for &Vector<f64> {
    type Output = Vector<f64>;

    fn add(self, other: Self) -> Vector<f64> {
        debug_assert_eq!(self.len(), other.len(), "add: length mismatch");
        self.data
            .iter()
            .zip(other.data.iter())
            .map(|(a, b)| a + b)
            .collect()
    }
}

impl Sub for &Vector<f64> {
    type Output = Vector<f64>;

    fn sub(self, other: Self) -> Vector<f64> {
        debug_assert_eq!(self.len(), other.len(), "sub: length mismatch");
        self.data
            .iter()
            .zip(other.data.iter())
            .map(|(a, b)| a - b)
            .collect()
    }
}

impl Mul<f64> for &Vector<f64> {
    type Output = Vector<f64>;

    fn mul(self, scalar: f64) -> Vector<f64> {
        self.mul_scalar(scalar)
    }
}

impl AddAssign<&Vector<f64>> for Vector<f64> {
    fn add_assign(&mut self, other: &Vector<f64>) {
        self.add_scaled(other, 1.0);
    }
}

#[cfg(test)]
#[path = "vector_tests.rs"]
mod tests;
