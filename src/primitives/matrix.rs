//! Matrix type for 2D numeric data.

use super::Vector;
use serde::{Deserialize, Serialize};

/// A 2D matrix of floating-point values (row-major storage).
///
/// # Examples
///
/// ```
/// use aprender_cmaes::primitives::Matrix;
///
/// let m = Matrix::from_vec(2, 3, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).expect("data length matches rows * cols");
/// assert_eq!(m.shape(), (2, 3));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Matrix<T> {
    data: Vec<T>,
    rows: usize,
    cols: usize,
}

impl<T: Copy> Matrix<T> {
    /// Creates a new matrix from a vector of data.
    ///
    /// # Errors
    ///
    /// Returns an error if data length doesn't match rows * cols.
    pub fn from_vec(rows: usize, cols: usize, data: Vec<T>) -> Result<Self, &'static str> {
        if data.len() != rows * cols {
            return Err("Data length must equal rows * cols");
        }
        Ok(Self { data, rows, cols })
    }

    /// Returns the shape as (rows, cols).
    #[must_use]
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Returns the number of rows.
    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.rows
    }

    /// Returns the number of columns.
    #[must_use]
    pub fn n_cols(&self) -> usize {
        self.cols
    }

    /// Returns true for an n×n matrix.
    #[must_use]
    pub fn is_square(&self) -> bool {
        self.rows == self.cols
    }

    /// Gets element at (row, col).
    ///
    /// # Panics
    ///
    /// Panics if indices are out of bounds.
    #[must_use]
    pub fn get(&self, row: usize, col: usize) -> T {
        self.data[row * self.cols + col]
    }

    /// Sets element at (row, col).
    ///
    /// # Panics
    ///
    /// Panics if indices are out of bounds.
    pub fn set(&mut self, row: usize, col: usize, value: T) {
        self.data[row * self.cols + col] = value;
    }

    /// Returns a row as a Vector.
    #[must_use]
    pub fn row(&self, row_idx: usize) -> Vector<T> {
        let start = row_idx * self.cols;
        let end = start + self.cols;
        Vector::from_slice(&self.data[start..end])
    }

    /// Returns a column as a Vector.
    #[must_use]
    pub fn column(&self, col_idx: usize) -> Vector<T> {
        let data: Vec<T> = (0..self.rows)
            .map(|row| self.data[row * self.cols + col_idx])
            .collect();
        Vector::from_vec(data)
    }

    /// Returns the underlying data as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }
}

impl Matrix<f64> {
    /// Creates a matrix of zeros.
    #[must_use]
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            data: vec![0.0; rows * cols],
            rows,
            cols,
        }
    }

    /// Creates an identity matrix.
    #[must_use]
    pub fn eye(n: usize) -> Self {
        let mut data = vec![0.0; n * n];
        for i in 0..n {
            data[i * n + i] = 1.0;
        }
        Self {
            data,
            rows: n,
            cols: n,
        }
    }

    /// Builds a matrix from equally sized rows.
    ///
    /// # Errors
    ///
    /// Returns an error if the rows have different lengths.
    pub fn from_rows(rows: &[Vector<f64>]) -> Result<Self, &'static str> {
        let cols = rows.first().map_or(0, Vector::len);
        if rows.iter().any(|r| r.len() != cols) {
            return Err("All rows must have the same length");
        }
        let data = rows.iter().flat_map(|r| r.iter().copied()).collect();
        Ok(Self {
            data,
            rows: rows.len(),
            cols,
        })
    }

    /// Returns the main diagonal.
    #[must_use]
    pub fn diagonal(&self) -> Vector<f64> {
        (0..self.rows.min(self.cols))
            .map(|i| self.get(i, i))
            .collect()
    }

    /// Returns `Mᵗ`.
    #[must_use]
    pub fn transpose(&self) -> Self {
        let data = (0..self.cols)
            .flat_map(|j| (0..self.rows).map(move |i| (i, j)))
            .map(|(i, j)| self.get(i, j))
            .collect();
        Self {
            data,
            rows: self.cols,
            cols: self.rows,
        }
    }

    /// Matrix-vector product `M·v` for callers that already guarantee the
    /// dimensions.
    ///
    /// # Panics
    ///
    /// Panics in debug builds unless `v.len()` equals the column count.
    #[must_use]
    pub fn apply(&self, v: &Vector<f64>) -> Vector<f64> {
        debug_assert_eq!(self.cols, v.len(), "matrix-vector product: dimension mismatch");
        if self.cols == 0 {
            return Vector::zeros(self.rows);
        }
        self.data
            .chunks_exact(self.cols)
            .map(|row| row.iter().zip(v.iter()).map(|(a, b)| a * b).sum())
            .collect()
    }

    /// Matrix-vector product `M·v`.
    ///
    /// # Errors
    ///
    /// Returns an error if dimensions don't match.
    pub fn matvec(&self, vec: &Vector<f64>) -> Result<Vector<f64>, &'static str> {
        if self.cols != vec.len() {
            return Err("Matrix columns must match vector length");
        }
        Ok(self.apply(vec))
    }

    /// Transposed matrix-vector product `Mᵗ·v`, without materializing `Mᵗ`.
    ///
    /// # Errors
    ///
    /// Returns an error if dimensions don't match.
    pub fn matvec_transposed(&self, vec: &Vector<f64>) -> Result<Vector<f64>, &'static str> {
        if self.rows != vec.len() {
            return Err("Matrix rows must match vector length");
        }

        let mut out = vec![0.0; self.cols];
        for i in 0..self.rows {
            let vi = vec[i];
            let start = i * self.cols;
            for (o, a) in out.iter_mut().zip(&self.data[start..start + self.cols]) {
                *o += a * vi;
            }
        }
        Ok(Vector::from_vec(out))
    }

    /// Returns `scalar · M`.
    #[must_use]
    pub fn mul_scalar(&self, scalar: f64) -> Self {
        let mut scaled = self.clone();
        scaled.scale(scalar);
        scaled
    }

    /// Multiplies each element by a scalar in place.
    pub fn scale(&mut self, scalar: f64) {
        for x in &mut self.data {
            *x *= scalar;
        }
    }

    /// Accumulates `multiplier · v·vᵗ` into this matrix.
    ///
    /// # Panics
    ///
    /// Panics in debug builds unless the matrix is `v.len()`×`v.len()`.
    pub fn add_outer_product(&mut self, v: &Vector<f64>, multiplier: f64) {
        debug_assert!(
            self.rows == v.len() && self.cols == v.len(),
            "outer product: dimension mismatch"
        );
        let n = self.cols;
        for i in 0..self.rows {
            let scaled = multiplier * v[i];
            let row = &mut self.data[i * n..(i + 1) * n];
            for (cell, vj) in row.iter_mut().zip(v.iter()) {
                *cell += scaled * vj;
            }
        }
    }

    /// Returns true if every element is finite.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.data.iter().all(|x| x.is_finite())
    }
}

#[cfg(test)]
#[path = "matrix_tests.rs"]
mod tests;
