//! Core compute primitives (Vector, Matrix).
//!
//! Dense `f64` arithmetic used by the covariance adaptation: sums, dot
//! products, scalar multiplication, outer-product accumulation and
//! (optionally transposed) matrix-vector products.

mod matrix;
mod vector;

pub use matrix::Matrix;
pub use vector::Vector;
