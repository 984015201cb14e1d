use super::*;

fn epsilon_equal(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-4
}

/// Each column must be a unit vector and the columns mutually orthogonal.
fn assert_orthonormal(basis: &Matrix<f64>) {
    let n = basis.n_cols();
    for i in 0..n {
        for j in 0..n {
            let expected = if i == j { 1.0 } else { 0.0 };
            let gram = basis.column(i).dot(&basis.column(j));
            assert!((gram - expected).abs() < 1e-9, "BᵗB[{i}][{j}] = {gram}");
        }
    }
}

/// Reassembles B·diag(λ)·Bᵗ one column at a time.
fn reconstruct(eig: &EigenDecomposition) -> Matrix<f64> {
    let n = eig.eigenvalues.len();
    let b = &eig.eigenvectors;
    let mut out = Matrix::zeros(n, n);
    for j in 0..n {
        let mut unit = Vector::zeros(n);
        unit[j] = 1.0;
        let projected = b.matvec_transposed(&unit).expect("square basis");
        let scaled = projected.hadamard(&eig.eigenvalues);
        let column = b.matvec(&scaled).expect("square basis");
        for i in 0..n {
            out.set(i, j, column[i]);
        }
    }
    out
}

#[test]
fn test_basic_eigen() {
    let mat: Matrix<f64> = Matrix::from_vec(2, 2, vec![5.0, 0.0, 0.0, 5.0]).expect("2*2=4 elements");
    let eig = NalgebraEigenSolver::new().decompose(&mat).expect("converges");

    assert!(epsilon_equal(eig.eigenvalues[0], 5.0));
    assert!(epsilon_equal(eig.eigenvalues[1], 5.0));
    assert_orthonormal(&eig.eigenvectors);
    // Repeated eigenvalue: basis is the identity up to sign and column order
    for col in 0..2 {
        let v = eig.eigenvectors.column(col);
        let max = v.iter().fold(0.0_f64, |m, x| m.max(x.abs()));
        assert!(epsilon_equal(max, 1.0));
    }
}

#[test]
fn test_identity_eigen() {
    let eig = NalgebraEigenSolver::new()
        .decompose(&Matrix::eye(4))
        .expect("converges");

    for i in 0..4 {
        assert!(epsilon_equal(eig.eigenvalues[i], 1.0));
    }
    assert_orthonormal(&eig.eigenvectors);
}

#[test]
fn test_more_complex_eigen() {
    let mat: Matrix<f64> = Matrix::from_vec(3, 3, vec![2.0, -1.0, 0.0, -1.0, 2.0, -1.0, 0.0, -1.0, 2.0])
        .expect("3*3=9 elements");
    let eig = NalgebraEigenSolver::new().decompose(&mat).expect("converges");

    let sqrt2 = 2.0_f64.sqrt();
    let true_values = [2.0 - sqrt2, 2.0, 2.0 + sqrt2];
    let true_vecs = [
        Vector::from_slice(&[1.0, sqrt2, 1.0]).normalized(),
        Vector::from_slice(&[-1.0, 0.0, 1.0]).normalized(),
        Vector::from_slice(&[1.0, -sqrt2, 1.0]).normalized(),
    ];

    for i in 0..3 {
        assert!(
            epsilon_equal(eig.eigenvalues[i], true_values[i]),
            "eigenvalue {i}: {} vs {}",
            eig.eigenvalues[i],
            true_values[i]
        );
        // Same direction up to sign
        let overlap = eig.eigenvectors.column(i).dot(&true_vecs[i]).abs();
        assert!(epsilon_equal(overlap, 1.0), "eigenvector {i}: |cos| = {overlap}");
    }
}

#[test]
fn test_eigenvalues_ascending_and_reconstruct() {
    let mat: Matrix<f64> = Matrix::from_vec(3, 3, vec![4.0, 1.0, 0.5, 1.0, 3.0, 0.2, 0.5, 0.2, 9.0])
        .expect("3*3=9 elements");
    let eig = NalgebraEigenSolver::new().decompose(&mat).expect("converges");

    assert!(eig.eigenvalues[0] <= eig.eigenvalues[1]);
    assert!(eig.eigenvalues[1] <= eig.eigenvalues[2]);
    assert_orthonormal(&eig.eigenvectors);

    let back = reconstruct(&eig);
    for (a, b) in back.as_slice().iter().zip(mat.as_slice()) {
        assert!((a - b).abs() < 1e-9);
    }
}

#[test]
fn test_columns_are_eigenvectors() {
    let mat: Matrix<f64> = Matrix::from_vec(2, 2, vec![2.0, 1.0, 1.0, 2.0]).expect("2*2=4 elements");
    let eig = NalgebraEigenSolver::new().decompose(&mat).expect("converges");

    for i in 0..2 {
        let v = eig.eigenvectors.column(i);
        let mv = mat.matvec(&v).expect("2x2 times 2");
        let lv = v.mul_scalar(eig.eigenvalues[i]);
        for k in 0..2 {
            assert!((mv[k] - lv[k]).abs() < 1e-9);
        }
    }
    assert!(epsilon_equal(eig.eigenvalues[0], 1.0));
    assert!(epsilon_equal(eig.eigenvalues[1], 3.0));
}

#[test]
fn test_non_square_rejected() {
    let mat = Matrix::zeros(2, 3);
    let err = NalgebraEigenSolver::new().decompose(&mat).unwrap_err();
    assert!(matches!(err, CmaError::DimensionMismatch { .. }));
}

#[test]
fn test_with_max_iterations_floor() {
    let solver = NalgebraEigenSolver::new().with_max_iterations(0);
    assert_eq!(solver.max_iterations, 1);
}
