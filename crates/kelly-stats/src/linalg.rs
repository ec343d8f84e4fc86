//! Dense linear-algebra helpers
//!
//! Small, allocation-light routines on `ndarray` used across the toolkit:
//! Cholesky factorization (for stable log-determinants and multivariate
//! normal sampling), Gaussian elimination with partial pivoting (for the
//! bordered Kelly system), and a Jacobi eigenvalue sweep used to check
//! positive semi-definiteness. No LAPACK binding; the matrices here are
//! small (one row per asset).

use crate::statistics::StatsError;
use ndarray::{Array1, Array2};

/// Compute the lower-triangular Cholesky factor `L` with `A = L·Lᵀ`.
///
/// Fails with [`StatsError::NotPositiveSemiDefinite`] when a pivot is not
/// strictly positive, which also covers semi-definite matrices whose rank
/// deficiency would make the factor unusable for solves and sampling.
pub fn cholesky(matrix: &Array2<f64>) -> Result<Array2<f64>, StatsError> {
    let n = matrix.nrows();
    if n != matrix.ncols() {
        return Err(StatsError::NotSymmetric);
    }

    let mut l = Array2::<f64>::zeros((n, n));
    for j in 0..n {
        let mut diag = matrix[[j, j]];
        for k in 0..j {
            diag -= l[[j, k]] * l[[j, k]];
        }
        if diag <= 0.0 || !diag.is_finite() {
            return Err(StatsError::NotPositiveSemiDefinite { eigenvalue: diag });
        }
        l[[j, j]] = diag.sqrt();

        for i in (j + 1)..n {
            let mut sum = matrix[[i, j]];
            for k in 0..j {
                sum -= l[[i, k]] * l[[j, k]];
            }
            l[[i, j]] = sum / l[[j, j]];
        }
    }

    Ok(l)
}

/// Solve `A·x = b` for symmetric positive-definite `A` given its Cholesky
/// factor `L`: forward substitution with `L`, back substitution with `Lᵀ`.
pub fn cholesky_solve(l: &Array2<f64>, b: &Array1<f64>) -> Array1<f64> {
    let n = l.nrows();

    // L·y = b
    let mut y = Array1::<f64>::zeros(n);
    for i in 0..n {
        let mut sum = b[i];
        for k in 0..i {
            sum -= l[[i, k]] * y[k];
        }
        y[i] = sum / l[[i, i]];
    }

    // Lᵀ·x = y
    let mut x = Array1::<f64>::zeros(n);
    for i in (0..n).rev() {
        let mut sum = y[i];
        for k in (i + 1)..n {
            sum -= l[[k, i]] * x[k];
        }
        x[i] = sum / l[[i, i]];
    }

    x
}

/// Log-determinant of a positive-definite matrix from its Cholesky factor:
/// `log det A = 2·Σ log L[i,i]`.
pub fn cholesky_log_determinant(l: &Array2<f64>) -> f64 {
    (0..l.nrows()).map(|i| l[[i, i]].ln()).sum::<f64>() * 2.0
}

/// Solve the general square system `A·x = b` by Gaussian elimination with
/// partial pivoting.
///
/// Fails with [`StatsError::SingularMatrix`] when no usable pivot exists,
/// which is how a zero-variance asset in the bordered Kelly system shows up.
pub fn lu_solve(a: &Array2<f64>, b: &Array1<f64>) -> Result<Array1<f64>, StatsError> {
    let n = a.nrows();
    if n != a.ncols() || n != b.len() {
        return Err(StatsError::DimensionMismatch {
            expected: n,
            actual: b.len(),
        });
    }

    let mut work = a.clone();
    let mut rhs = b.clone();

    for col in 0..n {
        // Partial pivoting: bring the largest remaining entry onto the diagonal.
        let mut pivot_row = col;
        let mut pivot_val = work[[col, col]].abs();
        for row in (col + 1)..n {
            let candidate = work[[row, col]].abs();
            if candidate > pivot_val {
                pivot_val = candidate;
                pivot_row = row;
            }
        }
        if pivot_val < 1e-12 || !pivot_val.is_finite() {
            return Err(StatsError::SingularMatrix);
        }
        if pivot_row != col {
            for k in 0..n {
                work.swap([col, k], [pivot_row, k]);
            }
            rhs.swap(col, pivot_row);
        }

        for row in (col + 1)..n {
            let factor = work[[row, col]] / work[[col, col]];
            if factor == 0.0 {
                continue;
            }
            for k in col..n {
                work[[row, k]] -= factor * work[[col, k]];
            }
            rhs[row] -= factor * rhs[col];
        }
    }

    let mut x = Array1::<f64>::zeros(n);
    for i in (0..n).rev() {
        let mut sum = rhs[i];
        for k in (i + 1)..n {
            sum -= work[[i, k]] * x[k];
        }
        x[i] = sum / work[[i, i]];
    }

    Ok(x)
}

/// Eigenvalues of a symmetric matrix via cyclic Jacobi rotations.
///
/// Returns the eigenvalues in descending order. Only the values are
/// computed; the rotations are not accumulated into eigenvectors since the
/// callers only need definiteness checks.
pub fn jacobi_eigenvalues(
    matrix: &Array2<f64>,
    max_iterations: usize,
    tolerance: f64,
) -> Result<Array1<f64>, StatsError> {
    let n = matrix.nrows();
    if n != matrix.ncols() {
        return Err(StatsError::NotSymmetric);
    }

    if n < 2 {
        return Ok(matrix.diag().to_owned());
    }

    let mut a = matrix.clone();

    for _iter in 0..max_iterations {
        let (p, q, max_off_diag) = largest_off_diagonal(&a);
        if max_off_diag.abs() < tolerance {
            break;
        }
        let (cos_theta, sin_theta) = jacobi_rotation(a[[p, p]], a[[q, q]], a[[p, q]]);
        apply_rotation(&mut a, p, q, cos_theta, sin_theta);
    }

    let mut eigenvalues: Vec<f64> = (0..n).map(|i| a[[i, i]]).collect();
    eigenvalues.sort_by(|x, y| y.partial_cmp(x).unwrap_or(std::cmp::Ordering::Equal));

    Ok(Array1::from_vec(eigenvalues))
}

/// Check that all eigenvalues of a symmetric matrix are non-negative
/// (within a small tolerance for rounding).
pub fn is_positive_semi_definite(matrix: &Array2<f64>) -> bool {
    match jacobi_eigenvalues(matrix, 100, 1e-12) {
        Ok(eigenvalues) => eigenvalues.iter().all(|v| *v >= -1e-10),
        Err(_) => false,
    }
}

fn largest_off_diagonal(matrix: &Array2<f64>) -> (usize, usize, f64) {
    let n = matrix.nrows();
    let mut max_val = 0.0;
    let mut p = 0;
    let mut q = if n > 1 { 1 } else { 0 };

    for i in 0..n {
        for j in (i + 1)..n {
            if matrix[[i, j]].abs() > max_val {
                max_val = matrix[[i, j]].abs();
                p = i;
                q = j;
            }
        }
    }

    (p, q, matrix[[p, q]])
}

fn jacobi_rotation(app: f64, aqq: f64, apq: f64) -> (f64, f64) {
    if apq.abs() < 1e-15 {
        return (1.0, 0.0);
    }

    let tau = (aqq - app) / (2.0 * apq);
    let t = if tau >= 0.0 {
        1.0 / (tau + (1.0 + tau * tau).sqrt())
    } else {
        -1.0 / (-tau + (1.0 + tau * tau).sqrt())
    };
    let cos_theta = 1.0 / (1.0 + t * t).sqrt();
    let sin_theta = t * cos_theta;

    (cos_theta, sin_theta)
}

fn apply_rotation(a: &mut Array2<f64>, p: usize, q: usize, c: f64, s: f64) {
    let n = a.nrows();

    let app = a[[p, p]];
    let aqq = a[[q, q]];
    let apq = a[[p, q]];

    a[[p, p]] = c * c * app - 2.0 * c * s * apq + s * s * aqq;
    a[[q, q]] = s * s * app + 2.0 * c * s * apq + c * c * aqq;
    a[[p, q]] = 0.0;
    a[[q, p]] = 0.0;

    for i in 0..n {
        if i != p && i != q {
            let aip = a[[i, p]];
            let aiq = a[[i, q]];
            a[[i, p]] = c * aip - s * aiq;
            a[[p, i]] = a[[i, p]];
            a[[i, q]] = s * aip + c * aiq;
            a[[q, i]] = a[[i, q]];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn test_cholesky_identity() {
        let l = cholesky(&Array2::eye(3)).unwrap();
        for i in 0..3 {
            for j in 0..3 {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert_relative_eq!(l[[i, j]], expected, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_cholesky_reconstructs_input() {
        let a = array![[4.0, 2.0, 0.6], [2.0, 5.0, 1.5], [0.6, 1.5, 9.0]];
        let l = cholesky(&a).unwrap();
        let reconstructed = l.dot(&l.t());
        for i in 0..3 {
            for j in 0..3 {
                assert_relative_eq!(reconstructed[[i, j]], a[[i, j]], epsilon = 1e-10);
            }
        }
    }

    #[test]
    fn test_cholesky_rejects_indefinite() {
        let a = array![[1.0, 2.0], [2.0, 1.0]];
        assert!(matches!(
            cholesky(&a),
            Err(StatsError::NotPositiveSemiDefinite { .. })
        ));
    }

    #[test]
    fn test_cholesky_solve() {
        let a = array![[4.0, 2.0], [2.0, 3.0]];
        let l = cholesky(&a).unwrap();
        let b = array![10.0, 8.0];
        let x = cholesky_solve(&l, &b);
        let residual = a.dot(&x) - &b;
        for v in residual.iter() {
            assert_relative_eq!(*v, 0.0, epsilon = 1e-10);
        }
    }

    #[test]
    fn test_log_determinant() {
        let a = array![[4.0, 0.0], [0.0, 9.0]];
        let l = cholesky(&a).unwrap();
        assert_relative_eq!(cholesky_log_determinant(&l), 36.0f64.ln(), epsilon = 1e-12);
    }

    #[test]
    fn test_lu_solve_simple() {
        let a = array![[2.0, 1.0], [1.0, 3.0]];
        let b = array![5.0, 10.0];
        let x = lu_solve(&a, &b).unwrap();
        assert_relative_eq!(x[0], 1.0, epsilon = 1e-12);
        assert_relative_eq!(x[1], 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_lu_solve_requires_pivoting() {
        // Zero on the leading diagonal forces a row swap.
        let a = array![[0.0, 1.0], [1.0, 0.0]];
        let b = array![2.0, 3.0];
        let x = lu_solve(&a, &b).unwrap();
        assert_relative_eq!(x[0], 3.0, epsilon = 1e-12);
        assert_relative_eq!(x[1], 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_lu_solve_singular() {
        let a = array![[1.0, 2.0], [2.0, 4.0]];
        let b = array![1.0, 2.0];
        assert!(matches!(lu_solve(&a, &b), Err(StatsError::SingularMatrix)));
    }

    #[test]
    fn test_jacobi_eigenvalues_diagonal() {
        let a = array![[3.0, 0.0], [0.0, 1.0]];
        let eig = jacobi_eigenvalues(&a, 100, 1e-12).unwrap();
        assert_relative_eq!(eig[0], 3.0, epsilon = 1e-10);
        assert_relative_eq!(eig[1], 1.0, epsilon = 1e-10);
    }

    #[test]
    fn test_jacobi_eigenvalues_known() {
        // Eigenvalues of [[2, 1], [1, 2]] are 3 and 1.
        let a = array![[2.0, 1.0], [1.0, 2.0]];
        let eig = jacobi_eigenvalues(&a, 100, 1e-12).unwrap();
        assert_relative_eq!(eig[0], 3.0, epsilon = 1e-10);
        assert_relative_eq!(eig[1], 1.0, epsilon = 1e-10);
    }

    #[test]
    fn test_is_positive_semi_definite() {
        assert!(is_positive_semi_definite(&array![[1.0, 0.0], [0.0, 0.0]]));
        assert!(!is_positive_semi_definite(&array![[1.0, 2.0], [2.0, 1.0]]));
    }
}
