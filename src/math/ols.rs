//! Least squares solver.
//!
//! The ARIMA estimator solves small regression problems when it builds start
//! values (Hannan–Rissanen):
//!
//! ```text
//! minimize Σ (y_i - x_i^T β)^2
//! ```
//!
//! Implementation choices:
//! - We use SVD so tall design matrices (more rows than columns) are handled.
//!   (Nalgebra's `QR::solve` is intended for square systems and will panic for
//!   non-square matrices.)
//! - Lagged regressors of a trending or nearly constant series are often close
//!   to collinear, so the solve retries with looser singular-value tolerances.

use nalgebra::{DMatrix, DVector};

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    if x.nrows() == 0 || x.ncols() == 0 || x.nrows() != y.len() {
        return None;
    }
    let svd = x.clone().svd(true, true);

    for &tol in &[1e-10, 1e-8, 1e-6] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }

    None
}

/// Regress `y[t]` on a constant-free design built row by row.
///
/// `rows` holds one regressor vector per observation; all rows must have the
/// same width.
pub fn regress_rows(rows: &[Vec<f64>], y: &[f64]) -> Option<Vec<f64>> {
    let n = rows.len();
    let k = rows.first()?.len();
    if n != y.len() || n <= k || rows.iter().any(|r| r.len() != k) {
        return None;
    }
    let flat: Vec<f64> = rows.iter().flat_map(|r| r.iter().copied()).collect();
    let x = DMatrix::from_row_slice(n, k, &flat);
    let yv = DVector::from_column_slice(y);
    solve_least_squares(&x, &yv).map(|b| b.iter().copied().collect())
}
