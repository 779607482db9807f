//! Small numerical helpers shared by the fitter and the plots.

use nalgebra::{DMatrix, DVector};

/// Normalized Gaussian density.
///
/// `gauss_norm(x, mu, sigma) = exp(-((x-mu)/sigma)^2 / 2) / (sigma * sqrt(2π))`
///
/// The `sigma` guard keeps the value finite for degenerate widths; the
/// fitter treats such parameter points as bad candidates rather than
/// propagating NaN through the residuals.
pub fn gauss_norm(x: f64, mu: f64, sigma: f64) -> f64 {
    let s = sigma.abs().max(1e-300);
    let z = (x - mu) / s;
    (-0.5 * z * z).exp() / (s * (2.0 * std::f64::consts::PI).sqrt())
}

/// Evenly spaced grid of `n` points from `a` to `b` inclusive.
pub fn linspace(a: f64, b: f64, n: usize) -> Vec<f64> {
    let n = n.max(2);
    (0..n)
        .map(|i| {
            let u = i as f64 / (n as f64 - 1.0);
            a + u * (b - a)
        })
        .collect()
}

/// Solve the symmetric system `a * x = b`.
///
/// The Levenberg–Marquardt step matrix is symmetric positive definite away
/// from degenerate parameter points, so we try Cholesky first and fall back
/// to an SVD solve with progressively looser tolerances (nearly collinear
/// model columns can make the system close to singular).
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_symmetric(a: &DMatrix<f64>, b: &DVector<f64>) -> Option<DVector<f64>> {
    if let Some(chol) = a.clone().cholesky() {
        let x = chol.solve(b);
        if x.iter().all(|v| v.is_finite()) {
            return Some(x);
        }
    }

    let svd = a.clone().svd(true, true);
    for &tol in &[1e-12, 1e-10, 1e-8] {
        if let Ok(x) = svd.solve(b, tol) {
            if x.iter().all(|v| v.is_finite()) {
                return Some(x);
            }
        }
    }

    None
}

/// Invert a symmetric matrix (Cholesky, then SVD pseudo-inverse fallback).
///
/// Used for the covariance `(JᵀJ)⁻¹` at the fit optimum.
pub fn invert_symmetric(a: &DMatrix<f64>) -> Option<DMatrix<f64>> {
    if let Some(chol) = a.clone().cholesky() {
        let inv = chol.inverse();
        if inv.iter().all(|v| v.is_finite()) {
            return Some(inv);
        }
    }

    let svd = a.clone().svd(true, true);
    for &tol in &[1e-12, 1e-10, 1e-8] {
        if let Ok(inv) = svd.clone().pseudo_inverse(tol) {
            if inv.iter().all(|v| v.is_finite()) {
                return Some(inv);
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gauss_norm_integrates_to_one() {
        // Riemann sum over ±8 sigma.
        let mu = 3.0;
        let sigma = 0.7;
        let n = 20_000;
        let lo = mu - 8.0 * sigma;
        let hi = mu + 8.0 * sigma;
        let dx = (hi - lo) / n as f64;
        let sum: f64 = (0..n)
            .map(|i| gauss_norm(lo + (i as f64 + 0.5) * dx, mu, sigma) * dx)
            .sum();
        assert!((sum - 1.0).abs() < 1e-6, "integral was {sum}");
    }

    #[test]
    fn gauss_norm_peak_value() {
        let v = gauss_norm(5.0, 5.0, 2.0);
        let expect = 1.0 / (2.0 * (2.0 * std::f64::consts::PI).sqrt());
        assert!((v - expect).abs() < 1e-12);
    }

    #[test]
    fn linspace_endpoints() {
        let g = linspace(1.0, 3.0, 5);
        assert_eq!(g.len(), 5);
        assert!((g[0] - 1.0).abs() < 1e-15);
        assert!((g[4] - 3.0).abs() < 1e-15);
        assert!((g[2] - 2.0).abs() < 1e-15);
    }

    #[test]
    fn solve_symmetric_simple() {
        let a = DMatrix::from_row_slice(2, 2, &[4.0, 1.0, 1.0, 3.0]);
        let b = DVector::from_row_slice(&[1.0, 2.0]);
        let x = solve_symmetric(&a, &b).unwrap();
        let r = &a * &x - &b;
        assert!(r.amax() < 1e-12);
    }

    #[test]
    fn invert_symmetric_roundtrip() {
        let a = DMatrix::from_row_slice(2, 2, &[2.0, 0.5, 0.5, 1.0]);
        let inv = invert_symmetric(&a).unwrap();
        let eye = &a * &inv;
        assert!((eye[(0, 0)] - 1.0).abs() < 1e-12);
        assert!((eye[(1, 1)] - 1.0).abs() < 1e-12);
        assert!(eye[(0, 1)].abs() < 1e-12);
    }
}
