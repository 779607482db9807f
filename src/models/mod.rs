//! Parametric model functions.
//!
//! Each model maps `(x, local params)` to a predicted bin value. "Local"
//! means the slice a dataset gathers from the global fit parameter vector
//! through its index map (see `fit::chi2::Dataset`); the same function can
//! therefore serve several datasets that share some parameters.

use crate::math::gauss_norm;

/// Exponential: `p[0] * exp(p[1] * x)`.
///
/// Local order: `[norm, slope]`.
pub fn exponential(x: f64, p: &[f64]) -> f64 {
    p[0] * (p[1] * x).exp()
}

/// Linear background plus a normalized Gaussian peak:
/// `p[0] + p[1]*x + p[2] * N(x; p[3], p[4])`.
///
/// Local order: `[b0, b1, amplitude, mu, sigma]`. The Gaussian is the
/// normalized density, so `amplitude` carries the peak's integrated counts
/// (per unit x).
pub fn gauss_linear(x: f64, p: &[f64]) -> f64 {
    p[0] + p[1] * x + p[2] * gauss_norm(x, p[3], p[4])
}

/// Unnormalized 2D Gaussian signal:
/// `p[0] * exp(-(x-p[1])^2 / p[3]^2) * exp(-(y-p[2])^2 / p[4]^2)`.
///
/// Local order: `[amplitude, mu_x, mu_y, sigma_x, sigma_y]`. Note the
/// exponent has no 1/2 factor; the signal yield of this shape is
/// `amplitude * π * sigma_x * sigma_y`.
pub fn signal2d(x: f64, y: f64, p: &[f64]) -> f64 {
    let dx = (x - p[1]) / p[3];
    let dy = (y - p[2]) / p[4];
    p[0] * (-dx * dx).exp() * (-dy * dy).exp()
}
