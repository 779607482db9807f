//! Migrad-style local minimizer for chi-square objectives.
//!
//! Levenberg–Marquardt descent on the residual vector:
//!
//! - numerical Jacobian by central differences, with per-parameter step
//!   sizes taken from the `ParamSpec` step scales
//! - damped normal equations `(JᵀJ + λ·diag(JᵀJ)) δ = Jᵀ r` solved with
//!   nalgebra, damping adapted on accept/reject
//! - parameter uncertainties from the curvature at the optimum:
//!   `cov = (JᵀJ)⁻¹`, `error_i = sqrt(cov_ii)`
//!
//! Parameters are unbounded. The convergence status is always surfaced in
//! the outcome; callers decide whether non-convergence is a warning or a
//! hard failure.

use nalgebra::{DMatrix, DVector};
use serde::Serialize;

use crate::error::AppError;
use crate::fit::chi2::ResidualObjective;
use crate::math::{invert_symmetric, solve_symmetric};

/// A named fit parameter with an initial value and a step scale.
///
/// The step is the minimizer's finite-difference scale (the analog of the
/// "initial step size" handed to a Migrad parameter definition); it does not
/// bound the parameter.
#[derive(Debug, Clone)]
pub struct ParamSpec {
    pub name: String,
    pub start: f64,
    pub step: f64,
}

impl ParamSpec {
    pub fn new(name: impl Into<String>, start: f64, step: f64) -> Self {
        Self {
            name: name.into(),
            start,
            step,
        }
    }
}

/// How to scale the covariance into parameter errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorScaling {
    /// `cov = (JᵀJ)⁻¹` as-is: the UP = 1 convention for a chi-square
    /// objective built from error-normalized residuals.
    Identity,
    /// Scale the covariance by `chi2 / ndof`. Appropriate when the bin
    /// errors are only known up to a common factor.
    Chi2PerDof,
}

/// Minimizer settings.
#[derive(Debug, Clone)]
pub struct MinimizerConfig {
    /// Maximum number of outer (Jacobian) iterations.
    pub max_iter: usize,
    /// Relative chi-square improvement below which the fit is converged.
    pub tol: f64,
    /// Covariance scaling for the reported errors.
    pub error_scaling: ErrorScaling,
}

impl Default for MinimizerConfig {
    fn default() -> Self {
        Self {
            max_iter: 200,
            tol: 1e-10,
            error_scaling: ErrorScaling::Identity,
        }
    }
}

/// One converged (or best-effort) parameter.
#[derive(Debug, Clone, Serialize)]
pub struct FittedParam {
    pub name: String,
    pub value: f64,
    pub error: f64,
}

/// Result of one minimization run.
#[derive(Debug, Clone)]
pub struct FitOutcome {
    /// Per-parameter value and uncertainty, in `ParamSpec` order.
    pub params: Vec<FittedParam>,
    /// Chi-square at the reported parameters.
    pub chi2: f64,
    /// Residual count minus parameter count (0 when non-positive).
    pub ndof: usize,
    /// Outer iterations performed.
    pub n_iter: usize,
    /// Objective (residual-vector) evaluations.
    pub n_eval: usize,
    /// Whether the run met the convergence criterion.
    pub converged: bool,
    /// Human-readable termination reason.
    pub message: String,
    /// Covariance at the optimum, if it could be computed.
    pub covariance: Option<DMatrix<f64>>,
}

impl FitOutcome {
    /// Fitted values in parameter order.
    pub fn values(&self) -> Vec<f64> {
        self.params.iter().map(|p| p.value).collect()
    }
}

/// Finite-difference step for one parameter.
fn fd_step(x: f64, step: f64) -> f64 {
    let scale = if step.abs() > 0.0 {
        step.abs()
    } else {
        x.abs().max(1.0)
    };
    (1e-6 * scale).max(1e-12)
}

/// Central-difference Jacobian of the residual vector.
fn jacobian(
    obj: &dyn ResidualObjective,
    p: &[f64],
    specs: &[ParamSpec],
    n_eval: &mut usize,
) -> DMatrix<f64> {
    let m = obj.n_residuals();
    let n = p.len();
    let mut jac = DMatrix::<f64>::zeros(m, n);

    let mut work = p.to_vec();
    for k in 0..n {
        let h = fd_step(p[k], specs[k].step);

        work[k] = p[k] + h;
        let r_plus = obj.residuals(&work);
        work[k] = p[k] - h;
        let r_minus = obj.residuals(&work);
        work[k] = p[k];
        *n_eval += 2;

        for i in 0..m {
            jac[(i, k)] = (r_plus[i] - r_minus[i]) / (2.0 * h);
        }
    }

    jac
}

fn chi2_of(r: &[f64]) -> f64 {
    r.iter().map(|v| v * v).sum()
}

/// Run a Levenberg–Marquardt minimization.
///
/// Errors only on malformed input (parameter count mismatch, empty data,
/// non-finite starting residuals); non-convergence is reported through
/// `FitOutcome::converged`, never as an `Err`.
pub fn minimize(
    obj: &dyn ResidualObjective,
    specs: &[ParamSpec],
    config: &MinimizerConfig,
) -> Result<FitOutcome, AppError> {
    let n = specs.len();
    if n == 0 || n != obj.n_params() {
        return Err(AppError::new(
            4,
            format!(
                "Parameter spec count {} does not match objective parameter count {}.",
                n,
                obj.n_params()
            ),
        ));
    }
    let m = obj.n_residuals();
    if m == 0 {
        return Err(AppError::new(4, "Objective has no residuals to fit."));
    }

    let mut p: Vec<f64> = specs.iter().map(|s| s.start).collect();
    let mut n_eval = 0usize;

    let mut r = obj.residuals(&p);
    n_eval += 1;
    if r.iter().any(|v| !v.is_finite()) {
        return Err(AppError::new(4, "Non-finite residuals at the starting parameters."));
    }
    let mut chi2 = chi2_of(&r);

    let mut lambda = 1e-3;
    let mut n_iter = 0usize;
    let mut converged = false;
    let mut message = "maximum iterations reached".to_string();

    const GRAD_TOL: f64 = 1e-10;
    const LAMBDA_MAX: f64 = 1e12;

    while n_iter < config.max_iter {
        n_iter += 1;

        let jac = jacobian(obj, &p, specs, &mut n_eval);
        let r_vec = DVector::from_row_slice(&r);
        let grad = jac.transpose() * &r_vec;
        let hess = jac.transpose() * &jac;

        if grad.amax() < GRAD_TOL {
            converged = true;
            message = "gradient below tolerance".to_string();
            break;
        }

        // Inner damping loop: reject uphill or non-finite steps by raising
        // lambda, accept downhill steps and relax it.
        let mut accepted = false;
        while lambda <= LAMBDA_MAX {
            let mut damped = hess.clone();
            for k in 0..n {
                let d = hess[(k, k)].abs().max(1e-12);
                damped[(k, k)] += lambda * d;
            }

            let Some(delta) = solve_symmetric(&damped, &grad) else {
                lambda *= 10.0;
                continue;
            };

            let candidate: Vec<f64> = p.iter().zip(delta.iter()).map(|(pi, di)| pi - di).collect();
            let r_new = obj.residuals(&candidate);
            n_eval += 1;
            let chi2_new = chi2_of(&r_new);

            if chi2_new.is_finite() && chi2_new < chi2 {
                let reduction = chi2 - chi2_new;
                p = candidate;
                r = r_new;
                chi2 = chi2_new;
                lambda = (lambda / 10.0).max(1e-12);
                accepted = true;

                if reduction <= config.tol * (chi2.abs() + config.tol) {
                    converged = true;
                    message = "chi-square change below tolerance".to_string();
                }
                break;
            }
            lambda *= 10.0;
        }

        if !accepted {
            // No downhill step exists within the damping budget: we are at
            // (numerically) the best reachable point.
            converged = true;
            message = "no further improvement possible".to_string();
            break;
        }
        if converged {
            break;
        }
    }

    // Curvature errors at the reported parameters.
    let jac = jacobian(obj, &p, specs, &mut n_eval);
    let hess = jac.transpose() * &jac;
    let ndof = m.saturating_sub(n);
    let scale = match config.error_scaling {
        ErrorScaling::Identity => 1.0,
        ErrorScaling::Chi2PerDof => {
            if ndof > 0 {
                chi2 / ndof as f64
            } else {
                1.0
            }
        }
    };

    let covariance = invert_symmetric(&hess).map(|c| c * scale);
    if covariance.is_none() {
        message.push_str("; covariance not available");
    }

    let params = specs
        .iter()
        .enumerate()
        .map(|(k, s)| FittedParam {
            name: s.name.clone(),
            value: p[k],
            error: covariance
                .as_ref()
                .map(|c| c[(k, k)].max(0.0).sqrt())
                .unwrap_or(0.0),
        })
        .collect();

    Ok(FitOutcome {
        params,
        chi2,
        ndof,
        n_iter,
        n_eval,
        converged,
        message,
        covariance,
    })
}
