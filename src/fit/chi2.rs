//! Chi-square objective over one or more binned datasets.
//!
//! The objective is the sum over all bins of all datasets of
//! `((observed - model(x; params)) / error)^2`. Each dataset owns a copy of
//! its observed values and errors and a model closure, so the evaluator is
//! pure and self-contained: nothing outside the objective can change the
//! data while a minimization is in flight.
//!
//! Parameter tying across datasets is expressed through index maps: every
//! dataset gathers its local parameter slice from the global parameter
//! vector, and two datasets that map a local slot to the same global index
//! share that parameter. A simultaneous fit of two histograms with a common
//! peak position is then just two datasets whose maps both point at the
//! global `mu` and `sigma` slots.

use crate::error::AppError;
use crate::hist::Hist1D;

/// Error used for bins whose statistical error is zero or undefined.
pub const FALLBACK_ERROR: f64 = 1.0;

/// Per-dataset bin-error convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorMode {
    /// Use the histogram's stored error (`sqrt(sumw2)` when present,
    /// else the Poisson approximation).
    Stored,
    /// Always use the Poisson approximation `sqrt(content)`.
    Poisson,
}

fn bin_error(h: &Hist1D, i: usize, mode: ErrorMode) -> f64 {
    let raw = match mode {
        ErrorMode::Stored => h.bin_error(i),
        ErrorMode::Poisson => {
            let y = h.contents[i];
            if y > 0.0 { y.sqrt() } else { 0.0 }
        }
    };
    if raw.is_finite() && raw > 0.0 {
        raw
    } else {
        FALLBACK_ERROR
    }
}

/// Observed data plus a model, bound to a subset of the global parameters.
pub struct Dataset {
    y: Vec<f64>,
    err: Vec<f64>,
    param_idx: Vec<usize>,
    model: Box<dyn Fn(usize, &[f64]) -> f64>,
}

impl Dataset {
    /// Raw constructor: observed values, per-bin errors (the unit-error
    /// fallback is applied to non-positive entries), a global→local index
    /// map, and a model closure `(bin index, local params) -> prediction`.
    pub fn new(
        y: Vec<f64>,
        err: Vec<f64>,
        param_idx: Vec<usize>,
        model: impl Fn(usize, &[f64]) -> f64 + 'static,
    ) -> Self {
        debug_assert_eq!(y.len(), err.len());
        let err = err
            .into_iter()
            .map(|e| if e.is_finite() && e > 0.0 { e } else { FALLBACK_ERROR })
            .collect();
        Self {
            y,
            err,
            param_idx,
            model: Box::new(model),
        }
    }

    /// Bind a 1D histogram: bin centers are captured into the model closure
    /// so the dataset needs no further access to the histogram.
    pub fn from_hist1d(
        h: &Hist1D,
        mode: ErrorMode,
        param_idx: Vec<usize>,
        f: impl Fn(f64, &[f64]) -> f64 + 'static,
    ) -> Self {
        let centers = h.bin_centers();
        let y = h.contents.clone();
        let err = (0..h.n_bins).map(|i| bin_error(h, i, mode)).collect();
        Self::new(y, err, param_idx, move |i, p| f(centers[i], p))
    }

    /// Number of bins.
    pub fn len(&self) -> usize {
        self.y.len()
    }

    /// True when the dataset has no bins.
    pub fn is_empty(&self) -> bool {
        self.y.is_empty()
    }
}

/// The contract between an objective and the minimizer.
///
/// Implementations must be pure in `params`: repeated calls with the same
/// vector return the same residuals, and evaluation has no side effects.
pub trait ResidualObjective {
    /// Global parameter count.
    fn n_params(&self) -> usize;

    /// Total residual count over all datasets.
    fn n_residuals(&self) -> usize;

    /// Error-normalized residuals `(obs - model) / err` for all bins.
    fn residuals(&self, params: &[f64]) -> Vec<f64>;

    /// Chi-square value: sum of squared residuals.
    fn value(&self, params: &[f64]) -> f64 {
        self.residuals(params).iter().map(|r| r * r).sum()
    }
}

/// Chi-square objective over an ordered set of datasets sharing one global
/// parameter vector.
pub struct BinnedChi2 {
    n_params: usize,
    datasets: Vec<Dataset>,
}

impl BinnedChi2 {
    /// New objective over `n_params` global parameters.
    pub fn new(n_params: usize) -> Self {
        Self {
            n_params,
            datasets: Vec::new(),
        }
    }

    /// Add a dataset. Every entry of its index map must address a global
    /// parameter slot.
    pub fn push(&mut self, dataset: Dataset) -> Result<(), AppError> {
        if let Some(&bad) = dataset.param_idx.iter().find(|&&i| i >= self.n_params) {
            return Err(AppError::new(
                4,
                format!(
                    "Dataset parameter index {bad} out of range (global parameter count {}).",
                    self.n_params
                ),
            ));
        }
        self.datasets.push(dataset);
        Ok(())
    }

    /// Number of datasets bound to this objective.
    pub fn n_datasets(&self) -> usize {
        self.datasets.len()
    }
}

impl ResidualObjective for BinnedChi2 {
    fn n_params(&self) -> usize {
        self.n_params
    }

    fn n_residuals(&self) -> usize {
        self.datasets.iter().map(|d| d.len()).sum()
    }

    fn residuals(&self, params: &[f64]) -> Vec<f64> {
        let mut out = Vec::with_capacity(self.n_residuals());
        let mut local = Vec::new();
        for d in &self.datasets {
            local.clear();
            local.extend(d.param_idx.iter().map(|&i| params[i]));
            for i in 0..d.len() {
                let predicted = (d.model)(i, &local);
                out.push((d.y[i] - predicted) / d.err[i]);
            }
        }
        out
    }
}
