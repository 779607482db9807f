//! 2D signal extraction: Gaussian signal over a scaled background template.
//!
//! The data histogram is modeled per bin as
//!
//! `model = signal2d(x, y; A, mu1, mu2, s1, s2) * bin_area + B * bkg`
//!
//! where `bkg` is the background template histogram. Errors are the Poisson
//! approximation `sqrt(max(data, 1))`, widths are kept positive through a
//! residual penalty, and the covariance is scaled by chi2/ndof before the
//! uncertainties (including the propagated signal-yield error) are
//! reported.

use std::f64::consts::PI;
use std::path::Path;

use crate::error::AppError;
use crate::fit::chi2::{BinnedChi2, Dataset, ResidualObjective};
use crate::fit::minimizer::{ErrorScaling, FitOutcome, MinimizerConfig, ParamSpec, minimize};
use crate::hist::Hist2D;
use crate::io::archive::HistArchive;
use crate::io::results::{FitReport, write_report_json};
use crate::models::signal2d;
use crate::plot::{MapPanel, save_heatmap_grid};
use crate::report;

/// Hard-coded input archive, relative to the working directory.
pub const INPUT_FILE: &str = "fitinputs.hpk";

/// Global parameter order: `[A, mu1, mu2, s1, s2, B]`.
const PAR_A: usize = 0;
const PAR_S1: usize = 3;
const PAR_S2: usize = 4;
const PAR_B: usize = 5;

/// Penalty residual used outside the physical region (non-positive widths),
/// mirroring the original residual guard.
const PENALTY: f64 = 1e6;

/// Objective wrapper that walls off non-positive widths.
struct PositiveWidthChi2 {
    inner: BinnedChi2,
}

impl ResidualObjective for PositiveWidthChi2 {
    fn n_params(&self) -> usize {
        self.inner.n_params()
    }

    fn n_residuals(&self) -> usize {
        self.inner.n_residuals()
    }

    fn residuals(&self, params: &[f64]) -> Vec<f64> {
        if params[PAR_S1] <= 0.0 || params[PAR_S2] <= 0.0 {
            return vec![PENALTY; self.inner.n_residuals()];
        }
        self.inner.residuals(params)
    }
}

/// The flattened fit inputs: bin coordinates, observed counts, the template
/// value and the Poisson error per bin.
struct FlatBins {
    xs: Vec<f64>,
    ys: Vec<f64>,
    data: Vec<f64>,
    bkg: Vec<f64>,
    err: Vec<f64>,
    area: f64,
}

fn flatten(hdata: &Hist2D, hbkg: &Hist2D) -> Result<FlatBins, AppError> {
    if hdata.nx != hbkg.nx || hdata.ny != hbkg.ny {
        return Err(AppError::new(
            2,
            "Data and background histograms have different binning.",
        ));
    }

    let n = hdata.nx * hdata.ny;
    let mut out = FlatBins {
        xs: Vec::with_capacity(n),
        ys: Vec::with_capacity(n),
        data: Vec::with_capacity(n),
        bkg: Vec::with_capacity(n),
        err: Vec::with_capacity(n),
        area: hdata.bin_area(),
    };

    for ix in 0..hdata.nx {
        for iy in 0..hdata.ny {
            let d = hdata.value(ix, iy);
            out.xs.push(hdata.x_center(ix));
            out.ys.push(hdata.y_center(iy));
            out.data.push(d);
            out.bkg.push(hbkg.value(ix, iy));
            out.err.push(d.max(1.0).sqrt());
        }
    }

    Ok(out)
}

fn build_objective(flat: &FlatBins) -> Result<PositiveWidthChi2, AppError> {
    let xs = flat.xs.clone();
    let ys = flat.ys.clone();
    let bkg = flat.bkg.clone();
    let area = flat.area;

    let mut inner = BinnedChi2::new(6);
    inner.push(Dataset::new(
        flat.data.clone(),
        flat.err.clone(),
        vec![0, 1, 2, 3, 4, 5],
        move |i, p| signal2d(xs[i], ys[i], &p[..5]) * area + p[PAR_B] * bkg[i],
    ))?;

    Ok(PositiveWidthChi2 { inner })
}

/// Starting guesses from the data: amplitude and position at the maximum
/// bin, widths at a tenth of each axis span, unit background scale.
fn starting_specs(hdata: &Hist2D, flat: &FlatBins) -> Vec<ParamSpec> {
    let (imax, &dmax) = flat
        .data
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
        .unwrap_or((0, &1.0));

    let s1 = 0.1 * (hdata.x_max - hdata.x_min);
    let s2 = 0.1 * (hdata.y_max - hdata.y_min);

    vec![
        ParamSpec::new("A", dmax.max(1.0), 0.05 * dmax.max(1.0)),
        ParamSpec::new("mu1", flat.xs[imax], 0.1),
        ParamSpec::new("mu2", flat.ys[imax], 0.1),
        ParamSpec::new("s1", s1, 0.05 * s1),
        ParamSpec::new("s2", s2, 0.05 * s2),
        ParamSpec::new("B", 1.0, 0.1),
    ]
}

/// Signal yield `N = A * π * s1 * s2` with its propagated uncertainty.
pub fn signal_yield(outcome: &FitOutcome) -> (f64, f64) {
    let a = outcome.params[PAR_A].value;
    let s1 = outcome.params[PAR_S1].value;
    let s2 = outcome.params[PAR_S2].value;
    let yield_value = a * PI * s1 * s2;

    let Some(cov) = &outcome.covariance else {
        return (yield_value, 0.0);
    };

    // Gradient of the yield w.r.t. (A, s1, s2), contracted with the
    // corresponding covariance block.
    let idx = [PAR_A, PAR_S1, PAR_S2];
    let g = [PI * s1 * s2, PI * a * s2, PI * a * s1];
    let mut var = 0.0;
    for (r, &ir) in idx.iter().enumerate() {
        for (c, &ic) in idx.iter().enumerate() {
            var += g[r] * cov[(ir, ic)] * g[c];
        }
    }

    (yield_value, var.max(0.0).sqrt())
}

fn format_results(outcome: &FitOutcome, n_yield: f64, n_yield_err: f64) -> String {
    let mut out = String::new();
    out.push_str("Fit results:\n");
    for p in &outcome.params {
        out.push_str(&format!("{} = {:.4} ± {:.4}\n", p.name, p.value, p.error));
    }
    out.push_str(&format!(
        "Chi2/ndof = {:.2}/{} = {:.3}\n",
        outcome.chi2,
        outcome.ndof,
        outcome.chi2 / outcome.ndof.max(1) as f64
    ));
    out.push_str(&format!("Signal yield = {n_yield:.4} ± {n_yield_err:.4}\n"));
    out
}

/// Run the whole program: one fit, a 2x2 diagnostic grid, results JSON.
pub fn run(input: &Path, out_dir: &Path) -> Result<(), AppError> {
    let archive = HistArchive::open(input)?;
    print!("{}", report::format_key_listing(&input.display().to_string(), &archive));

    let hdata = archive.get2d("hdata")?;
    let hbkg = archive.get2d("hbkg")?;

    let flat = flatten(hdata, hbkg)?;
    let obj = build_objective(&flat)?;
    let specs = starting_specs(hdata, &flat);

    let config = MinimizerConfig {
        max_iter: 500,
        error_scaling: ErrorScaling::Chi2PerDof,
        ..Default::default()
    };
    let outcome = minimize(&obj, &specs, &config)?;

    let (n_yield, n_yield_err) = signal_yield(&outcome);
    print!("{}", format_results(&outcome, n_yield, n_yield_err));
    if let Some(w) = report::convergence_warning("hdata", &outcome) {
        eprintln!("{w}");
    }

    // Diagnostic maps: data, full model, residuals, background-subtracted
    // data.
    let p = outcome.values();
    let n = flat.data.len();
    let mut model = Vec::with_capacity(n);
    for i in 0..n {
        model.push(signal2d(flat.xs[i], flat.ys[i], &p[..5]) * flat.area + p[PAR_B] * flat.bkg[i]);
    }
    let resid: Vec<f64> = flat.data.iter().zip(&model).map(|(d, m)| d - m).collect();
    let minus_bkg: Vec<f64> = flat
        .data
        .iter()
        .zip(&flat.bkg)
        .map(|(d, b)| d - p[PAR_B] * b)
        .collect();

    save_heatmap_grid(
        &out_dir.join("ex3.svg"),
        hdata,
        &[
            MapPanel { title: "Data".to_string(), values: flat.data.clone() },
            MapPanel { title: "Fit (Signal+Background)".to_string(), values: model },
            MapPanel { title: "Residuals (Data-Fit)".to_string(), values: resid },
            MapPanel { title: "Data - Best-fit Background".to_string(), values: minus_bkg },
        ],
    )?;

    write_report_json(
        &out_dir.join("sigfit_results.json"),
        &[FitReport::new("sigfit", "hdata", &outcome)],
    )?;

    println!("Fit done. Results saved in ex3.svg");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fit::minimizer::FittedParam;
    use nalgebra::DMatrix;

    #[test]
    fn yield_error_propagation() {
        // Diagonal covariance: var = sum (g_i sigma_i)^2.
        let a = 10.0;
        let s1 = 2.0;
        let s2 = 0.5;
        let mut cov = DMatrix::zeros(6, 6);
        cov[(PAR_A, PAR_A)] = 0.01;
        cov[(PAR_S1, PAR_S1)] = 0.04;
        cov[(PAR_S2, PAR_S2)] = 0.0025;

        let outcome = FitOutcome {
            params: vec![
                FittedParam { name: "A".to_string(), value: a, error: 0.1 },
                FittedParam { name: "mu1".to_string(), value: 0.0, error: 0.0 },
                FittedParam { name: "mu2".to_string(), value: 0.0, error: 0.0 },
                FittedParam { name: "s1".to_string(), value: s1, error: 0.2 },
                FittedParam { name: "s2".to_string(), value: s2, error: 0.05 },
                FittedParam { name: "B".to_string(), value: 1.0, error: 0.0 },
            ],
            chi2: 1.0,
            ndof: 1,
            n_iter: 1,
            n_eval: 1,
            converged: true,
            message: String::new(),
            covariance: Some(cov),
        };

        let (value, err) = signal_yield(&outcome);
        assert!((value - a * PI * s1 * s2).abs() < 1e-12);

        let g = [PI * s1 * s2, PI * a * s2, PI * a * s1];
        let expect = (g[0] * g[0] * 0.01 + g[1] * g[1] * 0.04 + g[2] * g[2] * 0.0025).sqrt();
        assert!((err - expect).abs() < 1e-12);
    }

    #[test]
    fn width_guard_walls_off_nonpositive_sigmas() {
        let flat = FlatBins {
            xs: vec![0.5, 1.5],
            ys: vec![0.5, 0.5],
            data: vec![4.0, 9.0],
            bkg: vec![1.0, 1.0],
            err: vec![2.0, 3.0],
            area: 1.0,
        };
        let obj = build_objective(&flat).unwrap();

        let bad = [1.0, 0.5, 0.5, -1.0, 1.0, 1.0];
        let r = obj.residuals(&bad);
        assert!(r.iter().all(|&v| v == PENALTY));

        let good = [1.0, 0.5, 0.5, 1.0, 1.0, 1.0];
        assert!(obj.value(&good).is_finite());
        assert!(obj.value(&good) < PENALTY);
    }
}
