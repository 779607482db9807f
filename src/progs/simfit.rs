//! Simultaneous fit of two histograms with a shared Gaussian peak.
//!
//! Both histograms are modeled as a linear background plus a normalized
//! Gaussian. The peak position and width are tied across the two datasets
//! through the global parameter vector; amplitudes and backgrounds stay
//! independent. Global parameter order:
//!
//! `[mu, sigma, A1, A2, b10, b11, b20, b21]`

use std::path::Path;

use crate::error::AppError;
use crate::fit::{
    BinnedChi2, Dataset, ErrorMode, FitOutcome, MinimizerConfig, ParamSpec, minimize,
};
use crate::hist::Hist1D;
use crate::io::archive::HistArchive;
use crate::io::results::{FitReport, write_report_json};
use crate::models::gauss_linear;
use crate::plot::{HistPanel, curve_over, save_two_panel};
use crate::report;

/// Hard-coded input archive, relative to the working directory.
pub const INPUT_FILE: &str = "experiments.hpk";

/// Local slots of `gauss_linear` are `[b0, b1, amplitude, mu, sigma]`;
/// these maps gather them from the global vector, pointing both datasets
/// at the same global mu and sigma.
const MAP_H1: [usize; 5] = [4, 5, 2, 0, 1];
const MAP_H2: [usize; 5] = [6, 7, 3, 0, 1];

/// Build and run the tied 8-parameter fit.
pub fn fit_simultaneous(h1: &Hist1D, h2: &Hist1D) -> Result<FitOutcome, AppError> {
    let mut obj = BinnedChi2::new(8);
    obj.push(Dataset::from_hist1d(h1, ErrorMode::Stored, MAP_H1.to_vec(), gauss_linear))?;
    obj.push(Dataset::from_hist1d(h2, ErrorMode::Stored, MAP_H2.to_vec(), gauss_linear))?;

    let specs = [
        ParamSpec::new("mu", 5.0, 0.1),
        ParamSpec::new("sigma", 1.0, 0.1),
        ParamSpec::new("A1", 100.0, 10.0),
        ParamSpec::new("A2", 100.0, 10.0),
        ParamSpec::new("b10", 10.0, 1.0),
        ParamSpec::new("b11", 0.0, 0.1),
        ParamSpec::new("b20", 10.0, 1.0),
        ParamSpec::new("b21", 0.0, 0.1),
    ];
    let config = MinimizerConfig {
        max_iter: 500,
        ..Default::default()
    };
    minimize(&obj, &specs, &config)
}

/// Fitted curve for one dataset, gathering its local parameters from the
/// global fit result.
fn dataset_curve(h: &Hist1D, global: &[f64], map: &[usize; 5]) -> Vec<(f64, f64)> {
    let local: Vec<f64> = map.iter().map(|&i| global[i]).collect();
    curve_over(h, 200, move |x| gauss_linear(x, &local))
}

/// Run the whole program: one joint fit, a two-panel plot, results JSON.
pub fn run(input: &Path, out_dir: &Path) -> Result<(), AppError> {
    let archive = HistArchive::open(input)?;
    print!("{}", report::format_key_listing(&input.display().to_string(), &archive));

    let h1 = archive.get1d("hexp1")?;
    let h2 = archive.get1d("hexp2")?;

    let outcome = fit_simultaneous(h1, h2)?;

    print!("{}", report::format_sim_results(&outcome));
    if let Some(w) = report::convergence_warning("hexp1+hexp2", &outcome) {
        eprintln!("{w}");
    }

    let global = outcome.values();
    let left = HistPanel {
        hist: h1,
        curve: dataset_curve(h1, &global, &MAP_H1),
        title: format!("{} — joint fit", h1.title),
    };
    let right = HistPanel {
        hist: h2,
        curve: dataset_curve(h2, &global, &MAP_H2),
        title: format!("{} — joint fit", h2.title),
    };
    save_two_panel(&out_dir.join("ex2.svg"), &left, &right)?;

    write_report_json(
        &out_dir.join("simfit_results.json"),
        &[FitReport::new("simfit", "hexp1+hexp2", &outcome)],
    )?;

    Ok(())
}
