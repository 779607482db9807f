//! Exponential fits: `dist1` and the projections of `dist2`.
//!
//! Flow: open the archive, chi-square fit `p0 * exp(p1 * x)` to the 1D
//! histogram and to both projections of the 2D histogram, print each fit's
//! parameters, and save one plot per fit.

use std::path::Path;

use crate::error::AppError;
use crate::fit::{
    BinnedChi2, Dataset, ErrorMode, FitOutcome, MinimizerConfig, ParamSpec, minimize,
};
use crate::hist::Hist1D;
use crate::io::archive::HistArchive;
use crate::io::results::{FitReport, write_report_json};
use crate::models::exponential;
use crate::plot::{HistPanel, curve_over, save_hist_fit};
use crate::report;

/// Hard-coded input archive, relative to the working directory.
pub const INPUT_FILE: &str = "distros.hpk";

/// Starting point for one exponential parameter: (value, step).
type Start = (f64, f64);

fn fit_exponential(h: &Hist1D, p0: Start, p1: Start) -> Result<FitOutcome, AppError> {
    let mut obj = BinnedChi2::new(2);
    // Poisson errors, like the original FCN: sqrt(y), or 1 for empty bins.
    obj.push(Dataset::from_hist1d(h, ErrorMode::Poisson, vec![0, 1], exponential))?;

    let specs = [
        ParamSpec::new("p0", p0.0, p0.1),
        ParamSpec::new("p1", p1.0, p1.1),
    ];
    minimize(&obj, &specs, &MinimizerConfig::default())
}

fn fit_print_plot(
    h: &Hist1D,
    label: &str,
    p0: Start,
    p1: Start,
    plot_path: &Path,
) -> Result<FitOutcome, AppError> {
    let outcome = fit_exponential(h, p0, p1)?;

    println!("{}", report::format_fit_params(&format!("Fit results for {label}:"), &outcome));
    if let Some(w) = report::convergence_warning(label, &outcome) {
        eprintln!("{w}");
    }

    let values = outcome.values();
    let panel = HistPanel {
        hist: h,
        curve: curve_over(h, 200, |x| exponential(x, &values)),
        title: format!("{} — exponential fit", h.title),
    };
    save_hist_fit(plot_path, &panel)?;

    Ok(outcome)
}

/// Run the whole program: three fits, three plots, one results JSON.
pub fn run(input: &Path, out_dir: &Path) -> Result<(), AppError> {
    let archive = HistArchive::open(input)?;
    print!("{}", report::format_key_listing(&input.display().to_string(), &archive));

    let dist1 = archive.get1d("dist1")?;
    let out1 = fit_print_plot(
        dist1,
        "dist1",
        (1.0, 0.1),
        (-0.1, 0.01),
        &out_dir.join("dist1_fit.svg"),
    )?;

    let dist2 = archive.get2d("dist2")?;

    let proj_x = dist2.projection_x();
    let out_x = fit_print_plot(
        &proj_x,
        "dist2 Projection X",
        (1.0, 0.1),
        (-0.1, 0.01),
        &out_dir.join("dist2_projx_fit.svg"),
    )?;

    let proj_y = dist2.projection_y();
    let out_y = fit_print_plot(
        &proj_y,
        "dist2 Projection Y",
        (1.0, 0.1),
        (0.05, 0.001),
        &out_dir.join("dist2_projy_fit.svg"),
    )?;

    write_report_json(
        &out_dir.join("expfit_results.json"),
        &[
            FitReport::new("expfit", "dist1", &out1),
            FitReport::new("expfit", "dist2_projx", &out_x),
            FitReport::new("expfit", "dist2_projy", &out_y),
        ],
    )?;

    println!("All plots saved.");
    Ok(())
}
