//! Deterministic synthetic demo archives.
//!
//! The original input files were produced by an untracked generator macro;
//! this module regenerates statistically equivalent inputs. Bin contents
//! are Poisson fluctuations around smooth expected shapes, drawn from a
//! seeded `StdRng` so every run (and the test fixtures) is reproducible.

use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Poisson;

use crate::error::AppError;
use crate::hist::{Hist1D, Hist2D};
use crate::io::archive::HistRecord;
use crate::math::gauss_norm;
use crate::models::signal2d;

/// Default seed for the shipped demo archives.
pub const DEMO_SEED: u64 = 20_240_915;

fn poisson_counts(rng: &mut StdRng, expected: &[f64]) -> Result<Vec<f64>, AppError> {
    expected
        .iter()
        .map(|&mean| {
            if mean <= 0.0 {
                return Ok(0.0);
            }
            let dist = Poisson::new(mean)
                .map_err(|e| AppError::new(4, format!("Poisson distribution error: {e}")))?;
            Ok(dist.sample(rng))
        })
        .collect()
}

fn hist1d_from_expected(
    rng: &mut StdRng,
    name: &str,
    title: &str,
    n_bins: usize,
    x_min: f64,
    x_max: f64,
    expected: impl Fn(f64) -> f64,
) -> Result<Hist1D, AppError> {
    let width = (x_max - x_min) / n_bins as f64;
    let means: Vec<f64> = (0..n_bins)
        .map(|i| expected(x_min + (i as f64 + 0.5) * width))
        .collect();
    let contents = poisson_counts(rng, &means)?;
    let entries = contents.iter().sum();
    // Unweighted fills: sumw2 equals the contents.
    let sumw2 = Some(contents.clone());
    Ok(Hist1D {
        name: name.to_string(),
        title: title.to_string(),
        n_bins,
        x_min,
        x_max,
        contents,
        sumw2,
        entries,
    })
}

/// The `distros` archive: a 1D exponential-decay histogram plus a 2D
/// histogram whose x projection decays and whose y projection grows.
pub fn make_distros(seed: u64) -> Result<Vec<HistRecord>, AppError> {
    let mut rng = StdRng::seed_from_u64(seed);

    let dist1 = hist1d_from_expected(
        &mut rng,
        "dist1",
        "Exponential decay sample",
        50,
        0.0,
        10.0,
        |x| 500.0 * (-0.4 * x).exp(),
    )?;

    let nx = 40;
    let ny = 40;
    let (x_min, x_max) = (0.0, 10.0);
    let (y_min, y_max) = (0.0, 10.0);
    let wx = (x_max - x_min) / nx as f64;
    let wy = (y_max - y_min) / ny as f64;

    let mut means = vec![0.0; nx * ny];
    for ix in 0..nx {
        for iy in 0..ny {
            let x = x_min + (ix as f64 + 0.5) * wx;
            let y = y_min + (iy as f64 + 0.5) * wy;
            means[ix * ny + iy] = 30.0 * (-0.5 * x).exp() * (0.05 * y).exp();
        }
    }
    let contents = poisson_counts(&mut rng, &means)?;
    let entries = contents.iter().sum();
    let dist2 = Hist2D {
        name: "dist2".to_string(),
        title: "2D exponential sample".to_string(),
        nx,
        ny,
        x_min,
        x_max,
        y_min,
        y_max,
        sumw2: Some(contents.clone()),
        contents,
        entries,
    };

    Ok(vec![HistRecord::H1(dist1), HistRecord::H2(dist2)])
}

/// The `experiments` archive: two histograms sharing one Gaussian peak
/// position and width over independent linear backgrounds.
pub fn make_experiments(seed: u64) -> Result<Vec<HistRecord>, AppError> {
    let mut rng = StdRng::seed_from_u64(seed);

    let mu = 5.0;
    let sigma = 1.0;

    let hexp1 = hist1d_from_expected(
        &mut rng,
        "hexp1",
        "Experiment 1",
        60,
        0.0,
        10.0,
        |x| 20.0 + 0.5 * x + 300.0 * gauss_norm(x, mu, sigma),
    )?;
    let hexp2 = hist1d_from_expected(
        &mut rng,
        "hexp2",
        "Experiment 2",
        60,
        0.0,
        10.0,
        |x| 15.0 + 0.2 * x + 200.0 * gauss_norm(x, mu, sigma),
    )?;

    Ok(vec![HistRecord::H1(hexp1), HistRecord::H1(hexp2)])
}

/// The `fitInputs` archive: a 2D data histogram (Gaussian signal over a
/// scaled background) plus the noiseless background template itself.
pub fn make_fit_inputs(seed: u64) -> Result<Vec<HistRecord>, AppError> {
    let mut rng = StdRng::seed_from_u64(seed);

    let nx = 30;
    let ny = 30;
    let (x_min, x_max) = (0.0, 10.0);
    let (y_min, y_max) = (0.0, 10.0);
    let wx = (x_max - x_min) / nx as f64;
    let wy = (y_max - y_min) / ny as f64;
    let area = wx * wy;

    // Signal truth: amplitude, peak position, widths. Background template
    // is a smooth falling surface scaled into the data by b_true.
    let signal_pars = [50.0, 4.0, 6.0, 1.2, 0.8];
    let b_true = 1.5;

    let mut bkg = vec![0.0; nx * ny];
    let mut data_means = vec![0.0; nx * ny];
    for ix in 0..nx {
        for iy in 0..ny {
            let x = x_min + (ix as f64 + 0.5) * wx;
            let y = y_min + (iy as f64 + 0.5) * wy;
            let k = ix * ny + iy;
            bkg[k] = 20.0 * (-0.05 * x).exp() * (-0.08 * y).exp();
            data_means[k] = signal2d(x, y, &signal_pars) * area + b_true * bkg[k];
        }
    }

    let contents = poisson_counts(&mut rng, &data_means)?;
    let entries = contents.iter().sum();
    let hdata = Hist2D {
        name: "hdata".to_string(),
        title: "Data".to_string(),
        nx,
        ny,
        x_min,
        x_max,
        y_min,
        y_max,
        sumw2: Some(contents.clone()),
        contents,
        entries,
    };

    let bkg_entries = bkg.iter().sum();
    let hbkg = Hist2D {
        name: "hbkg".to_string(),
        title: "Background template".to_string(),
        nx,
        ny,
        x_min,
        x_max,
        y_min,
        y_max,
        contents: bkg,
        sumw2: None,
        entries: bkg_entries,
    };

    Ok(vec![HistRecord::H2(hdata), HistRecord::H2(hbkg)])
}
