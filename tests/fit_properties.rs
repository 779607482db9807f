//! Fit-level properties: parameter recovery, tying, determinism, and the
//! zero-error fallback.

use histfit::fit::{
    BinnedChi2, Dataset, ErrorMode, ErrorScaling, MinimizerConfig, ParamSpec, ResidualObjective,
    minimize,
};
use histfit::hist::Hist1D;
use histfit::models::{exponential, gauss_linear};
use histfit::progs::simfit::fit_simultaneous;

fn hist_from(n_bins: usize, x_min: f64, x_max: f64, f: impl Fn(f64) -> f64) -> Hist1D {
    let mut h = Hist1D {
        name: "h".to_string(),
        title: "h".to_string(),
        n_bins,
        x_min,
        x_max,
        contents: vec![0.0; n_bins],
        sumw2: None,
        entries: 0.0,
    };
    for i in 0..n_bins {
        h.contents[i] = f(h.bin_center(i));
    }
    h.entries = h.total();
    h
}

#[test]
fn exponential_recovery_on_noiseless_data() {
    let truth = [10.0, -0.3];
    let h = hist_from(40, 0.0, 10.0, |x| exponential(x, &truth));

    let mut obj = BinnedChi2::new(2);
    obj.push(Dataset::from_hist1d(&h, ErrorMode::Poisson, vec![0, 1], exponential))
        .unwrap();

    let specs = [
        ParamSpec::new("p0", 1.0, 0.1),
        ParamSpec::new("p1", -0.1, 0.01),
    ];
    let config = MinimizerConfig {
        error_scaling: ErrorScaling::Chi2PerDof,
        ..Default::default()
    };
    let out = minimize(&obj, &specs, &config).unwrap();

    assert!(out.converged, "fit should converge: {}", out.message);
    let rel0 = (out.params[0].value - truth[0]).abs() / truth[0];
    let rel1 = (out.params[1].value - truth[1]).abs() / truth[1].abs();
    assert!(rel0 < 1e-3, "p0 off by {rel0}");
    assert!(rel1 < 1e-3, "p1 off by {rel1}");

    // Zero noise: chi2 ~ 0, so the chi2/ndof-scaled uncertainties vanish.
    assert!(out.params[0].error < 1e-4);
    assert!(out.params[1].error < 1e-4);
}

/// Noiseless pair of histograms with a shared peak, independent
/// backgrounds.
fn shared_peak_pair(b1: (f64, f64), b2: (f64, f64)) -> (Hist1D, Hist1D) {
    let mu = 5.2;
    let sigma = 0.8;
    let h1 = hist_from(60, 0.0, 10.0, |x| {
        gauss_linear(x, &[b1.0, b1.1, 300.0, mu, sigma])
    });
    let h2 = hist_from(60, 0.0, 10.0, |x| {
        gauss_linear(x, &[b2.0, b2.1, 250.0, mu, sigma])
    });
    (h1, h2)
}

#[test]
fn shared_peak_is_tied_across_histograms() {
    let (h1, h2) = shared_peak_pair((20.0, 0.5), (15.0, 0.2));
    let out = fit_simultaneous(&h1, &h2).unwrap();
    assert!(out.converged, "fit should converge: {}", out.message);

    // One (mu, sigma) pair explains both histograms.
    assert!((out.params[0].value - 5.2).abs() < 1e-3, "mu = {}", out.params[0].value);
    assert!((out.params[1].value - 0.8).abs() < 1e-3, "sigma = {}", out.params[1].value);

    // Changing only histogram 1's background must not move the tied peak.
    let (h1b, h2b) = shared_peak_pair((30.0, -0.3), (15.0, 0.2));
    let out_b = fit_simultaneous(&h1b, &h2b).unwrap();
    assert!((out_b.params[0].value - out.params[0].value).abs() < 1e-3);
    assert!((out_b.params[1].value - out.params[1].value).abs() < 1e-3);

    // The perturbed background is picked up by the background parameters.
    assert!((out_b.params[4].value - 30.0).abs() < 0.1, "b10 = {}", out_b.params[4].value);
    assert!((out_b.params[5].value + 0.3).abs() < 0.05, "b11 = {}", out_b.params[5].value);
    assert_eq!(h2.contents, h2b.contents);
}

#[test]
fn identical_runs_are_bitwise_identical() {
    let (h1, h2) = shared_peak_pair((20.0, 0.5), (15.0, 0.2));
    let a = fit_simultaneous(&h1, &h2).unwrap();
    let b = fit_simultaneous(&h1, &h2).unwrap();

    assert_eq!(a.n_iter, b.n_iter);
    assert_eq!(a.n_eval, b.n_eval);
    assert_eq!(a.chi2.to_bits(), b.chi2.to_bits());
    for (pa, pb) in a.params.iter().zip(b.params.iter()) {
        assert_eq!(pa.value.to_bits(), pb.value.to_bits());
        assert_eq!(pa.error.to_bits(), pb.error.to_bits());
    }
}

#[test]
fn empty_histogram_does_not_divide_by_zero() {
    let h = hist_from(20, 0.0, 10.0, |_| 0.0);

    let mut obj = BinnedChi2::new(2);
    obj.push(Dataset::from_hist1d(&h, ErrorMode::Poisson, vec![0, 1], exponential))
        .unwrap();

    // Every bin error fell back to 1, so the chi2 is finite everywhere.
    let v = obj.value(&[1.0, -0.1]);
    assert!(v.is_finite());

    let specs = [
        ParamSpec::new("p0", 1.0, 0.1),
        ParamSpec::new("p1", -0.1, 0.01),
    ];
    let out = minimize(&obj, &specs, &MinimizerConfig::default()).unwrap();
    assert!(out.chi2.is_finite());
    assert!(out.params.iter().all(|p| p.value.is_finite()));
}
