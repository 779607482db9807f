//! Formatted terminal output for fit results.
//!
//! Formatting lives in one place so the fitting code stays clean and output
//! changes are localized.

use crate::fit::minimizer::FitOutcome;
use crate::io::archive::HistArchive;

/// Format one fit's parameters as `name = value ± error` lines under a
/// heading.
pub fn format_fit_params(heading: &str, outcome: &FitOutcome) -> String {
    let mut out = String::new();
    out.push_str(heading);
    out.push('\n');
    for p in &outcome.params {
        out.push_str(&format!("{} = {:.6} ± {:.6}\n", p.name, p.value, p.error));
    }
    out
}

/// Format the simultaneous-fit summary block.
///
/// Parameter order is fixed by the driver: mu, sigma, A1, A2, b10, b11,
/// b20, b21.
pub fn format_sim_results(outcome: &FitOutcome) -> String {
    let p = &outcome.params;
    let mut out = String::new();
    out.push_str("===== Simultaneous Fit Results =====\n");
    out.push_str(&format!("mu     = {:.6} ± {:.6}\n", p[0].value, p[0].error));
    out.push_str(&format!("sigma  = {:.6} ± {:.6}\n", p[1].value, p[1].error));
    out.push_str(&format!("A1     = {:.6} ± {:.6}\n", p[2].value, p[2].error));
    out.push_str(&format!("A2     = {:.6} ± {:.6}\n", p[3].value, p[3].error));
    out.push_str(&format!("b10,b11= {:.6},{:.6}\n", p[4].value, p[5].value));
    out.push_str(&format!("b20,b21= {:.6},{:.6}\n", p[6].value, p[7].value));
    out.push_str(&format!(
        "chi2/ndof = {:.2}/{} = {:.3}\n",
        outcome.chi2,
        outcome.ndof,
        outcome.chi2 / outcome.ndof.max(1) as f64
    ));
    out
}

/// Stderr line for a fit that did not meet the convergence criterion.
///
/// Non-convergence is reported, not fatal: the driver still prints and
/// plots the best parameter state.
pub fn convergence_warning(target: &str, outcome: &FitOutcome) -> Option<String> {
    if outcome.converged {
        None
    } else {
        Some(format!(
            "warning: fit of '{target}' did not converge after {} iterations ({})",
            outcome.n_iter, outcome.message
        ))
    }
}

/// Format the archive key listing printed after a successful open.
pub fn format_key_listing(path_display: &str, archive: &HistArchive) -> String {
    let mut out = String::new();
    out.push_str(&format!("Successfully opened histogram file: {path_display}\n"));
    for (name, kind) in archive.keys() {
        out.push_str(&format!("  {} ({})\n", name, kind.label()));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fit::minimizer::FittedParam;

    fn outcome(converged: bool) -> FitOutcome {
        FitOutcome {
            params: vec![
                FittedParam { name: "p0".to_string(), value: 9.5, error: 0.2 },
                FittedParam { name: "p1".to_string(), value: -0.4, error: 0.01 },
            ],
            chi2: 40.0,
            ndof: 48,
            n_iter: 12,
            n_eval: 80,
            converged,
            message: if converged {
                "chi-square change below tolerance".to_string()
            } else {
                "maximum iterations reached".to_string()
            },
            covariance: None,
        }
    }

    #[test]
    fn fit_params_block() {
        let s = format_fit_params("Fit results for dist1:", &outcome(true));
        assert!(s.starts_with("Fit results for dist1:\n"));
        assert!(s.contains("p0 = 9.500000 ± 0.200000"));
        assert!(s.contains("p1 = -0.400000 ± 0.010000"));
    }

    #[test]
    fn warning_only_when_not_converged() {
        assert!(convergence_warning("dist1", &outcome(true)).is_none());
        let w = convergence_warning("dist1", &outcome(false)).unwrap();
        assert!(w.contains("did not converge"));
        assert!(w.contains("dist1"));
    }
}
