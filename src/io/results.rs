//! Write fit results as JSON.
//!
//! The JSON file is the machine-readable companion of the printed report
//! and the plot: program tag, chi-square diagnostics, convergence status,
//! and the per-parameter values and uncertainties.

use std::fs::File;
use std::path::Path;

use serde::Serialize;

use crate::error::AppError;
use crate::fit::minimizer::{FitOutcome, FittedParam};

/// Serialized record of one fit.
#[derive(Debug, Clone, Serialize)]
pub struct FitReport {
    pub program: String,
    pub target: String,
    pub chi2: f64,
    pub ndof: usize,
    pub converged: bool,
    pub message: String,
    pub params: Vec<FittedParam>,
}

impl FitReport {
    pub fn new(program: &str, target: &str, outcome: &FitOutcome) -> Self {
        Self {
            program: program.to_string(),
            target: target.to_string(),
            chi2: outcome.chi2,
            ndof: outcome.ndof,
            converged: outcome.converged,
            message: outcome.message.clone(),
            params: outcome.params.clone(),
        }
    }
}

/// Write one or more fit reports to a JSON file.
pub fn write_report_json(path: &Path, reports: &[FitReport]) -> Result<(), AppError> {
    let file = File::create(path).map_err(|e| {
        AppError::new(2, format!("Failed to create results JSON '{}': {e}", path.display()))
    })?;
    serde_json::to_writer_pretty(file, reports)
        .map_err(|e| AppError::new(2, format!("Failed to write results JSON: {e}")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_json_is_readable() {
        let outcome = FitOutcome {
            params: vec![
                FittedParam { name: "p0".to_string(), value: 1.5, error: 0.1 },
                FittedParam { name: "p1".to_string(), value: -0.3, error: 0.01 },
            ],
            chi2: 12.5,
            ndof: 48,
            n_iter: 7,
            n_eval: 40,
            converged: true,
            message: "chi-square change below tolerance".to_string(),
            covariance: None,
        };

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("r.json");
        let reports = vec![FitReport::new("expfit", "dist1", &outcome)];
        write_report_json(&path, &reports).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed[0]["target"], "dist1");
        assert_eq!(parsed[0]["params"][0]["name"], "p0");
        assert_eq!(parsed[0]["converged"], true);
    }
}
