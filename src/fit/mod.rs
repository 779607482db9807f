//! Chi-square objective construction and minimization.

pub mod chi2;
pub mod minimizer;

pub use chi2::{BinnedChi2, Dataset, ErrorMode, ResidualObjective};
pub use minimizer::{
    ErrorScaling, FitOutcome, FittedParam, MinimizerConfig, ParamSpec, minimize,
};
