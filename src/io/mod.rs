//! File input/output: the histogram archive and the fit-report JSON.

pub mod archive;
pub mod results;

pub use archive::{HistArchive, HistKind, HistRecord};
pub use results::{FitReport, write_report_json};
