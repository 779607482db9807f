//! Binned histogram data.

mod types;

pub use types::{Hist1D, Hist2D};
