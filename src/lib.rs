//! `histfit` library crate.
//!
//! Chi-square fits of binned histogram data against parametric models,
//! with a Migrad-style Levenberg–Marquardt minimizer, SVG diagnostics and
//! a small binary archive format for the inputs.
//!
//! The binaries (`expfit`, `simfit`, `sigfit`, `mkdata`) are thin wrappers
//! around the drivers in [`progs`] so that:
//!
//! - core logic is testable without spawning processes
//! - modules are reusable across the three analysis programs

pub mod data;
pub mod error;
pub mod fit;
pub mod hist;
pub mod io;
pub mod math;
pub mod models;
pub mod plot;
pub mod progs;
pub mod report;
