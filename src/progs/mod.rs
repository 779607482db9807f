//! Program drivers.
//!
//! Each submodule is the "real main" of one binary: a linear script that
//! opens the archive, runs its fits, prints the results, and renders the
//! plots. The binaries under `src/bin/` are thin wrappers that hard-code
//! the input path and map `AppError` to an exit code, so the drivers stay
//! testable without spawning processes.

pub mod expfit;
pub mod mkdata;
pub mod sigfit;
pub mod simfit;
