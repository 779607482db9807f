//! Generate the demo archives consumed by the fit programs.

use std::path::Path;

use crate::data::{DEMO_SEED, make_distros, make_experiments, make_fit_inputs};
use crate::error::AppError;
use crate::io::archive::HistArchive;

/// Write `distros.hpk`, `experiments.hpk` and `fitinputs.hpk` into `dir`.
pub fn run(dir: &Path, seed: u64) -> Result<(), AppError> {
    let outputs = [
        ("distros.hpk", make_distros(seed)?),
        ("experiments.hpk", make_experiments(seed)?),
        ("fitinputs.hpk", make_fit_inputs(seed)?),
    ];

    for (name, records) in &outputs {
        let path = dir.join(name);
        HistArchive::write(&path, records)?;
        println!("wrote {}", path.display());
    }

    Ok(())
}

/// Run with the default demo seed.
pub fn run_default(dir: &Path) -> Result<(), AppError> {
    run(dir, DEMO_SEED)
}
