use std::path::Path;
use std::process::ExitCode;

fn main() -> ExitCode {
    match histfit::progs::mkdata::run_default(Path::new(".")) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::from(err.exit_code())
        }
    }
}
