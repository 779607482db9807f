use std::path::Path;
use std::process::ExitCode;

fn main() -> ExitCode {
    let input = Path::new(histfit::progs::expfit::INPUT_FILE);
    match histfit::progs::expfit::run(input, Path::new(".")) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::from(err.exit_code())
        }
    }
}
