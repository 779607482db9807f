use std::path::Path;
use std::process::ExitCode;

fn main() -> ExitCode {
    let input = Path::new(histfit::progs::simfit::INPUT_FILE);
    match histfit::progs::simfit::run(input, Path::new(".")) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::from(err.exit_code())
        }
    }
}
