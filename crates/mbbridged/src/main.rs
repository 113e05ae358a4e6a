use std::io::{self, Write};
use std::process::ExitCode;

fn main() -> ExitCode {
    match mbbridged::run_bridge() {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            let _ = writeln!(io::stderr(), "mbbridged: {error}");
            ExitCode::FAILURE
        }
    }
}
