use std::process::ExitCode;

fn main() -> ExitCode {
    horizon_cli::run()
}
