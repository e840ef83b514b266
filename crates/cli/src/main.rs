use std::process::ExitCode;

fn main() -> ExitCode {
    tripxl_cli::run()
}
