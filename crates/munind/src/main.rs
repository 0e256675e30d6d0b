use std::process::ExitCode;

use clap::Parser;
use munin_config::CliOverrides;

fn main() -> ExitCode {
    let overrides = CliOverrides::parse();
    match munind::run_daemon(overrides) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("munind: {error}");
            ExitCode::FAILURE
        }
    }
}
