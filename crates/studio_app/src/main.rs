use std::process::ExitCode;

use clap::Parser;
use engine_logging::engine_error;

mod cli;
mod platform;

use cli::Cli;
use platform::logging::{self, LogDestination};

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::initialize(LogDestination::for_verbosity(cli.verbose));

    match platform::run_app(cli) {
        Ok(code) => code,
        Err(err) => {
            engine_error!("{err:#}");
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
