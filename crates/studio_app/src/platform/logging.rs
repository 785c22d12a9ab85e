//! Logger setup for the `studio` binary.
//!
//! Always writes `./studio.log` in the current working directory; verbose runs
//! mirror the log to the terminal at debug level.

use std::fs::File;
use std::path::PathBuf;

use log::LevelFilter;
use simplelog::{
    ColorChoice, CombinedLogger, Config, ConfigBuilder, SharedLogger, TermLogger, TerminalMode,
    WriteLogger,
};

const LOG_FILE: &str = "./studio.log";

/// Destination for log output.
pub(crate) enum LogDestination {
    File,
    /// Log file plus stderr.
    Both,
}

impl LogDestination {
    pub(crate) fn for_verbosity(verbose: bool) -> Self {
        if verbose {
            LogDestination::Both
        } else {
            LogDestination::File
        }
    }

    fn level(&self) -> LevelFilter {
        match self {
            LogDestination::File => LevelFilter::Info,
            LogDestination::Both => LevelFilter::Debug,
        }
    }
}

pub(crate) fn initialize(destination: LogDestination) {
    let level = destination.level();
    let config = build_config();

    let mut loggers: Vec<Box<dyn SharedLogger>> = Vec::new();
    if let LogDestination::Both = destination {
        loggers.push(TermLogger::new(
            level,
            config.clone(),
            TerminalMode::Stderr,
            ColorChoice::Auto,
        ));
    }
    if let Some(file_logger) = create_file_logger(level, config) {
        loggers.push(file_logger);
    }
    if loggers.is_empty() {
        return;
    }

    let _ = CombinedLogger::init(loggers);
}

fn build_config() -> Config {
    ConfigBuilder::new()
        .set_time_format_rfc3339()
        .set_target_level(LevelFilter::Error)
        // Connection-pool chatter drowns out the request log.
        .add_filter_ignore_str("hyper")
        .add_filter_ignore_str("rustls")
        .build()
}

fn create_file_logger(level: LevelFilter, config: Config) -> Option<Box<WriteLogger<File>>> {
    let log_path = PathBuf::from(LOG_FILE);
    match File::create(&log_path) {
        Ok(file) => Some(WriteLogger::new(level, config, file)),
        Err(err) => {
            eprintln!("Warning: Could not create log file at {:?}: {}", log_path, err);
            None
        }
    }
}
