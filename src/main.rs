//! tlsfront command line tool
//!
//! Resolves and validates the configuration. With `--test` the resolved
//! configuration is printed as JSON and the process exits.

use log::info;
use std::process::ExitCode;

use tlsfront::common::log::init_early_logger;
use tlsfront::common::{init_logger, Result};
use tlsfront::config::{self, log_config, Outcome};
use tlsfront::{APP_NAME, VERSION};

fn run() -> Result<()> {
    init_early_logger()?;

    let args: Vec<String> = std::env::args().collect();

    let config = match config::resolve(args)? {
        Outcome::Help(text) => {
            println!("{}", text);
            return Ok(());
        }
        Outcome::Version => {
            println!("{} {}", APP_NAME, VERSION);
            return Ok(());
        }
        Outcome::Run(config) => config,
    };

    init_logger(&config.logging)?;
    info!("Starting {} v{}", APP_NAME, VERSION);

    if config.test_only {
        println!("{}", serde_json::to_string_pretty(&config)?);
        info!("Configuration is valid");
        return Ok(());
    }

    let config = config::install(config);
    log_config(&config);

    Ok(())
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}: {}", APP_NAME, e);
            ExitCode::FAILURE
        }
    }
}
