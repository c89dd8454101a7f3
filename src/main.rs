//! metacache - cache the GitHub meta API response on disk
//!
//! Reuses a fresh cache, otherwise refreshes it through the GitHub CLI or a
//! direct HTTP request, and falls back to stale data when both fail.

use std::process::ExitCode;

use clap::Parser;

use metacache::cli::Cli;
use metacache::config::Config;
use metacache::{controller, logging};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init_logging();

    let config = match Config::from_cli(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    match controller::run(&config).await {
        Ok(outcome) => outcome.exit_code(),
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
