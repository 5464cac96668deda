//! # acisfp
//!
//! Command-line entry point. Logs go to stderr, results to stdout.

use acisfp::cli;
use acisfp::config::Cli;
use clap::Parser;
use std::io::Write;
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("acisfp=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli::run(&cli) {
        Ok(output) => {
            let mut stdout = std::io::stdout().lock();
            if let Err(e) = stdout.write_all(output.as_bytes()) {
                error!(error = %e, "Failed to write output");
                return ExitCode::FAILURE;
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "acisfp failed");
            ExitCode::from(e.exit_code())
        }
    }
}
