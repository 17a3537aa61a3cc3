//! Tracelock: administrative CLI for store resource locks.
//!
//! This is the main entry point for the `tracelock` CLI. It parses arguments,
//! installs logging, dispatches to the command handler, and maps errors to
//! exit codes.

mod cli;
mod commands;

use cli::Cli;
use std::process::ExitCode;
use tracelock::exit_codes;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cli = Cli::parse_args();
    init_logging(cli.verbose);

    match commands::dispatch(cli) {
        Ok(()) => ExitCode::from(exit_codes::SUCCESS as u8),
        Err(err) => {
            // Print user-actionable error message to stderr
            eprintln!("Error: {}", err);

            ExitCode::from(err.exit_code() as u8)
        }
    }
}

/// Log to stderr; `RUST_LOG` takes precedence over `-v`.
fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
