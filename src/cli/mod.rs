//! CLI argument parsing for tracelock.
//!
//! Uses clap derive macros for declarative argument definitions.
//! This module defines the command structure; actual implementations
//! are in the `commands` module.

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracelock::config::BackendKind;

/// Tracelock: administer the cross-process locks of a trace store.
///
/// Every store resource is guarded by a named semaphore. These commands
/// inspect, reset and remove those semaphores, and can hold a lock for
/// testing.
#[derive(Parser, Debug)]
#[command(name = "tracelock")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// State directory (default: $TRACELOCK_HOME, then ./.tracelock).
    #[arg(long, global = true)]
    pub state_dir: Option<PathBuf>,

    /// Semaphore backend, overriding the config file.
    #[arg(long, global = true, value_enum)]
    pub backend: Option<BackendArg>,

    /// Increase log verbosity (-v info, -vv debug). RUST_LOG overrides.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

/// Semaphore backend selectable on the command line.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendArg {
    Posix,
    File,
}

impl From<BackendArg> for BackendKind {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Posix => BackendKind::Posix,
            BackendArg::File => BackendKind::File,
        }
    }
}

/// Available commands for tracelock.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show the semaphore behind a resource's lock and whether it is free.
    Status(ResourceArgs),

    /// Release a resource's lock if it was left taken.
    ///
    /// Only use this on locks nobody is holding: resetting a lock that is
    /// legitimately held breaks its mutual exclusion.
    Reset(ResourceArgs),

    /// Remove a resource's semaphore entirely.
    Unlink(ResourceArgs),

    /// Acquire a resource's lock and hold it for a while.
    Hold(HoldArgs),
}

/// Arguments naming one resource.
#[derive(Parser, Debug)]
pub struct ResourceArgs {
    /// Resource identifier (URI).
    pub id: String,
}

/// Arguments for the `hold` command.
#[derive(Parser, Debug)]
pub struct HoldArgs {
    /// Resource identifier (URI).
    pub id: String,

    /// How long to hold the lock, in seconds.
    #[arg(long, default_value_t = 1.0)]
    pub seconds: f64,

    /// Maximum wait for the lock, in seconds (default: from config).
    #[arg(long)]
    pub timeout: Option<f64>,
}
