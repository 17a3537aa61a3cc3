//! Command implementations for tracelock.
//!
//! Each command resolves the state directory, loads the configuration,
//! builds a lock manager over the configured backend, and acts on one
//! resource lock.

use crate::cli::{Cli, Command, HoldArgs, ResourceArgs};
use serde_json::json;
use std::io::Write;
use std::time::Duration;
use tracelock::config::Config;
use tracelock::context::StoreContext;
use tracelock::error::{LockError, Result};
use tracelock::events::{Event, EventAction, append_event};
use tracelock::locks::LockManager;
use tracelock::resource::DetachedResource;
use tracelock::semaphore::SemaphoreName;

/// Dispatch a command to its implementation.
pub fn dispatch(cli: Cli) -> Result<()> {
    let ctx = StoreContext::resolve(cli.state_dir.as_deref())?;
    let mut config = Config::load_or_default(&ctx.config_path)?;
    if let Some(backend) = cli.backend {
        config.backend = backend.into();
    }
    let manager = LockManager::from_config(&config, &ctx.locks_dir)?;
    tracing::debug!(state_dir = %ctx.state_dir.display(), backend = %config.backend, "resolved store");

    match cli.command {
        Command::Status(args) => cmd_status(&manager, args),
        Command::Reset(args) => cmd_reset(&ctx, &config, &manager, args),
        Command::Unlink(args) => cmd_unlink(&ctx, &config, &manager, args),
        Command::Hold(args) => cmd_hold(&manager, args),
    }
}

fn cmd_status(manager: &LockManager, args: ResourceArgs) -> Result<()> {
    let status = manager.status(&args.id)?;
    println!("{}", status);
    if status.looks_stale() {
        println!("Hint: no holder is known in this process; if no other process holds it, run `tracelock reset`.");
    }
    Ok(())
}

fn cmd_reset(
    ctx: &StoreContext,
    config: &Config,
    manager: &LockManager,
    args: ResourceArgs,
) -> Result<()> {
    let name = SemaphoreName::for_resource(&args.id)?;
    let outcome = manager.reset(&args.id)?;

    let event = Event::new(EventAction::Reset, &args.id).with_details(json!({
        "semaphore": name.as_str(),
        "backend": config.backend.as_str(),
        "outcome": outcome.to_string(),
    }));
    append_event(ctx, &event)?;

    println!("Reset {}: {}", args.id, outcome);
    Ok(())
}

fn cmd_unlink(
    ctx: &StoreContext,
    config: &Config,
    manager: &LockManager,
    args: ResourceArgs,
) -> Result<()> {
    let name = SemaphoreName::for_resource(&args.id)?;
    manager.unlink(&args.id)?;

    let event = Event::new(EventAction::Unlink, &args.id).with_details(json!({
        "semaphore": name.as_str(),
        "backend": config.backend.as_str(),
    }));
    append_event(ctx, &event)?;

    println!("Unlinked {}", args.id);
    Ok(())
}

fn cmd_hold(manager: &LockManager, args: HoldArgs) -> Result<()> {
    let hold_for = seconds_arg("--seconds", args.seconds)?;
    let timeout = args
        .timeout
        .map(|t| seconds_arg("--timeout", t))
        .transpose()?;
    let res = DetachedResource::new(&args.id);

    let guard = manager.acquire_scope(&args.id, &res, timeout, "hold")?;
    println!("acquired {}", args.id);
    // Callers (and tests) wait for this line before contending.
    std::io::stdout()
        .flush()
        .map_err(|e| LockError::Io(format!("failed to flush stdout: {}", e)))?;

    std::thread::sleep(hold_for);
    guard.release()?;
    println!("released {}", args.id);
    Ok(())
}

fn seconds_arg(flag: &str, value: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(value)
        .map_err(|_| LockError::Config(format!("{} must be a non-negative number of seconds", flag)))
}
