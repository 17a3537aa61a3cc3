//! Tracelock: cross-process resource locking for a trace-based knowledge store.
//!
//! Store resources (root, bases, traces, models) are mutated by several
//! threads and worker processes at once. Each resource is guarded by a named,
//! OS-level semaphore keyed by its identifier:
//!
//! - [`semaphore`]: named semaphore backends (POSIX or counter files).
//! - [`locks`]: reentrant scoped locks with timeouts and stale-lock recovery.
//! - [`coordinator`]: which locks each resource operation takes, in order.
//! - [`resource`]: the view of a resource the locking layer consumes.

pub mod config;
pub mod context;
pub mod coordinator;
pub mod error;
pub mod events;
pub mod exit_codes;
pub mod locks;
pub mod resource;
pub mod semaphore;

#[cfg(test)]
mod test_support;
