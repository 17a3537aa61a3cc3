//! Reentrant, cross-process resource locks.
//!
//! Every resource identifier maps to one named semaphore with a count of 1
//! (see [`crate::semaphore`]). A [`LockManager`] hands out [`ScopedGuard`]s
//! over those semaphores:
//!
//! - A thread that already holds a resource's lock re-enters without
//!   touching the semaphore. Only the outermost guard releases it.
//! - Any other thread or process waits up to a timeout, then fails with
//!   [`LockError::ResourceBusy`](crate::error::LockError::ResourceBusy).
//! - Once acquired, the target resource is re-validated: if its state has
//!   become empty it is marked deleted and the acquisition fails with
//!   [`LockError::StaleResource`](crate::error::LockError::StaleResource).
//!
//! # Holder bookkeeping
//!
//! Each lock id has its own process-local slot recording the holding thread
//! and some [`HolderInfo`] for diagnostics. Holder information is never
//! shared between processes; a busy error caused by another process reports
//! the holder as `unknown`.
//!
//! # Recovery
//!
//! [`LockManager::reset`] and [`LockManager::unlink`] normalize and destroy
//! semaphores around resource creation and deletion.

mod guard;
mod holder;
mod manager;
mod recovery;
mod types;

#[cfg(test)]
mod tests;

// Re-export public API
pub use guard::ScopedGuard;
pub use holder::{HolderInfo, get_owner_string as holder_owner_string};
pub use manager::LockManager;
pub use types::{LockStatus, ResetOutcome};
