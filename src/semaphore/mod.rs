//! Named, cross-process counting semaphores.
//!
//! A semaphore is identified by a [`SemaphoreName`] derived from a resource
//! identifier. Obtaining a name that does not exist yet creates it with a
//! count of 1; the semaphore then persists (outside this process) until it
//! is explicitly unlinked.
//!
//! Two backends implement [`SemaphoreBackend`]:
//! - [`posix::PosixBackend`]: POSIX named semaphores (Linux).
//! - [`file::FileBackend`]: counter files guarded by advisory `flock`.

pub mod file;
mod name;
#[cfg(target_os = "linux")]
pub mod posix;


pub use name::{MAX_NAME_LEN, SemaphoreName};

use crate::config::{BackendKind, Config};
use crate::error::{LockError, Result};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// An open handle on a named semaphore. Dropping the handle closes it
/// without changing the count.
pub trait Semaphore: Send {
    /// Decrement the count, waiting up to `timeout` for it to become positive.
    ///
    /// Returns `Ok(false)` if the timeout expired.
    fn acquire(&mut self, timeout: Duration) -> Result<bool>;

    /// Increment the count.
    fn release(&mut self) -> Result<()>;

    /// The count as currently observed. Racy by nature; for diagnostics
    /// and stale-lock recovery only.
    fn value(&mut self) -> Result<u32>;

    fn name(&self) -> &SemaphoreName;
}

/// Registry of named semaphores.
pub trait SemaphoreBackend: Send + Sync + fmt::Debug {
    /// Open the semaphore for `name`, creating it with a count of 1 if absent.
    fn obtain(&self, name: &SemaphoreName) -> Result<Box<dyn Semaphore>>;

    /// Destroy the semaphore for `name`. Unlinking a missing name is a no-op.
    fn unlink(&self, name: &SemaphoreName) -> Result<()>;

    fn kind(&self) -> BackendKind;
}

/// Build the backend selected by `config`.
///
/// `default_locks_dir` is used by the file backend when the config does not
/// set `locks_dir`.
pub fn backend_from_config(
    config: &Config,
    default_locks_dir: &Path,
) -> Result<Arc<dyn SemaphoreBackend>> {
    match config.backend {
        BackendKind::File => {
            let dir = config
                .locks_dir
                .clone()
                .unwrap_or_else(|| default_locks_dir.to_path_buf());
            Ok(Arc::new(file::FileBackend::new(dir, config.poll_interval())?))
        }
        #[cfg(target_os = "linux")]
        BackendKind::Posix => Ok(Arc::new(posix::PosixBackend::new())),
        #[cfg(not(target_os = "linux"))]
        BackendKind::Posix => Err(LockError::Config(
            "the posix semaphore backend is only available on Linux; use `backend: file`"
                .to_string(),
        )),
    }
}

/// Map an I/O error raised while creating or opening a semaphore.
///
/// Exhaustion of OS resources is reported separately so callers can tell a
/// system limit from an ordinary failure.
pub(crate) fn open_error(name: &SemaphoreName, err: std::io::Error) -> LockError {
    if is_exhaustion(&err) {
        LockError::OsResourceExhausted {
            name: name.to_string(),
            message: err.to_string(),
        }
    } else {
        LockError::Io(format!("failed to open semaphore '{}': {}", name, err))
    }
}

#[cfg(unix)]
fn is_exhaustion(err: &std::io::Error) -> bool {
    matches!(
        err.raw_os_error(),
        Some(libc::ENOMEM) | Some(libc::ENFILE) | Some(libc::EMFILE) | Some(libc::ENOSPC)
    )
}

#[cfg(not(unix))]
fn is_exhaustion(err: &std::io::Error) -> bool {
    err.kind() == std::io::ErrorKind::OutOfMemory
}
