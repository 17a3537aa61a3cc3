//! POSIX named semaphores (`sem_overview(7)`).
//!
//! Semaphores live in the kernel's shared namespace (`/dev/shm/sem.*` on
//! Linux) and are visible to every process on the host. Timed waits use
//! `CLOCK_REALTIME`, so a wall-clock jump shortens or stretches a wait.

use super::{Semaphore, SemaphoreBackend, SemaphoreName, open_error};
use crate::config::BackendKind;
use crate::error::{LockError, Result};
use std::ffi::CString;
use std::io;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Permission bits for newly created semaphores.
const SEMAPHORE_MODE: libc::c_uint = 0o600;

/// Backend over the host's POSIX named-semaphore namespace.
#[derive(Debug, Default, Clone, Copy)]
pub struct PosixBackend;

impl PosixBackend {
    pub fn new() -> Self {
        Self
    }
}

impl SemaphoreBackend for PosixBackend {
    fn obtain(&self, name: &SemaphoreName) -> Result<Box<dyn Semaphore>> {
        Ok(Box::new(PosixSemaphore::open(name)?))
    }

    fn unlink(&self, name: &SemaphoreName) -> Result<()> {
        let c_name = c_name(name)?;
        // SAFETY: `c_name` is a valid NUL-terminated string for the duration of the call.
        let rc = unsafe { libc::sem_unlink(c_name.as_ptr()) };
        if rc == 0 {
            return Ok(());
        }

        let err = io::Error::last_os_error();
        if err.raw_os_error() == Some(libc::ENOENT) {
            return Ok(());
        }
        Err(LockError::Io(format!(
            "failed to unlink semaphore '{}': {}",
            name, err
        )))
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Posix
    }
}

/// An open POSIX semaphore handle. Closed (not unlinked) on drop.
#[derive(Debug)]
pub struct PosixSemaphore {
    name: SemaphoreName,
    sem: *mut libc::sem_t,
}

// SAFETY: a `sem_t*` returned by `sem_open` may be used from any thread, and
// the handle is only ever used through `&mut self`.
unsafe impl Send for PosixSemaphore {}

impl PosixSemaphore {
    /// Open `name`, creating it with a count of 1 if it does not exist.
    pub fn open(name: &SemaphoreName) -> Result<Self> {
        let c_name = c_name(name)?;
        // SAFETY: `c_name` is NUL-terminated; O_CREAT requires the mode and
        // initial value varargs, passed as promoted unsigned ints.
        let sem = unsafe {
            libc::sem_open(
                c_name.as_ptr(),
                libc::O_CREAT,
                SEMAPHORE_MODE,
                1 as libc::c_uint,
            )
        };
        if sem == libc::SEM_FAILED {
            return Err(open_error(name, io::Error::last_os_error()));
        }

        Ok(Self {
            name: name.clone(),
            sem,
        })
    }
}

impl Semaphore for PosixSemaphore {
    fn acquire(&mut self, timeout: Duration) -> Result<bool> {
        let deadline = realtime_deadline(timeout);
        loop {
            // SAFETY: `self.sem` is a live handle from `sem_open`; `deadline` outlives the call.
            let rc = unsafe { libc::sem_timedwait(self.sem, &deadline) };
            if rc == 0 {
                return Ok(true);
            }

            let err = io::Error::last_os_error();
            match err.raw_os_error() {
                Some(libc::EINTR) => continue,
                Some(libc::ETIMEDOUT) => return Ok(false),
                _ => {
                    return Err(LockError::Io(format!(
                        "failed to wait on semaphore '{}': {}",
                        self.name, err
                    )));
                }
            }
        }
    }

    fn release(&mut self) -> Result<()> {
        // SAFETY: `self.sem` is a live handle from `sem_open`.
        let rc = unsafe { libc::sem_post(self.sem) };
        if rc != 0 {
            return Err(LockError::Io(format!(
                "failed to release semaphore '{}': {}",
                self.name,
                io::Error::last_os_error()
            )));
        }
        Ok(())
    }

    fn value(&mut self) -> Result<u32> {
        let mut value: libc::c_int = 0;
        // SAFETY: `self.sem` is a live handle and `value` is a valid out pointer.
        let rc = unsafe { libc::sem_getvalue(self.sem, &mut value) };
        if rc != 0 {
            return Err(LockError::Io(format!(
                "failed to read semaphore '{}': {}",
                self.name,
                io::Error::last_os_error()
            )));
        }
        // Linux reports 0 rather than a negative waiter count.
        Ok(value.max(0) as u32)
    }

    fn name(&self) -> &SemaphoreName {
        &self.name
    }
}

impl Drop for PosixSemaphore {
    fn drop(&mut self) {
        // SAFETY: `self.sem` came from `sem_open` and is closed exactly once.
        if unsafe { libc::sem_close(self.sem) } != 0 {
            tracing::warn!(
                semaphore = %self.name,
                error = %io::Error::last_os_error(),
                "failed to close semaphore"
            );
        }
    }
}

fn c_name(name: &SemaphoreName) -> Result<CString> {
    CString::new(name.as_str()).map_err(|_| LockError::InvalidName {
        id: name.resource_id().to_string(),
        reason: "semaphore name contains a NUL byte".to_string(),
    })
}

/// Absolute `CLOCK_REALTIME` deadline `timeout` from now, saturating far in the future.
fn realtime_deadline(timeout: Duration) -> libc::timespec {
    let at = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .saturating_add(timeout);

    // SAFETY: timespec is plain old data; zeroing also clears any padding fields.
    let mut ts: libc::timespec = unsafe { std::mem::zeroed() };
    ts.tv_sec = at.as_secs().min(libc::time_t::MAX as u64) as libc::time_t;
    ts.tv_nsec = at.subsec_nanos() as libc::c_long;
    ts
}
