//! RAII guard for a held resource lock.

use super::manager::LockSlot;
use crate::error::Result;
use crate::semaphore::Semaphore;
use std::sync::Arc;

/// Scoped hold on a resource lock.
///
/// When dropped, the holder record is cleared, the semaphore is released and
/// its handle closed. A reentrant guard (issued to a thread that already held
/// the lock) does nothing on drop; the outermost guard releases.
/// If release fails during drop, a warning is logged but no panic occurs.
pub struct ScopedGuard {
    lock_id: String,
    slot: Arc<LockSlot>,
    semaphore: Option<Box<dyn Semaphore>>,
    reentrant: bool,
}

impl ScopedGuard {
    pub(super) fn acquired(lock_id: &str, slot: Arc<LockSlot>, semaphore: Box<dyn Semaphore>) -> Self {
        Self {
            lock_id: lock_id.to_string(),
            slot,
            semaphore: Some(semaphore),
            reentrant: false,
        }
    }

    pub(super) fn reentrant(lock_id: &str, slot: Arc<LockSlot>) -> Self {
        Self {
            lock_id: lock_id.to_string(),
            slot,
            semaphore: None,
            reentrant: true,
        }
    }

    /// Identifier of the locked resource.
    pub fn lock_id(&self) -> &str {
        &self.lock_id
    }

    /// True if this guard re-entered a lock the thread already held.
    pub fn is_reentrant(&self) -> bool {
        self.reentrant
    }

    /// Manually release the lock.
    ///
    /// This is useful when you want to release the lock before the guard
    /// goes out of scope, and want to handle errors explicitly.
    pub fn release(mut self) -> Result<()> {
        self.release_inner()
    }

    fn release_inner(&mut self) -> Result<()> {
        let Some(mut semaphore) = self.semaphore.take() else {
            return Ok(());
        };

        self.slot.clear();
        let result = semaphore.release();
        tracing::debug!(lock = %self.lock_id, semaphore = %semaphore.name(), "lock released");
        // Dropping the handle closes it.
        drop(semaphore);
        result
    }
}

impl std::fmt::Debug for ScopedGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopedGuard")
            .field("lock_id", &self.lock_id)
            .field("reentrant", &self.reentrant)
            .field("held", &self.semaphore.is_some())
            .finish()
    }
}

impl Drop for ScopedGuard {
    fn drop(&mut self) {
        if let Err(e) = self.release_inner() {
            tracing::warn!(lock = %self.lock_id, error = %e, "failed to release lock");
        }
    }
}
