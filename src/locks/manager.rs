//! Lock acquisition and per-lock holder slots.

use super::guard::ScopedGuard;
use super::holder::{Holder, HolderInfo};
use crate::config::Config;
use crate::error::{LockError, Result};
use crate::resource::Resource;
use crate::semaphore::{self, SemaphoreBackend, SemaphoreName};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

/// Process-local bookkeeping for one resource lock.
#[derive(Debug, Default)]
pub(crate) struct LockSlot {
    holder: Mutex<Option<Holder>>,
}

impl LockSlot {
    fn holder(&self) -> MutexGuard<'_, Option<Holder>> {
        // The record is diagnostic; a panic in another holder must not wedge it.
        self.holder.lock().unwrap_or_else(|poison| poison.into_inner())
    }

    pub(crate) fn is_held_by_current_thread(&self) -> bool {
        let current = thread::current().id();
        self.holder()
            .as_ref()
            .is_some_and(|holder| holder.thread == current)
    }

    pub(crate) fn set(&self, holder: Holder) {
        *self.holder() = Some(holder);
    }

    pub(crate) fn clear(&self) {
        *self.holder() = None;
    }

    pub(crate) fn info(&self) -> Option<HolderInfo> {
        self.holder().as_ref().map(|holder| holder.info.clone())
    }
}

/// Hands out scoped locks over named semaphores.
///
/// A manager is meant to be shared (`Arc<LockManager>`) by every thread of a
/// process; holder tracking and reentrancy only work between guards issued
/// by the same manager.
#[derive(Debug)]
pub struct LockManager {
    backend: Arc<dyn SemaphoreBackend>,
    default_timeout: Duration,
    slots: Mutex<HashMap<String, Arc<LockSlot>>>,
}

impl LockManager {
    pub fn new(backend: Arc<dyn SemaphoreBackend>, default_timeout: Duration) -> Self {
        Self {
            backend,
            default_timeout,
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Build a manager from configuration.
    ///
    /// `default_locks_dir` is where the file backend keeps its counters
    /// unless the config overrides it.
    pub fn from_config(config: &Config, default_locks_dir: &Path) -> Result<Self> {
        let backend = semaphore::backend_from_config(config, default_locks_dir)?;
        Ok(Self::new(backend, config.default_timeout()?))
    }

    pub fn backend(&self) -> &Arc<dyn SemaphoreBackend> {
        &self.backend
    }

    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    fn slots(&self) -> MutexGuard<'_, HashMap<String, Arc<LockSlot>>> {
        self.slots.lock().unwrap_or_else(|poison| poison.into_inner())
    }

    /// The slot for `id`, registering it on first use. Only called once
    /// the id is known to name a valid semaphore.
    fn slot(&self, id: &str) -> Arc<LockSlot> {
        Arc::clone(self.slots().entry(id.to_string()).or_default())
    }

    fn find_slot(&self, id: &str) -> Option<Arc<LockSlot>> {
        self.slots().get(id).cloned()
    }

    #[cfg(test)]
    pub(crate) fn tracked_locks(&self) -> usize {
        self.slots().len()
    }

    pub(crate) fn forget(&self, id: &str) {
        self.slots().remove(id);
    }

    /// The holder of `id`'s lock, if it is held in this process.
    pub fn holder(&self, id: &str) -> Option<HolderInfo> {
        self.find_slot(id).and_then(|slot| slot.info())
    }

    /// True if the calling thread holds `id`'s lock.
    pub fn is_held_by_current_thread(&self, id: &str) -> bool {
        self.find_slot(id)
            .is_some_and(|slot| slot.is_held_by_current_thread())
    }

    /// Lock the resource `lock_id` on behalf of `target`.
    ///
    /// `lock_id` names the lock to take (the resource itself, or a coarser
    /// resource such as the root); `target` is the resource the caller is
    /// about to work on, and is checked for existence once the lock is held.
    ///
    /// # Arguments
    ///
    /// * `lock_id` - Identifier of the resource whose lock is taken
    /// * `target` - The resource the protected operation works on
    /// * `timeout` - Maximum wait; `None` uses the manager's default
    /// * `action` - Label recorded for diagnostics (edit/post/delete/...)
    ///
    /// # Returns
    ///
    /// * `Ok(ScopedGuard)` - The lock is held until the guard is dropped
    /// * `Err(LockError::ResourceBusy)` - The timeout expired
    /// * `Err(LockError::StaleResource)` - `target` was deleted while waiting;
    ///   the lock has already been released again
    pub fn acquire_scope(
        &self,
        lock_id: &str,
        target: &dyn Resource,
        timeout: Option<Duration>,
        action: &str,
    ) -> Result<ScopedGuard> {
        let name = SemaphoreName::for_resource(lock_id)?;
        let slot = self.slot(lock_id);

        if slot.is_held_by_current_thread() {
            tracing::debug!(lock = lock_id, action, "re-entering held lock");
            return Ok(ScopedGuard::reentrant(lock_id, slot));
        }

        let mut semaphore = self.backend.obtain(&name)?;
        let timeout = timeout.unwrap_or(self.default_timeout);

        if !semaphore.acquire(timeout)? {
            let holder = slot
                .info()
                .map(|info| info.to_string())
                .unwrap_or_else(|| "unknown".to_string());
            tracing::debug!(lock = lock_id, action, ?timeout, %holder, "lock busy");
            return Err(LockError::ResourceBusy {
                resource: lock_id.to_string(),
                holder,
            });
        }

        slot.set(Holder::current(action));
        let guard = ScopedGuard::acquired(lock_id, slot, semaphore);
        tracing::debug!(lock = lock_id, action, "lock acquired");

        if target.state_is_empty() {
            target.mark_deleted();
            tracing::debug!(
                lock = lock_id,
                resource = target.id(),
                "resource deleted while waiting for its lock"
            );
            // Dropping the guard releases the semaphore.
            return Err(LockError::StaleResource {
                resource: target.id().to_string(),
            });
        }

        Ok(guard)
    }

    /// Run `body` while holding `lock_id`'s lock.
    ///
    /// The lock is released on every exit path, including when `body`
    /// returns an error or panics.
    pub fn with_lock<T, E>(
        &self,
        lock_id: &str,
        target: &dyn Resource,
        timeout: Option<Duration>,
        action: &str,
        body: impl FnOnce() -> std::result::Result<T, E>,
    ) -> std::result::Result<T, E>
    where
        E: From<LockError>,
    {
        let _guard = self.acquire_scope(lock_id, target, timeout, action)?;
        body()
    }
}
