//! Stale-lock recovery: normalizing and destroying resource semaphores.

use super::manager::LockManager;
use super::types::{LockStatus, ResetOutcome};
use crate::error::Result;
use crate::semaphore::SemaphoreName;

impl LockManager {
    /// Make sure `id`'s semaphore is free.
    ///
    /// Opens (or creates at 1) the semaphore; if its count is 0, releases it
    /// once. Idempotent, and called after a resource is created so that a new
    /// resource never inherits a stale semaphore left under the same name.
    ///
    /// # Known race
    ///
    /// The check and the release are not atomic. If a legitimate holder has
    /// the semaphore at 0 when `reset` runs, `reset` releases it to 1 and the
    /// holder's own release later raises it to 2. From then on two contexts
    /// can hold the lock at once, until the semaphore is unlinked or
    /// corrected by hand. Only run `reset` on locks nobody should be holding.
    pub fn reset(&self, id: &str) -> Result<ResetOutcome> {
        let name = SemaphoreName::for_resource(id)?;
        let mut semaphore = self.backend().obtain(&name)?;

        if semaphore.value()? == 0 {
            semaphore.release()?;
            tracing::info!(resource = id, semaphore = %name, "reset stale lock");
            return Ok(ResetOutcome::Released);
        }
        Ok(ResetOutcome::AlreadyFree)
    }

    /// Destroy `id`'s semaphore.
    ///
    /// Called once, after the resource's deletion has been acknowledged and
    /// every lock protecting the deletion has been released. A later
    /// acquisition on the same id creates a fresh semaphore at 1.
    pub fn unlink(&self, id: &str) -> Result<()> {
        let name = SemaphoreName::for_resource(id)?;
        self.backend().unlink(&name)?;
        self.forget(id);
        tracing::info!(resource = id, semaphore = %name, "unlinked lock");
        Ok(())
    }

    /// Report the observed state of `id`'s lock.
    ///
    /// Creates the semaphore (at 1) if it does not exist yet.
    pub fn status(&self, id: &str) -> Result<LockStatus> {
        let name = SemaphoreName::for_resource(id)?;
        let value = self.backend().obtain(&name)?.value()?;

        Ok(LockStatus {
            id: id.to_string(),
            name: name.to_string(),
            value,
            holder: self.holder(id),
        })
    }
}
