//! Hierarchical lock acquisition for resource operations.
//!
//! | Operation | Locks (in order) |
//! |-----------|------------------|
//! | edit      | self             |
//! | post      | self             |
//! | delete    | root, then self  |
//! | create    | none; reset after creation |
//!
//! Locks are taken through a [`LockChain`], which releases them in reverse
//! order when dropped. If any acquisition in a plan fails, the locks already
//! taken are released before the error is returned.
//!
//! The store calls into [`LockCoordinator`] at fixed points of a resource's
//! lifecycle: around every edit/post/delete, after a resource is physically
//! created ([`LockCoordinator::after_create`]) and after its deletion is
//! acknowledged ([`LockCoordinator::after_delete_ack`]).

mod plan;


pub use plan::{LockPlan, Operation};

use crate::error::{LockError, Result};
use crate::locks::{LockManager, ResetOutcome, ScopedGuard};
use crate::resource::Resource;
use std::sync::Arc;
use std::time::Duration;

/// Locks held for one operation. Released innermost first on drop.
#[derive(Debug, Default)]
pub struct LockChain {
    guards: Vec<ScopedGuard>,
}

impl LockChain {
    /// Ids of the locks in acquisition order.
    pub fn lock_ids(&self) -> Vec<&str> {
        self.guards.iter().map(|guard| guard.lock_id()).collect()
    }

    pub fn len(&self) -> usize {
        self.guards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.guards.is_empty()
    }
}

impl Drop for LockChain {
    fn drop(&mut self) {
        while let Some(guard) = self.guards.pop() {
            drop(guard);
        }
    }
}

/// Applies lock plans to resource operations.
#[derive(Debug, Clone)]
pub struct LockCoordinator {
    manager: Arc<LockManager>,
}

impl LockCoordinator {
    pub fn new(manager: Arc<LockManager>) -> Self {
        Self { manager }
    }

    pub fn manager(&self) -> &LockManager {
        &self.manager
    }

    /// Take every lock `operation` needs on `resource`.
    pub fn lock_for(
        &self,
        operation: Operation,
        resource: &dyn Resource,
        timeout: Option<Duration>,
    ) -> Result<LockChain> {
        let plan = LockPlan::for_operation(operation, resource);
        let mut chain = LockChain::default();

        for lock_id in plan.lock_ids() {
            // On error `chain` drops here, releasing what was already taken.
            let guard =
                self.manager
                    .acquire_scope(lock_id, resource, timeout, operation.as_str())?;
            chain.guards.push(guard);
        }

        Ok(chain)
    }

    fn run<T, E>(
        &self,
        operation: Operation,
        resource: &dyn Resource,
        timeout: Option<Duration>,
        body: impl FnOnce() -> std::result::Result<T, E>,
    ) -> std::result::Result<T, E>
    where
        E: From<LockError>,
    {
        let _chain = self.lock_for(operation, resource, timeout)?;
        body()
    }

    /// Mutate `resource`'s content under its own lock.
    pub fn edit<T, E>(
        &self,
        resource: &dyn Resource,
        timeout: Option<Duration>,
        body: impl FnOnce() -> std::result::Result<T, E>,
    ) -> std::result::Result<T, E>
    where
        E: From<LockError>,
    {
        self.run(Operation::Edit, resource, timeout, body)
    }

    /// Create a child of `resource` under `resource`'s lock.
    pub fn post<T, E>(
        &self,
        resource: &dyn Resource,
        timeout: Option<Duration>,
        body: impl FnOnce() -> std::result::Result<T, E>,
    ) -> std::result::Result<T, E>
    where
        E: From<LockError>,
    {
        self.run(Operation::Post, resource, timeout, body)
    }

    /// Delete `resource` under its root's lock and its own.
    pub fn delete<T, E>(
        &self,
        resource: &dyn Resource,
        timeout: Option<Duration>,
        body: impl FnOnce() -> std::result::Result<T, E>,
    ) -> std::result::Result<T, E>
    where
        E: From<LockError>,
    {
        self.run(Operation::Delete, resource, timeout, body)
    }

    /// Delete `resource`, then acknowledge the deletion by unlinking its
    /// semaphore once every lock has been released.
    pub fn delete_and_ack<T, E>(
        &self,
        resource: &dyn Resource,
        timeout: Option<Duration>,
        body: impl FnOnce() -> std::result::Result<T, E>,
    ) -> std::result::Result<T, E>
    where
        E: From<LockError>,
    {
        let out = self.delete(resource, timeout, body)?;
        self.after_delete_ack(resource.id())?;
        Ok(out)
    }

    /// Create the resource `id` with `body`, then reset its lock.
    ///
    /// Nothing can contend for a resource that does not exist yet, so no lock
    /// is taken. The reset only runs if `body` succeeds.
    pub fn create<T, E>(
        &self,
        id: &str,
        body: impl FnOnce() -> std::result::Result<T, E>,
    ) -> std::result::Result<T, E>
    where
        E: From<LockError>,
    {
        let out = body()?;
        self.after_create(id)?;
        Ok(out)
    }

    /// Hook: the storage record for `id` has just been created.
    pub fn after_create(&self, id: &str) -> Result<ResetOutcome> {
        self.manager.reset(id)
    }

    /// Hook: the deletion of `id` has been acknowledged.
    pub fn after_delete_ack(&self, id: &str) -> Result<()> {
        self.manager.unlink(id)
    }
}
