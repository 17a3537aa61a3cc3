//! Lock status and recovery result types.

use super::holder::HolderInfo;
use std::fmt;

/// Snapshot of a resource lock, as seen from this process.
#[derive(Debug, Clone)]
pub struct LockStatus {
    /// The resource identifier.
    pub id: String,

    /// The OS-level semaphore name.
    pub name: String,

    /// Observed semaphore count (1 = free, 0 = held).
    pub value: u32,

    /// Holder tracked by this process, if any.
    pub holder: Option<HolderInfo>,
}

impl LockStatus {
    pub fn is_free(&self) -> bool {
        self.value > 0
    }

    /// The semaphore is taken but no holder is known in this process.
    ///
    /// A holder in another process looks exactly the same, so this is a hint
    /// for an administrator, not proof.
    pub fn looks_stale(&self) -> bool {
        self.value == 0 && self.holder.is_none()
    }
}

impl fmt::Display for LockStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): ", self.id, self.name)?;
        match (&self.holder, self.value) {
            (Some(holder), _) => write!(f, "locked by {}", holder),
            (None, 0) => write!(f, "locked (holder unknown)"),
            (None, 1) => write!(f, "free"),
            (None, n) => write!(f, "free (count {}, mutual exclusion broken)", n),
        }
    }
}

/// Result of [`LockManager::reset`](super::LockManager::reset).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetOutcome {
    /// The semaphore was already free (or newly created at 1).
    AlreadyFree,
    /// The semaphore was at 0 and has been released once.
    Released,
}

impl fmt::Display for ResetOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResetOutcome::AlreadyFree => f.write_str("already free"),
            ResetOutcome::Released => f.write_str("released"),
        }
    }
}
