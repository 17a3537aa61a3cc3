//! Holder identity recorded while a lock is held.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::thread::{self, ThreadId};

/// Who holds a lock, for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HolderInfo {
    /// Owner of the lock (e.g., `user@HOST`).
    pub owner: String,

    /// Process ID of the lock holder.
    pub pid: u32,

    /// Thread name, or its id when unnamed.
    pub thread: String,

    /// When the lock was acquired.
    pub acquired_at: DateTime<Utc>,

    /// The operation being performed (edit/post/delete/...).
    pub action: String,
}

impl HolderInfo {
    /// Describe the calling thread as a holder.
    pub fn current(action: &str) -> Self {
        let current = thread::current();
        let thread = match current.name() {
            Some(name) => name.to_string(),
            None => format!("{:?}", current.id()),
        };

        Self {
            owner: get_owner_string(),
            pid: std::process::id(),
            thread,
            acquired_at: Utc::now(),
            action: action.to_string(),
        }
    }

    /// How long the lock has been held.
    pub fn age(&self) -> Duration {
        Utc::now().signed_duration_since(self.acquired_at)
    }

    /// Format the age as a human-readable string.
    pub fn age_string(&self) -> String {
        let age = self.age();
        let millis = age.num_milliseconds();
        let seconds = age.num_seconds();
        let minutes = age.num_minutes();
        let hours = age.num_hours();

        if hours > 0 {
            format!("{}h {}m", hours, minutes % 60)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds % 60)
        } else if seconds > 0 {
            format!("{}s", seconds)
        } else {
            format!("{}ms", millis.max(0))
        }
    }
}

impl fmt::Display for HolderInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "thread {} (pid {}, {}, held {}, action {})",
            self.thread,
            self.pid,
            self.owner,
            self.age_string(),
            self.action
        )
    }
}

/// Holder record kept in a lock slot: the identity used for reentrancy plus
/// the diagnostic description.
#[derive(Debug, Clone)]
pub(crate) struct Holder {
    pub(crate) thread: ThreadId,
    pub(crate) info: HolderInfo,
}

impl Holder {
    pub(crate) fn current(action: &str) -> Self {
        Self {
            thread: thread::current().id(),
            info: HolderInfo::current(action),
        }
    }
}

/// Get the owner string for holder metadata.
pub fn get_owner_string() -> String {
    let user = std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string());

    let host = hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    format!("{}@{}", user, host)
}
