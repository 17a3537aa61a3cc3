//! Configuration types and defaults for tracelock.

use serde::{Deserialize, Serialize};

/// Which semaphore implementation backs the named locks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// POSIX named semaphores (`sem_open`). Linux only.
    Posix,
    /// Counter files guarded by advisory `flock`.
    File,
}

impl Default for BackendKind {
    fn default() -> Self {
        if cfg!(target_os = "linux") {
            BackendKind::Posix
        } else {
            BackendKind::File
        }
    }
}

impl BackendKind {
    /// Parse a backend kind from a string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "posix" => Some(Self::Posix),
            "file" => Some(Self::File),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Posix => "posix",
            BackendKind::File => "file",
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub(crate) fn default_lock_timeout_secs() -> f64 {
    60.0
}

pub(crate) fn default_poll_interval_ms() -> u64 {
    10
}
