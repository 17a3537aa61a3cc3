//! Config struct definition and default implementation.

use super::types::*;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for tracelock.
///
/// This struct represents the contents of `<state_dir>/config.yaml`.
/// Unknown fields in the YAML are ignored for forward compatibility.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Seconds to wait for a lock before failing with a busy error.
    /// Fractional values are allowed; individual calls may override it.
    #[serde(default = "default_lock_timeout_secs")]
    pub lock_timeout_secs: f64,

    /// Semaphore implementation.
    #[serde(default)]
    pub backend: BackendKind,

    /// How often the file backend re-checks a busy counter.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Directory holding file-backend counters (default: `<state_dir>/locks`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locks_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            lock_timeout_secs: default_lock_timeout_secs(),
            backend: BackendKind::default(),
            poll_interval_ms: default_poll_interval_ms(),
            locks_dir: None,
        }
    }
}
