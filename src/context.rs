//! State-directory resolution for tracelock.
//!
//! All administrative commands operate on one state directory holding the
//! configuration, the file-backend lock counters and the audit log:
//!
//! ```text
//! <state_dir>/
//!   config.yaml
//!   locks/           counter files (file backend only)
//!   events/events.ndjson
//! ```

use crate::error::{LockError, Result};
use std::env;
use std::path::{Path, PathBuf};

/// Environment variable naming the state directory.
pub const STATE_DIR_ENV: &str = "TRACELOCK_HOME";

/// Default state directory, relative to the working directory.
pub const DEFAULT_STATE_DIR: &str = ".tracelock";

/// Resolved paths for one tracelock state directory. All paths are absolute.
#[derive(Debug, Clone)]
pub struct StoreContext {
    /// Absolute path to the state directory.
    pub state_dir: PathBuf,

    /// Absolute path to the config file (may not exist).
    pub config_path: PathBuf,

    /// Absolute path to the default file-backend locks directory.
    pub locks_dir: PathBuf,
}

impl StoreContext {
    /// Resolve the state directory.
    ///
    /// Precedence: `explicit`, then `$TRACELOCK_HOME`, then `./.tracelock`.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        if let Some(dir) = explicit {
            return Self::resolve_from(dir);
        }

        if let Some(dir) = env::var_os(STATE_DIR_ENV).filter(|v| !v.is_empty()) {
            return Self::resolve_from(PathBuf::from(dir));
        }

        let cwd = env::current_dir().map_err(|e| {
            LockError::Io(format!("failed to get current working directory: {}", e))
        })?;
        Self::resolve_from(cwd.join(DEFAULT_STATE_DIR))
    }

    /// Build the context for a specific state directory.
    pub fn resolve_from<P: AsRef<Path>>(state_dir: P) -> Result<Self> {
        let state_dir = state_dir.as_ref();
        let state_dir = if state_dir.is_absolute() {
            state_dir.to_path_buf()
        } else {
            env::current_dir()
                .map_err(|e| {
                    LockError::Io(format!("failed to get current working directory: {}", e))
                })?
                .join(state_dir)
        };

        Ok(Self {
            config_path: state_dir.join("config.yaml"),
            locks_dir: state_dir.join("locks"),
            state_dir,
        })
    }

    /// Directory holding the audit log.
    pub fn events_dir(&self) -> PathBuf {
        self.state_dir.join("events")
    }
}
