//! Audit log for administrative lock actions.
//!
//! Forced resets and unlinks change lock state outside the normal
//! acquire/release protocol, so each one is recorded as one NDJSON line in
//! `<state_dir>/events/events.ndjson`.
//!
//! # Event Format
//!
//! - `ts`: RFC3339 timestamp
//! - `action`: `reset` or `unlink`
//! - `actor`: The owner string (e.g., `user@HOST`)
//! - `resource`: The resource identifier
//! - `details`: Freeform object with action-specific details

use crate::context::StoreContext;
use crate::error::{LockError, Result};
use crate::locks::holder_owner_string;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

/// Actions that can be logged as events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventAction {
    /// Stale semaphore normalized to free.
    Reset,
    /// Semaphore destroyed.
    Unlink,
}

impl std::fmt::Display for EventAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventAction::Reset => write!(f, "reset"),
            EventAction::Unlink => write!(f, "unlink"),
        }
    }
}

/// An event record for the audit log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// RFC3339 timestamp when the event occurred.
    pub ts: DateTime<Utc>,

    /// The action that was performed.
    pub action: EventAction,

    /// The actor who performed the action (e.g., `user@HOST`).
    pub actor: String,

    /// The resource whose lock was affected.
    pub resource: String,

    /// Freeform details object with action-specific information.
    pub details: Value,
}

impl Event {
    /// Create a new event for `resource`, timestamped now.
    pub fn new(action: EventAction, resource: impl Into<String>) -> Self {
        Self {
            ts: Utc::now(),
            action,
            actor: holder_owner_string(),
            resource: resource.into(),
            details: Value::Object(serde_json::Map::new()),
        }
    }

    /// Set the details object for this event.
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = details;
        self
    }

    /// Serialize the event to a single-line JSON string.
    pub fn to_ndjson_line(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| LockError::Io(format!("failed to serialize event to JSON: {}", e)))
    }
}

/// Get the path to the events file.
pub fn events_file_path(ctx: &StoreContext) -> PathBuf {
    ctx.events_dir().join("events.ndjson")
}

/// Append an event to the events log, creating the file if needed.
pub fn append_event(ctx: &StoreContext, event: &Event) -> Result<()> {
    let events_file = events_file_path(ctx);
    let json_line = event.to_ndjson_line()?;

    let events_dir = ctx.events_dir();
    if !events_dir.exists() {
        fs::create_dir_all(&events_dir).map_err(|e| {
            LockError::Io(format!(
                "failed to create events directory '{}': {}",
                events_dir.display(),
                e
            ))
        })?;
    }

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&events_file)
        .map_err(|e| {
            LockError::Io(format!(
                "failed to open events file '{}': {}",
                events_file.display(),
                e
            ))
        })?;

    writeln!(file, "{}", json_line).map_err(|e| {
        LockError::Io(format!(
            "failed to write event to '{}': {}",
            events_file.display(),
            e
        ))
    })?;

    file.sync_all().map_err(|e| {
        LockError::Io(format!(
            "failed to sync events file '{}': {}",
            events_file.display(),
            e
        ))
    })?;

    Ok(())
}
