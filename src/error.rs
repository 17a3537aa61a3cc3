//! Error types for tracelock.
//!
//! Uses thiserror for derive macros. Every lock-related failure reaches the
//! caller of the protected operation unchanged in meaning.

use crate::exit_codes;
use thiserror::Error;

/// Main error type for locking operations.
#[derive(Error, Debug)]
pub enum LockError {
    /// Acquisition timed out while another context held the lock.
    ///
    /// `holder` is best-effort: it is only known when the holder lives in
    /// this process, and may already be cleared by the time it is read.
    #[error("The resource <{resource}> is locked by {holder}")]
    ResourceBusy { resource: String, holder: String },

    /// The lock was acquired but the resource was deleted in the meantime.
    #[error("The resource <{resource}> no longer exists")]
    StaleResource { resource: String },

    /// The OS refused to create another semaphore (system-level limit).
    #[error("cannot create semaphore '{name}': {message}")]
    OsResourceExhausted { name: String, message: String },

    /// The resource id cannot be mapped to a legal semaphore name.
    #[error("invalid lock name for resource <{id}>: {reason}")]
    InvalidName { id: String, reason: String },

    /// Configuration could not be read or failed validation.
    #[error("{0}")]
    Config(String),

    /// Any other I/O or OS-level failure.
    #[error("{0}")]
    Io(String),
}

impl LockError {
    /// Returns the appropriate exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            LockError::ResourceBusy { .. } => exit_codes::LOCK_BUSY,
            LockError::StaleResource { .. } => exit_codes::STALE_RESOURCE,
            LockError::OsResourceExhausted { .. } => exit_codes::OS_EXHAUSTED,
            LockError::InvalidName { .. } => exit_codes::USER_ERROR,
            LockError::Config(_) => exit_codes::USER_ERROR,
            LockError::Io(_) => exit_codes::USER_ERROR,
        }
    }

    /// True if the error came from an acquisition timeout.
    pub fn is_busy(&self) -> bool {
        matches!(self, LockError::ResourceBusy { .. })
    }
}

/// Result type alias for tracelock operations.
pub type Result<T> = std::result::Result<T, LockError>;
