//! Mapping from resource identifiers to flat OS semaphore names.

use crate::error::{LockError, Result};
use std::fmt;

/// Longest name Linux accepts for a named semaphore (`NAME_MAX - 4`).
pub const MAX_NAME_LEN: usize = 251;

/// A validated semaphore name derived from a resource identifier.
///
/// The name is `"/" + id` with every `/` replaced by `-`. Two ids that differ
/// only by `/` versus `-` in the same position map to the same name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SemaphoreName {
    id: String,
    name: String,
}

impl SemaphoreName {
    /// Derive the semaphore name for a resource identifier.
    pub fn for_resource(id: &str) -> Result<Self> {
        if id.is_empty() {
            return Err(LockError::InvalidName {
                id: id.to_string(),
                reason: "resource identifier is empty".to_string(),
            });
        }
        if id.contains('\0') {
            return Err(LockError::InvalidName {
                id: id.to_string(),
                reason: "resource identifier contains a NUL byte".to_string(),
            });
        }

        let name = format!("/{}", id.replace('/', "-"));
        if name.len() > MAX_NAME_LEN {
            return Err(LockError::InvalidName {
                id: id.to_string(),
                reason: format!(
                    "semaphore name is {} bytes, the limit is {}",
                    name.len(),
                    MAX_NAME_LEN
                ),
            });
        }

        Ok(Self {
            id: id.to_string(),
            name,
        })
    }

    /// The resource identifier this name was derived from.
    pub fn resource_id(&self) -> &str {
        &self.id
    }

    /// The OS-level name, including the leading `/`.
    pub fn as_str(&self) -> &str {
        &self.name
    }

    /// The name without its leading separator, usable as a file name.
    pub fn flat(&self) -> &str {
        &self.name[1..]
    }
}

impl fmt::Display for SemaphoreName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
