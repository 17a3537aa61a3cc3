//! Which locks each operation takes, and in what order.

use crate::resource::Resource;
use std::fmt;

/// A lock-protected resource operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Mutate the resource's content.
    Edit,
    /// Create a child resource (membership change).
    Post,
    /// Delete the resource.
    Delete,
    /// Create a new resource. Takes no lock; its semaphore is reset afterwards.
    Create,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Edit => "edit",
            Operation::Post => "post",
            Operation::Delete => "delete",
            Operation::Create => "create",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered lock ids for one operation, coarsest first.
///
/// Always locking the root before a child keeps concurrent deletes and edits
/// on related resources from deadlocking each other.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockPlan {
    operation: Operation,
    lock_ids: Vec<String>,
}

impl LockPlan {
    pub fn for_operation(operation: Operation, resource: &dyn Resource) -> Self {
        let lock_ids = match operation {
            Operation::Edit | Operation::Post => vec![resource.id().to_string()],
            // Deleting the root itself lists it twice; the second
            // acquisition re-enters.
            Operation::Delete => vec![resource.root_id().to_string(), resource.id().to_string()],
            Operation::Create => Vec::new(),
        };

        Self {
            operation,
            lock_ids,
        }
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }

    pub fn lock_ids(&self) -> &[String] {
        &self.lock_ids
    }
}
