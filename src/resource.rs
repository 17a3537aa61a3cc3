//! The view of a store resource that the locking layer needs.
//!
//! Resources themselves (their graph-backed state, URIs, REST handling) live
//! in the store. The locking layer only needs a stable identifier, a way to
//! tell whether the resource still exists, a way to flag it as deleted in
//! local caches, and the identifier of its root.

/// A lockable store resource.
pub trait Resource {
    /// Stable unique identifier (the resource URI).
    fn id(&self) -> &str;

    /// True if the resource's state is empty, i.e. it has been deleted.
    fn state_is_empty(&self) -> bool;

    /// Flag the resource as deleted in any local cache.
    fn mark_deleted(&self);

    /// Identifier of the root resource above this one. The root returns its
    /// own identifier.
    fn root_id(&self) -> &str;
}

/// A resource known only by identifier and presumed to exist.
///
/// Used by administrative paths that lock a resource without loading it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetachedResource {
    id: String,
    root_id: String,
}

impl DetachedResource {
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            root_id: id.clone(),
            id,
        }
    }

    pub fn with_root(mut self, root_id: impl Into<String>) -> Self {
        self.root_id = root_id.into();
        self
    }
}

impl Resource for DetachedResource {
    fn id(&self) -> &str {
        &self.id
    }

    fn state_is_empty(&self) -> bool {
        false
    }

    fn mark_deleted(&self) {}

    fn root_id(&self) -> &str {
        &self.root_id
    }
}
