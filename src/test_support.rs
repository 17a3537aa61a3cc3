use crate::locks::LockManager;
use crate::resource::Resource;
use crate::semaphore::file::FileBackend;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tempfile::TempDir;

static NEXT_ID: AtomicUsize = AtomicUsize::new(0);

/// A resource id no other test (or test run) uses.
///
/// POSIX semaphores live in a host-wide namespace, so ids embed the pid, a
/// counter and the start time.
pub(crate) fn unique_id(prefix: &str) -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    format!(
        "{}/{}-{}-{}",
        prefix,
        std::process::id(),
        NEXT_ID.fetch_add(1, Ordering::Relaxed),
        nanos
    )
}

/// In-memory resource whose state is a list of triples.
#[derive(Debug)]
pub(crate) struct TestResource {
    id: String,
    root_id: String,
    state: Mutex<Vec<String>>,
    deleted: AtomicBool,
}

impl TestResource {
    pub(crate) fn root(id: &str) -> Arc<Self> {
        Self::child(id, id)
    }

    pub(crate) fn child(id: &str, root_id: &str) -> Arc<Self> {
        Arc::new(Self {
            id: id.to_string(),
            root_id: root_id.to_string(),
            state: Mutex::new(vec![format!("<{}> a :Resource", id)]),
            deleted: AtomicBool::new(false),
        })
    }

    /// Empty the state, as a concurrent delete would.
    pub(crate) fn clear_state(&self) {
        self.state.lock().unwrap().clear();
    }

    pub(crate) fn add_triple(&self, triple: &str) {
        self.state.lock().unwrap().push(triple.to_string());
    }

    pub(crate) fn triple_count(&self) -> usize {
        self.state.lock().unwrap().len()
    }

    pub(crate) fn is_marked_deleted(&self) -> bool {
        self.deleted.load(Ordering::SeqCst)
    }
}

impl Resource for TestResource {
    fn id(&self) -> &str {
        &self.id
    }

    fn state_is_empty(&self) -> bool {
        self.state.lock().unwrap().is_empty()
    }

    fn mark_deleted(&self) {
        self.deleted.store(true, Ordering::SeqCst);
    }

    fn root_id(&self) -> &str {
        &self.root_id
    }
}

/// A manager over a file backend in a fresh temporary directory.
pub(crate) fn file_manager(default_timeout: Duration) -> (TempDir, Arc<LockManager>) {
    let temp_dir = TempDir::new().unwrap();
    let backend = FileBackend::new(temp_dir.path().join("locks"), Duration::from_millis(2)).unwrap();
    let manager = LockManager::new(Arc::new(backend), default_timeout);
    (temp_dir, Arc::new(manager))
}

/// A manager over POSIX named semaphores.
#[cfg(target_os = "linux")]
pub(crate) fn posix_manager(default_timeout: Duration) -> Arc<LockManager> {
    let backend = crate::semaphore::posix::PosixBackend::new();
    Arc::new(LockManager::new(Arc::new(backend), default_timeout))
}
