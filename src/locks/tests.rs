//! Tests for the locks subsystem.

use super::*;
use crate::error::LockError;
use crate::resource::DetachedResource;
use crate::semaphore::SemaphoreName;
use crate::test_support::{TestResource, file_manager, unique_id};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

const SHORT: Duration = Duration::from_millis(100);

/// Leave `id`'s semaphore at 0 with no holder, as a crashed process would.
fn leave_stale(manager: &LockManager, id: &str) {
    let name = SemaphoreName::for_resource(id).unwrap();
    let mut sem = manager.backend().obtain(&name).unwrap();
    assert!(sem.acquire(Duration::ZERO).unwrap());
}

fn check_reset_then_acquire_never_blocks(manager: &LockManager) {
    let id = unique_id("b/fresh");
    let res = DetachedResource::new(&id);

    assert_eq!(manager.reset(&id).unwrap(), ResetOutcome::AlreadyFree);
    let guard = manager
        .acquire_scope(&id, &res, Some(Duration::ZERO), "edit")
        .unwrap();
    assert!(!guard.is_reentrant());
    drop(guard);

    assert_eq!(manager.status(&id).unwrap().value, 1);
    manager.unlink(&id).unwrap();
}

fn check_reentrancy(manager: &LockManager) {
    let id = unique_id("b/reentrant");
    let res = DetachedResource::new(&id);

    let outer = manager.acquire_scope(&id, &res, Some(SHORT), "edit").unwrap();
    {
        let inner = manager
            .acquire_scope(&id, &res, Some(Duration::ZERO), "post")
            .unwrap();
        assert!(inner.is_reentrant());
        {
            let innermost = manager
                .acquire_scope(&id, &res, Some(Duration::ZERO), "edit")
                .unwrap();
            assert!(innermost.is_reentrant());
        }
        // Inner exits do not release.
        assert_eq!(manager.status(&id).unwrap().value, 0);
        assert!(manager.is_held_by_current_thread(&id));
    }
    assert_eq!(manager.status(&id).unwrap().value, 0);

    drop(outer);
    assert_eq!(manager.status(&id).unwrap().value, 1);
    assert!(!manager.is_held_by_current_thread(&id));
    manager.unlink(&id).unwrap();
}

fn check_mutual_exclusion(manager: &Arc<LockManager>) {
    let id = unique_id("b/counter");
    let counter = Arc::new(AtomicUsize::new(0));
    let threads = 4;
    let rounds = 20;

    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let manager = Arc::clone(manager);
            let counter = Arc::clone(&counter);
            let id = id.clone();
            thread::spawn(move || {
                let res = DetachedResource::new(&id);
                for _ in 0..rounds {
                    manager
                        .with_lock(&id, &res, Some(Duration::from_secs(10)), "edit", || {
                            // Deliberately non-atomic read-modify-write.
                            let seen = counter.load(Ordering::SeqCst);
                            thread::sleep(Duration::from_micros(200));
                            counter.store(seen + 1, Ordering::SeqCst);
                            Ok::<(), LockError>(())
                        })
                        .unwrap();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(counter.load(Ordering::SeqCst), threads * rounds);
    manager.unlink(&id).unwrap();
}

fn check_timeout_then_success(manager: &Arc<LockManager>) {
    let id = unique_id("b/t1");
    let (locked_tx, locked_rx) = std::sync::mpsc::channel();

    let holder = {
        let manager = Arc::clone(manager);
        let id = id.clone();
        thread::Builder::new()
            .name("holder-a".to_string())
            .spawn(move || {
                let res = DetachedResource::new(&id);
                let guard = manager.acquire_scope(&id, &res, Some(SHORT), "edit").unwrap();
                locked_tx.send(()).unwrap();
                thread::sleep(Duration::from_millis(600));
                drop(guard);
            })
            .unwrap()
    };
    locked_rx.recv().unwrap();

    let res = DetachedResource::new(&id);
    let started = Instant::now();
    let err = manager.acquire_scope(&id, &res, Some(SHORT), "edit").unwrap_err();
    let waited = started.elapsed();

    match &err {
        LockError::ResourceBusy { resource, holder } => {
            assert_eq!(resource, &id);
            assert!(holder.contains("holder-a"), "holder was {}", holder);
            assert!(holder.contains("action edit"), "holder was {}", holder);
        }
        other => panic!("expected busy error, got {:?}", other),
    }
    assert!(waited >= Duration::from_millis(90), "waited {:?}", waited);
    assert!(waited < Duration::from_millis(550), "waited {:?}", waited);

    holder.join().unwrap();

    let started = Instant::now();
    let guard = manager.acquire_scope(&id, &res, Some(SHORT), "edit").unwrap();
    assert!(started.elapsed() < SHORT);
    drop(guard);
    manager.unlink(&id).unwrap();
}

fn check_unlink_then_reobtain(manager: &LockManager) {
    let id = unique_id("b/unlinked");
    leave_stale(manager, &id);
    assert_eq!(manager.status(&id).unwrap().value, 0);

    manager.unlink(&id).unwrap();

    assert_eq!(manager.status(&id).unwrap().value, 1);
    manager.unlink(&id).unwrap();
}

fn check_reset_releases_stale_lock(manager: &LockManager) {
    let id = unique_id("b/stale");
    leave_stale(manager, &id);

    let status = manager.status(&id).unwrap();
    assert!(status.looks_stale());

    assert_eq!(manager.reset(&id).unwrap(), ResetOutcome::Released);
    assert!(manager.status(&id).unwrap().is_free());
    assert_eq!(manager.status(&id).unwrap().value, 1);

    // Idempotent.
    assert_eq!(manager.reset(&id).unwrap(), ResetOutcome::AlreadyFree);
    assert_eq!(manager.status(&id).unwrap().value, 1);
    manager.unlink(&id).unwrap();
}

fn check_stale_resource(manager: &LockManager) {
    let id = unique_id("b/gone");
    let res = TestResource::root(&id);
    res.clear_state();

    let err = manager
        .acquire_scope(&id, res.as_ref(), Some(SHORT), "edit")
        .unwrap_err();
    assert!(matches!(err, LockError::StaleResource { ref resource } if resource == &id));
    assert!(res.is_marked_deleted());

    // The lock was released on the error path.
    let status = manager.status(&id).unwrap();
    assert_eq!(status.value, 1);
    assert!(status.holder.is_none());
    manager.unlink(&id).unwrap();
}

#[test]
fn test_file_reset_then_acquire_never_blocks() {
    let (_temp_dir, manager) = file_manager(SHORT);
    check_reset_then_acquire_never_blocks(&manager);
}

#[test]
fn test_file_reentrancy() {
    let (_temp_dir, manager) = file_manager(SHORT);
    check_reentrancy(&manager);
}

#[test]
fn test_file_mutual_exclusion() {
    let (_temp_dir, manager) = file_manager(SHORT);
    check_mutual_exclusion(&manager);
}

#[test]
fn test_file_timeout_then_success() {
    let (_temp_dir, manager) = file_manager(SHORT);
    check_timeout_then_success(&manager);
}

#[test]
fn test_file_unlink_then_reobtain() {
    let (_temp_dir, manager) = file_manager(SHORT);
    check_unlink_then_reobtain(&manager);
}

#[test]
fn test_file_reset_releases_stale_lock() {
    let (_temp_dir, manager) = file_manager(SHORT);
    check_reset_releases_stale_lock(&manager);
}

#[test]
fn test_file_stale_resource() {
    let (_temp_dir, manager) = file_manager(SHORT);
    check_stale_resource(&manager);
}

#[cfg(target_os = "linux")]
mod posix {
    use super::*;
    use crate::test_support::posix_manager;

    #[test]
    fn test_posix_reset_then_acquire_never_blocks() {
        check_reset_then_acquire_never_blocks(&posix_manager(SHORT));
    }

    #[test]
    fn test_posix_reentrancy() {
        check_reentrancy(&posix_manager(SHORT));
    }

    #[test]
    fn test_posix_mutual_exclusion() {
        check_mutual_exclusion(&posix_manager(SHORT));
    }

    #[test]
    fn test_posix_timeout_then_success() {
        check_timeout_then_success(&posix_manager(SHORT));
    }

    #[test]
    fn test_posix_unlink_then_reobtain() {
        check_unlink_then_reobtain(&posix_manager(SHORT));
    }

    #[test]
    fn test_posix_reset_releases_stale_lock() {
        check_reset_releases_stale_lock(&posix_manager(SHORT));
    }

    #[test]
    fn test_posix_stale_resource() {
        check_stale_resource(&posix_manager(SHORT));
    }
}

#[test]
fn test_lock_released_when_body_fails() {
    let (_temp_dir, manager) = file_manager(SHORT);
    let res = DetachedResource::new("b/failing");

    let result: Result<(), LockError> = manager.with_lock("b/failing", &res, None, "edit", || {
        Err(LockError::Io("boom".to_string()))
    });
    assert!(matches!(result, Err(LockError::Io(_))));

    let status = manager.status("b/failing").unwrap();
    assert_eq!(status.value, 1);
    assert!(status.holder.is_none());
}

#[test]
fn test_lock_released_when_body_panics() {
    let (_temp_dir, manager) = file_manager(SHORT);
    let res = DetachedResource::new("b/panicking");

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        manager.with_lock("b/panicking", &res, None, "edit", || -> Result<(), LockError> {
            panic!("body failed")
        })
    }));
    assert!(outcome.is_err());

    assert_eq!(manager.status("b/panicking").unwrap().value, 1);
    assert!(!manager.is_held_by_current_thread("b/panicking"));
}

#[test]
fn test_holder_recorded_while_held() {
    let (_temp_dir, manager) = file_manager(SHORT);
    let res = DetachedResource::new("b/held");

    let guard = manager.acquire_scope("b/held", &res, None, "post").unwrap();
    let holder = manager.holder("b/held").unwrap();
    assert_eq!(holder.action, "post");
    assert_eq!(holder.pid, std::process::id());

    let status = manager.status("b/held").unwrap();
    assert!(!status.looks_stale());
    assert!(status.to_string().contains("locked by"));

    drop(guard);
    assert!(manager.holder("b/held").is_none());
}

#[test]
fn test_holders_are_tracked_per_lock() {
    let (_temp_dir, manager) = file_manager(SHORT);
    let a = DetachedResource::new("b/a");
    let b = DetachedResource::new("b/b");

    let _guard = manager.acquire_scope("b/a", &a, None, "edit").unwrap();
    assert!(manager.is_held_by_current_thread("b/a"));
    assert!(!manager.is_held_by_current_thread("b/b"));

    // Holding one lock neither blocks nor re-enters another.
    let other = manager.acquire_scope("b/b", &b, Some(Duration::ZERO), "edit").unwrap();
    assert!(!other.is_reentrant());
}

#[test]
fn test_manual_release() {
    let (_temp_dir, manager) = file_manager(SHORT);
    let res = DetachedResource::new("b/manual");

    let guard = manager.acquire_scope("b/manual", &res, None, "edit").unwrap();
    assert_eq!(guard.lock_id(), "b/manual");
    guard.release().unwrap();

    assert_eq!(manager.status("b/manual").unwrap().value, 1);
}

#[test]
fn test_busy_holder_unknown_without_local_holder() {
    let (_temp_dir, manager) = file_manager(SHORT);
    leave_stale(&manager, "b/orphan");
    let res = DetachedResource::new("b/orphan");

    let err = manager
        .acquire_scope("b/orphan", &res, Some(Duration::from_millis(20)), "edit")
        .unwrap_err();
    assert!(matches!(err, LockError::ResourceBusy { ref holder, .. } if holder == "unknown"));
}

#[test]
fn test_invalid_lock_id() {
    let (_temp_dir, manager) = file_manager(SHORT);
    let res = DetachedResource::new("");

    let err = manager.acquire_scope("", &res, None, "edit").unwrap_err();
    assert!(matches!(err, LockError::InvalidName { .. }));
    assert_eq!(manager.tracked_locks(), 0);
}

#[test]
fn test_lookups_do_not_register_locks() {
    let (_temp_dir, manager) = file_manager(SHORT);
    let id = unique_id("b/never-locked");

    assert!(manager.holder(&id).is_none());
    assert!(!manager.is_held_by_current_thread(&id));
    assert!(manager.status(&id).unwrap().is_free());
    assert_eq!(manager.tracked_locks(), 0);

    let res = DetachedResource::new(&id);
    drop(manager.acquire_scope(&id, &res, None, "edit").unwrap());
    assert_eq!(manager.tracked_locks(), 1);

    manager.unlink(&id).unwrap();
    assert_eq!(manager.tracked_locks(), 0);
}

#[test]
fn test_holder_info_current() {
    let info = HolderInfo::current("delete");

    assert!(!info.owner.is_empty());
    assert_eq!(info.pid, std::process::id());
    assert_eq!(info.action, "delete");
    assert!(info.age().num_seconds() < 1);
    assert!(info.age_string().ends_with("ms"));
    assert!(info.to_string().contains("action delete"));
}

#[test]
fn test_holder_info_age_string() {
    let mut info = HolderInfo::current("edit");

    info.acquired_at = chrono::Utc::now() - chrono::Duration::seconds(5);
    assert_eq!(info.age_string(), "5s");

    info.acquired_at = chrono::Utc::now() - chrono::Duration::minutes(3);
    assert!(info.age_string().starts_with("3m"));

    info.acquired_at = chrono::Utc::now() - chrono::Duration::hours(2);
    assert!(info.age_string().starts_with("2h"));
}

#[test]
fn test_holder_info_serialization() {
    let info = HolderInfo::current("edit");
    let json = serde_json::to_string(&info).unwrap();
    let parsed: HolderInfo = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, info);
}
