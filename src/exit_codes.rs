//! Exit code constants for the tracelock CLI.
//!
//! - 0: Success
//! - 1: User error (bad args, invalid config, I/O failure)
//! - 4: Lock busy (acquisition timed out)
//! - 5: Stale resource (resource deleted while waiting for its lock)
//! - 6: OS semaphore resources exhausted

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// User error: bad arguments, invalid configuration, or I/O failure.
pub const USER_ERROR: i32 = 1;

/// Lock acquisition timed out while another context held the lock.
pub const LOCK_BUSY: i32 = 4;

/// The lock was acquired but the protected resource no longer exists.
pub const STALE_RESOURCE: i32 = 5;

/// The OS refused to create another semaphore.
pub const OS_EXHAUSTED: i32 = 6;
