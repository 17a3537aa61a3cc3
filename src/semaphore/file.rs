//! Counting semaphores stored as counter files.
//!
//! Each semaphore is a file `<dir>/<flat-name>.sem` holding its count as
//! decimal text. Every read-modify-write of the count happens under an
//! exclusive advisory `flock`, so the counter is shared correctly between
//! threads (each handle has its own open file description) and processes.
//! A waiter polls the counter until it becomes positive or the deadline
//! passes.

use super::{Semaphore, SemaphoreBackend, SemaphoreName, open_error};
use crate::config::BackendKind;
use crate::error::{LockError, Result};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

/// File extension of counter files.
pub const COUNTER_EXTENSION: &str = "sem";

/// Backend keeping one counter file per semaphore in a directory.
#[derive(Debug, Clone)]
pub struct FileBackend {
    dir: PathBuf,
    poll_interval: Duration,
}

impl FileBackend {
    /// Create a backend rooted at `dir`, creating the directory if needed.
    pub fn new(dir: impl Into<PathBuf>, poll_interval: Duration) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| {
            LockError::Io(format!(
                "failed to create locks directory '{}': {}",
                dir.display(),
                e
            ))
        })?;

        Ok(Self { dir, poll_interval })
    }

    /// Path of the counter file for `name`.
    pub fn path_for(&self, name: &SemaphoreName) -> PathBuf {
        self.dir
            .join(format!("{}.{}", name.flat(), COUNTER_EXTENSION))
    }
}

impl SemaphoreBackend for FileBackend {
    fn obtain(&self, name: &SemaphoreName) -> Result<Box<dyn Semaphore>> {
        let path = self.path_for(name);
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| open_error(name, e))?;

        let mut sem = FileSemaphore {
            name: name.clone(),
            path,
            file,
            poll_interval: self.poll_interval,
        };
        // Persist the initial count of a freshly created counter.
        sem.update(|_| ())?;
        Ok(Box::new(sem))
    }

    fn unlink(&self, name: &SemaphoreName) -> Result<()> {
        let path = self.path_for(name);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(LockError::Io(format!(
                "failed to unlink semaphore '{}': {}",
                path.display(),
                e
            ))),
        }
    }

    fn kind(&self) -> BackendKind {
        BackendKind::File
    }
}

/// An open counter-file handle.
#[derive(Debug)]
pub struct FileSemaphore {
    name: SemaphoreName,
    path: PathBuf,
    file: File,
    poll_interval: Duration,
}

impl FileSemaphore {
    /// Run `f` on the count while holding the exclusive file lock.
    ///
    /// The count is written back only if `f` changed it, or if the file was
    /// empty (a counter that was just created starts at 1).
    fn update<T>(&mut self, f: impl FnOnce(&mut u32) -> T) -> Result<T> {
        FileExt::lock_exclusive(&self.file).map_err(|e| {
            LockError::Io(format!(
                "failed to lock counter file '{}': {}",
                self.path.display(),
                e
            ))
        })?;

        let result = self.update_locked(f);

        if let Err(e) = FileExt::unlock(&self.file) {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to unlock counter file");
        }
        result
    }

    fn update_locked<T>(&mut self, f: impl FnOnce(&mut u32) -> T) -> Result<T> {
        let (before, fresh) = self.read_count()?;
        let mut count = before;
        let out = f(&mut count);
        if fresh || count != before {
            self.write_count(count)?;
        }
        Ok(out)
    }

    fn read_count(&mut self) -> Result<(u32, bool)> {
        let mut content = String::new();
        self.file
            .seek(SeekFrom::Start(0))
            .and_then(|_| self.file.read_to_string(&mut content))
            .map_err(|e| {
                LockError::Io(format!(
                    "failed to read counter file '{}': {}",
                    self.path.display(),
                    e
                ))
            })?;

        let content = content.trim();
        if content.is_empty() {
            return Ok((1, true));
        }

        let count = content.parse::<u32>().map_err(|_| {
            LockError::Io(format!(
                "counter file '{}' is corrupt (found '{}')",
                self.path.display(),
                content
            ))
        })?;
        Ok((count, false))
    }

    fn write_count(&mut self, count: u32) -> Result<()> {
        self.file
            .set_len(0)
            .and_then(|_| self.file.seek(SeekFrom::Start(0)))
            .and_then(|_| write!(self.file, "{}", count))
            .and_then(|_| self.file.flush())
            .map_err(|e| {
                LockError::Io(format!(
                    "failed to write counter file '{}': {}",
                    self.path.display(),
                    e
                ))
            })
    }
}

impl Semaphore for FileSemaphore {
    fn acquire(&mut self, timeout: Duration) -> Result<bool> {
        let deadline = Instant::now().checked_add(timeout);
        loop {
            let taken = self.update(|count| {
                if *count > 0 {
                    *count -= 1;
                    true
                } else {
                    false
                }
            })?;
            if taken {
                return Ok(true);
            }

            let now = Instant::now();
            let wait = match deadline {
                Some(deadline) if now >= deadline => return Ok(false),
                Some(deadline) => self.poll_interval.min(deadline - now),
                None => self.poll_interval,
            };
            thread::sleep(wait);
        }
    }

    fn release(&mut self) -> Result<()> {
        self.update(|count| *count = count.saturating_add(1))
    }

    fn value(&mut self) -> Result<u32> {
        self.update(|count| *count)
    }

    fn name(&self) -> &SemaphoreName {
        &self.name
    }
}
