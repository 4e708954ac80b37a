//! core::ops::lock
//!
//! Exclusive per-store advisory lock.
//!
//! # Architecture
//!
//! The store lock keeps two processes from interleaving their sentinel and
//! snapshot writes on the same store, and keeps a guard repair from racing a
//! save in progress. Reads only try the lock; when it is busy they skip
//! repair and leave the in-flight snapshot alone.
//!
//! # Storage
//!
//! - `<store>/.lock` - Lock file with OS-level exclusive lock
//!
//! # Invariants
//!
//! - Lock is held for the entire save (guard, sentinel, snapshot, cleanup)
//! - Lock is automatically released on drop (RAII pattern)
//! - Lock acquisition is non-blocking (fails fast if locked)
//! - The lock file itself is never treated as a snapshot
//!
//! # Example
//!
//! ```
//! use plaintxtdb::core::ops::lock::StoreLock;
//!
//! let dir = tempfile::TempDir::new().unwrap();
//! let lock = StoreLock::acquire(dir.path()).unwrap();
//! assert!(lock.is_held());
//! // Lock automatically released when dropped
//! drop(lock);
//! ```

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use thiserror::Error;

use crate::core::paths::DbPaths;

/// Errors from locking operations.
#[derive(Debug, Error)]
pub enum LockError {
    /// Another process already holds the lock.
    #[error("store {0} is locked by another process")]
    AlreadyLocked(PathBuf),

    /// Failed to create lock file or directory.
    #[error("failed to create lock: {0}")]
    CreateFailed(String),

    /// Failed to acquire the OS lock.
    #[error("failed to acquire lock: {0}")]
    AcquireFailed(String),

    /// Failed to release the lock.
    #[error("failed to release lock: {0}")]
    ReleaseFailed(String),
}

/// An exclusive lock on one store directory.
///
/// The lock is released when this guard is dropped, even on panic.
#[derive(Debug)]
pub struct StoreLock {
    /// Path to the lock file.
    path: PathBuf,
    /// The open file handle with the lock held. `Some` while held.
    file: Option<File>,
}

impl StoreLock {
    /// Attempt to acquire the lock for `store_dir`.
    ///
    /// Uses OS-level file locking via `fs2`, which works across processes.
    /// The store directory is created if missing.
    ///
    /// # Errors
    ///
    /// - [`LockError::AlreadyLocked`] if another holder has the lock
    /// - [`LockError::CreateFailed`] if the lock file cannot be created
    /// - [`LockError::AcquireFailed`] if the OS lock cannot be acquired
    pub fn acquire(store_dir: &Path) -> Result<Self, LockError> {
        fs::create_dir_all(store_dir).map_err(|e| {
            LockError::CreateFailed(format!("cannot create {}: {}", store_dir.display(), e))
        })?;

        let path = DbPaths::lock_path(store_dir);

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| {
                LockError::CreateFailed(format!("cannot open {}: {}", path.display(), e))
            })?;

        match file.try_lock_exclusive() {
            Ok(()) => Ok(Self {
                path,
                file: Some(file),
            }),
            Err(e) if e.kind() == fs2::lock_contended_error().kind() => {
                Err(LockError::AlreadyLocked(store_dir.to_path_buf()))
            }
            Err(e) => Err(LockError::AcquireFailed(e.to_string())),
        }
    }

    /// Try to acquire the lock, returning `None` if already held.
    pub fn try_acquire(store_dir: &Path) -> Result<Option<Self>, LockError> {
        match Self::acquire(store_dir) {
            Ok(lock) => Ok(Some(lock)),
            Err(LockError::AlreadyLocked(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Check if the lock is currently held.
    pub fn is_held(&self) -> bool {
        self.file.is_some()
    }

    /// Get the path to the lock file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Release the lock explicitly.
    ///
    /// Called automatically on drop.
    pub fn release(&mut self) -> Result<(), LockError> {
        if let Some(file) = self.file.take() {
            file.unlock()
                .map_err(|e| LockError::ReleaseFailed(e.to_string()))?;
        }
        Ok(())
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        // Best-effort release on drop
        if let Some(file) = self.file.take() {
            let _ = file.unlock();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn lock_acquire_succeeds() {
        let temp = TempDir::new().unwrap();

        let lock = StoreLock::acquire(temp.path()).expect("acquire lock");
        assert!(lock.is_held());
        assert!(lock.path().exists());
    }

    #[test]
    fn lock_creates_store_directory() {
        let temp = TempDir::new().unwrap();
        let store_dir = temp.path().join("accounts").join("cash");
        assert!(!store_dir.exists());

        let _lock = StoreLock::acquire(&store_dir).expect("acquire lock");
        assert!(store_dir.is_dir());
    }

    #[test]
    fn lock_prevents_second_acquire() {
        let temp = TempDir::new().unwrap();

        let lock1 = StoreLock::acquire(temp.path()).expect("first acquire");
        assert!(lock1.is_held());

        let result = StoreLock::acquire(temp.path());
        assert!(matches!(result, Err(LockError::AlreadyLocked(_))));
    }

    #[test]
    fn lock_released_on_drop() {
        let temp = TempDir::new().unwrap();

        {
            let lock = StoreLock::acquire(temp.path()).expect("first acquire");
            assert!(lock.is_held());
        }

        let lock2 = StoreLock::acquire(temp.path()).expect("second acquire");
        assert!(lock2.is_held());
    }

    #[test]
    fn lock_released_explicitly() {
        let temp = TempDir::new().unwrap();

        let mut lock = StoreLock::acquire(temp.path()).expect("acquire");
        lock.release().expect("release");
        assert!(!lock.is_held());

        let lock2 = StoreLock::acquire(temp.path()).expect("reacquire");
        assert!(lock2.is_held());
    }

    #[test]
    fn try_acquire_returns_none_when_locked() {
        let temp = TempDir::new().unwrap();

        let _lock1 = StoreLock::acquire(temp.path()).expect("first acquire");

        let result = StoreLock::try_acquire(temp.path()).expect("try_acquire");
        assert!(result.is_none());
    }

    #[test]
    fn multiple_release_calls_are_safe() {
        let temp = TempDir::new().unwrap();

        let mut lock = StoreLock::acquire(temp.path()).expect("acquire");
        lock.release().expect("first release");
        lock.release().expect("second release should be ok");
        assert!(!lock.is_held());
    }

    #[test]
    fn separate_stores_lock_independently() {
        let temp = TempDir::new().unwrap();

        let _a = StoreLock::acquire(&temp.path().join("a")).expect("lock a");
        let b = StoreLock::acquire(&temp.path().join("b")).expect("lock b");
        assert!(b.is_held());
    }

    #[test]
    fn error_display_formatting() {
        let err = LockError::AlreadyLocked(PathBuf::from("/db/cash"));
        assert!(err.to_string().contains("locked"));
        assert!(err.to_string().contains("/db/cash"));

        let err = LockError::CreateFailed("test".into());
        assert!(err.to_string().contains("create"));
    }
}
