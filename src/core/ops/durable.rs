//! core::ops::durable
//!
//! Durable file writes used by the sentinel and the snapshot writer.
//!
//! # Durability Barriers
//!
//! A write is complete only once its bytes have been flushed and
//! `sync_all` has returned. Directory entries (creation and removal) are
//! made durable separately with [`sync_dir`].
//!
//! # Fault Injection
//!
//! When compiled with `cfg(test)` or the `fault_injection` feature, a write
//! can be made to "crash" part-way: half the payload lands on disk and the
//! call returns an error, leaving exactly the state a power loss would.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

/// How [`write_durable`] opens its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Create the file or truncate an existing one.
    Replace,
    /// Fail with `AlreadyExists` if the file is present.
    CreateNew,
}

/// Write `bytes` to `path`, flushing and syncing when `sync` is set.
pub fn write_durable(path: &Path, bytes: &[u8], mode: WriteMode, sync: bool) -> io::Result<()> {
    let mut options = OpenOptions::new();
    options.write(true);
    match mode {
        WriteMode::Replace => {
            options.create(true).truncate(true);
        }
        WriteMode::CreateNew => {
            options.create_new(true);
        }
    }
    let mut file = options.open(path)?;

    #[cfg(any(test, feature = "fault_injection"))]
    if fault_injection::should_crash() {
        file.write_all(&bytes[..bytes.len() / 2])?;
        return Err(io::Error::new(
            io::ErrorKind::Other,
            "simulated crash for fault injection testing",
        ));
    }

    file.write_all(bytes)?;
    file.flush()?;
    if sync {
        file.sync_all()?;
    }
    Ok(())
}

/// Make directory entry changes under `dir` durable.
///
/// Only meaningful on unix; elsewhere directories cannot be opened for
/// syncing and this is a no-op.
pub fn sync_dir(dir: &Path) -> io::Result<()> {
    #[cfg(unix)]
    {
        File::open(dir)?.sync_all()?;
    }
    #[cfg(not(unix))]
    {
        let _ = dir;
    }
    Ok(())
}

/// Fault injection support for testing crash recovery.
///
/// # Usage
///
/// ```ignore
/// use plaintxtdb::core::ops::durable::fault_injection;
///
/// // The sentinel write succeeds, the snapshot write "crashes" half-way.
/// fault_injection::set_crash_after(2);
/// assert!(db.save(&handle).is_err());
/// fault_injection::reset();
/// ```
#[cfg(any(test, feature = "fault_injection"))]
pub mod fault_injection {
    use std::cell::Cell;

    // Thread-local so parallel tests do not interfere.
    thread_local! {
        /// Crash on the Nth durable write. 0 disables.
        static CRASH_AT_WRITE: Cell<usize> = const { Cell::new(0) };

        /// Durable writes attempted since the last arm.
        static WRITE_COUNT: Cell<usize> = const { Cell::new(0) };
    }

    /// Crash on the `n`th durable write from now (1-based). 0 disables.
    pub fn set_crash_after(n: usize) {
        CRASH_AT_WRITE.with(|c| c.set(n));
        WRITE_COUNT.with(|c| c.set(0));
    }

    /// Count a write and report whether it should crash.
    pub fn should_crash() -> bool {
        CRASH_AT_WRITE.with(|threshold_cell| {
            let threshold = threshold_cell.get();
            if threshold == 0 {
                return false;
            }
            WRITE_COUNT.with(|count_cell| {
                let count = count_cell.get() + 1;
                count_cell.set(count);
                count == threshold
            })
        })
    }

    /// Disable crash simulation.
    pub fn reset() {
        CRASH_AT_WRITE.with(|c| c.set(0));
        WRITE_COUNT.with(|c| c.set(0));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn replace_overwrites() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("f");

        write_durable(&path, b"first", WriteMode::Replace, true).unwrap();
        write_durable(&path, b"second", WriteMode::Replace, true).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "second");
    }

    #[test]
    fn create_new_refuses_existing() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("f");

        write_durable(&path, b"first", WriteMode::CreateNew, false).unwrap();
        let err = write_durable(&path, b"second", WriteMode::CreateNew, false).unwrap_err();

        assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);
        assert_eq!(fs::read_to_string(&path).unwrap(), "first");
    }

    #[test]
    fn simulated_crash_leaves_partial_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("f");

        fault_injection::set_crash_after(1);
        let result = write_durable(&path, b"0123456789", WriteMode::CreateNew, true);
        fault_injection::reset();

        assert!(result.is_err());
        assert_eq!(fs::read_to_string(&path).unwrap(), "01234");
    }

    #[test]
    fn crash_only_fires_once() {
        let temp = TempDir::new().unwrap();

        fault_injection::set_crash_after(2);
        assert!(write_durable(&temp.path().join("a"), b"a", WriteMode::Replace, false).is_ok());
        assert!(write_durable(&temp.path().join("b"), b"b", WriteMode::Replace, false).is_err());
        assert!(write_durable(&temp.path().join("c"), b"c", WriteMode::Replace, false).is_ok());
        fault_injection::reset();
    }

    #[test]
    fn sync_dir_on_existing_dir() {
        let temp = TempDir::new().unwrap();
        sync_dir(temp.path()).unwrap();
    }
}
