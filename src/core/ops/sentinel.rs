//! core::ops::sentinel
//!
//! In-flight save marker.
//!
//! # Protocol
//!
//! Before a snapshot is written, the writer durably records the target file
//! name in `<store>/saving`. Once the snapshot is durable the sentinel is
//! removed. A sentinel found on open therefore names a snapshot whose write
//! may not have completed.
//!
//! The file content is the bare target file name followed by a newline.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::core::ops::durable::{write_durable, WriteMode};
use crate::core::paths::DbPaths;
use crate::core::types::SnapshotId;

/// Errors from sentinel operations.
#[derive(Debug, Error)]
pub enum SentinelError {
    /// I/O error reading or writing the sentinel.
    #[error("sentinel i/o error at {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
}

/// What a sentinel on disk points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SentinelTarget {
    /// A well-formed snapshot file name.
    Snapshot(SnapshotId),
    /// Content that is not a snapshot file name (empty, truncated, garbage).
    Corrupt(String),
}

/// The in-flight save marker of one store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sentinel {
    target: SnapshotId,
}

impl Sentinel {
    /// Create a sentinel for an upcoming snapshot write.
    pub fn new(target: SnapshotId) -> Self {
        Self { target }
    }

    /// The snapshot this sentinel protects.
    pub fn target(&self) -> &SnapshotId {
        &self.target
    }

    /// Durably write the sentinel into `store_dir`.
    pub fn write(&self, store_dir: &Path, sync: bool) -> Result<(), SentinelError> {
        let path = DbPaths::sentinel_path(store_dir);
        let content = format!("{}\n", self.target.file_name());
        write_durable(&path, content.as_bytes(), WriteMode::Replace, sync)
            .map_err(|source| SentinelError::Io { path, source })
    }

    /// Read the sentinel of `store_dir`, if one exists.
    ///
    /// Only a regular file counts as a sentinel. Content that is not UTF-8
    /// (a torn write) is reported as [`SentinelTarget::Corrupt`].
    pub fn read(store_dir: &Path) -> Result<Option<SentinelTarget>, SentinelError> {
        let path = DbPaths::sentinel_path(store_dir);
        match fs::metadata(&path) {
            Ok(meta) if !meta.is_file() => {
                debug!(path = %path.display(), "ignoring non-file at sentinel path");
                return Ok(None);
            }
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(SentinelError::Io { path, source }),
        }

        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(SentinelError::Io { path, source }),
        };

        let content = match String::from_utf8(bytes) {
            Ok(content) => content,
            Err(e) => {
                return Ok(Some(SentinelTarget::Corrupt(
                    String::from_utf8_lossy(e.as_bytes()).into_owned(),
                )));
            }
        };

        let name = content.trim();
        Ok(Some(match SnapshotId::parse(name) {
            Some(id) => SentinelTarget::Snapshot(id),
            None => SentinelTarget::Corrupt(name.to_string()),
        }))
    }

    /// Remove the sentinel of `store_dir`. Missing is not an error.
    pub fn remove(store_dir: &Path) -> Result<(), SentinelError> {
        let path = DbPaths::sentinel_path(store_dir);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(SentinelError::Io { path, source }),
        }
    }

    /// Check whether `store_dir` has a sentinel.
    pub fn exists(store_dir: &Path) -> bool {
        DbPaths::sentinel_path(store_dir).is_file()
    }
}
