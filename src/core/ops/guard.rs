//! core::ops::guard
//!
//! Crash-consistency check run before any read or write of a store.
//!
//! # Contract
//!
//! - Store directory absent: it is created.
//! - Path exists but is not a directory: [`GuardError::NotADirectory`].
//! - Sentinel present: the interrupted save is repaired according to the
//!   [`SentinelPolicy`], and the sentinel is removed.
//!
//! After a successful check the store has no sentinel and every snapshot
//! file in it was completely written.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::core::ops::durable::sync_dir;
use crate::core::ops::sentinel::{Sentinel, SentinelError, SentinelTarget};
use crate::core::paths::DbPaths;
use crate::core::types::SnapshotId;

/// Errors from the consistency check.
#[derive(Debug, Error)]
pub enum GuardError {
    /// The store path exists but is a file.
    #[error("store path is not a directory: {0}")]
    NotADirectory(PathBuf),

    /// I/O error while checking or repairing.
    #[error("i/o error at {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
}

impl From<SentinelError> for GuardError {
    fn from(err: SentinelError) -> Self {
        match err {
            SentinelError::Io { path, source } => GuardError::Io { path, source },
        }
    }
}

/// How an interrupted save is repaired.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SentinelPolicy {
    /// Always delete the sentinel's target. The previous snapshot stays the
    /// latest valid one.
    #[default]
    Discard,
    /// Keep the target if it parses as a complete JSON object; delete it
    /// otherwise.
    Verify,
}

impl fmt::Display for SentinelPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SentinelPolicy::Discard => write!(f, "discard"),
            SentinelPolicy::Verify => write!(f, "verify"),
        }
    }
}

/// A repair performed by [`check`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Repair {
    /// The sentinel's target was deleted (`existed` is false if the crash
    /// happened before the target was created).
    DiscardedTarget { target: SnapshotId, existed: bool },
    /// The target was verified complete and kept.
    KeptTarget { target: SnapshotId },
    /// The sentinel did not name a snapshot; only the sentinel was removed.
    CorruptSentinel { content: String },
}

impl fmt::Display for Repair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Repair::DiscardedTarget {
                target,
                existed: true,
            } => write!(f, "discarded unverified snapshot {}", target),
            Repair::DiscardedTarget {
                target,
                existed: false,
            } => write!(f, "removed sentinel for never-written snapshot {}", target),
            Repair::KeptTarget { target } => write!(f, "verified and kept snapshot {}", target),
            Repair::CorruptSentinel { content } => {
                write!(f, "removed corrupt sentinel (content: {:?})", content)
            }
        }
    }
}

/// Outcome of a consistency check.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckReport {
    /// The store directory did not exist and was created.
    pub created: bool,
    /// The repair performed, if a sentinel was found.
    pub repair: Option<Repair>,
}

impl CheckReport {
    /// Whether the store was already consistent.
    pub fn is_clean(&self) -> bool {
        self.repair.is_none()
    }
}

/// Check `store_dir` and repair an interrupted save.
///
/// Callers that may race a writer should hold the store lock.
pub fn check(
    store_dir: &Path,
    policy: SentinelPolicy,
    sync: bool,
) -> Result<CheckReport, GuardError> {
    let io_err = |source| GuardError::Io {
        path: store_dir.to_path_buf(),
        source,
    };

    let mut report = CheckReport::default();

    match fs::metadata(store_dir) {
        Ok(meta) if !meta.is_dir() => {
            return Err(GuardError::NotADirectory(store_dir.to_path_buf()));
        }
        Ok(_) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            info!(store = %store_dir.display(), "creating store directory");
            fs::create_dir_all(store_dir).map_err(io_err)?;
            report.created = true;
            return Ok(report);
        }
        Err(e) => return Err(io_err(e)),
    }

    let Some(target) = Sentinel::read(store_dir)? else {
        debug!(store = %store_dir.display(), "store ok");
        return Ok(report);
    };

    let repair = match target {
        SentinelTarget::Corrupt(content) => {
            warn!(
                store = %store_dir.display(),
                content = %content,
                "sentinel does not name a snapshot; removing it"
            );
            Repair::CorruptSentinel { content }
        }
        SentinelTarget::Snapshot(id) => repair_target(store_dir, id, policy)?,
    };

    Sentinel::remove(store_dir)?;
    if sync {
        sync_dir(store_dir).map_err(io_err)?;
    }

    info!(store = %store_dir.display(), repair = %repair, "repaired interrupted save");
    report.repair = Some(repair);
    Ok(report)
}

fn repair_target(
    store_dir: &Path,
    target: SnapshotId,
    policy: SentinelPolicy,
) -> Result<Repair, GuardError> {
    let path = DbPaths::snapshot_path(store_dir, &target);

    if policy == SentinelPolicy::Verify && is_complete(&path) {
        return Ok(Repair::KeptTarget { target });
    }

    let existed = match fs::remove_file(&path) {
        Ok(()) => true,
        Err(e) if e.kind() == io::ErrorKind::NotFound => false,
        Err(source) => return Err(GuardError::Io { path, source }),
    };
    Ok(Repair::DiscardedTarget { target, existed })
}

/// A snapshot is complete if it parses as a JSON object.
fn is_complete(path: &Path) -> bool {
    fs::read(path)
        .ok()
        .and_then(|bytes| serde_json::from_slice::<serde_json::Value>(&bytes).ok())
        .is_some_and(|value| value.is_object())
}
