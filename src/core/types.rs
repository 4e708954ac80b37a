//! core::types
//!
//! Strong types used throughout plaintxtdb.
//!
//! # Types
//!
//! - [`StorePath`] - Validated, root-relative store location
//! - [`SnapshotId`] - Timestamp plus sequence naming one snapshot file
//!
//! # Validation
//!
//! These types enforce validity at construction time. A `StorePath` can
//! never escape the database root and a `SnapshotId` always round-trips
//! through its file name.
//!
//! # Examples
//!
//! ```
//! use plaintxtdb::core::types::{SnapshotId, StorePath};
//!
//! let path = StorePath::new("accounts/cash").unwrap();
//! assert_eq!(path.as_str(), "accounts/cash");
//!
//! assert!(StorePath::new("../outside").is_err());
//! assert!(SnapshotId::parse("2023-01-01__00.00.00.json").is_some());
//! ```

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, NaiveDateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::paths::SENTINEL_FILE;

/// Timestamp portion of a snapshot file name.
pub const SNAPSHOT_TIME_FORMAT: &str = "%Y-%m-%d__%H.%M.%S";

/// Extension of every snapshot file.
pub const SNAPSHOT_EXTENSION: &str = ".json";

/// Character length of a formatted [`SNAPSHOT_TIME_FORMAT`] timestamp.
const SNAPSHOT_TIME_LEN: usize = 20;

/// Errors from type validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid store path: {0}")]
    InvalidStorePath(String),

    #[error("invalid time '{input}': expected RFC 3339, 'YYYY-MM-DD HH:MM:SS' or 'YYYY-MM-DD'")]
    InvalidTime { input: String },
}

/// A validated store location relative to the database root.
///
/// Store paths use `/` as separator regardless of platform. They must:
/// - Be non-empty and relative
/// - Contain no empty, `.` or `..` components
/// - Contain no component starting with `.` (reserved for lock and config files)
/// - Contain no component named `saving` (the in-flight save marker)
/// - Contain no `|` (the reference token delimiter), `\` or control characters
///
/// # Example
///
/// ```
/// use plaintxtdb::core::types::StorePath;
///
/// let path = StorePath::new("transfers/t1").unwrap();
/// assert_eq!(path.components().count(), 2);
///
/// assert!(StorePath::new("").is_err());
/// assert!(StorePath::new("/abs").is_err());
/// assert!(StorePath::new("a|b").is_err());
/// assert!(StorePath::new("a/.hidden").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StorePath(String);

impl StorePath {
    /// Create a new validated store path.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidStorePath` if the path violates the rules above.
    pub fn new(path: impl Into<String>) -> Result<Self, TypeError> {
        let path = path.into();
        Self::validate(&path)?;
        Ok(Self(path))
    }

    fn validate(path: &str) -> Result<(), TypeError> {
        if path.is_empty() {
            return Err(TypeError::InvalidStorePath(
                "store path cannot be empty".into(),
            ));
        }
        if path.starts_with('/') {
            return Err(TypeError::InvalidStorePath(format!(
                "store path must be relative: '{}'",
                path
            )));
        }
        if let Some(c) = path
            .chars()
            .find(|c| *c == '|' || *c == '\\' || c.is_control())
        {
            return Err(TypeError::InvalidStorePath(format!(
                "store path '{}' contains forbidden character {:?}",
                path, c
            )));
        }
        for component in path.split('/') {
            if component.is_empty() {
                return Err(TypeError::InvalidStorePath(format!(
                    "store path '{}' has an empty component",
                    path
                )));
            }
            if component.starts_with('.') {
                return Err(TypeError::InvalidStorePath(format!(
                    "store path component '{}' cannot start with '.'",
                    component
                )));
            }
            if component == SENTINEL_FILE {
                return Err(TypeError::InvalidStorePath(format!(
                    "store path component '{}' is reserved",
                    component
                )));
            }
        }
        Ok(())
    }

    /// Get the path as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Iterate over the `/`-separated components.
    pub fn components(&self) -> impl Iterator<Item = &str> {
        self.0.split('/')
    }

    /// Resolve this store path under a root directory.
    pub fn to_fs_path(&self, root: &Path) -> PathBuf {
        self.components().fold(root.to_path_buf(), |acc, c| acc.join(c))
    }
}

impl TryFrom<String> for StorePath {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for StorePath {
    type Error = TypeError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<StorePath> for String {
    fn from(path: StorePath) -> Self {
        path.0
    }
}

impl AsRef<str> for StorePath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StorePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of one snapshot within a store.
///
/// The first snapshot in a given second is named by its timestamp alone
/// (`2023-01-01__00.00.00.json`). Later snapshots in the same second carry a
/// sequence suffix (`2023-01-01__00.00.00.0001.json`). Ordering is by
/// timestamp, then sequence.
///
/// # Example
///
/// ```
/// use plaintxtdb::core::types::SnapshotId;
///
/// let first = SnapshotId::parse("2023-01-01__00.00.00.json").unwrap();
/// let second = first.next_in_second().unwrap();
/// assert_eq!(second.file_name(), "2023-01-01__00.00.00.0001.json");
/// assert!(second > first);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SnapshotId {
    at: DateTime<Utc>,
    seq: u32,
}

impl SnapshotId {
    /// Create an id, truncating `at` to whole seconds.
    pub fn new(at: DateTime<Utc>, seq: u32) -> Self {
        Self {
            at: at.trunc_subsecs(0),
            seq,
        }
    }

    /// The next id within the same second, or `None` once the sequence is
    /// exhausted.
    pub fn next_in_second(&self) -> Option<Self> {
        Some(Self {
            at: self.at,
            seq: self.seq.checked_add(1)?,
        })
    }

    /// Timestamp of this snapshot (second resolution).
    pub fn at(&self) -> DateTime<Utc> {
        self.at
    }

    /// Sequence number within the second.
    pub fn seq(&self) -> u32 {
        self.seq
    }

    /// File name of this snapshot inside its store directory.
    pub fn file_name(&self) -> String {
        let stamp = self.at.format(SNAPSHOT_TIME_FORMAT);
        if self.seq == 0 {
            format!("{}{}", stamp, SNAPSHOT_EXTENSION)
        } else {
            format!("{}.{:04}{}", stamp, self.seq, SNAPSHOT_EXTENSION)
        }
    }

    /// Parse a snapshot file name.
    ///
    /// Returns `None` if the name is not a snapshot file name. A zero
    /// sequence suffix is rejected so every id has exactly one spelling.
    pub fn parse(name: &str) -> Option<Self> {
        let stem = name.strip_suffix(SNAPSHOT_EXTENSION)?;
        if !stem.is_ascii() || stem.len() < SNAPSHOT_TIME_LEN {
            return None;
        }
        let (stamp, rest) = stem.split_at(SNAPSHOT_TIME_LEN);
        let at = NaiveDateTime::parse_from_str(stamp, SNAPSHOT_TIME_FORMAT)
            .ok()?
            .and_utc();
        if at.format(SNAPSHOT_TIME_FORMAT).to_string() != stamp {
            return None;
        }

        let seq = if rest.is_empty() {
            0
        } else {
            let digits = rest.strip_prefix('.')?;
            if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            match digits.parse::<u32>().ok()? {
                0 => return None,
                n => n,
            }
        };

        Some(Self { at, seq })
    }
}

impl fmt::Display for SnapshotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.file_name())
    }
}

/// Parse a user-supplied point in time.
///
/// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DDTHH:MM:SS` (both
/// read as UTC) and a bare `YYYY-MM-DD` (midnight UTC).
pub fn parse_when(input: &str) -> Result<DateTime<Utc>, TypeError> {
    let trimmed = input.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(naive.and_utc());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        if let Some(naive) = date.and_hms_opt(0, 0, 0) {
            return Ok(naive.and_utc());
        }
    }
    Err(TypeError::InvalidTime {
        input: input.to_string(),
    })
}
