//! core::paths
//!
//! Centralized path routing for plaintxtdb storage locations.
//!
//! # Architecture
//!
//! Every on-disk location is computed here. No other module joins reserved
//! file names onto a store directory by hand.
//!
//! # Storage Layout
//!
//! ```text
//! <root>/
//!   .ptdb/config.toml              root configuration
//!   <store path>/                  one directory per store
//!     2023-01-01__00.00.00.json    snapshot
//!     2023-01-01__00.00.00.0001.json
//!     saving                       sentinel, only during a save
//!     .lock                        advisory lock file
//! ```
//!
//! # Example
//!
//! ```
//! use plaintxtdb::core::paths::DbPaths;
//! use plaintxtdb::core::types::StorePath;
//! use std::path::PathBuf;
//!
//! let paths = DbPaths::new("/data");
//! let store = StorePath::new("accounts/cash").unwrap();
//!
//! assert_eq!(paths.store_dir(&store), PathBuf::from("/data/accounts/cash"));
//! assert_eq!(
//!     DbPaths::sentinel_path(&paths.store_dir(&store)),
//!     PathBuf::from("/data/accounts/cash/saving")
//! );
//! ```

use std::path::{Path, PathBuf};

use crate::core::types::{SnapshotId, StorePath};

/// File name of the in-flight save marker inside a store directory.
pub const SENTINEL_FILE: &str = "saving";

/// File name of the advisory lock inside a store directory.
pub const LOCK_FILE: &str = ".lock";

/// Directory under the root holding database-level files.
pub const ROOT_META_DIR: &str = ".ptdb";

/// Centralized path routing for one database root.
///
/// # Invariants
///
/// - Store directories always live under `root`
/// - Reserved names ([`SENTINEL_FILE`], [`LOCK_FILE`]) never parse as snapshots
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbPaths {
    root: PathBuf,
}

impl DbPaths {
    /// Create path routing for a database root.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The database root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    // =========================================================================
    // Root-scoped paths
    // =========================================================================

    /// Directory for database-level files: `<root>/.ptdb`.
    pub fn meta_dir(&self) -> PathBuf {
        self.root.join(ROOT_META_DIR)
    }

    /// Root configuration file: `<root>/.ptdb/config.toml`.
    pub fn root_config_path(&self) -> PathBuf {
        self.meta_dir().join("config.toml")
    }

    // =========================================================================
    // Store-scoped paths
    // =========================================================================

    /// Directory holding every snapshot of `store`.
    pub fn store_dir(&self, store: &StorePath) -> PathBuf {
        store.to_fs_path(&self.root)
    }

    /// Sentinel file of a store directory.
    pub fn sentinel_path(store_dir: &Path) -> PathBuf {
        store_dir.join(SENTINEL_FILE)
    }

    /// Lock file of a store directory.
    pub fn lock_path(store_dir: &Path) -> PathBuf {
        store_dir.join(LOCK_FILE)
    }

    /// Snapshot file of a store directory.
    pub fn snapshot_path(store_dir: &Path, id: &SnapshotId) -> PathBuf {
        store_dir.join(id.file_name())
    }

    /// Whether a directory entry name is reserved by the store format.
    pub fn is_reserved(name: &str) -> bool {
        name == SENTINEL_FILE || name == LOCK_FILE
    }
}
