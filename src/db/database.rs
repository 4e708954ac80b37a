//! db::database
//!
//! The store manager: owns a database root and everything bound to it.
//!
//! # Architecture
//!
//! A [`Database`] holds the root directory, the frozen type [`Registry`],
//! the [`IdentityCache`] of live instances, the clock and the effective
//! configuration. All store operations go through it; there is no global
//! state, so independent databases (or tests) never share instances.
//!
//! Loading lives in [`crate::db::reader`], saving in
//! [`crate::db::writer`]; this module wires them to the guard and lock.
//!
//! # Example
//!
//! ```
//! use plaintxtdb::db::{Database, FieldKind, Registry, Schema};
//!
//! let registry = Registry::builder()
//!     .register(Schema::new("Account").field("quantity", FieldKind::Plain, 0))
//!     .unwrap()
//!     .build();
//!
//! let root = tempfile::TempDir::new().unwrap();
//! let db = Database::builder(root.path(), registry).build();
//!
//! let cash = db.open("accounts/cash", "Account").unwrap();
//! cash.set("quantity", 100).unwrap();
//! db.save(&cash).unwrap();
//!
//! assert!(db.open("accounts/cash", "Account").unwrap().ptr_eq(&cash));
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value as Json;
use tracing::{debug, info};

use super::codec::encode_record;
use super::error::{StoreError, StoreResult};
use super::identity::IdentityCache;
use super::instance::{Handle, Instance};
use super::schema::Registry;
use super::store::Store;
use super::writer::SnapshotWriter;
use crate::core::clock::{Clock, SystemClock};
use crate::core::config::Config;
use crate::core::ops::guard::CheckReport;
use crate::core::paths::DbPaths;
use crate::core::types::{SnapshotId, StorePath};

/// A database root with its registry, identity cache, clock and settings.
#[derive(Debug)]
pub struct Database {
    pub(super) paths: DbPaths,
    pub(super) registry: Registry,
    pub(super) cache: IdentityCache,
    pub(super) clock: Arc<dyn Clock>,
    pub(super) config: Config,
}

/// Builder for [`Database`].
#[derive(Debug)]
pub struct DatabaseBuilder {
    root: PathBuf,
    registry: Registry,
    clock: Option<Arc<dyn Clock>>,
    config: Option<Config>,
}

impl DatabaseBuilder {
    /// Use `clock` instead of the system clock.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Use `config` instead of defaults.
    pub fn config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    pub fn build(self) -> Database {
        Database {
            paths: DbPaths::new(self.root),
            registry: self.registry,
            cache: IdentityCache::new(),
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            config: self.config.unwrap_or_default(),
        }
    }
}

impl Database {
    /// Start building a database over `root`. Configuration defaults to
    /// built-in values; see [`Database::open_root`] to load config files.
    pub fn builder(root: impl Into<PathBuf>, registry: Registry) -> DatabaseBuilder {
        DatabaseBuilder {
            root: root.into(),
            registry,
            clock: None,
            config: None,
        }
    }

    /// Open `root` with the system clock and configuration loaded from the
    /// global and root config files.
    pub fn open_root(root: impl Into<PathBuf>, registry: Registry) -> StoreResult<Self> {
        let root = root.into();
        let config = Config::load(Some(&root))?;
        Ok(Self::builder(root, registry).config(config).build())
    }

    pub fn root(&self) -> &Path {
        self.paths.root()
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Raw view of the store at `path`.
    pub fn store(&self, path: &StorePath) -> Store {
        Store::new(&self.paths, path.clone())
    }

    /// The live instance for `path`, if one has been opened or resolved.
    pub fn cached(&self, path: &StorePath) -> Option<Handle> {
        self.cache.get(path)
    }

    /// Paths of every live instance.
    pub fn cached_paths(&self) -> Vec<StorePath> {
        self.cache.paths()
    }

    /// The instance bound to `path`.
    ///
    /// Returns the cached handle if the path is already live. Otherwise a
    /// blank instance of `type_name` is created, the store is checked (and
    /// created if absent), and the instance is cached. Nothing is loaded.
    ///
    /// # Errors
    ///
    /// - [`StoreError::UnregisteredType`] if `type_name` is unknown
    /// - [`StoreError::TypeMismatch`] if the path is live with another type
    /// - [`StoreError::NotADirectory`] if the store path is a file
    pub fn open(&self, path: impl AsRef<str>, type_name: &str) -> StoreResult<Handle> {
        let path = StorePath::new(path.as_ref())?;
        let schema = self
            .registry
            .lookup(type_name)
            .ok_or_else(|| StoreError::UnregisteredType {
                type_name: type_name.to_string(),
                store: path.clone(),
            })?;

        if let Some(existing) = self.cache.get(&path) {
            return expect_type(existing, type_name);
        }

        self.guard(&self.store(&path))?;
        let (handle, created) = self
            .cache
            .get_or_insert_with(&path, || Handle::new(Instance::blank(path.clone(), schema)));
        if created {
            debug!(store = %path, type_name, "opened");
        }
        expect_type(handle, type_name)
    }

    /// Persist the property set of `handle` as a new snapshot.
    ///
    /// References are written as tokens; referenced instances are not saved.
    /// On success the instance counts as loaded from the new snapshot.
    pub fn save(&self, handle: &Handle) -> StoreResult<SnapshotId> {
        let store = self.store(handle.path());
        let _lock = if self.config.locking() {
            Some(store.lock()?)
        } else {
            None
        };
        store.check(self.config.sentinel_policy(), self.config.sync())?;

        let record = encode_record(handle.path(), handle.schema(), &handle.fields())?;
        let newest = store.list()?.first().copied();
        let id = SnapshotWriter::new(&store, self.config.sync(), self.config.max_collision_retries())
            .write(newest, self.clock.now(), &record)?;

        handle.mark_saved(id);
        info!(store = %handle.path(), snapshot = %id, "saved");
        Ok(id)
    }

    /// Run the consistency guard on `path` under the store lock.
    pub fn check(&self, path: &StorePath) -> StoreResult<CheckReport> {
        let store = self.store(path);
        // Taking the lock creates the directory.
        let existed = store.dir().exists();
        let _lock = if self.config.locking() {
            Some(store.lock()?)
        } else {
            None
        };
        let mut report = store.check(self.config.sentinel_policy(), self.config.sync())?;
        report.created |= !existed;
        Ok(report)
    }

    /// Snapshot ids of `path`, newest first.
    pub fn history(&self, path: &StorePath) -> StoreResult<Vec<SnapshotId>> {
        let store = self.store(path);
        self.guard(&store)?;
        store.list()
    }

    /// The undecoded snapshot of `path` chosen for `when` (default now).
    pub fn read_raw(
        &self,
        path: &StorePath,
        when: Option<DateTime<Utc>>,
    ) -> StoreResult<(SnapshotId, Json)> {
        let store = self.store(path);
        self.guard(&store)?;
        let id = store.select(when.unwrap_or_else(|| self.clock.now()))?;
        let record = store.read(&id)?;
        Ok((id, Json::Object(record)))
    }

    /// Guard run before reads.
    ///
    /// With locking enabled the repair happens only if the store lock is
    /// free; a busy lock means a save is in flight, and the listing skips
    /// its target instead.
    pub(super) fn guard(&self, store: &Store) -> StoreResult<()> {
        let policy = self.config.sentinel_policy();
        let sync = self.config.sync();
        if !self.config.locking() {
            store.check(policy, sync)?;
            return Ok(());
        }
        match store.try_lock()? {
            Some(_lock) => {
                store.check(policy, sync)?;
            }
            None => debug!(store = %store.path(), "store busy; skipping repair"),
        }
        Ok(())
    }
}

pub(super) fn expect_type(handle: Handle, type_name: &str) -> StoreResult<Handle> {
    if handle.type_name() == type_name {
        Ok(handle)
    } else {
        Err(StoreError::TypeMismatch {
            store: handle.path().clone(),
            expected: type_name.to_string(),
            actual: handle.type_name().to_string(),
        })
    }
}
