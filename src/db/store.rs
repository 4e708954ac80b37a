//! db::store
//!
//! One store directory: listing, selecting and reading its snapshots.
//!
//! A [`Store`] knows nothing about schemas or references. It is the raw view
//! used by the reader, the writer and the inspection commands.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde_json::{Map, Value as Json};

use super::error::{StoreError, StoreResult};
use crate::core::ops::guard::{self, CheckReport, SentinelPolicy};
use crate::core::ops::lock::StoreLock;
use crate::core::ops::sentinel::{Sentinel, SentinelTarget};
use crate::core::paths::DbPaths;
use crate::core::types::{SnapshotId, StorePath};

/// A store path resolved under a database root.
#[derive(Debug, Clone)]
pub struct Store {
    path: StorePath,
    dir: PathBuf,
}

impl Store {
    pub fn new(paths: &DbPaths, path: StorePath) -> Self {
        let dir = paths.store_dir(&path);
        Self { path, dir }
    }

    pub fn path(&self) -> &StorePath {
        &self.path
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Run the consistency guard on this store.
    pub fn check(&self, policy: SentinelPolicy, sync: bool) -> StoreResult<CheckReport> {
        Ok(guard::check(&self.dir, policy, sync)?)
    }

    /// Take the store lock, failing fast if another holder has it.
    pub fn lock(&self) -> StoreResult<StoreLock> {
        self.ensure_not_file()?;
        Ok(StoreLock::acquire(&self.dir)?)
    }

    /// Take the store lock if it is free.
    pub fn try_lock(&self) -> StoreResult<Option<StoreLock>> {
        self.ensure_not_file()?;
        Ok(StoreLock::try_acquire(&self.dir)?)
    }

    fn ensure_not_file(&self) -> StoreResult<()> {
        match fs::metadata(&self.dir) {
            Ok(meta) if !meta.is_dir() => Err(StoreError::NotADirectory {
                path: self.dir.clone(),
            }),
            _ => Ok(()),
        }
    }

    /// Snapshot ids, newest first.
    ///
    /// Reserved files and subdirectories (child stores) are skipped, as is
    /// the target of a sentinel still present. A missing directory lists as
    /// empty.
    ///
    /// # Errors
    ///
    /// [`StoreError::BadSnapshotName`] for any other file that is not a
    /// snapshot.
    pub fn list(&self) -> StoreResult<Vec<SnapshotId>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::io(&self.dir)(e)),
        };

        let in_flight = match Sentinel::read(&self.dir) {
            Ok(Some(SentinelTarget::Snapshot(id))) => Some(id),
            Ok(_) => None,
            Err(e) => return Err(guard::GuardError::from(e).into()),
        };

        let mut ids = Vec::new();
        for entry in entries {
            let entry = entry.map_err(StoreError::io(&self.dir))?;
            let file_type = entry.file_type().map_err(StoreError::io(entry.path()))?;
            if file_type.is_dir() {
                continue;
            }
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if DbPaths::is_reserved(&name) {
                continue;
            }
            match SnapshotId::parse(&name) {
                Some(id) if Some(id) == in_flight => {}
                Some(id) => ids.push(id),
                None => {
                    return Err(StoreError::BadSnapshotName {
                        dir: self.dir.clone(),
                        name: name.into_owned(),
                    })
                }
            }
        }

        ids.sort_unstable_by(|a, b| b.cmp(a));
        Ok(ids)
    }

    /// The latest snapshot taken at or before `when`.
    ///
    /// # Errors
    ///
    /// - [`StoreError::EmptyStore`] if there are no snapshots
    /// - [`StoreError::NoDataBeforeTime`] if `when` precedes all of them
    pub fn select(&self, when: DateTime<Utc>) -> StoreResult<SnapshotId> {
        let ids = self.list()?;
        let Some(earliest) = ids.last().copied() else {
            return Err(StoreError::EmptyStore {
                store: self.path.clone(),
            });
        };
        ids.into_iter()
            .find(|id| id.at() <= when)
            .ok_or_else(|| StoreError::NoDataBeforeTime {
                store: self.path.clone(),
                when,
                earliest,
            })
    }

    /// Read and parse one snapshot. The content must be a JSON object.
    pub fn read(&self, id: &SnapshotId) -> StoreResult<Map<String, Json>> {
        let path = DbPaths::snapshot_path(&self.dir, id);
        let bytes = fs::read(&path).map_err(StoreError::io(&path))?;
        match serde_json::from_slice(&bytes) {
            Ok(Json::Object(record)) => Ok(record),
            Ok(other) => Err(StoreError::Decode {
                store: self.path.clone(),
                snapshot: *id,
                location: String::new(),
                reason: format!("snapshot is a JSON {}, not an object", json_type(&other)),
            }),
            Err(source) => Err(StoreError::Json { path, source }),
        }
    }
}

fn json_type(json: &Json) -> &'static str {
    match json {
        Json::Null => "null",
        Json::Bool(_) => "boolean",
        Json::Number(_) => "number",
        Json::String(_) => "string",
        Json::Array(_) => "array",
        Json::Object(_) => "object",
    }
}
