//! db::error
//!
//! Error type for store operations.
//!
//! Every storage error carries the store path, and the requested time where
//! one applies. Errors from the lower layers convert with `?`.

use std::io;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use thiserror::Error;

use super::schema::SchemaError;
use crate::core::config::ConfigError;
use crate::core::ops::guard::GuardError;
use crate::core::ops::lock::LockError;
use crate::core::types::{SnapshotId, StorePath, TypeError};

/// Errors from opening, loading, saving and checking stores.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store path exists but is a file.
    #[error("store path is not a directory: {}", path.display())]
    NotADirectory { path: PathBuf },

    /// Load on a store with no snapshots.
    #[error("store '{store}' has no snapshots")]
    EmptyStore { store: StorePath },

    /// Load for a time before the earliest snapshot.
    #[error("store '{store}' has no data at or before {when} (earliest snapshot is {earliest})")]
    NoDataBeforeTime {
        store: StorePath,
        when: DateTime<Utc>,
        earliest: SnapshotId,
    },

    /// A reference names a type that is not in the registry.
    #[error("type '{type_name}' referenced by '{store}' is not registered")]
    UnregisteredType { type_name: String, store: StorePath },

    /// A path is already bound to an instance of another type.
    #[error("store '{store}' is bound to type '{actual}', not '{expected}'")]
    TypeMismatch {
        store: StorePath,
        expected: String,
        actual: String,
    },

    /// A field outside the type's property set.
    #[error("type '{type_name}' has no persistable field '{field}'")]
    UnknownField { type_name: String, field: String },

    /// A value that does not fit its field's declared kind.
    #[error("field '{field}' of type '{type_name}' expects {expected}, got {actual}")]
    KindMismatch {
        type_name: String,
        field: String,
        expected: String,
        actual: String,
    },

    /// Every candidate snapshot name in the retry window was taken.
    #[error("store '{store}': no free snapshot name after {attempts} attempts")]
    WriteCollision { store: StorePath, attempts: u32 },

    /// A file in a store directory is not a snapshot.
    #[error("unexpected file '{name}' in store directory {}", dir.display())]
    BadSnapshotName { dir: PathBuf, name: String },

    /// A snapshot's content does not match the schema.
    #[error("cannot decode '{location}' in {store}/{snapshot}: {reason}")]
    Decode {
        store: StorePath,
        snapshot: SnapshotId,
        location: String,
        reason: String,
    },

    /// A field value cannot be represented in a snapshot.
    #[error("cannot encode '{location}' of '{store}': {reason}")]
    Encode {
        store: StorePath,
        location: String,
        reason: String,
    },

    #[error("i/o error at {}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },

    #[error("invalid JSON in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error(transparent)]
    Lock(#[from] LockError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Type(#[from] TypeError),

    #[error(transparent)]
    Schema(#[from] SchemaError),
}

impl From<GuardError> for StoreError {
    fn from(err: GuardError) -> Self {
        match err {
            GuardError::NotADirectory(path) => StoreError::NotADirectory { path },
            GuardError::Io { path, source } => StoreError::Io { path, source },
        }
    }
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(io::Error) -> StoreError {
        let path = path.into();
        move |source| StoreError::Io { path, source }
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
