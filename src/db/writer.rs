//! db::writer
//!
//! Crash-safe append of a new snapshot.
//!
//! # Protocol
//!
//! 1. Pick the candidate id (see [`next_id`]).
//! 2. Durably write the sentinel naming the candidate (barrier 1).
//! 3. Create the candidate with `create_new`, write the encoded record and
//!    sync it (barrier 2). If the name is taken, move to the next sequence
//!    number and go back to step 2.
//! 4. Remove the sentinel and sync the store directory.
//!
//! A crash at any point leaves either no sentinel (all snapshots complete)
//! or a sentinel whose target the guard repairs on the next open.
//!
//! The caller holds the store lock and has already run the guard.

use std::io;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::{Map, Value as Json};
use tracing::debug;

use super::error::{StoreError, StoreResult};
use super::store::Store;
use crate::core::ops::durable::{sync_dir, write_durable, WriteMode};
use crate::core::ops::guard::GuardError;
use crate::core::ops::sentinel::Sentinel;
use crate::core::paths::DbPaths;
use crate::core::types::SnapshotId;

/// Candidate id for a snapshot taken at `now`.
///
/// A save in the same second as the newest snapshot, or after the clock
/// stepped backwards, continues that snapshot's sequence. Ids therefore
/// never go backwards within a store. `None` if that sequence is exhausted.
pub fn next_id(newest: Option<SnapshotId>, now: DateTime<Utc>) -> Option<SnapshotId> {
    let candidate = SnapshotId::new(now, 0);
    match newest {
        Some(newest) if newest.at() >= candidate.at() => newest.next_in_second(),
        _ => Some(candidate),
    }
}

/// Serialize a record the way snapshots are laid out on disk: four-space
/// indentation, keys in sorted order.
pub fn to_snapshot_bytes(record: &Map<String, Json>) -> serde_json::Result<Vec<u8>> {
    let mut bytes = Vec::new();
    let mut ser = serde_json::Serializer::with_formatter(&mut bytes, PrettyFormatter::with_indent(b"    "));
    record.serialize(&mut ser)?;
    bytes.push(b'\n');
    Ok(bytes)
}

/// Writes snapshots into one store.
#[derive(Debug)]
pub struct SnapshotWriter<'a> {
    store: &'a Store,
    sync: bool,
    max_attempts: u32,
}

impl<'a> SnapshotWriter<'a> {
    pub fn new(store: &'a Store, sync: bool, max_attempts: u32) -> Self {
        Self {
            store,
            sync,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Append `record` as a new snapshot and return its id.
    ///
    /// `newest` is the newest id already in the store.
    ///
    /// # Errors
    ///
    /// - [`StoreError::WriteCollision`] if every candidate name was taken or
    ///   the sequence within the second ran out
    /// - [`StoreError::Io`] on any write failure; the sentinel stays behind
    ///   for the guard
    pub fn write(
        &self,
        newest: Option<SnapshotId>,
        now: DateTime<Utc>,
        record: &Map<String, Json>,
    ) -> StoreResult<SnapshotId> {
        let dir = self.store.dir();
        let bytes = to_snapshot_bytes(record).map_err(|source| StoreError::Json {
            path: dir.to_path_buf(),
            source,
        })?;

        let mut next = next_id(newest, now);
        let mut attempts = 0;
        while let Some(candidate) = next {
            if attempts == self.max_attempts {
                break;
            }
            attempts += 1;
            next = candidate.next_in_second();

            let path = DbPaths::snapshot_path(dir, &candidate);
            if path.exists() {
                debug!(store = %self.store.path(), snapshot = %candidate, attempts, "snapshot name taken");
                continue;
            }

            Sentinel::new(candidate)
                .write(dir, self.sync)
                .map_err(GuardError::from)?;

            match write_durable(&path, &bytes, WriteMode::CreateNew, self.sync) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    debug!(store = %self.store.path(), snapshot = %candidate, attempts, "lost race for snapshot name");
                    continue;
                }
                Err(source) => return Err(StoreError::Io { path, source }),
            }

            Sentinel::remove(dir).map_err(GuardError::from)?;
            if self.sync {
                sync_dir(dir).map_err(StoreError::io(dir))?;
            }
            debug!(store = %self.store.path(), snapshot = %candidate, "snapshot written");
            return Ok(candidate);
        }

        // Any sentinel left names a file some other writer completed.
        Sentinel::remove(dir).map_err(GuardError::from)?;
        Err(StoreError::WriteCollision {
            store: self.store.path().clone(),
            attempts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ops::durable::fault_injection;
    use crate::core::types::StorePath;
    use chrono::TimeZone;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, 1, 1, h, m, s).unwrap()
    }

    fn setup() -> (TempDir, Store) {
        let temp = TempDir::new().unwrap();
        let store = Store::new(
            &DbPaths::new(temp.path()),
            StorePath::new("accounts/cash").unwrap(),
        );
        fs::create_dir_all(store.dir()).unwrap();
        (temp, store)
    }

    fn record(quantity: i64) -> Map<String, Json> {
        json!({"quantity": quantity, "name": "cash"})
            .as_object()
            .cloned()
            .unwrap()
    }

    fn put_snapshot(store: &Store, id: SnapshotId) {
        fs::write(DbPaths::snapshot_path(store.dir(), &id), "{}").unwrap();
    }

    mod next_id {
        use super::*;

        #[test]
        fn first_snapshot() {
            assert_eq!(next_id(None, at(0, 0, 0)), Some(SnapshotId::new(at(0, 0, 0), 0)));
        }

        #[test]
        fn later_second_resets_sequence() {
            let newest = SnapshotId::new(at(0, 0, 0), 3);
            assert_eq!(
                next_id(Some(newest), at(0, 0, 1)),
                Some(SnapshotId::new(at(0, 0, 1), 0))
            );
        }

        #[test]
        fn same_second_bumps_sequence() {
            let newest = SnapshotId::new(at(0, 0, 0), 0);
            let precise = at(0, 0, 0) + chrono::Duration::milliseconds(500);
            assert_eq!(next_id(Some(newest), precise), newest.next_in_second());
        }

        #[test]
        fn clock_backwards_stays_monotonic() {
            let newest = SnapshotId::new(at(12, 0, 0), 0);
            let id = next_id(Some(newest), at(11, 0, 0)).unwrap();
            assert!(id > newest);
        }
    }

    #[test]
    fn writes_pretty_sorted_json() {
        let (_temp, store) = setup();
        let id = SnapshotWriter::new(&store, true, 4)
            .write(None, at(0, 0, 0), &record(100))
            .unwrap();

        let text = fs::read_to_string(DbPaths::snapshot_path(store.dir(), &id)).unwrap();
        assert_eq!(text, "{\n    \"name\": \"cash\",\n    \"quantity\": 100\n}\n");
        assert!(!Sentinel::exists(store.dir()));
    }

    #[test]
    fn same_second_saves_do_not_overwrite() {
        let (_temp, store) = setup();
        let writer = SnapshotWriter::new(&store, false, 4);
        let first = writer.write(None, at(0, 0, 0), &record(1)).unwrap();
        let second = writer.write(Some(first), at(0, 0, 0), &record(2)).unwrap();

        assert_ne!(first, second);
        assert_eq!(second.seq(), 1);
        assert_eq!(store.list().unwrap(), vec![second, first]);
    }

    #[test]
    fn taken_name_moves_to_next_sequence() {
        let (_temp, store) = setup();
        let taken = SnapshotId::new(at(0, 0, 0), 0);
        fs::write(DbPaths::snapshot_path(store.dir(), &taken), "{}").unwrap();

        // Caller passes a stale `newest`, as a second writer would.
        let id = SnapshotWriter::new(&store, false, 4)
            .write(None, at(0, 0, 0), &record(1))
            .unwrap();

        assert_eq!(Some(id), taken.next_in_second());
    }

    #[test]
    fn collision_exhaustion() {
        let (_temp, store) = setup();
        let mut id = SnapshotId::new(at(0, 0, 0), 0);
        for _ in 0..3 {
            fs::write(DbPaths::snapshot_path(store.dir(), &id), "{}").unwrap();
            id = id.next_in_second().unwrap();
        }

        let err = SnapshotWriter::new(&store, false, 3)
            .write(None, at(0, 0, 0), &record(1))
            .unwrap_err();

        assert!(matches!(err, StoreError::WriteCollision { attempts: 3, .. }));
        assert!(!Sentinel::exists(store.dir()));
    }

    #[test]
    fn exhausted_sequence_is_a_collision() {
        let (_temp, store) = setup();
        let last = SnapshotId::new(at(0, 0, 0), u32::MAX - 1);
        put_snapshot(&store, last);

        let writer = SnapshotWriter::new(&store, false, 4);
        let id = writer.write(Some(last), at(0, 0, 0), &record(1)).unwrap();
        assert_eq!(id.seq(), u32::MAX);

        let err = writer.write(Some(id), at(0, 0, 0), &record(2)).unwrap_err();
        assert!(matches!(err, StoreError::WriteCollision { attempts: 0, .. }));
        assert!(!Sentinel::exists(store.dir()));
        assert_eq!(store.list().unwrap(), vec![id, last]);
    }

    #[test]
    fn taken_names_up_to_sequence_end() {
        let (_temp, store) = setup();
        let last = SnapshotId::new(at(0, 0, 0), u32::MAX);
        put_snapshot(&store, last);

        // A stale `newest` walks into the taken final name and stops there.
        let stale = SnapshotId::new(at(0, 0, 0), u32::MAX - 1);
        put_snapshot(&store, stale);
        let err = SnapshotWriter::new(&store, false, 4)
            .write(Some(stale), at(0, 0, 0), &record(1))
            .unwrap_err();

        assert!(matches!(err, StoreError::WriteCollision { attempts: 1, .. }));
    }

    #[test]
    fn crash_during_snapshot_leaves_sentinel() {
        let (_temp, store) = setup();
        fault_injection::set_crash_after(2);
        let result = SnapshotWriter::new(&store, false, 4).write(None, at(0, 0, 0), &record(1));
        fault_injection::reset();

        assert!(matches!(result, Err(StoreError::Io { .. })));
        assert!(Sentinel::exists(store.dir()));
        let partial = DbPaths::snapshot_path(store.dir(), &SnapshotId::new(at(0, 0, 0), 0));
        assert!(serde_json::from_slice::<Json>(&fs::read(partial).unwrap()).is_err());
    }

    #[test]
    fn crash_during_sentinel_writes_nothing() {
        let (_temp, store) = setup();
        fault_injection::set_crash_after(1);
        let result = SnapshotWriter::new(&store, false, 4).write(None, at(0, 0, 0), &record(1));
        fault_injection::reset();

        assert!(result.is_err());
        assert!(store.list().unwrap().is_empty());
    }
}
