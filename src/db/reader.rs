//! db::reader
//!
//! Temporal reader: loads an instance from the snapshot valid at a time.
//!
//! # Algorithm
//!
//! 1. Run the guard on the store.
//! 2. Pick the newest snapshot taken at or before the query time.
//! 3. Decode it against the instance's schema. Each reference resolves
//!    through the identity cache; an instance seen for the first time is
//!    created from the registry, cached, then loaded at the *same* time.
//! 4. Apply the decoded fields.
//!
//! # Cycles
//!
//! [`Database::load`] sets the instance's loaded marker before reading, so
//! a reference back to an instance already being loaded resolves to the
//! live handle without recursing again. The marker is cleared if the load
//! fails.

use chrono::{DateTime, Utc};
use tracing::debug;

use super::codec::{Decoder, RefToken};
use super::database::{expect_type, Database};
use super::error::{StoreError, StoreResult};
use super::instance::{Handle, Instance};

impl Database {
    /// Load `handle` from the snapshot valid at `when` (default now).
    ///
    /// Does nothing if the instance is already loaded or was saved by this
    /// database. Use [`Database::reload`] to force a read.
    pub fn load(&self, handle: &Handle, when: Option<DateTime<Utc>>) -> StoreResult<()> {
        if !handle.begin_load() {
            debug!(store = %handle.path(), "already loaded");
            return Ok(());
        }
        self.read_into(handle, when).inspect_err(|_| {
            handle.set_loaded(false);
        })
    }

    /// Re-read `handle` from the snapshot valid at `when` (default now),
    /// discarding unsaved changes to fields present in that snapshot.
    ///
    /// Referenced instances that are already live are not re-read.
    pub fn reload(&self, handle: &Handle, when: Option<DateTime<Utc>>) -> StoreResult<()> {
        let was_loaded = handle.set_loaded(true);
        self.read_into(handle, when).inspect_err(|_| {
            handle.set_loaded(was_loaded);
        })
    }

    fn read_into(&self, handle: &Handle, when: Option<DateTime<Utc>>) -> StoreResult<()> {
        let when = when.unwrap_or_else(|| self.clock.now());
        let store = self.store(handle.path());
        self.guard(&store)?;

        let id = store.select(when)?;
        let record = store.read(&id)?;
        debug!(store = %handle.path(), snapshot = %id, %when, "loading");

        let mut resolve = |token: &RefToken| self.resolve(handle, token, when);
        let fields = Decoder::new(handle.path(), id, &mut resolve)
            .decode_record(handle.schema(), &record)?;

        handle.apply(fields, id);
        Ok(())
    }

    /// The live, loaded instance a reference inside `from` points at.
    fn resolve(&self, from: &Handle, token: &RefToken, when: DateTime<Utc>) -> StoreResult<Handle> {
        let schema =
            self.registry
                .lookup(&token.type_name)
                .ok_or_else(|| StoreError::UnregisteredType {
                    type_name: token.type_name.clone(),
                    store: from.path().clone(),
                })?;

        let (target, _) = self.cache.get_or_insert_with(&token.path, || {
            Handle::new(Instance::blank(token.path.clone(), schema))
        });
        let target = expect_type(target, &token.type_name)?;

        self.load(&target, Some(when))?;
        Ok(target)
    }
}
