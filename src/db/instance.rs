//! db::instance
//!
//! Live persistable instances.
//!
//! An [`Instance`] is bound to one store path for its whole life and holds
//! the current value of every field in its schema. Instances are shared
//! through [`Handle`]s; the database's identity cache guarantees at most one
//! instance per path, so two handles to the same path are the same object.
//!
//! Field state sits behind a lock that is never held across I/O or across
//! the resolution of references, so reference cycles cannot deadlock.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use super::codec;
use super::error::{StoreError, StoreResult};
use super::schema::Schema;
use super::value::Value;
use crate::core::types::{SnapshotId, StorePath};

#[derive(Debug)]
struct InstanceState {
    fields: BTreeMap<String, Value>,
    loaded: bool,
    snapshot: Option<SnapshotId>,
}

/// A persistable object bound to a store path.
pub struct Instance {
    path: StorePath,
    schema: Arc<Schema>,
    state: RwLock<InstanceState>,
}

impl Instance {
    /// A blank instance: every field at its schema default, not loaded.
    pub fn blank(path: StorePath, schema: Arc<Schema>) -> Self {
        let fields = schema
            .fields()
            .iter()
            .map(|f| (f.name().to_string(), f.default_value().clone()))
            .collect();
        Self {
            path,
            schema,
            state: RwLock::new(InstanceState {
                fields,
                loaded: false,
                snapshot: None,
            }),
        }
    }
}

/// Shared pointer to a live [`Instance`].
///
/// Equality compares type and path, which identify the durable object.
/// Use [`Handle::ptr_eq`] to check that two handles share one instance.
#[derive(Clone)]
pub struct Handle(Arc<Instance>);

impl Handle {
    pub fn new(instance: Instance) -> Self {
        Self(Arc::new(instance))
    }

    pub fn path(&self) -> &StorePath {
        &self.0.path
    }

    pub fn type_name(&self) -> &str {
        self.0.schema.type_name()
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.0.schema
    }

    /// Whether both handles point at the same live instance.
    pub fn ptr_eq(&self, other: &Handle) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Current value of a field.
    pub fn get(&self, field: &str) -> Option<Value> {
        self.0.state.read().fields.get(field).cloned()
    }

    /// Set a field of the property set.
    ///
    /// # Errors
    ///
    /// - [`StoreError::UnknownField`] if the schema does not declare `field`
    /// - [`StoreError::KindMismatch`] if `value` does not fit the field's kind
    pub fn set(&self, field: &str, value: impl Into<Value>) -> StoreResult<()> {
        let value = value.into();
        let spec = self
            .0
            .schema
            .get(field)
            .ok_or_else(|| StoreError::UnknownField {
                type_name: self.type_name().to_string(),
                field: field.to_string(),
            })?;
        codec::check_kind(spec.kind(), &value).map_err(|location| StoreError::KindMismatch {
            type_name: self.type_name().to_string(),
            field: join_location(field, &location),
            expected: spec.kind().to_string(),
            actual: value.kind_name().to_string(),
        })?;
        self.0
            .state
            .write()
            .fields
            .insert(field.to_string(), value);
        Ok(())
    }

    /// Copy of every field value.
    pub fn fields(&self) -> BTreeMap<String, Value> {
        self.0.state.read().fields.clone()
    }

    /// Whether `load` has run (or a save has made memory current).
    pub fn is_loaded(&self) -> bool {
        self.0.state.read().loaded
    }

    /// Snapshot the fields were last loaded from or saved to.
    pub fn snapshot(&self) -> Option<SnapshotId> {
        self.0.state.read().snapshot
    }

    /// Set the loaded marker; returns `false` if it was already set.
    pub(crate) fn begin_load(&self) -> bool {
        let mut state = self.0.state.write();
        !std::mem::replace(&mut state.loaded, true)
    }

    /// Set the loaded marker to `loaded`, returning the previous value.
    pub(crate) fn set_loaded(&self, loaded: bool) -> bool {
        std::mem::replace(&mut self.0.state.write().loaded, loaded)
    }

    /// Replace decoded fields from `snapshot`. Fields absent from the
    /// snapshot keep their current value.
    pub(crate) fn apply(&self, fields: BTreeMap<String, Value>, snapshot: SnapshotId) {
        let mut state = self.0.state.write();
        state.fields.extend(fields);
        state.snapshot = Some(snapshot);
    }

    /// Record that memory now matches `snapshot`.
    pub(crate) fn mark_saved(&self, snapshot: SnapshotId) {
        let mut state = self.0.state.write();
        state.loaded = true;
        state.snapshot = Some(snapshot);
    }
}

/// `field` plus a nested location such as `[2]` or `.key`.
fn join_location(field: &str, nested: &str) -> String {
    format!("{}{}", field, nested)
}

impl PartialEq for Handle {
    fn eq(&self, other: &Self) -> bool {
        self.path() == other.path() && self.type_name() == other.type_name()
    }
}

impl Eq for Handle {}

// Fields are left out: reference cycles would recurse forever.
impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("type", &self.type_name())
            .field("path", &self.path().as_str())
            .finish()
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schema::FieldKind;

    fn handle(path: &str) -> Handle {
        let schema = Schema::new("Account")
            .field("quantity", FieldKind::Plain, 0)
            .field("opened", FieldKind::Timestamp, Value::Null)
            .field("peer", FieldKind::Reference, Value::Null);
        Handle::new(Instance::blank(
            StorePath::new(path).unwrap(),
            Arc::new(schema),
        ))
    }

    #[test]
    fn blank_has_defaults() {
        let h = handle("accounts/cash");
        assert_eq!(h.get("quantity"), Some(Value::Int(0)));
        assert_eq!(h.get("opened"), Some(Value::Null));
        assert!(!h.is_loaded());
        assert_eq!(h.snapshot(), None);
    }

    #[test]
    fn set_known_field() {
        let h = handle("accounts/cash");
        h.set("quantity", 100).unwrap();
        assert_eq!(h.get("quantity"), Some(Value::Int(100)));
    }

    #[test]
    fn set_unknown_field_fails() {
        let h = handle("accounts/cash");
        let err = h.set("colour", "red").unwrap_err();
        assert!(matches!(err, StoreError::UnknownField { .. }));
    }

    #[test]
    fn set_wrong_kind_fails() {
        let h = handle("accounts/cash");
        let err = h.set("opened", "yesterday").unwrap_err();
        assert!(matches!(err, StoreError::KindMismatch { .. }));

        let err = h.set("peer", 5).unwrap_err();
        assert!(matches!(err, StoreError::KindMismatch { .. }));
    }

    #[test]
    fn set_reference_field() {
        let a = handle("accounts/a");
        let b = handle("accounts/b");
        a.set("peer", &b).unwrap();
        assert_eq!(a.get("peer"), Some(Value::Ref(b)));
    }

    #[test]
    fn begin_load_only_once() {
        let h = handle("accounts/cash");
        assert!(h.begin_load());
        assert!(!h.begin_load());
        assert!(h.is_loaded());
    }

    #[test]
    fn equality_is_by_path_and_type() {
        let a = handle("accounts/cash");
        let b = handle("accounts/cash");
        assert_eq!(a, b);
        assert!(!a.ptr_eq(&b));
        assert!(a.ptr_eq(&a.clone()));
        assert_ne!(a, handle("accounts/other"));
    }

    #[test]
    fn debug_does_not_recurse() {
        let a = handle("accounts/a");
        a.set("peer", &a).unwrap();
        let text = format!("{:?}", a);
        assert!(text.contains("accounts/a"));
    }
}
