//! db::codec
//!
//! Reference codec: maps field values to and from the JSON of a snapshot.
//!
//! # Wire Format
//!
//! Snapshots are plain JSON objects keyed by field name. Two value types
//! have no JSON counterpart and travel as marked strings:
//!
//! | Value          | Encoding                              |
//! |----------------|---------------------------------------|
//! | `Value::Time`  | `|d|2023-01-01 00:00:00`              |
//! | `Value::Ref`   | `|o|Account|accounts/cash`            |
//!
//! Markers are recognised at any nesting depth, but only where the field's
//! [`FieldKind`] allows them. A `Plain` field never has its strings
//! inspected; only `Any` fields sniff for markers, which means a plain
//! string that happens to begin with a marker is mis-decoded there.
//!
//! Timestamps are stored at second resolution.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::{Map, Number, Value as Json};
use tracing::warn;

use super::error::{StoreError, StoreResult};
use super::instance::Handle;
use super::schema::{FieldKind, Schema};
use super::value::Value;
use crate::core::types::{SnapshotId, StorePath};

/// Marker prefix of an encoded timestamp.
pub const DATE_PREFIX: &str = "|d|";

/// Marker prefix of an encoded reference.
pub const REF_PREFIX: &str = "|o|";

/// Timestamp layout after [`DATE_PREFIX`].
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// The decoded form of a reference string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefToken {
    pub type_name: String,
    pub path: StorePath,
}

impl RefToken {
    pub fn new(type_name: impl Into<String>, path: StorePath) -> Self {
        Self {
            type_name: type_name.into(),
            path,
        }
    }

    /// `|o|<type>|<path>`
    pub fn encode(&self) -> String {
        format!("{}{}|{}", REF_PREFIX, self.type_name, self.path)
    }

    /// Parse a reference string. Returns `None` unless the string has the
    /// reference marker, a non-empty type name and a valid store path.
    pub fn parse(s: &str) -> Option<Self> {
        let rest = s.strip_prefix(REF_PREFIX)?;
        let (type_name, path) = rest.split_once('|')?;
        if type_name.is_empty() {
            return None;
        }
        let path = StorePath::new(path).ok()?;
        Some(Self::new(type_name, path))
    }
}

/// Encode a timestamp token.
pub fn encode_time(at: &DateTime<Utc>) -> String {
    format!("{}{}", DATE_PREFIX, at.format(DATE_FORMAT))
}

/// Parse a timestamp token. `None` if the marker is missing or the date
/// after it is malformed.
pub fn parse_time(s: &str) -> Option<DateTime<Utc>> {
    let rest = s.strip_prefix(DATE_PREFIX)?;
    NaiveDateTime::parse_from_str(rest, DATE_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

/// Check that `value` fits `kind`.
///
/// On failure returns the location of the offending item relative to the
/// field (`""` for the field itself, `"[2]"`, `".key"`).
pub fn check_kind(kind: &FieldKind, value: &Value) -> Result<(), String> {
    match (kind, value) {
        (_, Value::Null) | (FieldKind::Any, _) => Ok(()),
        (FieldKind::Timestamp, Value::Time(_)) => Ok(()),
        (FieldKind::Reference, Value::Ref(_)) => Ok(()),
        (FieldKind::Plain, v) => check_plain(v),
        (FieldKind::List(inner), Value::List(items)) => {
            for (i, item) in items.iter().enumerate() {
                check_kind(inner, item).map_err(|loc| format!("[{}]{}", i, loc))?;
            }
            Ok(())
        }
        (FieldKind::Map(inner), Value::Map(map)) => {
            for (key, item) in map {
                check_kind(inner, item).map_err(|loc| format!(".{}{}", key, loc))?;
            }
            Ok(())
        }
        _ => Err(String::new()),
    }
}

/// Plain data holds no timestamps or references at any depth.
fn check_plain(value: &Value) -> Result<(), String> {
    match value {
        Value::Time(_) | Value::Ref(_) => Err(String::new()),
        Value::List(items) => {
            for (i, item) in items.iter().enumerate() {
                check_plain(item).map_err(|loc| format!("[{}]{}", i, loc))?;
            }
            Ok(())
        }
        Value::Map(map) => {
            for (key, item) in map {
                check_plain(item).map_err(|loc| format!(".{}{}", key, loc))?;
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

/// Encode the property set of an instance into a snapshot object.
///
/// Only fields declared by `schema` are written. Keys come out sorted.
pub fn encode_record(
    store: &StorePath,
    schema: &Schema,
    fields: &BTreeMap<String, Value>,
) -> StoreResult<Map<String, Json>> {
    let mut record = Map::new();
    for spec in schema.fields() {
        let value = fields.get(spec.name()).unwrap_or(&Value::Null);
        check_kind(spec.kind(), value).map_err(|loc| StoreError::KindMismatch {
            type_name: schema.type_name().to_string(),
            field: format!("{}{}", spec.name(), loc),
            expected: spec.kind().to_string(),
            actual: value.kind_name().to_string(),
        })?;
        let json = encode_value(store, spec.name(), value)?;
        record.insert(spec.name().to_string(), json);
    }
    Ok(record)
}

fn encode_value(store: &StorePath, location: &str, value: &Value) -> StoreResult<Json> {
    Ok(match value {
        Value::Null => Json::Null,
        Value::Bool(b) => Json::Bool(*b),
        Value::Int(i) => Json::Number(Number::from(*i)),
        Value::Float(x) => match Number::from_f64(*x) {
            Some(n) => Json::Number(n),
            None => {
                return Err(StoreError::Encode {
                    store: store.clone(),
                    location: location.to_string(),
                    reason: format!("{} is not representable in JSON", x),
                })
            }
        },
        Value::Text(s) => Json::String(s.clone()),
        Value::Time(at) => Json::String(encode_time(at)),
        Value::Ref(handle) => {
            Json::String(RefToken::new(handle.type_name(), handle.path().clone()).encode())
        }
        Value::List(items) => Json::Array(
            items
                .iter()
                .enumerate()
                .map(|(i, item)| encode_value(store, &format!("{}[{}]", location, i), item))
                .collect::<StoreResult<_>>()?,
        ),
        Value::Map(map) => Json::Object(
            map.iter()
                .map(|(key, item)| {
                    let json = encode_value(store, &format!("{}.{}", location, key), item)?;
                    Ok((key.clone(), json))
                })
                .collect::<StoreResult<_>>()?,
        ),
    })
}

/// Turns snapshot JSON back into field values.
///
/// References are handed to `resolve`, which returns the live instance for
/// the token (constructing and loading it if needed).
pub struct Decoder<'a> {
    store: &'a StorePath,
    snapshot: SnapshotId,
    resolve: &'a mut dyn FnMut(&RefToken) -> StoreResult<Handle>,
}

impl<'a> Decoder<'a> {
    pub fn new(
        store: &'a StorePath,
        snapshot: SnapshotId,
        resolve: &'a mut dyn FnMut(&RefToken) -> StoreResult<Handle>,
    ) -> Self {
        Self {
            store,
            snapshot,
            resolve,
        }
    }

    /// Decode a snapshot object according to `schema`.
    ///
    /// Keys the schema does not declare are skipped with a warning. Declared
    /// fields missing from the snapshot are absent from the result.
    pub fn decode_record(
        &mut self,
        schema: &Schema,
        record: &Map<String, Json>,
    ) -> StoreResult<BTreeMap<String, Value>> {
        let mut fields = BTreeMap::new();
        for (key, json) in record {
            let Some(spec) = schema.get(key) else {
                warn!(
                    store = %self.store,
                    snapshot = %self.snapshot,
                    field = %key,
                    "ignoring field not declared by type {}",
                    schema.type_name()
                );
                continue;
            };
            let value = self.decode_value(spec.kind(), json, key)?;
            fields.insert(key.clone(), value);
        }
        Ok(fields)
    }

    fn decode_value(&mut self, kind: &FieldKind, json: &Json, location: &str) -> StoreResult<Value> {
        if json.is_null() {
            return Ok(Value::Null);
        }
        match kind {
            FieldKind::Plain => Ok(plain(json)),
            FieldKind::Timestamp => match json.as_str().and_then(parse_time) {
                Some(at) => Ok(Value::Time(at)),
                None => Err(self.error(location, format!("expected a timestamp, found {}", json))),
            },
            FieldKind::Reference => match json.as_str().and_then(RefToken::parse) {
                Some(token) => Ok(Value::Ref((self.resolve)(&token)?)),
                None => Err(self.error(location, format!("expected a reference, found {}", json))),
            },
            FieldKind::List(inner) => match json {
                Json::Array(items) => items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| self.decode_value(inner, item, &format!("{}[{}]", location, i)))
                    .collect::<StoreResult<_>>()
                    .map(Value::List),
                _ => Err(self.error(location, format!("expected a list, found {}", json))),
            },
            FieldKind::Map(inner) => match json {
                Json::Object(map) => self.decode_map(inner, map, location),
                _ => Err(self.error(location, format!("expected a map, found {}", json))),
            },
            FieldKind::Any => self.sniff(json, location),
        }
    }

    fn decode_map(
        &mut self,
        kind: &FieldKind,
        map: &Map<String, Json>,
        location: &str,
    ) -> StoreResult<Value> {
        let mut out = BTreeMap::new();
        for (key, item) in map {
            let value = self.decode_value(kind, item, &format!("{}.{}", location, key))?;
            out.insert(key.clone(), value);
        }
        Ok(Value::Map(out))
    }

    fn sniff(&mut self, json: &Json, location: &str) -> StoreResult<Value> {
        match json {
            Json::String(s) if s.starts_with(DATE_PREFIX) => {
                Ok(parse_time(s).map_or_else(|| Value::Text(s.clone()), Value::Time))
            }
            Json::String(s) if s.starts_with(REF_PREFIX) => match RefToken::parse(s) {
                Some(token) => Ok(Value::Ref((self.resolve)(&token)?)),
                None => Err(self.error(location, format!("malformed reference {:?}", s))),
            },
            Json::Array(items) => items
                .iter()
                .enumerate()
                .map(|(i, item)| self.sniff(item, &format!("{}[{}]", location, i)))
                .collect::<StoreResult<_>>()
                .map(Value::List),
            Json::Object(map) => self.decode_map(&FieldKind::Any, map, location),
            other => Ok(plain(other)),
        }
    }

    fn error(&self, location: &str, reason: String) -> StoreError {
        StoreError::Decode {
            store: self.store.clone(),
            snapshot: self.snapshot,
            location: location.to_string(),
            reason,
        }
    }
}

/// Convert JSON without interpreting strings.
///
/// Integers outside the `i64` range become floats.
pub fn plain(json: &Json) -> Value {
    match json {
        Json::Null => Value::Null,
        Json::Bool(b) => Value::Bool(*b),
        Json::Number(n) => n
            .as_i64()
            .map(Value::Int)
            .or_else(|| n.as_f64().map(Value::Float))
            .unwrap_or(Value::Null),
        Json::String(s) => Value::Text(s.clone()),
        Json::Array(items) => Value::List(items.iter().map(plain).collect()),
        Json::Object(map) => Value::Map(
            map.iter()
                .map(|(key, item)| (key.clone(), plain(item)))
                .collect(),
        ),
    }
}
