//! db::schema
//!
//! Record schemas and the class registry.
//!
//! # Overview
//!
//! A [`Schema`] names a persistable type and lists its persistable fields
//! (its property set). Each field declares a [`FieldKind`], which tells the
//! codec exactly where timestamps and references may appear. Schemas compose
//! explicitly: [`Schema::extending`] copies a base schema's fields into a
//! more specific type.
//!
//! The [`Registry`] maps type names to schemas. It is built once with
//! [`RegistryBuilder`] and is immutable afterwards; the database uses it to
//! construct blank instances when a reference names a type.
//!
//! # Example
//!
//! ```
//! use plaintxtdb::db::schema::{FieldKind, Registry, Schema};
//! use plaintxtdb::db::Value;
//!
//! let repo = Schema::new("Repo")
//!     .field("name", FieldKind::Plain, "")
//!     .field("quantity", FieldKind::Plain, 0);
//! let account = Schema::extending("Account", &repo)
//!     .field("opened", FieldKind::Timestamp, Value::Null);
//!
//! let registry = Registry::builder()
//!     .register(repo)
//!     .unwrap()
//!     .register(account)
//!     .unwrap()
//!     .build();
//!
//! let schema = registry.lookup("Account").unwrap();
//! assert_eq!(schema.field_names().collect::<Vec<_>>(), ["name", "quantity", "opened"]);
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use super::value::Value;

/// Errors from schema registration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("type '{0}' is already registered")]
    DuplicateType(String),

    #[error("invalid type name '{0}': must be non-empty and contain no '|' or whitespace")]
    InvalidTypeName(String),

    #[error("type '{type_name}' has an empty field name")]
    EmptyFieldName { type_name: String },
}

/// Where typed values may appear in a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    /// Plain JSON data. Strings are never interpreted.
    Plain,
    /// A timestamp (or null).
    Timestamp,
    /// A reference to another store (or null).
    Reference,
    /// A sequence whose items have the inner kind.
    List(Box<FieldKind>),
    /// A string-keyed mapping whose values have the inner kind.
    Map(Box<FieldKind>),
    /// Untyped data. Strings carrying the date or reference marker are
    /// decoded as those constructs, so a plain string that happens to
    /// start with a marker is mis-decoded.
    Any,
}

impl FieldKind {
    pub fn list_of(inner: FieldKind) -> Self {
        FieldKind::List(Box::new(inner))
    }

    pub fn map_of(inner: FieldKind) -> Self {
        FieldKind::Map(Box::new(inner))
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKind::Plain => write!(f, "plain"),
            FieldKind::Timestamp => write!(f, "timestamp"),
            FieldKind::Reference => write!(f, "reference"),
            FieldKind::List(inner) => write!(f, "list<{}>", inner),
            FieldKind::Map(inner) => write!(f, "map<{}>", inner),
            FieldKind::Any => write!(f, "any"),
        }
    }
}

/// One persistable field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    name: String,
    kind: FieldKind,
    default: Value,
}

impl FieldSpec {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }

    /// Value a fresh instance starts with.
    pub fn default_value(&self) -> &Value {
        &self.default
    }
}

/// A persistable type: its name and property set.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    type_name: String,
    fields: Vec<FieldSpec>,
}

impl Schema {
    /// Start a schema with no fields.
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            fields: Vec::new(),
        }
    }

    /// Start a schema that embeds every field of `base`.
    pub fn extending(type_name: impl Into<String>, base: &Schema) -> Self {
        Self {
            type_name: type_name.into(),
            fields: base.fields.clone(),
        }
    }

    /// Declare a field. Redeclaring an inherited field replaces it in place.
    pub fn field(mut self, name: impl Into<String>, kind: FieldKind, default: impl Into<Value>) -> Self {
        let spec = FieldSpec {
            name: name.into(),
            kind,
            default: default.into(),
        };
        match self.fields.iter_mut().find(|f| f.name == spec.name) {
            Some(existing) => *existing = spec,
            None => self.fields.push(spec),
        }
        self
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Fields in declaration order, base fields first.
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    pub fn get(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    fn validate(&self) -> Result<(), SchemaError> {
        let name = &self.type_name;
        if name.is_empty() || name.contains('|') || name.chars().any(char::is_whitespace) {
            return Err(SchemaError::InvalidTypeName(name.clone()));
        }
        if self.fields.iter().any(|f| f.name.is_empty()) {
            return Err(SchemaError::EmptyFieldName {
                type_name: name.clone(),
            });
        }
        Ok(())
    }
}

/// Immutable map from type name to schema.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    types: HashMap<String, Arc<Schema>>,
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// Look up a registered type.
    pub fn lookup(&self, type_name: &str) -> Option<Arc<Schema>> {
        self.types.get(type_name).cloned()
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.types.contains_key(type_name)
    }

    /// Registered type names, sorted.
    pub fn type_names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.types.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

/// Collects schemas before freezing them into a [`Registry`].
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    types: HashMap<String, Arc<Schema>>,
}

impl RegistryBuilder {
    /// Add a schema.
    ///
    /// # Errors
    ///
    /// Fails on a duplicate or malformed type name, or an empty field name.
    pub fn register(mut self, schema: Schema) -> Result<Self, SchemaError> {
        schema.validate()?;
        if self.types.contains_key(schema.type_name()) {
            return Err(SchemaError::DuplicateType(schema.type_name.clone()));
        }
        self.types
            .insert(schema.type_name.clone(), Arc::new(schema));
        Ok(self)
    }

    pub fn build(self) -> Registry {
        Registry { types: self.types }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo() -> Schema {
        Schema::new("Repo")
            .field("name", FieldKind::Plain, "")
            .field("quantity", FieldKind::Plain, 0)
    }

    #[test]
    fn extending_inherits_base_fields_first() {
        let account = Schema::extending("Account", &repo()).field("mine", FieldKind::Plain, false);
        let names: Vec<_> = account.field_names().collect();
        assert_eq!(names, ["name", "quantity", "mine"]);
    }

    #[test]
    fn extending_three_levels() {
        let account = Schema::extending("Account", &repo()).field("mine", FieldKind::Plain, false);
        let checking = Schema::extending("Checking", &account).field("bank", FieldKind::Plain, "");
        let names: Vec<_> = checking.field_names().collect();
        assert_eq!(names, ["name", "quantity", "mine", "bank"]);
    }

    #[test]
    fn redeclared_field_replaces_in_place() {
        let usd = Schema::extending("Usd", &repo()).field("quantity", FieldKind::Plain, 100);
        assert_eq!(usd.fields().len(), 2);
        assert_eq!(usd.get("quantity").unwrap().default_value(), &Value::Int(100));
        assert_eq!(usd.fields()[1].name(), "quantity");
    }

    #[test]
    fn base_unchanged_by_extension() {
        let base = repo();
        let _derived = Schema::extending("Derived", &base).field("extra", FieldKind::Plain, 1);
        assert!(base.get("extra").is_none());
    }

    #[test]
    fn registry_lookup() {
        let registry = Registry::builder().register(repo()).unwrap().build();
        assert!(registry.contains("Repo"));
        assert_eq!(registry.lookup("Repo").unwrap().type_name(), "Repo");
        assert!(registry.lookup("Missing").is_none());
        assert_eq!(registry.type_names(), ["Repo"]);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn duplicate_type_rejected() {
        let result = Registry::builder()
            .register(repo())
            .unwrap()
            .register(Schema::new("Repo"));
        assert_eq!(result.unwrap_err(), SchemaError::DuplicateType("Repo".into()));
    }

    #[test]
    fn invalid_type_names_rejected() {
        for name in ["", "A|B", "Two Words"] {
            let result = Registry::builder().register(Schema::new(name));
            assert!(matches!(result, Err(SchemaError::InvalidTypeName(_))), "{name}");
        }
    }

    #[test]
    fn empty_field_name_rejected() {
        let result = Registry::builder().register(Schema::new("T").field("", FieldKind::Plain, 0));
        assert!(matches!(result, Err(SchemaError::EmptyFieldName { .. })));
    }

    #[test]
    fn kind_display() {
        assert_eq!(
            FieldKind::list_of(FieldKind::map_of(FieldKind::Reference)).to_string(),
            "list<map<reference>>"
        );
    }
}
