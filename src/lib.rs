//! plaintxtdb - Append-only, timestamped plain-text object store
//!
//! plaintxtdb persists application records as immutable JSON snapshots in
//! one directory per record, and rebuilds a coherent object graph (including
//! references between records) as it was at any point in time.
//!
//! # Architecture
//!
//! The codebase is layered:
//!
//! - [`core`] - Strong types, paths, config, and crash-safety primitives
//! - [`db`] - Schemas, instances, the reference codec, reader and writer
//! - [`cli`] - Command-line interface for inspecting stores
//! - [`ui`] - User-facing output
//!
//! # Correctness Invariants
//!
//! 1. A save never overwrites an existing snapshot
//! 2. An interrupted save is detected and repaired before the store is read
//! 3. A load for time T sees the newest snapshot taken at or before T
//! 4. Within one [`db::Database`] each store path has exactly one live instance
//!
//! # Example
//!
//! ```
//! use plaintxtdb::db::{Database, FieldKind, Registry, Schema, Value};
//!
//! let registry = Registry::builder()
//!     .register(Schema::new("Account").field("quantity", FieldKind::Plain, 0))
//!     .unwrap()
//!     .register(
//!         Schema::new("Transfer")
//!             .field("from", FieldKind::Reference, Value::Null)
//!             .field("amount", FieldKind::Plain, 0),
//!     )
//!     .unwrap()
//!     .build();
//!
//! let root = tempfile::TempDir::new().unwrap();
//! let db = Database::builder(root.path(), registry.clone()).build();
//!
//! let cash = db.open("accounts/cash", "Account").unwrap();
//! cash.set("quantity", 100).unwrap();
//! db.save(&cash).unwrap();
//!
//! let t1 = db.open("transfers/t1", "Transfer").unwrap();
//! t1.set("from", &cash).unwrap();
//! t1.set("amount", 50).unwrap();
//! db.save(&t1).unwrap();
//!
//! // A new database sees the same graph.
//! let db = Database::builder(root.path(), registry).build();
//! let t1 = db.open("transfers/t1", "Transfer").unwrap();
//! db.load(&t1, None).unwrap();
//! let from = t1.get("from").unwrap();
//! assert_eq!(from.as_handle().unwrap().get("quantity"), Some(Value::Int(100)));
//! ```

pub mod cli;
pub mod core;
pub mod db;
pub mod ui;
