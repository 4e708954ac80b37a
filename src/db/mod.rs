//! db
//!
//! Persistable instances and the stores behind them.
//!
//! # Modules
//!
//! - [`schema`] - Type schemas and the class registry
//! - [`value`] - Field values
//! - [`instance`] - Live instances and their handles
//! - [`codec`] - Timestamp and reference encoding inside snapshot JSON
//! - [`identity`] - One live instance per store path
//! - [`store`] - Listing and reading one store directory
//! - [`writer`] - Crash-safe snapshot append
//! - [`reader`] - Point-in-time loading with reference resolution
//! - [`database`] - The service tying it together
//!
//! # Layering
//!
//! `db` builds on [`crate::core`] for paths, locking and the consistency
//! guard. Nothing in `core` depends on `db`.

pub mod codec;
pub mod database;
pub mod error;
pub mod identity;
pub mod instance;
pub mod reader;
pub mod schema;
pub mod store;
pub mod value;
pub mod writer;

pub use database::{Database, DatabaseBuilder};
pub use error::{StoreError, StoreResult};
pub use instance::{Handle, Instance};
pub use schema::{FieldKind, FieldSpec, Registry, RegistryBuilder, Schema, SchemaError};
pub use value::Value;
