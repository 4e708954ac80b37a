//! core
//!
//! Foundation types and crash-safety primitives for plaintxtdb.
//!
//! # Modules
//!
//! - [`types`] - Strong types: StorePath, SnapshotId
//! - [`paths`] - Centralized path routing for on-disk storage
//! - [`clock`] - Injectable wall clock
//! - [`config`] - Configuration schema and loading
//! - [`ops`] - Durable writes, locking, sentinel, consistency guard
//!
//! # Design Principles
//!
//! - Strong typing prevents invalid store paths and snapshot names
//! - Nothing here knows about records or references; that is [`crate::db`]

pub mod clock;
pub mod config;
pub mod ops;
pub mod paths;
pub mod types;
