//! core::ops
//!
//! Crash-safety primitives for store mutation.
//!
//! # Modules
//!
//! - [`durable`] - Flushed and synced file writes, fault injection
//! - [`lock`] - Exclusive per-store advisory lock
//! - [`sentinel`] - In-flight save marker
//! - [`guard`] - Consistency check and repair of interrupted saves
//!
//! # Architecture
//!
//! Every save:
//! 1. Acquires the store lock
//! 2. Runs the guard so the store starts consistent
//! 3. Writes the sentinel naming the new snapshot (durability barrier 1)
//! 4. Writes the snapshot (durability barrier 2)
//! 5. Removes the sentinel
//!
//! A crash anywhere in 3-5 leaves a sentinel that the next guard run repairs.

pub mod durable;
pub mod guard;
pub mod lock;
pub mod sentinel;

pub use guard::{check, CheckReport, GuardError, Repair, SentinelPolicy};
pub use lock::{LockError, StoreLock};
pub use sentinel::{Sentinel, SentinelError, SentinelTarget};
