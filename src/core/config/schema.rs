//! core::config::schema
//!
//! Configuration schema types.
//!
//! # Global Config
//!
//! Located at (in order of precedence):
//! 1. `$PTDB_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/ptdb/config.toml`
//! 3. `~/.ptdb/config.toml`
//!
//! # Root Config
//!
//! Located at `<root>/.ptdb/config.toml`. Applies to one database.
//!
//! Both files share the same keys; the root file wins.

use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::core::ops::guard::SentinelPolicy;

/// Settings shared by the global and root config files.
///
/// # Example
///
/// ```toml
/// sentinel_policy = "verify"
/// locking = true
/// max_collision_retries = 8
/// sync = true
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct StoreSettings {
    /// Repair policy for interrupted saves
    pub sentinel_policy: Option<SentinelPolicy>,

    /// Hold the per-store advisory lock while saving
    pub locking: Option<bool>,

    /// Attempts at the next sequence number when a snapshot name is taken
    pub max_collision_retries: Option<u32>,

    /// Issue fsync at each durability barrier
    pub sync: Option<bool>,
}

impl StoreSettings {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_collision_retries == Some(0) {
            return Err(ConfigError::InvalidValue(
                "max_collision_retries must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Overlay `other` on top of `self`; set values in `other` win.
    pub fn merged_with(&self, other: &StoreSettings) -> StoreSettings {
        StoreSettings {
            sentinel_policy: other.sentinel_policy.or(self.sentinel_policy),
            locking: other.locking.or(self.locking),
            max_collision_retries: other.max_collision_retries.or(self.max_collision_retries),
            sync: other.sync.or(self.sync),
        }
    }
}

/// Global configuration (user scope).
pub type GlobalConfig = StoreSettings;

/// Root configuration (one database).
pub type RootConfig = StoreSettings;
