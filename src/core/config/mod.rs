//! core::config
//!
//! Configuration schema and loading.
//!
//! # Overview
//!
//! plaintxtdb has two configuration scopes:
//! - **Global**: User-level settings
//! - **Root**: Settings for one database root
//!
//! # Precedence
//!
//! Configuration values are resolved in this order (later overrides earlier):
//! 1. Default values
//! 2. Global config file
//! 3. Root config file
//! 4. CLI flags (not handled here)
//!
//! # Global Config Locations
//!
//! Searched in order:
//! 1. `$PTDB_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/ptdb/config.toml`
//! 3. `~/.ptdb/config.toml`
//!
//! # Example
//!
//! ```no_run
//! use plaintxtdb::core::config::Config;
//! use std::path::Path;
//!
//! let config = Config::load(Some(Path::new("/path/to/db"))).unwrap();
//! println!("Sentinel policy: {}", config.sentinel_policy());
//! println!("Locking: {}", config.locking());
//! ```

pub mod schema;

pub use schema::{GlobalConfig, RootConfig, StoreSettings};

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::core::ops::durable::{write_durable, WriteMode};
use crate::core::ops::guard::SentinelPolicy;
use crate::core::paths::DbPaths;

/// Default number of sequence numbers tried when a snapshot name is taken.
pub const DEFAULT_MAX_COLLISION_RETRIES: u32 = 16;

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("failed to write config file '{path}': {source}")]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config value: {0}")]
    InvalidValue(String),
}

/// Merged configuration from all sources.
///
/// Accessor methods apply precedence automatically: root overrides global,
/// global overrides defaults.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Global configuration
    pub global: GlobalConfig,
    /// Root configuration (if a root was given and has a config file)
    pub root: Option<RootConfig>,
    /// Path to the global config file (if loaded)
    global_path: Option<PathBuf>,
    /// Path to the root config file (if loaded)
    root_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from default locations.
    ///
    /// If `root` is provided, also loads `<root>/.ptdb/config.toml`.
    ///
    /// # Errors
    ///
    /// Returns an error if config files exist but cannot be parsed or hold
    /// invalid values. Missing config files are not an error.
    pub fn load(root: Option<&Path>) -> Result<Config, ConfigError> {
        let global_path = Self::find_global();
        let root_path = root
            .map(|r| DbPaths::new(r).root_config_path())
            .filter(|p| p.exists());
        Self::load_from(global_path.as_deref(), root_path.as_deref())
    }

    /// Load configuration from explicit file paths.
    pub fn load_from(
        global_path: Option<&Path>,
        root_path: Option<&Path>,
    ) -> Result<Config, ConfigError> {
        let global = match global_path {
            Some(path) => Self::read_settings(path)?,
            None => GlobalConfig::default(),
        };
        let root = root_path.map(Self::read_settings).transpose()?;

        global.validate()?;
        if let Some(ref r) = root {
            r.validate()?;
        }

        Ok(Config {
            global,
            root,
            global_path: global_path.map(Path::to_path_buf),
            root_path: root_path.map(Path::to_path_buf),
        })
    }

    /// Find the global config file, if any exists.
    fn find_global() -> Option<PathBuf> {
        // 1. $PTDB_CONFIG
        if let Ok(path) = std::env::var("PTDB_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        // 2. $XDG_CONFIG_HOME/ptdb/config.toml
        if let Ok(xdg_home) = std::env::var("XDG_CONFIG_HOME") {
            let path = PathBuf::from(xdg_home).join("ptdb/config.toml");
            if path.exists() {
                return Some(path);
            }
        }

        // 3. ~/.ptdb/config.toml
        dirs::home_dir()
            .map(|home| home.join(".ptdb/config.toml"))
            .filter(|p| p.exists())
    }

    /// Read and parse one config file.
    fn read_settings(path: &Path) -> Result<StoreSettings, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Write root config atomically.
    ///
    /// Creates `<root>/.ptdb` if needed. The file is written to a temp path,
    /// synced, then renamed into place.
    pub fn write_root(root: &Path, config: &RootConfig) -> Result<PathBuf, ConfigError> {
        config.validate()?;
        let path = DbPaths::new(root).root_config_path();
        Self::write_config_atomic(&path, config)?;
        Ok(path)
    }

    fn write_config_atomic<T: serde::Serialize>(
        path: &Path,
        config: &T,
    ) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::WriteError {
                path: path.to_path_buf(),
                source: e,
            })?;
        }

        let contents =
            toml::to_string_pretty(config).map_err(|e| ConfigError::InvalidValue(e.to_string()))?;

        let temp_path = path.with_extension("toml.tmp");
        write_durable(&temp_path, contents.as_bytes(), WriteMode::Replace, true).map_err(|e| {
            ConfigError::WriteError {
                path: temp_path.clone(),
                source: e,
            }
        })?;

        fs::rename(&temp_path, path).map_err(|e| ConfigError::WriteError {
            path: path.to_path_buf(),
            source: e,
        })?;

        Ok(())
    }

    // =========================================================================
    // Accessor methods with precedence
    // =========================================================================

    /// The effective settings after applying precedence.
    pub fn effective(&self) -> StoreSettings {
        match &self.root {
            Some(root) => self.global.merged_with(root),
            None => self.global.clone(),
        }
    }

    /// Repair policy for interrupted saves.
    ///
    /// Defaults to [`SentinelPolicy::Discard`].
    pub fn sentinel_policy(&self) -> SentinelPolicy {
        self.effective().sentinel_policy.unwrap_or_default()
    }

    /// Whether saves hold the per-store lock.
    ///
    /// Defaults to `true`.
    pub fn locking(&self) -> bool {
        self.effective().locking.unwrap_or(true)
    }

    /// Attempts at the next sequence number when a snapshot name is taken.
    ///
    /// Defaults to [`DEFAULT_MAX_COLLISION_RETRIES`].
    pub fn max_collision_retries(&self) -> u32 {
        self.effective()
            .max_collision_retries
            .unwrap_or(DEFAULT_MAX_COLLISION_RETRIES)
    }

    /// Whether durability barriers fsync.
    ///
    /// Defaults to `true`.
    pub fn sync(&self) -> bool {
        self.effective().sync.unwrap_or(true)
    }

    /// Look up a setting by key for display.
    pub fn get(&self, key: &str) -> Option<String> {
        match key {
            "sentinel_policy" => Some(self.sentinel_policy().to_string()),
            "locking" => Some(self.locking().to_string()),
            "max_collision_retries" => Some(self.max_collision_retries().to_string()),
            "sync" => Some(self.sync().to_string()),
            _ => None,
        }
    }

    /// All known keys, in display order.
    pub fn keys() -> &'static [&'static str] {
        &["sentinel_policy", "locking", "max_collision_retries", "sync"]
    }

    /// Get the path to the loaded global config file.
    pub fn global_config_loaded_from(&self) -> Option<&Path> {
        self.global_path.as_deref()
    }

    /// Get the path to the loaded root config file.
    pub fn root_config_loaded_from(&self) -> Option<&Path> {
        self.root_path.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults_without_files() {
        let config = Config::load_from(None, None).unwrap();

        assert_eq!(config.sentinel_policy(), SentinelPolicy::Discard);
        assert!(config.locking());
        assert!(config.sync());
        assert_eq!(
            config.max_collision_retries(),
            DEFAULT_MAX_COLLISION_RETRIES
        );
        assert!(config.global_config_loaded_from().is_none());
        assert!(config.root_config_loaded_from().is_none());
    }

    #[test]
    fn load_global_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(&path, "locking = false\n").unwrap();

        let config = Config::load_from(Some(&path), None).unwrap();

        assert!(!config.locking());
        assert_eq!(config.global_config_loaded_from(), Some(path.as_path()));
    }

    #[test]
    fn load_root_config() {
        let temp = TempDir::new().unwrap();
        let meta = temp.path().join(".ptdb");
        fs::create_dir_all(&meta).unwrap();
        fs::write(meta.join("config.toml"), "sentinel_policy = \"verify\"\n").unwrap();

        let config = Config::load(Some(temp.path())).unwrap();

        assert_eq!(config.sentinel_policy(), SentinelPolicy::Verify);
        assert!(config.root_config_loaded_from().is_some());
    }

    #[test]
    fn root_overrides_global() {
        let temp = TempDir::new().unwrap();
        let global = temp.path().join("global.toml");
        let root = temp.path().join("root.toml");
        fs::write(&global, "sync = false\nlocking = false\n").unwrap();
        fs::write(&root, "sync = true\n").unwrap();

        let config = Config::load_from(Some(&global), Some(&root)).unwrap();

        assert!(config.sync());
        assert!(!config.locking());
    }

    #[test]
    fn write_root_config_atomic() {
        let temp = TempDir::new().unwrap();
        let settings = RootConfig {
            max_collision_retries: Some(4),
            ..Default::default()
        };

        let path = Config::write_root(temp.path(), &settings).unwrap();

        assert!(path.exists());
        assert!(!path.with_extension("toml.tmp").exists());
        let loaded = Config::load(Some(temp.path())).unwrap();
        assert_eq!(loaded.max_collision_retries(), 4);
    }

    #[test]
    fn invalid_value_rejected() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(&path, "max_collision_retries = 0\n").unwrap();

        let result = Config::load_from(Some(&path), None);
        assert!(matches!(result, Err(ConfigError::InvalidValue(_))));
    }

    #[test]
    fn unknown_fields_rejected() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(&path, "locking = true\nunknown_field = 1\n").unwrap();

        let result = Config::load_from(Some(&path), None);
        assert!(matches!(result, Err(ConfigError::ParseError { .. })));
    }

    #[test]
    fn get_known_and_unknown_keys() {
        let config = Config::default();
        assert_eq!(config.get("sync").as_deref(), Some("true"));
        assert_eq!(config.get("sentinel_policy").as_deref(), Some("discard"));
        assert_eq!(config.get("nope"), None);
        assert!(Config::keys().iter().all(|k| config.get(k).is_some()));
    }
}
