//! config command - Get, set, or list configuration values

use anyhow::{bail, Context as _, Result};

use crate::cli::Context;
use crate::core::config::{Config, RootConfig};
use crate::core::ops::guard::SentinelPolicy;
use crate::ui::output;

fn load(ctx: &Context) -> Result<Config> {
    Config::load(Some(&ctx.root)).context("Failed to load config")
}

/// Get a configuration value.
pub fn get(ctx: &Context, key: &str) -> Result<()> {
    let config = load(ctx)?;
    match config.get(key) {
        Some(value) => {
            println!("{}", value);
            Ok(())
        }
        None => bail!("Unknown configuration key: {}", key),
    }
}

/// Set a value in the root configuration file.
pub fn set(ctx: &Context, key: &str, value: &str) -> Result<()> {
    let mut root = load(ctx)?.root.unwrap_or_default();

    match key {
        "sentinel_policy" => {
            root.sentinel_policy = Some(match value {
                "discard" => SentinelPolicy::Discard,
                "verify" => SentinelPolicy::Verify,
                _ => bail!("Invalid sentinel_policy '{}': expected 'discard' or 'verify'", value),
            });
        }
        "locking" => root.locking = Some(parse_bool(key, value)?),
        "sync" => root.sync = Some(parse_bool(key, value)?),
        "max_collision_retries" => {
            root.max_collision_retries = Some(
                value
                    .parse()
                    .with_context(|| format!("Invalid max_collision_retries '{}'", value))?,
            );
        }
        _ => bail!("Unknown configuration key: {}", key),
    }

    let path = write(ctx, &root)?;
    output::success(format!("Set {} = {}", key, value), ctx.verbosity());
    output::debug(format!("wrote {}", path.display()), ctx.verbosity());
    Ok(())
}

fn write(ctx: &Context, root: &RootConfig) -> Result<std::path::PathBuf> {
    Config::write_root(&ctx.root, root).context("Failed to write config")
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => bail!("Invalid {} '{}': expected 'true' or 'false'", key, value),
    }
}

/// List all configuration values.
pub fn list(ctx: &Context) -> Result<()> {
    let config = load(ctx)?;

    println!("# Effective Configuration");
    for key in Config::keys() {
        if let Some(value) = config.get(key) {
            println!("{} = {}", key, value);
        }
    }

    let verbosity = ctx.verbosity();
    match config.global_config_loaded_from() {
        Some(path) => output::debug(format!("global config: {}", path.display()), verbosity),
        None => output::debug("global config: (none)", verbosity),
    }
    match config.root_config_loaded_from() {
        Some(path) => output::debug(format!("root config: {}", path.display()), verbosity),
        None => output::debug("root config: (none)", verbosity),
    }
    Ok(())
}
