//! cli
//!
//! Command-line interface layer for ptdb.
//!
//! # Responsibilities
//!
//! - Parse command-line arguments and global flags
//! - Delegate to command handlers
//! - Format results for the terminal
//!
//! # Architecture
//!
//! The CLI layer is thin. It parses arguments via clap and calls into
//! [`crate::db::Database`]. Commands work on raw snapshots and need no
//! registered types, so the database is opened with an empty registry.

pub mod args;
pub mod commands;

pub use args::{Cli, Shell};

use std::path::PathBuf;

use anyhow::{Context as _, Result};

use crate::db::{Database, Registry};
use crate::ui::output::Verbosity;

/// Settings shared by every command.
#[derive(Debug, Clone)]
pub struct Context {
    /// Database root.
    pub root: PathBuf,
    pub debug: bool,
    pub quiet: bool,
}

impl Context {
    pub fn verbosity(&self) -> Verbosity {
        Verbosity::from_flags(self.quiet, self.debug)
    }

    /// Open the database at the root with its configuration.
    pub fn open_database(&self) -> Result<Database> {
        Database::open_root(&self.root, Registry::default())
            .with_context(|| format!("Failed to open database at {}", self.root.display()))
    }
}

/// Run the CLI application.
///
/// This is the main entry point called from `main.rs`.
pub fn run(cli: Cli) -> Result<()> {
    let root = match cli.root {
        Some(root) => root,
        None => std::env::current_dir().context("Failed to determine current directory")?,
    };
    let ctx = Context {
        root,
        debug: cli.debug,
        quiet: cli.quiet,
    };

    commands::dispatch(cli.command, &ctx)
}
