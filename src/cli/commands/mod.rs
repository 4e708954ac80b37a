//! cli::commands
//!
//! Command dispatch and handlers.
//!
//! # Architecture
//!
//! Each command handler:
//! 1. Validates command-specific arguments
//! 2. Calls the database to execute the command
//! 3. Formats and displays output

mod check;
mod completion;
mod config_cmd;
mod log_cmd;
mod show;

pub use check::check;
pub use completion::completion;
pub use log_cmd::log;
pub use show::show;

use anyhow::{Context as _, Result};

use super::args::{Command, ConfigAction};
use super::Context;
use crate::core::types::StorePath;

/// Dispatch a parsed command to its handler.
pub fn dispatch(command: Command, ctx: &Context) -> Result<()> {
    match command {
        Command::Check { store } => check(ctx, &parse_store(&store)?),
        Command::Log { store, limit } => log(ctx, &parse_store(&store)?, limit),
        Command::Show { store, at } => show(ctx, &parse_store(&store)?, at.as_deref()),
        Command::Config { action } => match action {
            ConfigAction::Get { key } => config_cmd::get(ctx, &key),
            ConfigAction::Set { key, value } => config_cmd::set(ctx, &key, &value),
            ConfigAction::List => config_cmd::list(ctx),
        },
        Command::Completion { shell } => completion(shell),
    }
}

fn parse_store(store: &str) -> Result<StorePath> {
    StorePath::new(store).with_context(|| format!("Invalid store path '{}'", store))
}
