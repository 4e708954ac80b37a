//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! These flags are available on all commands:
//! - `--help` / `-h`: Show help
//! - `--version`: Show version
//! - `--root <path>`: Database root (default: current directory)
//! - `--debug`: Enable debug logging
//! - `--quiet` / `-q`: Minimal output

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// ptdb - Inspect and maintain plaintxtdb stores
#[derive(Parser, Debug)]
#[command(name = "ptdb")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Database root directory
    #[arg(long, global = true, value_name = "DIR")]
    pub root: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Minimal output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Check a store and repair an interrupted save
    #[command(
        name = "check",
        long_about = "Check a store and repair an interrupted save.\n\n\
            Every save first writes a 'saving' marker naming the snapshot it is \
            about to create. If the process died before finishing, the marker is \
            still there. check removes the unfinished snapshot (or keeps it, \
            under the 'verify' sentinel policy, when it is complete JSON) and \
            then removes the marker. A missing store directory is created.",
        after_help = "\
EXAMPLES:
    # Check one store under the current directory
    ptdb check accounts/cash

    # Check a store under another root
    ptdb --root ~/money check transfers/t1"
    )]
    Check {
        /// Store path relative to the root
        store: String,
    },

    /// List the snapshots of a store, newest first
    #[command(
        name = "log",
        after_help = "\
EXAMPLES:
    ptdb log accounts/cash

    # Only the newest three
    ptdb log accounts/cash -n 3"
    )]
    Log {
        /// Store path relative to the root
        store: String,

        /// Show at most this many snapshots
        #[arg(short = 'n', long, value_name = "COUNT")]
        limit: Option<usize>,
    },

    /// Print the snapshot of a store valid at a point in time
    #[command(
        name = "show",
        long_about = "Print the snapshot of a store valid at a point in time.\n\n\
            Picks the newest snapshot taken at or before --at (default: now) \
            and prints its JSON unchanged. References and timestamps appear as \
            their encoded strings.",
        after_help = "\
EXAMPLES:
    ptdb show accounts/cash
    ptdb show accounts/cash --at 2023-03-01
    ptdb show accounts/cash --at '2023-03-01 12:00:00'"
    )]
    Show {
        /// Store path relative to the root
        store: String,

        /// Point in time (RFC 3339, 'YYYY-MM-DD HH:MM:SS' or 'YYYY-MM-DD', UTC)
        #[arg(long, value_name = "TIME")]
        at: Option<String>,
    },

    /// Get, set, or list configuration values
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completion scripts
    #[command(
        name = "completion",
        after_help = "\
EXAMPLES:
    # Bash (add to ~/.bashrc)
    ptdb completion bash >> ~/.bashrc

    # Zsh (add to ~/.zshrc)
    ptdb completion zsh >> ~/.zshrc

    # Fish
    ptdb completion fish > ~/.config/fish/completions/ptdb.fish"
    )]
    Completion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Get a configuration value
    Get {
        /// Configuration key
        key: String,
    },
    /// Set a value in the root configuration file
    Set {
        /// Configuration key
        key: String,
        /// Value to set
        value: String,
    },
    /// List all configuration values
    List,
}

/// Supported shells for completion
#[derive(clap::ValueEnum, Debug, Clone, Copy)]
#[allow(clippy::enum_variant_names)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
}
