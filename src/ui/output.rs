//! ui::output
//!
//! Terminal output for ptdb commands.
//!
//! # Streams
//!
//! Command results (snapshot listings, raw JSON, check outcomes) go to
//! stdout and are suppressed by `--quiet`, so scripts can rely on an empty
//! stdout. Warnings, errors and `--debug` notes go to stderr with a prefix.
//! Library diagnostics are emitted through `tracing` and never pass here.

use std::fmt::Display;
use std::io::{self, Write};

/// How much a command prints.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Verbosity {
    /// Errors only
    Quiet,
    #[default]
    Normal,
    /// Normal output plus `[debug]` notes on stderr
    Debug,
}

impl Verbosity {
    /// Create verbosity from the global flags. Quiet wins over debug.
    pub fn from_flags(quiet: bool, debug: bool) -> Self {
        match (quiet, debug) {
            (true, _) => Verbosity::Quiet,
            (false, true) => Verbosity::Debug,
            (false, false) => Verbosity::Normal,
        }
    }

    /// Whether results and warnings are shown.
    pub fn shows_results(self) -> bool {
        self != Verbosity::Quiet
    }

    /// Whether debug notes are shown.
    pub fn shows_debug(self) -> bool {
        self == Verbosity::Debug
    }
}

/// Write `message` on its own line with an optional prefix.
///
/// Output is best effort: a closed pipe (`ptdb log | head`) is not an error
/// worth reporting.
fn line(out: &mut impl Write, prefix: &str, message: impl Display) {
    let _ = writeln!(out, "{}{}", prefix, message);
}

/// A command result on stdout.
pub fn print(message: impl Display, verbosity: Verbosity) {
    if verbosity.shows_results() {
        line(&mut io::stdout().lock(), "", message);
    }
}

/// A completed action on stdout (`accounts/cash: ok`).
pub fn success(message: impl Display, verbosity: Verbosity) {
    print(message, verbosity);
}

/// A problem that did not stop the command.
pub fn warn(message: impl Display, verbosity: Verbosity) {
    if verbosity.shows_results() {
        line(&mut io::stderr().lock(), "warning: ", message);
    }
}

/// The error that ended the command. Always shown.
pub fn error(message: impl Display) {
    line(&mut io::stderr().lock(), "error: ", message);
}

/// A `--debug` note, such as which snapshot or config file was used.
pub fn debug(message: impl Display, verbosity: Verbosity) {
    if verbosity.shows_debug() {
        line(&mut io::stderr().lock(), "[debug] ", message);
    }
}
