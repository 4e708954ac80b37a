//! log command - List the snapshots of a store
//!
//! One line per snapshot, newest first: the UTC timestamp, the sequence
//! number when more than one snapshot shares a second, and the file name.

use anyhow::{Context as _, Result};

use crate::cli::Context;
use crate::core::types::{SnapshotId, StorePath};
use crate::ui::output;

/// List snapshots of `store`, newest first.
pub fn log(ctx: &Context, store: &StorePath, limit: Option<usize>) -> Result<()> {
    let db = ctx.open_database()?;
    let ids = db
        .history(store)
        .with_context(|| format!("Failed to list store '{}'", store))?;
    let verbosity = ctx.verbosity();

    if ids.is_empty() {
        output::print(format!("{}: no snapshots", store), verbosity);
        return Ok(());
    }

    let shown = limit.unwrap_or(ids.len()).min(ids.len());
    for id in &ids[..shown] {
        println!("{}", format_entry(id));
    }
    if shown < ids.len() {
        output::print(format!("({} older snapshots not shown)", ids.len() - shown), verbosity);
    }
    Ok(())
}

fn format_entry(id: &SnapshotId) -> String {
    let stamp = id.at().format("%Y-%m-%d %H:%M:%S");
    if id.seq() == 0 {
        format!("{}        {}", stamp, id.file_name())
    } else {
        format!("{} #{:<4}  {}", stamp, id.seq(), id.file_name())
    }
}
