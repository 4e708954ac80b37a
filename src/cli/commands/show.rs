//! show command - Print the raw snapshot valid at a point in time

use anyhow::{Context as _, Result};

use crate::cli::Context;
use crate::core::types::{parse_when, StorePath};
use crate::ui::output;

/// Print the snapshot of `store` valid at `at` (default now).
pub fn show(ctx: &Context, store: &StorePath, at: Option<&str>) -> Result<()> {
    let when = at.map(parse_when).transpose()?;
    let db = ctx.open_database()?;
    let (id, json) = db
        .read_raw(store, when)
        .with_context(|| format!("Failed to read store '{}'", store))?;

    output::debug(format!("snapshot {}", id), ctx.verbosity());
    let text = serde_json::to_string_pretty(&json).context("Failed to format snapshot")?;
    println!("{}", text);
    Ok(())
}
