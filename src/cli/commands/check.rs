//! check command - Run the consistency guard on a store

use anyhow::{Context as _, Result};

use crate::cli::Context;
use crate::core::ops::guard::Repair;
use crate::core::types::StorePath;
use crate::ui::output;

/// Check `store`, repairing an interrupted save.
pub fn check(ctx: &Context, store: &StorePath) -> Result<()> {
    let db = ctx.open_database()?;
    let report = db
        .check(store)
        .with_context(|| format!("Failed to check store '{}'", store))?;
    let verbosity = ctx.verbosity();

    if report.created {
        output::print(format!("{}: created empty store", store), verbosity);
    }
    match &report.repair {
        Some(repair @ Repair::CorruptSentinel { .. }) => {
            output::warn(format!("{}: {}", store, repair), verbosity)
        }
        Some(repair) => output::success(format!("{}: {}", store, repair), verbosity),
        None if !report.created => output::success(format!("{}: ok", store), verbosity),
        None => {}
    }
    Ok(())
}
