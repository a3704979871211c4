//! Clean command for the govm CLI.
//!
//! ## Usage
//!
//! ```bash
//! govm clean go1.20    # keep only the newest go1.20.x and locked releases
//! ```

use anyhow::Result;
use clap::Args;

use super::Session;
use crate::toolchain::CleanOutcome;
use crate::toolchain::lifecycle;

/// Arguments for the clean command.
#[derive(Args)]
pub struct CleanArgs {
    /// Minor line to clean (e.g. "go1.20").
    pub line: String,
}

/// Executes the clean command.
///
/// # Errors
///
/// Returns an error if the line is unknown or a release could not be
/// deleted.
pub async fn execute(args: &CleanArgs) -> Result<()> {
    let session = Session::open()?;
    let catalog = session.catalog().await?;

    let report = lifecycle::clean(
        &session.layout,
        session.linker.as_ref(),
        &catalog,
        &args.line,
    )?;

    let removed: Vec<&str> = report.with(CleanOutcome::Removed).collect();
    let locked: Vec<&str> = report.with(CleanOutcome::Locked).collect();

    if removed.is_empty() {
        println!("Nothing to clean in {}.", args.line);
    } else {
        println!("Removed {}.", removed.join(", "));
    }
    if !locked.is_empty() {
        println!("Kept locked {}.", locked.join(", "));
    }

    Ok(())
}
