//! Fix command for the govm CLI.
//!
//! Repairs dangling line aliases and `<sdk>/<line>.latest` directory links,
//! then repoints `go.latest`, creating `go` when it is missing.

use anyhow::Result;
use tracing::warn;

use super::Session;
use crate::toolchain::{latest, lifecycle};

/// Executes the fix command.
///
/// # Errors
///
/// Returns an error if `go.latest` cannot be written.
pub async fn execute() -> Result<()> {
    let session = Session::open()?;
    let catalog = session.catalog().await?;
    let linker = session.linker.as_ref();

    for line in catalog.lines() {
        if let Err(e) = lifecycle::repair_line_alias(&session.layout, linker, line) {
            warn!("could not repair {}: {e}", line.normalized);
        }
    }

    match latest::refresh(&session.layout, linker, &catalog)? {
        Some(version) => println!("go.latest -> {version}"),
        None => println!("No Go release installed. Run 'govm install <version>' first."),
    }

    Ok(())
}
