//! Remove command for the govm CLI.
//!
//! ## Usage
//!
//! ```bash
//! govm remove go1.20.4
//! govm uninstall go1.20.4
//! ```

use anyhow::Result;
use clap::Args;

use super::Session;
use crate::toolchain::lifecycle;

/// Arguments for the remove command.
#[derive(Args)]
pub struct RemoveArgs {
    /// Installed release to remove (e.g. "go1.20.4").
    pub version: String,
}

/// Executes the remove command.
///
/// Deletes the install directory and exact alias, repairs the line alias
/// and refreshes `go.latest`. Lock markers do not protect against an
/// explicit removal.
///
/// # Errors
///
/// Returns an error if the release is not installed or cannot be deleted.
pub async fn execute(args: &RemoveArgs) -> Result<()> {
    let session = Session::open()?;
    let catalog = session.catalog().await?;

    println!("Removing {}...", args.version);
    let version = lifecycle::remove(
        &session.layout,
        session.linker.as_ref(),
        &catalog,
        &args.version,
    )?;
    println!("{version} removed.");

    Ok(())
}
