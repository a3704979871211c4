//! Update command for the govm CLI.
//!
//! ## Usage
//!
//! ```bash
//! govm update          # every installed line
//! govm update all      # same
//! govm update go1.21   # one line
//! ```

use anyhow::Result;
use clap::Args;

use super::Session;
use crate::toolchain::lifecycle;
use crate::toolchain::{Installer, Platform};

/// Arguments for the update command.
#[derive(Args)]
pub struct UpdateArgs {
    /// Minor line to update, or "all". Defaults to every installed line.
    pub target: Option<String>,
}

/// Executes the update command.
///
/// Installs the newest release of each targeted line, then cleans the
/// releases it supersedes. One failing line does not stop the others.
///
/// # Errors
///
/// Returns an error naming every line that failed.
pub async fn execute(args: &UpdateArgs) -> Result<()> {
    let session = Session::open()?;
    let catalog = session.catalog().await?;
    let fetcher = session.fetcher()?;
    let platform = Platform::detect()?;

    let target = args.target.as_deref().unwrap_or("");
    let installer = Installer::new(
        &session.settings,
        &session.layout,
        session.linker.as_ref(),
        &fetcher,
        platform,
    );

    if target.is_empty() || target == "all" {
        println!("Updating all installed lines...");
    } else {
        println!("Updating {target}...");
    }
    lifecycle::update(&installer, &catalog, target).await?;
    println!("Update complete.");

    Ok(())
}
