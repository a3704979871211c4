//! Lock and unlock commands for the govm CLI.
//!
//! A locked release survives `clean` and `update`.
//!
//! ## Usage
//!
//! ```bash
//! govm lock go1.20.4
//! govm unlock go1.20.4
//! ```

use anyhow::Result;
use clap::Args;

use super::Session;
use crate::toolchain::LockAction;
use crate::toolchain::lifecycle;

/// Arguments for the lock and unlock commands.
#[derive(Args)]
pub struct LockArgs {
    /// Installed release (e.g. "go1.20.4").
    pub version: String,
}

/// Executes the lock or unlock command.
///
/// # Errors
///
/// Returns an error if the release is not installed or the marker cannot be
/// written.
pub fn execute(args: &LockArgs, action: LockAction) -> Result<()> {
    let session = Session::open()?;
    let version = lifecycle::lock(&session.layout, &args.version, action)?;
    println!("{version} {action}.");
    Ok(())
}
