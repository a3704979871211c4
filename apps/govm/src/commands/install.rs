//! Install command for the govm CLI.
//!
//! ## Usage
//!
//! ```bash
//! govm install go1.21      # newest go1.21.x
//! govm install go1.21.3    # exact release
//! govm install go1.22rc1   # pre-release
//! govm install gotip       # built from source
//! ```

use std::path::Path;

use anyhow::Result;
use clap::Args;

use super::Session;
use crate::toolchain::{Installer, Platform};

/// Arguments for the install command.
#[derive(Args)]
pub struct InstallArgs {
    /// Release or minor line to install (e.g. "go1.21" or "go1.21.3").
    pub version: String,
}

/// Executes the install command.
///
/// # Process
///
/// 1. Refresh the release listing if it is stale
/// 2. Resolve the request to one release
/// 3. Build from source or download an archive, mirror by mirror
/// 4. Point the exact and line aliases at it
/// 5. Refresh `go.latest`
///
/// # Errors
///
/// Returns an error if the version is unknown or every acquisition strategy
/// failed.
pub async fn execute(args: &InstallArgs) -> Result<()> {
    let session = Session::open()?;
    let catalog = session.catalog().await?;
    let fetcher = session.fetcher()?;
    let platform = Platform::detect()?;

    println!("Installing {} for {platform}...", args.version);
    let installer = Installer::new(
        &session.settings,
        &session.layout,
        session.linker.as_ref(),
        &fetcher,
        platform,
    );
    let version = installer.install(&catalog, &args.version).await?;

    println!(
        "{version} installed in {}",
        session.layout.install_dir(&version).display()
    );

    if !on_path(&session.layout.bin_dir) {
        println!();
        println!(
            "Note: {} is not on your PATH. Add it to run {version} directly:",
            session.layout.bin_dir.display()
        );
        println!("  export PATH=\"{}:$PATH\"", session.layout.bin_dir.display());
    }

    Ok(())
}

fn on_path(dir: &Path) -> bool {
    std::env::var_os("PATH")
        .is_some_and(|path| std::env::split_paths(&path).any(|entry| entry == dir))
}
