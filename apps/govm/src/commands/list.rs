//! List command for the govm CLI.
//!
//! ## Usage
//!
//! ```bash
//! govm list               # every known line
//! govm list --installed   # only lines with an installed release
//! govm list --json
//! ```
//!
//! ## Output Format
//!
//! ```text
//! LINE       LATEST       INSTALLED
//! gotip      gotip        -
//! go1.21     go1.21.3     go1.21.3*
//! go1.20     go1.20.5     go1.20.4 (locked)
//! ```
//!
//! `*` marks the release behind `go.latest`.

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use super::Session;
use crate::toolchain::{Catalog, Layout, MinorVersion, Version, latest};

/// Arguments for the list command.
#[derive(Args)]
pub struct ListArgs {
    /// Print JSON instead of a table.
    #[arg(long)]
    pub json: bool,

    /// Only show lines with at least one installed release.
    #[arg(long)]
    pub installed: bool,
}

#[derive(Serialize)]
struct LineEntry<'a> {
    line: &'a str,
    latest: &'a Version,
    installed: Vec<InstalledEntry<'a>>,
}

#[derive(Serialize)]
struct InstalledEntry<'a> {
    #[serde(flatten)]
    version: &'a Version,
    locked: bool,
    current: bool,
}

/// Executes the list command.
///
/// # Errors
///
/// Returns an error if the catalog cannot be loaded.
pub async fn execute(args: &ListArgs) -> Result<()> {
    let session = Session::open()?;
    let catalog = session.catalog().await?;
    let entries = collect(&session.layout, &catalog, args.installed);

    if args.json {
        let json = serde_json::to_string_pretty(&entries).context("Failed to encode JSON")?;
        println!("{json}");
        return Ok(());
    }

    if entries.is_empty() {
        println!("No Go releases installed.");
        println!();
        println!("Run 'govm install <version>' to install one.");
        return Ok(());
    }

    println!("{:<10} {:<12} INSTALLED", "LINE", "LATEST");
    for entry in &entries {
        println!(
            "{:<10} {:<12} {}",
            entry.line,
            entry.latest.raw,
            format_installed(&entry.installed)
        );
    }

    Ok(())
}

fn collect<'a>(layout: &Layout, catalog: &'a Catalog, installed_only: bool) -> Vec<LineEntry<'a>> {
    let current = latest::pick(layout, catalog);
    catalog
        .lines()
        .map(|line| LineEntry {
            line: &line.normalized,
            latest: line.latest(),
            installed: installed_patches(layout, line, current),
        })
        .filter(|entry| !installed_only || !entry.installed.is_empty())
        .collect()
}

fn installed_patches<'a>(
    layout: &Layout,
    line: &'a MinorVersion,
    current: Option<&Version>,
) -> Vec<InstalledEntry<'a>> {
    line.patches
        .iter()
        .filter(|patch| layout.is_installed(patch))
        .map(|patch| InstalledEntry {
            version: patch,
            locked: layout.is_locked(patch),
            current: current.is_some_and(|c| c.raw == patch.raw),
        })
        .collect()
}

fn format_installed(installed: &[InstalledEntry<'_>]) -> String {
    if installed.is_empty() {
        return "-".to_string();
    }
    installed
        .iter()
        .map(|entry| {
            let mut text = entry.version.raw.clone();
            if entry.current {
                text.push('*');
            }
            if entry.locked {
                text.push_str(" (locked)");
            }
            text
        })
        .collect::<Vec<_>>()
        .join(", ")
}
