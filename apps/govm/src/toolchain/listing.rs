//! Release listing: a checkout of the upstream `golang/dl` repository, which
//! holds one directory per published release.
//!
//! The checkout is refreshed at most once per [`REFRESH_INTERVAL`]. When git
//! is unavailable or the network is down, the listing is seeded from
//! [`BUNDLED_RELEASES`] so that archive installs still work offline of git.

use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, SystemTime};

use anyhow::{Context, Result, bail};
use tokio::process::Command;
use tracing::{debug, info, warn};

use super::catalog::Catalog;
use super::config::Settings;
use super::paths::Layout;
use crate::errors::{GovmError, GovmResult};

/// Minimum time between two refreshes of the listing.
pub const REFRESH_INTERVAL: Duration = Duration::from_secs(60);

/// Deadline for one `git clone` or `git pull`.
pub const GIT_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Releases known at build time, used when the listing cannot be fetched.
pub static BUNDLED_RELEASES: &[&str] = &[
    // go1.24
    "go1.24.4", "go1.24.3", "go1.24.2", "go1.24.1", "go1.24.0", "go1.24rc3", "go1.24rc2",
    "go1.24rc1", // go1.23
    "go1.23.10", "go1.23.9", "go1.23.8", "go1.23.7", "go1.23.6", "go1.23.5", "go1.23.4",
    "go1.23.3", "go1.23.2", "go1.23.1", "go1.23.0", "go1.23rc2", "go1.23rc1", // go1.22
    "go1.22.12", "go1.22.11", "go1.22.10", "go1.22.9", "go1.22.8", "go1.22.7", "go1.22.6",
    "go1.22.5", "go1.22.4", "go1.22.3", "go1.22.2", "go1.22.1", "go1.22.0", "go1.22rc2",
    "go1.22rc1", // go1.21
    "go1.21.13", "go1.21.12", "go1.21.11", "go1.21.10", "go1.21.9", "go1.21.8", "go1.21.7",
    "go1.21.6", "go1.21.5", "go1.21.4", "go1.21.3", "go1.21.2", "go1.21.1", "go1.21.0",
    "go1.21rc4", "go1.21rc3", "go1.21rc2", // go1.20
    "go1.20.14", "go1.20.13", "go1.20.12", "go1.20.11", "go1.20.10", "go1.20.9", "go1.20.8",
    "go1.20.7", "go1.20.6", "go1.20.5", "go1.20.4", "go1.20.3", "go1.20.2", "go1.20.1",
    "go1.20", "go1.20rc3", "go1.20rc2", "go1.20rc1", // go1.19
    "go1.19.13", "go1.19.12", "go1.19.11", "go1.19.10", "go1.19.9", "go1.19.8", "go1.19.7",
    "go1.19.6", "go1.19.5", "go1.19.4", "go1.19.3", "go1.19.2", "go1.19.1", "go1.19",
    // go1.18
    "go1.18.10", "go1.18.9", "go1.18.8", "go1.18.7", "go1.18.6", "go1.18.5", "go1.18.4",
    "go1.18.3", "go1.18.2", "go1.18.1", "go1.18", "go1.18rc1", "go1.18beta2", "go1.18beta1",
    // go1.17
    "go1.17.13", "go1.17.12", "go1.17.11", "go1.17.10", "go1.17.9", "go1.17.8", "go1.17.7",
    "go1.17.6", "go1.17.5", "go1.17.4", "go1.17.3", "go1.17.2", "go1.17.1", "go1.17",
    // go1.16
    "go1.16.15", "go1.16.14", "go1.16.13", "go1.16.12", "go1.16.11", "go1.16.10", "go1.16.9",
    "go1.16.8", "go1.16.7", "go1.16.6", "go1.16.5", "go1.16.4", "go1.16.3", "go1.16.2",
    "go1.16.1", "go1.16", "gotip",
];

/// Refreshes the listing if it is stale, then reads it.
///
/// # Errors
///
/// Returns [`GovmError::Catalog`] if the listing is unusable even after
/// falling back to the bundled releases.
pub async fn load_catalog(layout: &Layout, settings: &Settings) -> GovmResult<Catalog> {
    refresh(layout, settings).await?;
    Catalog::scan(&layout.catalog_dir())
}

/// Brings the listing up to date.
///
/// Skips the network entirely when the last refresh happened less than
/// [`REFRESH_INTERVAL`] ago and the listing exists.
///
/// # Errors
///
/// Returns an error only if neither git nor the bundled fallback produced a
/// listing.
pub async fn refresh(layout: &Layout, settings: &Settings) -> GovmResult<()> {
    let catalog_dir = layout.catalog_dir();
    let stamp = layout.refresh_stamp();

    if catalog_dir.is_dir() && is_fresh(&stamp, SystemTime::now()) {
        debug!("listing refreshed less than {REFRESH_INTERVAL:?} ago");
        return Ok(());
    }

    std::fs::create_dir_all(&layout.data_dir).map_err(|e| {
        GovmError::io_error(format!("create {}", layout.data_dir.display()), e)
    })?;

    if let Err(e) = sync_repo(&settings.catalog_repo, &catalog_dir).await {
        warn!("could not update release listing: {e:#}");
        if !has_entries(&catalog_dir) {
            info!("using bundled release listing");
            seed_bundled(&catalog_dir)?;
        }
    }

    std::fs::write(&stamp, unix_now().to_string())
        .map_err(|e| GovmError::io_error(format!("write {}", stamp.display()), e))?;
    Ok(())
}

/// Whether the stamp file was written within [`REFRESH_INTERVAL`] of `now`.
#[must_use]
pub fn is_fresh(stamp: &Path, now: SystemTime) -> bool {
    std::fs::metadata(stamp)
        .and_then(|m| m.modified())
        .ok()
        .and_then(|modified| now.duration_since(modified).ok())
        .is_some_and(|age| age < REFRESH_INTERVAL)
}

/// Creates one empty directory per bundled release.
///
/// # Errors
///
/// Returns [`GovmError::Catalog`] if the directories cannot be created.
pub fn seed_bundled(catalog_dir: &Path) -> GovmResult<()> {
    for name in BUNDLED_RELEASES {
        std::fs::create_dir_all(catalog_dir.join(name)).map_err(|e| {
            GovmError::catalog(format!("cannot seed {}: {e}", catalog_dir.display()))
        })?;
    }
    Ok(())
}

fn has_entries(dir: &Path) -> bool {
    std::fs::read_dir(dir)
        .map(|mut entries| entries.next().is_some())
        .unwrap_or(false)
}

async fn sync_repo(repo: &str, dir: &Path) -> Result<()> {
    let git = which::which("git").context("git not found in PATH")?;

    if dir.join(".git").is_dir() {
        return run_git(&git, &["pull", "--ff-only", "-q"], Some(dir)).await;
    }

    let staging = dir.with_extension("tmp");
    let _ = tokio::fs::remove_dir_all(&staging).await;
    let staging_arg = staging.to_string_lossy();
    run_git(
        &git,
        &["clone", "--depth", "1", "-q", repo, &staging_arg],
        None,
    )
    .await?;

    if dir.exists() {
        tokio::fs::remove_dir_all(dir)
            .await
            .with_context(|| format!("Failed to remove {}", dir.display()))?;
    }
    tokio::fs::rename(&staging, dir)
        .await
        .with_context(|| format!("Failed to move listing into {}", dir.display()))?;
    info!("cloned release listing from {repo}");
    Ok(())
}

async fn run_git(git: &Path, args: &[&str], cwd: Option<&Path>) -> Result<()> {
    let mut cmd = Command::new(git);
    cmd.args(args)
        .env("GIT_TERMINAL_PROMPT", "0")
        .stdin(Stdio::null())
        .kill_on_drop(true);
    if let Some(cwd) = cwd {
        cmd.current_dir(cwd);
    }
    debug!("running git {}", args.join(" "));

    let output = tokio::time::timeout(GIT_TIMEOUT, cmd.output())
        .await
        .with_context(|| format!("git {} timed out", args[0]))?
        .context("Failed to run git")?;

    if !output.status.success() {
        bail!(
            "git {} exited with {}: {}",
            args[0],
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }
    Ok(())
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
