//! Locating a working `go` binary and building releases from source.
//!
//! The search order for a bootstrap toolchain is:
//!
//! 1. System PATH via `which::which("go")`
//! 2. Toolchains already installed under the install root, newest first
//!
//! A candidate is accepted only after `go version` answers within
//! [`PROBE_TIMEOUT`].

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use tokio::process::Command;
use tracing::{debug, info};

use super::paths::{Layout, entry_exists, is_executable};
use super::version::Version;

/// Deadline for `go version`.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(60);

/// Deadline for `go build`.
pub const BUILD_TIMEOUT: Duration = Duration::from_secs(10 * 60);

const VERSION_PREFIX: &str = "go version go";
const NOT_DOWNLOADED: &str = "not downloaded";

/// Runs `<binary> version` and returns its first output line.
///
/// # Errors
///
/// Returns an error if the binary cannot be started, times out, exits
/// unsuccessfully, or prints something other than a Go version banner.
pub async fn probe(binary: &Path) -> Result<String> {
    let mut cmd = Command::new(binary);
    cmd.arg("version")
        .stdin(Stdio::null())
        .kill_on_drop(true);

    let output = tokio::time::timeout(PROBE_TIMEOUT, cmd.output())
        .await
        .with_context(|| format!("{} version timed out", binary.display()))?
        .with_context(|| format!("Failed to run {}", binary.display()))?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    let line = stdout.lines().next().unwrap_or_default().trim().to_string();

    if !output.status.success() {
        bail!(
            "{} version exited with {}: {}",
            binary.display(),
            output.status,
            stderr.trim()
        );
    }
    if line.contains(NOT_DOWNLOADED) || stderr.contains(NOT_DOWNLOADED) {
        bail!("{} is not downloaded", binary.display());
    }
    if !line.starts_with(VERSION_PREFIX) {
        bail!("{} printed unexpected output: {line}", binary.display());
    }
    Ok(line)
}

/// Bootstrap candidates in search order. Not yet probed.
#[must_use]
pub fn candidates(layout: &Layout) -> Vec<PathBuf> {
    let mut found = Vec::new();

    if let Ok(path) = which::which("go") {
        found.push(path);
    }

    let mut installed: Vec<Version> = std::fs::read_dir(&layout.sdk_dir)
        .into_iter()
        .flatten()
        .filter_map(Result::ok)
        .filter_map(|entry| entry.file_name().to_str().map(Version::parse))
        .filter_map(Result::ok)
        .filter(|v| !v.is_tip())
        .collect();
    installed.sort_by(|a, b| b.cmp(a));

    for version in installed {
        let binary = layout.toolchain_binary(&version);
        if is_executable(&binary) && !found.contains(&binary) {
            found.push(binary);
        }
    }

    found
}

/// Finds the first candidate that answers `go version`.
pub async fn find_working_go(layout: &Layout) -> Option<PathBuf> {
    for candidate in candidates(layout) {
        match probe(&candidate).await {
            Ok(banner) => {
                debug!("bootstrap toolchain {}: {banner}", candidate.display());
                return Some(candidate);
            }
            Err(e) => debug!("skipping {}: {e:#}", candidate.display()),
        }
    }
    None
}

/// Builds `version` from its listing source tree into its install directory.
///
/// On any failure the produced binary is removed so that the release does
/// not look installed, together with the install directory when this build
/// created it.
///
/// # Errors
///
/// Returns an error if no source tree or bootstrap toolchain exists, the build
/// fails or times out, or the result does not answer `go version`.
pub async fn build_from_source(layout: &Layout, version: &Version) -> Result<()> {
    let source = layout.source_dir(version);
    if !source.is_dir() {
        bail!("no source tree at {}", source.display());
    }

    let go = find_working_go(layout)
        .await
        .context("no working Go toolchain found to build with")?;

    let install_dir = layout.install_dir(version);
    let fresh_dir = !entry_exists(&install_dir);
    let output = layout.toolchain_binary(version);
    if let Some(parent) = output.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let result = run_build(&go, &source, &output).await;
    let result = match result {
        Ok(()) => probe(&output).await.map(|banner| {
            info!("built {version}: {banner}");
        }),
        Err(e) => Err(e),
    };

    if result.is_err() {
        if fresh_dir {
            let _ = tokio::fs::remove_dir_all(&install_dir).await;
        } else {
            let _ = tokio::fs::remove_file(&output).await;
        }
    }
    result
}

async fn run_build(go: &Path, source: &Path, output: &Path) -> Result<()> {
    let mut cmd = Command::new(go);
    cmd.arg("build")
        .arg("-o")
        .arg(output)
        .current_dir(source)
        .stdin(Stdio::null())
        .kill_on_drop(true);
    bootstrap_env(&mut cmd, go);

    debug!("running {} build -o {} in {}", go.display(), output.display(), source.display());

    let result = tokio::time::timeout(BUILD_TIMEOUT, cmd.output())
        .await
        .context("go build timed out")?
        .with_context(|| format!("Failed to run {}", go.display()))?;

    if !result.status.success() {
        bail!(
            "go build exited with {}: {}",
            result.status,
            String::from_utf8_lossy(&result.stderr).trim()
        );
    }
    Ok(())
}

/// Points GOROOT at the bootstrap toolchain when it is a full distribution,
/// and keeps the build cache out of the user's cache.
fn bootstrap_env(cmd: &mut Command, go: &Path) {
    let Some(root) = go.parent().and_then(Path::parent) else {
        return;
    };
    if !root.join("api").join("go1.1.txt").is_file() {
        return;
    }
    cmd.env("GOROOT", root)
        .env("GOCACHE", std::env::temp_dir().join("govm_build_cache"));
}
