//! Install orchestration: resolve a request, acquire the release, link it.
//!
//! ```text
//! Requested -> Resolved -> Acquiring -> Linked -> Done
//!      \___________\___________\__________\____-> Failed
//! ```
//!
//! Acquisition tries, in order, a build from the listing's source tree and
//! then the upstream archive from each configured mirror. The first success
//! wins; when all fail the error carries one reason per attempt.

use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use tracing::{debug, info};

use super::archive::{GO_ARCHIVE_STRIP, unpack};
use super::attempt::{Attempt, first_success};
use super::catalog::{Catalog, MinorVersion};
use super::config::Settings;
use super::download::Fetch;
use super::latest;
use super::link::Linker;
use super::paths::Layout;
use super::platform::Platform;
use super::resolver;
use super::version::Version;
use crate::errors::{GovmError, GovmResult};

/// Installs releases and keeps their aliases current.
pub struct Installer<'a> {
    settings: &'a Settings,
    layout: &'a Layout,
    linker: &'a dyn Linker,
    fetcher: &'a dyn Fetch,
    platform: Platform,
}

impl<'a> Installer<'a> {
    #[must_use]
    pub fn new(
        settings: &'a Settings,
        layout: &'a Layout,
        linker: &'a dyn Linker,
        fetcher: &'a dyn Fetch,
        platform: Platform,
    ) -> Self {
        Self {
            settings,
            layout,
            linker,
            fetcher,
            platform,
        }
    }

    #[must_use]
    pub fn layout(&self) -> &'a Layout {
        self.layout
    }

    #[must_use]
    pub fn linker(&self) -> &'a dyn Linker {
        self.linker
    }

    /// Maps a request to a concrete release.
    ///
    /// A line id (`go1.21`) resolves to that line's newest release; anything
    /// else must name one release of a known line, with `go1.N.0` and `go1.N`
    /// treated as the same release.
    ///
    /// # Errors
    ///
    /// [`GovmError::Parse`] for a malformed id, [`GovmError::VersionNotFound`]
    /// when no known release matches.
    pub fn resolve(catalog: &Catalog, id: &str) -> GovmResult<Version> {
        if let Some(line) = catalog.get(id) {
            return Ok(line.latest().clone());
        }

        let parsed = Version::parse(id)?;
        catalog
            .get(&parsed.normalized)
            .and_then(|line| line.find(id))
            .cloned()
            .ok_or_else(|| GovmError::version_not_found(id))
    }

    /// Installs `id` and refreshes `go.latest` whatever the outcome.
    ///
    /// # Errors
    ///
    /// Returns the first fatal error of resolve, acquire or link.
    pub async fn install(&self, catalog: &Catalog, id: &str) -> GovmResult<Version> {
        let result = self.install_target(catalog, id).await;
        latest::refresh_quietly(self.layout, self.linker, catalog);
        result
    }

    async fn install_target(&self, catalog: &Catalog, id: &str) -> GovmResult<Version> {
        let version = Self::resolve(catalog, id)?;
        debug!("resolved {id} to {version}");

        if self.layout.is_installed(&version) {
            info!("{version} is already installed");
        } else {
            debug!("acquiring {version}");
            self.acquire(&version).await?;
        }

        if let Some(line) = catalog.get(&version.normalized) {
            self.link(&version, line)?;
        }
        debug!("linked {version}");
        Ok(version)
    }

    /// Runs every acquisition strategy until one produces an installed
    /// release.
    ///
    /// # Errors
    ///
    /// Returns [`GovmError::AcquisitionFailed`] with one reason per attempt.
    pub async fn acquire(&self, version: &Version) -> GovmResult<()> {
        let archive_name = self.platform.archive_name(version);

        let mut attempts = Vec::new();
        if self.settings.build_from_source {
            attempts.push(Attempt::new(
                "source build",
                resolver::build_from_source(self.layout, version),
            ));
        }
        for url in self.settings.archive_urls(&archive_name) {
            attempts.push(Attempt::new(
                format!("archive {url}"),
                self.install_archive(version, url, &archive_name),
            ));
        }

        first_success(attempts)
            .await
            .map_err(|reasons| GovmError::acquisition_failed(&version.raw, reasons))?;
        info!("installed {version} into {}", self.layout.install_dir(version).display());
        Ok(())
    }

    async fn install_archive(&self, version: &Version, url: String, archive_name: &str) -> Result<()> {
        let archive = self.layout.download_path(archive_name);
        self.fetcher.fetch(&url, &archive).await?;

        let result = self.unpack_into_place(version, archive.clone()).await;
        let _ = tokio::fs::remove_file(&archive).await;
        result
    }

    async fn unpack_into_place(&self, version: &Version, archive: PathBuf) -> Result<()> {
        let install_dir = self.layout.install_dir(version);
        if install_dir.exists() {
            tokio::fs::remove_dir_all(&install_dir)
                .await
                .with_context(|| format!("Failed to clear {}", install_dir.display()))?;
        }

        let dest = install_dir.clone();
        let unpacked = tokio::task::spawn_blocking(move || {
            unpack(&archive, &dest, GO_ARCHIVE_STRIP)
        })
        .await
        .context("unpack task failed")
        .and_then(|result| result)
        .and_then(|()| {
            if self.layout.is_installed(version) {
                Ok(())
            } else {
                Err(anyhow!("archive has no bin/go"))
            }
        });
        if let Err(e) = unpacked {
            let _ = tokio::fs::remove_dir_all(&install_dir).await;
            return Err(e);
        }

        let sentinel = self.layout.unpacked_sentinel(version);
        tokio::fs::write(&sentinel, b"")
            .await
            .with_context(|| format!("Failed to write {}", sentinel.display()))?;
        Ok(())
    }

    /// Points the exact alias at `version`, and the line alias and the line's
    /// `<sdk>/<line>.latest` directory link at the line's newest installed
    /// release.
    ///
    /// # Errors
    ///
    /// Returns [`GovmError::LinkFailed`] if an alias cannot be written.
    pub fn link(&self, version: &Version, line: &MinorVersion) -> GovmResult<()> {
        let exact = self.layout.exact_alias(version);
        self.linker.link(&self.layout.toolchain_binary(version), &exact)?;

        let line_alias = self.layout.line_alias(version);
        if line_alias == exact {
            return Ok(());
        }

        let newest = line.latest_installed(self.layout).unwrap_or(version);
        let newest_exact = self.layout.exact_alias(newest);
        if newest != version && !newest_exact.exists() {
            self.linker
                .link(&self.layout.toolchain_binary(newest), &newest_exact)?;
        }
        self.linker.link(&newest_exact, &line_alias)?;
        self.linker.link_dir(
            &self.layout.install_dir(newest),
            &self.layout.line_sdk_link(newest),
        )
    }
}
