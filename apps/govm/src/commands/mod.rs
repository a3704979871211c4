//! Command modules for the govm CLI.
//!
//! ## Installing
//!
//! - [`install`] - Install a release or the newest release of a line
//! - [`update`] - Move installed lines to their newest release
//!
//! ## Housekeeping
//!
//! - [`clean`] - Remove superseded releases of a line
//! - [`lock`] - Protect a release from `clean`, or lift the protection
//! - [`remove`] - Uninstall one release
//! - [`fix`] - Repair the `go.latest` and `go` aliases
//!
//! ## Inspection
//!
//! - [`list`] - Show known lines and installed releases

pub mod clean;
pub mod fix;
pub mod install;
pub mod list;
pub mod lock;
pub mod remove;
pub mod update;

use anyhow::{Context, Result};

use crate::toolchain::listing::load_catalog;
use crate::toolchain::{Catalog, HttpFetcher, Layout, Linker, Settings, select_linker};

/// Settings, layout and alias strategy shared by every command.
pub struct Session {
    pub settings: Settings,
    pub layout: Layout,
    pub linker: Box<dyn Linker>,
}

impl Session {
    /// Loads the configuration and probes the alias directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file is malformed or the alias
    /// directory cannot be created.
    pub fn open() -> Result<Self> {
        let settings = Settings::load().context("Failed to load configuration")?;
        let layout = settings.layout();
        let linker = select_linker(&layout.bin_dir)?;
        tracing::debug!(
            "sdk: {}, aliases: {}",
            layout.sdk_dir.display(),
            layout.bin_dir.display()
        );
        Ok(Self {
            settings,
            layout,
            linker,
        })
    }

    /// Refreshes the release listing if stale and builds the catalog.
    ///
    /// # Errors
    ///
    /// Returns an error if no listing is available at all.
    pub async fn catalog(&self) -> Result<Catalog> {
        load_catalog(&self.layout, &self.settings)
            .await
            .context("Failed to load the release catalog")
    }

    /// HTTP client configured with the proxy and TLS settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the client cannot be built.
    pub fn fetcher(&self) -> Result<HttpFetcher> {
        HttpFetcher::new(&self.settings)
    }
}
