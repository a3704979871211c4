//! Shared fixtures for toolchain unit tests.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use futures_util::future::BoxFuture;
use tempfile::TempDir;

use super::catalog::Catalog;
use super::config::{ConfigFile, Settings};
use super::download::Fetch;
use super::paths::Layout;
use super::version::Version;

/// Scratch install root, alias directory and catalog.
pub struct Sandbox {
    pub temp: TempDir,
    pub settings: Settings,
    pub layout: Layout,
    pub catalog: Catalog,
}

impl Sandbox {
    pub fn new(releases: &[&str]) -> Self {
        Self::with_config(releases, ConfigFile::default())
    }

    pub fn with_config(releases: &[&str], file: ConfigFile) -> Self {
        let temp = tempfile::tempdir().unwrap();
        let file = ConfigFile {
            sdk_dir: Some(path_str(&temp.path().join("sdk"))),
            bin_dir: Some(path_str(&temp.path().join("bin"))),
            ..file
        };
        let settings = Settings::resolve(file, temp.path(), None).unwrap();
        let layout = settings.layout();
        Self {
            temp,
            settings,
            layout,
            catalog: Catalog::from_names(releases),
        }
    }
}

fn path_str(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Writes an executable `bin/go` that prints a version banner.
#[cfg(unix)]
pub fn install_fake(layout: &Layout, raw: &str) -> Version {
    use std::os::unix::fs::PermissionsExt;

    let version = Version::parse(raw).unwrap();
    let binary = layout.toolchain_binary(&version);
    std::fs::create_dir_all(binary.parent().unwrap()).unwrap();
    std::fs::write(
        &binary,
        format!("#!/bin/sh\necho 'go version {raw} linux/amd64'\n"),
    )
    .unwrap();
    std::fs::set_permissions(&binary, std::fs::Permissions::from_mode(0o755)).unwrap();
    version
}

/// [`Fetch`] that serves fixed files per URL and records every request.
#[derive(Default)]
pub struct FakeFetcher {
    responses: Vec<(String, Option<PathBuf>)>,
    pub requests: Mutex<Vec<String>>,
}

impl FakeFetcher {
    /// Serves a copy of `archive` for `url`.
    pub fn serve(mut self, url: impl Into<String>, archive: &Path) -> Self {
        self.responses.push((url.into(), Some(archive.to_path_buf())));
        self
    }

    /// Fails every request for `url`.
    pub fn fail(mut self, url: impl Into<String>) -> Self {
        self.responses.push((url.into(), None));
        self
    }

    pub fn requested(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

impl Fetch for FakeFetcher {
    fn fetch<'a>(&'a self, url: &'a str, dest: &'a Path) -> BoxFuture<'a, anyhow::Result<()>> {
        Box::pin(async move {
            self.requests.lock().unwrap().push(url.to_string());
            let source = self
                .responses
                .iter()
                .find(|(u, _)| u == url)
                .and_then(|(_, source)| source.clone());
            match source {
                Some(source) => {
                    std::fs::create_dir_all(dest.parent().unwrap())?;
                    std::fs::copy(source, dest)?;
                    Ok(())
                }
                None => anyhow::bail!("HTTP error 404: {url}"),
            }
        })
    }
}
