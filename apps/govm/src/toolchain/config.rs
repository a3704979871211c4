//! User configuration (`~/.config/govm/config.toml`).
//!
//! The file is optional: every field has a default and a commented template
//! is written on first run. `GOVM_CONFIG` points at an alternate file.
//!
//! ```toml
//! proxy = "http://127.0.0.1:3128"
//! archive_url_prefixes = ["https://dl.google.com/go/"]
//! insecure_skip_verify = false
//! sdk_dir = "~/sdk"
//! bin_dir = "~/go/bin"
//! build_from_source = true
//! catalog_repo = "https://github.com/golang/dl.git"
//! ```

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::paths::Layout;
use crate::errors::{GovmError, GovmResult};

/// Environment variable that overrides the config file location.
pub const CONFIG_ENV: &str = "GOVM_CONFIG";

/// Archive mirrors tried in order when none are configured.
pub const DEFAULT_ARCHIVE_PREFIXES: [&str; 2] =
    ["https://dl-ssl.google.com/go/", "https://dl.google.com/go/"];

/// Repository holding one directory per published release.
pub const DEFAULT_CATALOG_REPO: &str = "https://github.com/golang/dl.git";

const TEMPLATE: &str = r#"# govm configuration. Every setting is optional.

# HTTP(S) proxy used for archive downloads.
# proxy = "http://127.0.0.1:3128"

# Archive mirrors, tried in order.
# archive_url_prefixes = ["https://dl-ssl.google.com/go/", "https://dl.google.com/go/"]

# Skip TLS certificate verification for archive downloads.
# insecure_skip_verify = false

# Where toolchains are installed.
# sdk_dir = "~/sdk"

# Where version aliases are created. Defaults to the first $GOBIN entry, then ~/go/bin.
# bin_dir = "~/go/bin"

# Try `go build` against the release listing before downloading an archive.
# build_from_source = true

# Git repository with the release listing.
# catalog_repo = "https://github.com/golang/dl.git"
"#;

/// On-disk configuration as written by the user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    /// Proxy URL for archive downloads
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy: Option<String>,

    /// Archive mirror prefixes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub archive_url_prefixes: Option<Vec<String>>,

    /// Disable TLS verification
    #[serde(skip_serializing_if = "Option::is_none")]
    pub insecure_skip_verify: Option<bool>,

    /// Install root
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sdk_dir: Option<String>,

    /// Alias directory
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bin_dir: Option<String>,

    /// Enable the build-from-source strategy
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build_from_source: Option<bool>,

    /// Release listing repository
    #[serde(skip_serializing_if = "Option::is_none")]
    pub catalog_repo: Option<String>,
}

impl ConfigFile {
    /// Parses configuration text.
    ///
    /// # Errors
    ///
    /// Returns [`GovmError::Config`] on invalid TOML or unknown keys.
    pub fn parse(content: &str, origin: &Path) -> GovmResult<Self> {
        toml::from_str(content)
            .map_err(|e| GovmError::config(format!("{}: {e}", origin.display())))
    }
}

/// Resolved process-wide settings. Built once at startup.
#[derive(Debug, Clone)]
pub struct Settings {
    pub proxy: Option<String>,
    pub archive_url_prefixes: Vec<String>,
    pub insecure_skip_verify: bool,
    pub sdk_dir: PathBuf,
    pub bin_dir: PathBuf,
    pub build_from_source: bool,
    pub catalog_repo: String,
}

impl Settings {
    /// Loads settings from `$GOVM_CONFIG` or the default config file.
    ///
    /// Writes a commented template when the file does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns [`GovmError::Config`] if the home directory cannot be
    /// determined or the file is malformed.
    pub fn load() -> GovmResult<Self> {
        let home = dirs::home_dir()
            .ok_or_else(|| GovmError::config("cannot determine home directory"))?;
        let path = match std::env::var_os(CONFIG_ENV) {
            Some(p) if !p.is_empty() => PathBuf::from(p),
            _ => default_config_path(&home),
        };

        let file = read_or_init(&path)?;
        Self::resolve(file, &home, std::env::var_os("GOBIN"))
    }

    /// Applies defaults to a parsed config file.
    ///
    /// # Errors
    ///
    /// Returns [`GovmError::Config`] for an empty mirror list.
    pub fn resolve(file: ConfigFile, home: &Path, gobin: Option<OsString>) -> GovmResult<Self> {
        let archive_url_prefixes = match file.archive_url_prefixes {
            Some(prefixes) if prefixes.iter().all(|p| p.trim().is_empty()) => {
                return Err(GovmError::config(
                    "archive_url_prefixes must name at least one mirror",
                ));
            }
            Some(prefixes) => prefixes
                .into_iter()
                .filter(|p| !p.trim().is_empty())
                .collect(),
            None => DEFAULT_ARCHIVE_PREFIXES
                .iter()
                .map(ToString::to_string)
                .collect(),
        };

        let sdk_dir = file
            .sdk_dir
            .map_or_else(|| home.join("sdk"), |p| expand_home(&p, home));

        let bin_dir = match file.bin_dir {
            Some(p) => expand_home(&p, home),
            None => gobin
                .as_deref()
                .and_then(|v| std::env::split_paths(v).find(|p| !p.as_os_str().is_empty()))
                .unwrap_or_else(|| home.join("go").join("bin")),
        };

        Ok(Self {
            proxy: file.proxy.filter(|p| !p.trim().is_empty()),
            archive_url_prefixes,
            insecure_skip_verify: file.insecure_skip_verify.unwrap_or(false),
            sdk_dir,
            bin_dir,
            build_from_source: file.build_from_source.unwrap_or(true),
            catalog_repo: file
                .catalog_repo
                .unwrap_or_else(|| DEFAULT_CATALOG_REPO.to_string()),
        })
    }

    /// Filesystem layout derived from these settings.
    #[must_use]
    pub fn layout(&self) -> Layout {
        Layout::new(self.sdk_dir.clone(), self.bin_dir.clone())
    }

    /// Full download URLs for an archive, one per mirror, in order.
    #[must_use]
    pub fn archive_urls(&self, archive_name: &str) -> Vec<String> {
        self.archive_url_prefixes
            .iter()
            .map(|prefix| {
                if prefix.ends_with('/') {
                    format!("{prefix}{archive_name}")
                } else {
                    format!("{prefix}/{archive_name}")
                }
            })
            .collect()
    }
}

/// `~/.config/govm/config.toml`
#[must_use]
pub fn default_config_path(home: &Path) -> PathBuf {
    home.join(".config").join("govm").join("config.toml")
}

fn read_or_init(path: &Path) -> GovmResult<ConfigFile> {
    match std::fs::read_to_string(path) {
        Ok(content) => {
            debug!("loaded config from {}", path.display());
            ConfigFile::parse(&content, path)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    GovmError::io_error(format!("create {}", parent.display()), e)
                })?;
            }
            std::fs::write(path, TEMPLATE)
                .map_err(|e| GovmError::io_error(format!("write {}", path.display()), e))?;
            info!("wrote default config to {}", path.display());
            Ok(ConfigFile::default())
        }
        Err(e) => Err(GovmError::config(format!("{}: {e}", path.display()))),
    }
}

fn expand_home(value: &str, home: &Path) -> PathBuf {
    if value == "~" {
        home.to_path_buf()
    } else if let Some(rest) = value.strip_prefix("~/") {
        home.join(rest)
    } else {
        PathBuf::from(value)
    }
}
