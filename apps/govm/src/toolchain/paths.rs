//! Path management for govm.
//!
//! Every location the manager reads or writes is derived here from the
//! resolved [`Settings`](super::Settings), so the rest of the code never
//! joins path segments by hand.
//!
//! ## Directory Structure
//!
//! ```text
//! ~/sdk/                      # Install root (sdk_dir)
//!   go1.21.3/                 # One directory per exact patch
//!     bin/go                  # Toolchain binary, decides "installed"
//!     .unpacked-success       # Written after an archive install
//!     govm.locked             # Protects the version from `clean`
//!   go1.21.0/                 # First release of go1.21
//!   govm/                     # Data directory
//!     golang_dl/              # Release listing (one directory per release)
//!     download.status         # Last catalog refresh
//!     downloads/              # Archive cache
//!
//! $GOBIN/                     # Alias directory (bin_dir)
//!   go1.21.3 -> ~/sdk/go1.21.3/bin/go
//!   go1.21   -> go1.21.3
//!   go.latest -> go1.21.3
//!   go       -> go.latest
//! ```

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use super::version::Version;

/// Written into an install directory once an archive has been unpacked.
pub const UNPACKED_SENTINEL: &str = ".unpacked-success";

/// Marker that excludes a version from `clean`.
pub const LOCK_FILE: &str = "govm.locked";

/// Alias that always points at the newest official release.
pub const LATEST_ALIAS: &str = "go.latest";

/// Bare alias created once if the user has no `go` of their own.
pub const DEFAULT_ALIAS: &str = "go";

/// Suffix of the per-line install directory link.
pub const LINE_SDK_SUFFIX: &str = ".latest";

const DATA_DIR: &str = "govm";
const CATALOG_DIR: &str = "golang_dl";
const REFRESH_STAMP: &str = "download.status";
const DOWNLOADS_DIR: &str = "downloads";

/// Manages paths for toolchain installations and aliases.
#[derive(Debug, Clone)]
pub struct Layout {
    /// Install root containing one directory per release.
    pub sdk_dir: PathBuf,
    /// Alias directory.
    pub bin_dir: PathBuf,
    /// Manager state: listing, refresh stamp, downloads.
    pub data_dir: PathBuf,
}

impl Layout {
    /// Creates a layout from an install root and an alias directory.
    #[must_use = "returns new layout without side effects"]
    pub fn new(sdk_dir: PathBuf, bin_dir: PathBuf) -> Self {
        Self {
            data_dir: sdk_dir.join(DATA_DIR),
            sdk_dir,
            bin_dir,
        }
    }

    /// Directory holding the release listing.
    #[must_use]
    pub fn catalog_dir(&self) -> PathBuf {
        self.data_dir.join(CATALOG_DIR)
    }

    /// Source tree of one release inside the listing.
    #[must_use]
    pub fn source_dir(&self, version: &Version) -> PathBuf {
        self.catalog_dir().join(&version.raw)
    }

    /// Timestamp file used to throttle catalog refreshes.
    #[must_use]
    pub fn refresh_stamp(&self) -> PathBuf {
        self.data_dir.join(REFRESH_STAMP)
    }

    /// Path for a downloaded archive file.
    #[must_use]
    pub fn download_path(&self, filename: &str) -> PathBuf {
        self.data_dir.join(DOWNLOADS_DIR).join(filename)
    }

    /// Install directory of a release.
    #[must_use]
    pub fn install_dir(&self, version: &Version) -> PathBuf {
        self.sdk_dir.join(version.raw_formatted())
    }

    /// Toolchain binary inside an install directory.
    #[must_use]
    pub fn toolchain_binary(&self, version: &Version) -> PathBuf {
        self.install_dir(version)
            .join("bin")
            .join(executable_name("go"))
    }

    /// Archive sentinel inside an install directory.
    #[must_use]
    pub fn unpacked_sentinel(&self, version: &Version) -> PathBuf {
        self.install_dir(version).join(UNPACKED_SENTINEL)
    }

    /// Lock marker inside an install directory.
    #[must_use]
    pub fn lock_marker(&self, version: &Version) -> PathBuf {
        self.install_dir(version).join(LOCK_FILE)
    }

    /// Whether the release is protected from `clean`.
    #[must_use]
    pub fn is_locked(&self, version: &Version) -> bool {
        self.lock_marker(version).is_file()
    }

    /// Alias named after the exact patch, e.g. `$GOBIN/go1.21.3`.
    #[must_use]
    pub fn exact_alias(&self, version: &Version) -> PathBuf {
        self.bin_dir
            .join(executable_name(&version.raw_formatted()))
    }

    /// Alias named after the minor line, e.g. `$GOBIN/go1.21`.
    #[must_use]
    pub fn line_alias(&self, version: &Version) -> PathBuf {
        self.bin_dir.join(executable_name(&version.normalized))
    }

    /// Directory link named after the minor line, e.g. `<sdk>/go1.21.latest`.
    #[must_use]
    pub fn line_sdk_link(&self, version: &Version) -> PathBuf {
        self.sdk_dir
            .join(format!("{}{LINE_SDK_SUFFIX}", version.normalized))
    }

    /// The `go.latest` alias.
    #[must_use]
    pub fn latest_alias(&self) -> PathBuf {
        self.bin_dir.join(executable_name(LATEST_ALIAS))
    }

    /// The bare `go` alias.
    #[must_use]
    pub fn default_alias(&self) -> PathBuf {
        self.bin_dir.join(executable_name(DEFAULT_ALIAS))
    }

    /// Checks whether a release is installed.
    ///
    /// Always asks the filesystem: the install directory must exist and hold
    /// an executable toolchain binary.
    #[must_use]
    pub fn is_installed(&self, version: &Version) -> bool {
        self.install_dir(version).is_dir() && is_executable(&self.toolchain_binary(version))
    }

    /// Last modification time of a release's install directory.
    #[must_use]
    pub fn touched_at(&self, version: &Version) -> Option<SystemTime> {
        std::fs::metadata(self.install_dir(version))
            .and_then(|m| m.modified())
            .ok()
    }
}

/// Appends the platform executable suffix to a binary or alias name.
#[must_use]
pub fn executable_name(name: &str) -> String {
    format!("{name}{}", std::env::consts::EXE_SUFFIX)
}

/// Whether `path` is a file the current user could execute.
#[must_use]
pub fn is_executable(path: &Path) -> bool {
    let Ok(meta) = std::fs::metadata(path) else {
        return false;
    };
    if !meta.is_file() {
        return false;
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        meta.permissions().mode() & 0o111 != 0
    }

    #[cfg(not(unix))]
    {
        true
    }
}

/// Whether something exists at `path`, including a broken symlink.
#[must_use]
pub fn entry_exists(path: &Path) -> bool {
    path.symlink_metadata().is_ok()
}

/// Whether `path` is a link whose target is gone.
#[must_use]
pub fn is_dangling(path: &Path) -> bool {
    entry_exists(path) && !path.exists()
}
