//! Platform detection for Go release archives.
//!
//! Upstream archives are named `<release>.<os>-<arch><ext>` using Go's own
//! spelling of operating systems and architectures, which differs from
//! Rust's `std::env::consts` values.

use std::fmt;

use crate::errors::{GovmError, GovmResult};

use super::version::Version;

/// An OS and architecture pair in Go's spelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Platform {
    os: &'static str,
    arch: &'static str,
}

impl Platform {
    /// Detects the platform the binary was compiled for.
    ///
    /// # Errors
    ///
    /// Returns an error if the OS or architecture has no upstream archive.
    pub fn detect() -> GovmResult<Self> {
        Self::from_rust(std::env::consts::OS, std::env::consts::ARCH)
    }

    /// Maps Rust target names onto Go's archive spelling.
    ///
    /// # Errors
    ///
    /// Returns [`GovmError::Config`] for combinations upstream does not ship.
    pub fn from_rust(os: &str, arch: &str) -> GovmResult<Self> {
        let go_os = match os {
            "linux" => "linux",
            "macos" => "darwin",
            "windows" => "windows",
            "freebsd" => "freebsd",
            other => {
                return Err(GovmError::config(format!(
                    "unsupported operating system: {other}"
                )));
            }
        };

        let go_arch = match (go_os, arch) {
            (_, "x86_64") => "amd64",
            (_, "aarch64") => "arm64",
            (_, "x86") => "386",
            ("linux", "arm") => "armv6l",
            ("linux", "powerpc64") => "ppc64le",
            ("linux", "s390x") => "s390x",
            (_, other) => {
                return Err(GovmError::config(format!(
                    "unsupported architecture {other} on {go_os}"
                )));
            }
        };

        Ok(Self {
            os: go_os,
            arch: go_arch,
        })
    }

    /// Go's name for the operating system, e.g. `darwin`.
    #[must_use = "returns the OS string without side effects"]
    pub fn os(self) -> &'static str {
        self.os
    }

    /// Go's name for the architecture, e.g. `amd64`.
    #[must_use = "returns the architecture string without side effects"]
    pub fn arch(self) -> &'static str {
        self.arch
    }

    /// Returns whether this platform is Windows.
    #[must_use = "returns platform check result without side effects"]
    pub fn is_windows(self) -> bool {
        self.os == "windows"
    }

    /// Archive extension used upstream for this platform.
    #[must_use]
    pub fn archive_extension(self) -> &'static str {
        if self.is_windows() { ".zip" } else { ".tar.gz" }
    }

    /// File name of the upstream archive for `version`.
    #[must_use]
    pub fn archive_name(self, version: &Version) -> String {
        format!(
            "{}.{}-{}{}",
            version.archive_stem(),
            self.os,
            self.arch,
            self.archive_extension()
        )
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.os, self.arch)
    }
}
