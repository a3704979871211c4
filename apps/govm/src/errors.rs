//! Error types for govm.
//!
//! `GovmError` is the typed result contract of the toolchain core. Every
//! operation in [`crate::toolchain`] returns one of these variants so the
//! command layer can tell a malformed identifier from a missing install or an
//! exhausted download. Commands wrap them in `anyhow::Result` and `main` maps
//! any failure to a nonzero exit code.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Consolidated error type for toolchain operations.
#[derive(Debug, Error)]
pub enum GovmError {
    /// Identifier does not match the release grammar.
    #[error("invalid version {input:?}: {reason}")]
    Parse {
        /// The rejected identifier.
        input: String,
        /// What was wrong with it.
        reason: String,
    },

    /// No known line or patch matches the request.
    #[error("version not found: {version}")]
    VersionNotFound {
        /// The requested identifier.
        version: String,
    },

    /// Operation requires the version to be installed first.
    #[error("version {version} is not installed")]
    NotInstalled {
        /// The requested identifier.
        version: String,
    },

    /// Every acquisition strategy failed.
    #[error("failed to acquire {version}: {}", join_reasons(.reasons))]
    AcquisitionFailed {
        /// The version being installed.
        version: String,
        /// One entry per failed attempt, in attempt order.
        reasons: Vec<String>,
    },

    /// Alias creation or removal did not complete.
    #[error("failed to update alias {}: {source}", .alias.display())]
    LinkFailed {
        /// The alias path.
        alias: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Any other filesystem failure.
    #[error("I/O error: {message}")]
    Io {
        /// Description of the operation that failed.
        message: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The release listing could not be refreshed or read.
    #[error("catalog error: {message}")]
    Catalog {
        /// Description of the catalog failure.
        message: String,
    },

    /// Configuration file is unreadable or invalid.
    #[error("config error: {message}")]
    Config {
        /// Description of the configuration problem.
        message: String,
    },

    /// Invalid command arguments.
    #[error("invalid arguments: {message}")]
    InvalidArguments {
        /// Description of what was invalid.
        message: String,
    },

    /// One or more items of a batch operation failed.
    #[error("{operation} failed for {}", BatchList(.failures))]
    Batch {
        /// Name of the batch operation (`clean`, `update`).
        operation: String,
        /// Failed item and its error message.
        failures: Vec<(String, String)>,
    },
}

impl GovmError {
    /// Creates a new `Parse` error.
    #[must_use]
    pub fn parse(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Parse {
            input: input.into(),
            reason: reason.into(),
        }
    }

    /// Creates a new `VersionNotFound` error.
    #[must_use]
    pub fn version_not_found(version: impl Into<String>) -> Self {
        Self::VersionNotFound {
            version: version.into(),
        }
    }

    /// Creates a new `NotInstalled` error.
    #[must_use]
    pub fn not_installed(version: impl Into<String>) -> Self {
        Self::NotInstalled {
            version: version.into(),
        }
    }

    /// Creates a new `AcquisitionFailed` error.
    #[must_use]
    pub fn acquisition_failed(version: impl Into<String>, reasons: Vec<String>) -> Self {
        Self::AcquisitionFailed {
            version: version.into(),
            reasons,
        }
    }

    /// Creates a new `LinkFailed` error.
    #[must_use]
    pub fn link_failed(alias: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::LinkFailed {
            alias: alias.into(),
            source,
        }
    }

    /// Creates a new `Io` error from an I/O error with context.
    #[must_use]
    pub fn io_error(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source,
        }
    }

    /// Creates a new `Catalog` error.
    #[must_use]
    pub fn catalog(message: impl Into<String>) -> Self {
        Self::Catalog {
            message: message.into(),
        }
    }

    /// Creates a new `Config` error.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidArguments` error.
    #[must_use]
    pub fn invalid_arguments(message: impl Into<String>) -> Self {
        Self::InvalidArguments {
            message: message.into(),
        }
    }

    /// Creates a new `Batch` error.
    #[must_use]
    pub fn batch(operation: impl Into<String>, failures: Vec<(String, String)>) -> Self {
        Self::Batch {
            operation: operation.into(),
            failures,
        }
    }
}

fn join_reasons(reasons: &[String]) -> String {
    if reasons.is_empty() {
        "no acquisition strategy available".to_string()
    } else {
        reasons.join("; ")
    }
}

struct BatchList<'a>(&'a [(String, String)]);

impl fmt::Display for BatchList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (item, message)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{item} ({message})")?;
        }
        Ok(())
    }
}

/// Result alias for toolchain operations.
pub type GovmResult<T> = Result<T, GovmError>;
