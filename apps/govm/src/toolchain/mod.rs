//! Toolchain management for govm.
//!
//! ## Module Structure
//!
//! - [`version`] - Release identifier parsing and ordering
//! - [`catalog`] - Known releases grouped by minor line
//! - [`listing`] - Release listing refresh (git, bundled fallback)
//! - [`paths`] - Install root, alias and data directory layout
//! - [`config`] - User configuration
//! - [`platform`] - OS and architecture in upstream spelling
//! - [`link`] - Alias creation (symlink or copy)
//! - [`download`] - HTTP archive downloads
//! - [`archive`] - tar.gz and ZIP extraction
//! - [`attempt`] - Ordered fallback driver
//! - [`resolver`] - Bootstrap toolchain lookup and source builds
//! - [`install`] - Install orchestration
//! - [`lifecycle`] - Clean, lock, remove and update
//! - [`latest`] - `go.latest` and `go` maintenance

pub mod archive;
pub mod attempt;
pub mod catalog;
pub mod config;
pub mod download;
pub mod install;
pub mod latest;
pub mod lifecycle;
pub mod link;
pub mod listing;
pub mod paths;
pub mod platform;
pub mod resolver;
pub mod version;

#[cfg(test)]
pub(crate) mod testing;

pub use catalog::{Catalog, MinorVersion};
pub use config::Settings;
pub use download::HttpFetcher;
pub use install::Installer;
pub use lifecycle::{CleanOutcome, LockAction};
pub use link::{Linker, select_linker};
pub use paths::Layout;
pub use platform::Platform;
pub use version::Version;
