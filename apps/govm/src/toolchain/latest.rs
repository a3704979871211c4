//! Maintenance of the cross-line `go.latest` and `go` aliases.

use tracing::{debug, info, warn};

use super::catalog::Catalog;
use super::link::{Linker, link_source};
use super::paths::{Layout, entry_exists, is_dangling};
use super::version::Version;
use crate::errors::GovmResult;

/// Picks the release `go.latest` should point at.
///
/// Prefers the newest installed official release. Without one, falls back to
/// the most recently touched install of any channel. `gotip` never
/// qualifies.
#[must_use]
pub fn pick<'c>(layout: &Layout, catalog: &'c Catalog) -> Option<&'c Version> {
    let installed: Vec<&Version> = catalog
        .versions()
        .filter(|v| !v.is_tip() && layout.is_installed(v))
        .collect();

    installed
        .iter()
        .copied()
        .filter(|v| v.is_official())
        .max()
        .or_else(|| {
            installed
                .iter()
                .copied()
                .max_by_key(|v| layout.touched_at(v))
        })
}

/// Repoints `go.latest`, and creates `go` if the user has none.
///
/// Returns the release `go.latest` now points at, or `None` if nothing is
/// installed, in which case a dangling `go.latest` is removed.
///
/// # Errors
///
/// Returns an error if an alias cannot be written.
pub fn refresh(layout: &Layout, linker: &dyn Linker, catalog: &Catalog) -> GovmResult<Option<Version>> {
    let Some(chosen) = pick(layout, catalog) else {
        debug!("no installed release for go.latest");
        clear_dangling(layout, linker)?;
        return Ok(None);
    };

    let exact = layout.exact_alias(chosen);
    if !exact.exists() {
        linker.link(&layout.toolchain_binary(chosen), &exact)?;
    }

    let latest = layout.latest_alias();
    linker.link(&exact, &latest)?;
    debug!("go.latest -> {chosen}");

    let default = layout.default_alias();
    if !entry_exists(&default) {
        linker.link(&latest, &default)?;
        info!("created {}", default.display());
    }

    Ok(Some(chosen.clone()))
}

/// Removes a dangling `go.latest`, and `go` when it is our link to it.
fn clear_dangling(layout: &Layout, linker: &dyn Linker) -> GovmResult<()> {
    let latest = layout.latest_alias();
    if !is_dangling(&latest) {
        return Ok(());
    }
    linker.unlink(&latest)?;
    info!("removed {}, nothing is installed", latest.display());

    let default = layout.default_alias();
    let points_at_latest = std::fs::read_link(&default)
        .is_ok_and(|target| target == link_source(&latest, &default));
    if points_at_latest {
        linker.unlink(&default)?;
    }
    Ok(())
}

/// [`refresh`], logging instead of returning failures.
pub fn refresh_quietly(layout: &Layout, linker: &dyn Linker, catalog: &Catalog) {
    if let Err(e) = refresh(layout, linker, catalog) {
        warn!("could not update go.latest: {e}");
    }
}
