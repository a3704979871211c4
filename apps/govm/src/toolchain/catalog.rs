//! In-memory view of every known release, grouped by minor line.

use std::collections::HashMap;
use std::path::Path;

use tracing::debug;

use super::paths::Layout;
use super::version::{TIP, Version};
use crate::errors::{GovmError, GovmResult};

/// All releases of one minor line, newest first.
#[derive(Debug, Clone)]
pub struct MinorVersion {
    /// Line identifier, e.g. `go1.21`.
    pub normalized: String,
    /// Releases sorted descending by `num`. Never empty.
    pub patches: Vec<Version>,
}

impl MinorVersion {
    /// Newest release of the line.
    #[must_use]
    pub fn latest(&self) -> &Version {
        &self.patches[0]
    }

    /// Whether any release of the line is installed.
    #[must_use]
    pub fn installed(&self, layout: &Layout) -> bool {
        self.patches.iter().any(|p| layout.is_installed(p))
    }

    /// Newest installed release of the line.
    #[must_use]
    pub fn latest_installed(&self, layout: &Layout) -> Option<&Version> {
        self.patches.iter().find(|p| layout.is_installed(p))
    }

    /// Looks up a release by id, accepting an implicit trailing `.0`.
    #[must_use]
    pub fn find(&self, id: &str) -> Option<&Version> {
        self.patches.iter().find(|p| p.matches_id(id))
    }

    /// Whether this is the synthetic tip line.
    #[must_use]
    pub fn is_tip(&self) -> bool {
        self.normalized == TIP
    }
}

/// Known releases grouped into lines, newest line first.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    lines: Vec<MinorVersion>,
}

impl Catalog {
    /// Builds a catalog from release names.
    ///
    /// Names that do not parse are skipped. The `gotip` line is always
    /// present and always first.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut grouped: HashMap<String, Vec<Version>> = HashMap::new();

        for name in names {
            let name = name.as_ref().trim();
            if name.is_empty() || name == TIP {
                continue;
            }
            match Version::parse(name) {
                Ok(version) => grouped
                    .entry(version.normalized.clone())
                    .or_default()
                    .push(version),
                Err(e) => debug!("skipping listing entry: {e}"),
            }
        }

        let mut lines: Vec<MinorVersion> = grouped
            .into_iter()
            .map(|(normalized, mut patches)| {
                patches.sort_by(|a, b| b.cmp(a));
                patches.dedup_by(|a, b| a.num == b.num);
                MinorVersion {
                    normalized,
                    patches,
                }
            })
            .collect();
        lines.sort_by(|a, b| b.latest().cmp(a.latest()));

        lines.insert(
            0,
            MinorVersion {
                normalized: TIP.to_string(),
                patches: vec![Version::tip()],
            },
        );

        Self { lines }
    }

    /// Builds a catalog from the directory names of a release listing.
    ///
    /// # Errors
    ///
    /// Returns [`GovmError::Catalog`] if the listing cannot be read.
    pub fn scan(dir: &Path) -> GovmResult<Self> {
        let entries = std::fs::read_dir(dir).map_err(|e| {
            GovmError::catalog(format!("cannot read listing {}: {e}", dir.display()))
        })?;

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| GovmError::io_error("read listing entry", e))?;
            if !entry.path().is_dir() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str()
                && name.starts_with("go")
            {
                names.push(name.to_string());
            }
        }

        Ok(Self::from_names(names))
    }

    /// Exact match on a line identifier.
    #[must_use]
    pub fn get(&self, normalized: &str) -> Option<&MinorVersion> {
        self.lines.iter().find(|l| l.normalized == normalized)
    }

    /// Lines in catalog order.
    pub fn lines(&self) -> impl Iterator<Item = &MinorVersion> {
        self.lines.iter()
    }

    /// Every release of every line.
    pub fn versions(&self) -> impl Iterator<Item = &Version> {
        self.lines.iter().flat_map(|l| l.patches.iter())
    }
}
