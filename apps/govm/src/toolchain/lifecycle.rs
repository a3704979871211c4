//! Retiring, protecting, removing and updating installed releases.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use tracing::{debug, info, warn};

use super::catalog::{Catalog, MinorVersion};
use super::install::Installer;
use super::latest;
use super::link::Linker;
use super::paths::{Layout, is_dangling};
use super::version::{TIP, Version};
use crate::errors::{GovmError, GovmResult};

/// What `clean` did with one release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CleanOutcome {
    /// Install directory and exact alias deleted.
    Removed,
    /// Nothing on disk.
    Missing,
    /// Protected by a lock marker.
    Locked,
}

/// Per-release outcomes of one `clean`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CleanReport {
    pub entries: Vec<(String, CleanOutcome)>,
}

impl CleanReport {
    /// Releases with the given outcome.
    pub fn with(&self, outcome: CleanOutcome) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .filter(move |(_, o)| *o == outcome)
            .map(|(raw, _)| raw.as_str())
    }
}

/// Deletes every release of `line_id` except its newest, skipping locked
/// ones.
///
/// # Errors
///
/// [`GovmError::VersionNotFound`] for an unknown line. [`GovmError::Batch`]
/// naming every release that could not be deleted; the others are still
/// processed.
pub fn clean(
    layout: &Layout,
    linker: &dyn Linker,
    catalog: &Catalog,
    line_id: &str,
) -> GovmResult<CleanReport> {
    let line = catalog
        .get(line_id)
        .ok_or_else(|| GovmError::version_not_found(line_id))?;

    let mut report = CleanReport::default();
    let mut failures = Vec::new();

    for patch in line.patches.iter().skip(1) {
        match clean_one(layout, linker, patch) {
            Ok(outcome) => report.entries.push((patch.raw.clone(), outcome)),
            Err(e) => {
                warn!("could not remove {patch}: {e}");
                failures.push((patch.raw.clone(), e.to_string()));
            }
        }
    }

    if line.patches.len() > 1 {
        if let Err(e) = repair_line_alias(layout, linker, line) {
            warn!("could not repair aliases of {}: {e}", line.normalized);
            failures.push((line.normalized.clone(), e.to_string()));
        }
        latest::refresh_quietly(layout, linker, catalog);
    }

    if failures.is_empty() {
        Ok(report)
    } else {
        Err(GovmError::batch("clean", failures))
    }
}

fn clean_one(layout: &Layout, linker: &dyn Linker, patch: &Version) -> GovmResult<CleanOutcome> {
    let dir = layout.install_dir(patch);
    if !dir.is_dir() {
        return Ok(CleanOutcome::Missing);
    }
    if layout.is_locked(patch) {
        info!("{patch} is locked, keeping it");
        return Ok(CleanOutcome::Locked);
    }

    linker.unlink(&layout.exact_alias(patch))?;
    std::fs::remove_dir_all(&dir)
        .map_err(|e| GovmError::io_error(format!("remove {}", dir.display()), e))?;
    info!("removed {patch}");
    Ok(CleanOutcome::Removed)
}

/// Repoints a dangling line alias and `<line>.latest` directory link at the
/// newest installed release of the line, or deletes them when none is left.
///
/// # Errors
///
/// Returns [`GovmError::LinkFailed`] if a link cannot be rewritten.
pub fn repair_line_alias(layout: &Layout, linker: &dyn Linker, line: &MinorVersion) -> GovmResult<()> {
    if line.is_tip() {
        return Ok(());
    }
    let alias = layout.line_alias(line.latest());
    let sdk_link = layout.line_sdk_link(line.latest());
    let alias_dangles = is_dangling(&alias);
    let sdk_link_dangles = is_dangling(&sdk_link);
    if !alias_dangles && !sdk_link_dangles {
        return Ok(());
    }

    match line.latest_installed(layout) {
        Some(newest) => {
            if alias_dangles {
                let exact = layout.exact_alias(newest);
                if !exact.exists() {
                    linker.link(&layout.toolchain_binary(newest), &exact)?;
                }
                linker.link(&exact, &alias)?;
                debug!("repointed {} to {newest}", alias.display());
            }
            if sdk_link_dangles {
                linker.link_dir(&layout.install_dir(newest), &sdk_link)?;
                debug!("repointed {} to {newest}", sdk_link.display());
            }
        }
        None => {
            for link in [&alias, &sdk_link] {
                if is_dangling(link) {
                    linker.unlink(link)?;
                    debug!("removed dangling {}", link.display());
                }
            }
        }
    }
    Ok(())
}

/// Lock marker operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockAction {
    Add,
    Remove,
}

impl FromStr for LockAction {
    type Err = GovmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "add" | "lock" => Ok(Self::Add),
            "remove" | "unlock" => Ok(Self::Remove),
            other => Err(GovmError::invalid_arguments(format!(
                "unknown lock action {other:?}, expected add or remove"
            ))),
        }
    }
}

impl fmt::Display for LockAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Add => "locked",
            Self::Remove => "unlocked",
        })
    }
}

/// Adds or removes the lock marker of one installed release. Idempotent.
///
/// # Errors
///
/// [`GovmError::Parse`] for a malformed id, [`GovmError::NotInstalled`] when
/// the install directory does not exist.
pub fn lock(layout: &Layout, raw_id: &str, action: LockAction) -> GovmResult<Version> {
    let version = Version::parse(raw_id)?.canonical();
    if !layout.install_dir(&version).is_dir() {
        return Err(GovmError::not_installed(raw_id));
    }

    let marker = layout.lock_marker(&version);
    match action {
        LockAction::Add => {
            if !marker.exists() {
                std::fs::write(&marker, b"")
                    .map_err(|e| GovmError::io_error(format!("write {}", marker.display()), e))?;
            }
        }
        LockAction::Remove => {
            if marker.exists() {
                std::fs::remove_file(&marker).map_err(|e| {
                    GovmError::io_error(format!("remove {}", marker.display()), e)
                })?;
            }
        }
    }
    info!("{version} {action}");
    Ok(version)
}

/// Uninstalls one release and fixes the aliases that pointed at it.
///
/// # Errors
///
/// [`GovmError::Parse`] for a malformed id, [`GovmError::NotInstalled`] when
/// the install directory does not exist, or the I/O error that stopped the
/// removal.
pub fn remove(
    layout: &Layout,
    linker: &dyn Linker,
    catalog: &Catalog,
    raw_id: &str,
) -> GovmResult<Version> {
    let version = Version::parse(raw_id)?.canonical();
    let dir = layout.install_dir(&version);
    if !dir.is_dir() {
        return Err(GovmError::not_installed(raw_id));
    }

    linker.unlink(&layout.exact_alias(&version))?;
    std::fs::remove_dir_all(&dir)
        .map_err(|e| GovmError::io_error(format!("remove {}", dir.display()), e))?;
    info!("removed {version}");

    let line_alias = layout.line_alias(&version);
    if line_alias != layout.exact_alias(&version) {
        let sdk_link = layout.line_sdk_link(&version);
        match catalog.get(&version.normalized) {
            Some(line) if line.latest().num == version.num => {
                linker.unlink(&line_alias)?;
                if sdk_link.is_symlink() {
                    linker.unlink(&sdk_link)?;
                }
            }
            Some(line) => repair_line_alias(layout, linker, line)?,
            None => {
                for link in [&line_alias, &sdk_link] {
                    if is_dangling(link) {
                        linker.unlink(link)?;
                    }
                }
            }
        }
    }

    latest::refresh_quietly(layout, linker, catalog);
    Ok(version)
}

/// Installs the newest release of one line, or of every installed line, and
/// retires what it supersedes.
///
/// `""` and `"all"` update every installed line except `gotip`, collecting
/// failures. Otherwise `target` must name a minor line, which is cleaned only
/// after its install succeeded.
///
/// # Errors
///
/// [`GovmError::InvalidArguments`] when `target` names a release instead of
/// a line, [`GovmError::VersionNotFound`] for an unknown line, the install or
/// clean error for a single line, or [`GovmError::Batch`] naming every failed
/// line.
pub async fn update(installer: &Installer<'_>, catalog: &Catalog, target: &str) -> GovmResult<()> {
    if !target.is_empty() && target != "all" {
        let Some(line) = catalog.get(target) else {
            return Err(match Version::parse(target) {
                Ok(version) if version.normalized != target => {
                    GovmError::invalid_arguments(format!(
                        "update takes a minor line such as {}, not the release {target}",
                        version.normalized
                    ))
                }
                _ => GovmError::version_not_found(target),
            });
        };
        installer.install(catalog, &line.normalized).await?;
        clean(installer.layout(), installer.linker(), catalog, &line.normalized)?;
        return Ok(());
    }

    let mut failures = Vec::new();
    for line in catalog.lines() {
        if line.normalized == TIP || !line.installed(installer.layout()) {
            continue;
        }
        info!("updating {}", line.normalized);
        let result = match installer.install(catalog, &line.normalized).await {
            Ok(_) => clean(installer.layout(), installer.linker(), catalog, &line.normalized)
                .map(|_| ()),
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            warn!("update of {} failed: {e}", line.normalized);
            failures.push((line.normalized.clone(), e.to_string()));
        }
    }

    if failures.is_empty() {
        Ok(())
    } else {
        Err(GovmError::batch("update", failures))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::toolchain::config::ConfigFile;
    use std::path::{Path, PathBuf};

    use crate::toolchain::archive::tests::write_go_tar_gz;
    use crate::toolchain::link::SymlinkLinker;
    use crate::toolchain::paths::entry_exists;
    use crate::toolchain::platform::Platform;
    use crate::toolchain::testing::{FakeFetcher, Sandbox, install_fake};

    fn v(raw: &str) -> Version {
        Version::parse(raw).unwrap()
    }

    fn link_all(sandbox: &Sandbox, raw: &str) {
        let version = v(raw);
        let layout = &sandbox.layout;
        SymlinkLinker
            .link(&layout.toolchain_binary(&version), &layout.exact_alias(&version))
            .unwrap();
    }

    #[test]
    fn clean_single_patch_line_is_noop() {
        let sandbox = Sandbox::new(&["go1.21.3"]);
        install_fake(&sandbox.layout, "go1.21.3");

        let report = clean(&sandbox.layout, &SymlinkLinker, &sandbox.catalog, "go1.21").unwrap();
        assert!(report.entries.is_empty());
        assert!(sandbox.layout.is_installed(&v("go1.21.3")));
    }

    #[test]
    fn clean_removes_old_patches_and_keeps_locked() {
        let sandbox = Sandbox::new(&["go1.21.1", "go1.21.2", "go1.21.3", "go1.21.4"]);
        for raw in ["go1.21.1", "go1.21.2", "go1.21.4"] {
            install_fake(&sandbox.layout, raw);
            link_all(&sandbox, raw);
        }
        lock(&sandbox.layout, "go1.21.1", LockAction::Add).unwrap();

        let report = clean(&sandbox.layout, &SymlinkLinker, &sandbox.catalog, "go1.21").unwrap();

        assert_eq!(report.with(CleanOutcome::Removed).collect::<Vec<_>>(), ["go1.21.2"]);
        assert_eq!(report.with(CleanOutcome::Missing).collect::<Vec<_>>(), ["go1.21.3"]);
        assert_eq!(report.with(CleanOutcome::Locked).collect::<Vec<_>>(), ["go1.21.1"]);
        assert!(sandbox.layout.is_installed(&v("go1.21.4")));
        assert!(sandbox.layout.is_installed(&v("go1.21.1")));
        assert!(!sandbox.layout.install_dir(&v("go1.21.2")).exists());
        assert!(!entry_exists(&sandbox.layout.exact_alias(&v("go1.21.2"))));
    }

    #[test]
    fn clean_is_idempotent() {
        let sandbox = Sandbox::new(&["go1.21.1", "go1.21.2"]);
        install_fake(&sandbox.layout, "go1.21.1");
        install_fake(&sandbox.layout, "go1.21.2");

        clean(&sandbox.layout, &SymlinkLinker, &sandbox.catalog, "go1.21").unwrap();
        let again = clean(&sandbox.layout, &SymlinkLinker, &sandbox.catalog, "go1.21").unwrap();

        assert_eq!(again.with(CleanOutcome::Missing).collect::<Vec<_>>(), ["go1.21.1"]);
        assert!(sandbox.layout.is_installed(&v("go1.21.2")));
    }

    #[test]
    fn clean_unknown_line_fails() {
        let sandbox = Sandbox::new(&["go1.21.1"]);
        let err = clean(&sandbox.layout, &SymlinkLinker, &sandbox.catalog, "go1.12").unwrap_err();
        assert!(matches!(err, GovmError::VersionNotFound { .. }));
    }

    #[test]
    fn clean_repoints_dangling_line_alias() {
        let sandbox = Sandbox::new(&["go1.21.1", "go1.21.2", "go1.21.3"]);
        let layout = &sandbox.layout;
        install_fake(layout, "go1.21.1");
        install_fake(layout, "go1.21.3");
        link_all(&sandbox, "go1.21.1");
        SymlinkLinker
            .link(&layout.exact_alias(&v("go1.21.1")), &layout.line_alias(&v("go1.21.1")))
            .unwrap();

        clean(layout, &SymlinkLinker, &sandbox.catalog, "go1.21").unwrap();

        let alias = layout.line_alias(&v("go1.21.3"));
        assert_eq!(std::fs::read_link(&alias).unwrap().to_str(), Some("go1.21.3"));
        assert!(alias.exists());
    }

    #[test]
    fn lock_and_unlock_are_idempotent() {
        let sandbox = Sandbox::new(&["go1.21.3"]);
        install_fake(&sandbox.layout, "go1.21.3");
        let version = v("go1.21.3");

        lock(&sandbox.layout, "go1.21.3", LockAction::Add).unwrap();
        lock(&sandbox.layout, "go1.21.3", LockAction::Add).unwrap();
        assert!(sandbox.layout.is_locked(&version));

        lock(&sandbox.layout, "go1.21.3", LockAction::Remove).unwrap();
        lock(&sandbox.layout, "go1.21.3", LockAction::Remove).unwrap();
        assert!(!sandbox.layout.is_locked(&version));
    }

    #[test]
    fn lock_requires_install_dir() {
        let sandbox = Sandbox::new(&["go1.21.3"]);
        let err = lock(&sandbox.layout, "go1.21.3", LockAction::Add).unwrap_err();
        assert!(matches!(err, GovmError::NotInstalled { .. }));

        let err = lock(&sandbox.layout, "go1.21.x", LockAction::Add).unwrap_err();
        assert!(matches!(err, GovmError::Parse { .. }));
    }

    #[test]
    fn lock_action_parses() {
        assert_eq!("add".parse::<LockAction>().unwrap(), LockAction::Add);
        assert_eq!("unlock".parse::<LockAction>().unwrap(), LockAction::Remove);
        assert!(matches!(
            "toggle".parse::<LockAction>(),
            Err(GovmError::InvalidArguments { .. })
        ));
    }

    #[test]
    fn remove_latest_patch_deletes_line_alias() {
        let sandbox = Sandbox::new(&["go1.21.2", "go1.21.3"]);
        let layout = &sandbox.layout;
        install_fake(layout, "go1.21.2");
        install_fake(layout, "go1.21.3");
        link_all(&sandbox, "go1.21.3");
        SymlinkLinker
            .link(&layout.exact_alias(&v("go1.21.3")), &layout.line_alias(&v("go1.21.3")))
            .unwrap();

        remove(layout, &SymlinkLinker, &sandbox.catalog, "go1.21.3").unwrap();

        assert!(!layout.install_dir(&v("go1.21.3")).exists());
        assert!(!entry_exists(&layout.exact_alias(&v("go1.21.3"))));
        assert!(!entry_exists(&layout.line_alias(&v("go1.21.3"))));
    }

    #[test]
    fn remove_older_patch_repoints_line_alias() {
        let sandbox = Sandbox::new(&["go1.21.1", "go1.21.2", "go1.21.3"]);
        let layout = &sandbox.layout;
        install_fake(layout, "go1.21.1");
        install_fake(layout, "go1.21.2");
        link_all(&sandbox, "go1.21.2");
        SymlinkLinker
            .link(&layout.exact_alias(&v("go1.21.2")), &layout.line_alias(&v("go1.21.2")))
            .unwrap();

        remove(layout, &SymlinkLinker, &sandbox.catalog, "go1.21.2").unwrap();

        let alias = layout.line_alias(&v("go1.21.1"));
        assert_eq!(std::fs::read_link(&alias).unwrap().to_str(), Some("go1.21.1"));
    }

    #[test]
    fn remove_accepts_explicit_zero_patch() {
        let sandbox = Sandbox::new(&["go1.21", "go1.21.1"]);
        install_fake(&sandbox.layout, "go1.21");

        let removed = remove(&sandbox.layout, &SymlinkLinker, &sandbox.catalog, "go1.21.0").unwrap();
        assert_eq!(removed.raw, "go1.21");
        assert!(!sandbox.layout.install_dir(&removed).exists());
    }

    #[test]
    fn remove_missing_is_not_installed() {
        let sandbox = Sandbox::new(&["go1.21.3"]);
        let err = remove(&sandbox.layout, &SymlinkLinker, &sandbox.catalog, "go1.21.3").unwrap_err();
        assert!(matches!(err, GovmError::NotInstalled { .. }));
    }

    #[test]
    fn remove_refreshes_latest_alias() {
        let sandbox = Sandbox::new(&["go1.20.5", "go1.21.3"]);
        let layout = &sandbox.layout;
        install_fake(layout, "go1.20.5");
        install_fake(layout, "go1.21.3");
        latest::refresh(layout, &SymlinkLinker, &sandbox.catalog).unwrap();

        remove(layout, &SymlinkLinker, &sandbox.catalog, "go1.21.3").unwrap();

        let target = std::fs::read_link(layout.latest_alias()).unwrap();
        assert_eq!(target.to_str(), Some("go1.20.5"));
    }

    fn offline_installer_sandbox(releases: &[&str]) -> Sandbox {
        Sandbox::with_config(
            releases,
            ConfigFile {
                build_from_source: Some(false),
                archive_url_prefixes: Some(vec!["https://mirror.invalid/go/".into()]),
                ..ConfigFile::default()
            },
        )
    }

    #[tokio::test]
    async fn failed_install_does_not_clean_the_line() {
        let sandbox = offline_installer_sandbox(&["go1.21.2", "go1.21.3"]);
        install_fake(&sandbox.layout, "go1.21.2");
        let fetcher = FakeFetcher::default();
        let installer = Installer::new(
            &sandbox.settings,
            &sandbox.layout,
            &SymlinkLinker,
            &fetcher,
            Platform::from_rust("linux", "x86_64").unwrap(),
        );

        let err = update(&installer, &sandbox.catalog, "go1.21").await.unwrap_err();

        assert!(matches!(err, GovmError::AcquisitionFailed { .. }));
        assert!(sandbox.layout.is_installed(&v("go1.21.2")));
    }

    #[tokio::test]
    async fn update_all_skips_uninstalled_lines_and_aggregates_failures() {
        let sandbox = offline_installer_sandbox(&["go1.19.1", "go1.20.1", "go1.20.2", "go1.21.3"]);
        install_fake(&sandbox.layout, "go1.20.1");
        install_fake(&sandbox.layout, "go1.21.3");
        let fetcher = FakeFetcher::default();
        let installer = Installer::new(
            &sandbox.settings,
            &sandbox.layout,
            &SymlinkLinker,
            &fetcher,
            Platform::from_rust("linux", "x86_64").unwrap(),
        );

        let err = update(&installer, &sandbox.catalog, "all").await.unwrap_err();

        let GovmError::Batch { operation, failures } = err else {
            panic!("expected Batch");
        };
        assert_eq!(operation, "update");
        let failed: Vec<&str> = failures.iter().map(|(line, _)| line.as_str()).collect();
        assert_eq!(failed, ["go1.20"]);
        assert_eq!(
            fetcher.requested(),
            ["https://mirror.invalid/go/go1.20.2.linux-amd64.tar.gz"]
        );
        assert!(sandbox.layout.is_installed(&v("go1.20.1")));
        assert!(sandbox.layout.is_installed(&v("go1.21.3")));
    }

    #[tokio::test]
    async fn update_single_line_cleans_after_install() {
        let sandbox = offline_installer_sandbox(&["go1.21.2", "go1.21.3"]);
        install_fake(&sandbox.layout, "go1.21.2");
        install_fake(&sandbox.layout, "go1.21.3");
        let fetcher = FakeFetcher::default();
        let installer = Installer::new(
            &sandbox.settings,
            &sandbox.layout,
            &SymlinkLinker,
            &fetcher,
            Platform::from_rust("linux", "x86_64").unwrap(),
        );

        update(&installer, &sandbox.catalog, "go1.21").await.unwrap();

        assert!(!sandbox.layout.install_dir(&v("go1.21.2")).exists());
        assert!(sandbox.layout.is_installed(&v("go1.21.3")));
        assert!(sandbox.layout.line_alias(&v("go1.21.3")).exists());
    }

    #[tokio::test]
    async fn update_rejects_exact_release() {
        let sandbox = offline_installer_sandbox(&["go1.21.2", "go1.21.3"]);
        let archive = sandbox.temp.path().join("go1.21.2.tar.gz");
        write_go_tar_gz(&archive);
        let fetcher = FakeFetcher::default().serve(
            "https://mirror.invalid/go/go1.21.2.linux-amd64.tar.gz",
            &archive,
        );
        let installer = Installer::new(
            &sandbox.settings,
            &sandbox.layout,
            &SymlinkLinker,
            &fetcher,
            Platform::from_rust("linux", "x86_64").unwrap(),
        );

        let err = update(&installer, &sandbox.catalog, "go1.21.2").await.unwrap_err();
        assert!(matches!(err, GovmError::InvalidArguments { .. }));

        let err = update(&installer, &sandbox.catalog, "go1.99").await.unwrap_err();
        assert!(matches!(err, GovmError::VersionNotFound { .. }));

        assert!(fetcher.requested().is_empty());
        assert!(!sandbox.layout.install_dir(&v("go1.21.2")).exists());
    }

    #[tokio::test]
    async fn update_line_installs_latest_then_cleans() {
        let sandbox = offline_installer_sandbox(&["go1.21.2", "go1.21.3"]);
        install_fake(&sandbox.layout, "go1.21.2");
        let archive = sandbox.temp.path().join("go1.21.3.tar.gz");
        write_go_tar_gz(&archive);
        let fetcher = FakeFetcher::default().serve(
            "https://mirror.invalid/go/go1.21.3.linux-amd64.tar.gz",
            &archive,
        );
        let installer = Installer::new(
            &sandbox.settings,
            &sandbox.layout,
            &SymlinkLinker,
            &fetcher,
            Platform::from_rust("linux", "x86_64").unwrap(),
        );

        update(&installer, &sandbox.catalog, "go1.21").await.unwrap();

        let layout = &sandbox.layout;
        assert!(layout.is_installed(&v("go1.21.3")));
        assert!(!layout.install_dir(&v("go1.21.2")).exists());
        assert!(layout.line_alias(&v("go1.21.3")).exists());
        assert!(layout.line_sdk_link(&v("go1.21.3")).exists());
    }

    /// Symlinks everything except one alias, which it refuses to write.
    struct RefusingLinker(PathBuf);

    impl Linker for RefusingLinker {
        fn link(&self, target: &Path, alias: &Path) -> GovmResult<()> {
            if alias == self.0 {
                return Err(GovmError::link_failed(
                    alias,
                    std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
                ));
            }
            SymlinkLinker.link(target, alias)
        }

        fn link_dir(&self, target: &Path, link: &Path) -> GovmResult<()> {
            SymlinkLinker.link_dir(target, link)
        }

        fn kind(&self) -> &'static str {
            "refusing"
        }
    }

    #[test]
    fn clean_reports_alias_repair_failure_and_still_refreshes_latest() {
        let sandbox = Sandbox::new(&["go1.21.1", "go1.21.2", "go1.21.3"]);
        let layout = &sandbox.layout;
        install_fake(layout, "go1.21.1");
        install_fake(layout, "go1.21.3");
        link_all(&sandbox, "go1.21.1");
        let line_alias = layout.line_alias(&v("go1.21.1"));
        SymlinkLinker
            .link(&layout.exact_alias(&v("go1.21.1")), &line_alias)
            .unwrap();
        let linker = RefusingLinker(line_alias);

        let err = clean(layout, &linker, &sandbox.catalog, "go1.21").unwrap_err();

        let GovmError::Batch { operation, failures } = err else {
            panic!("expected Batch");
        };
        assert_eq!(operation, "clean");
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0, "go1.21");
        assert!(!layout.install_dir(&v("go1.21.1")).exists());
        assert_eq!(
            std::fs::read_link(layout.latest_alias()).unwrap().to_str(),
            Some("go1.21.3")
        );
    }

    fn link_sdk_dir(sandbox: &Sandbox, raw: &str) {
        let version = v(raw);
        let layout = &sandbox.layout;
        SymlinkLinker
            .link_dir(&layout.install_dir(&version), &layout.line_sdk_link(&version))
            .unwrap();
    }

    #[test]
    fn clean_repoints_dangling_sdk_link() {
        let sandbox = Sandbox::new(&["go1.21.1", "go1.21.2", "go1.21.3"]);
        let layout = &sandbox.layout;
        install_fake(layout, "go1.21.1");
        install_fake(layout, "go1.21.3");
        link_sdk_dir(&sandbox, "go1.21.1");

        clean(layout, &SymlinkLinker, &sandbox.catalog, "go1.21").unwrap();

        let link = layout.line_sdk_link(&v("go1.21.3"));
        assert_eq!(std::fs::read_link(&link).unwrap().to_str(), Some("go1.21.3"));
        assert!(link.join("bin").join("go").is_file());
    }

    #[test]
    fn remove_latest_patch_deletes_sdk_link() {
        let sandbox = Sandbox::new(&["go1.21.2", "go1.21.3"]);
        let layout = &sandbox.layout;
        install_fake(layout, "go1.21.2");
        install_fake(layout, "go1.21.3");
        link_sdk_dir(&sandbox, "go1.21.3");

        remove(layout, &SymlinkLinker, &sandbox.catalog, "go1.21.3").unwrap();

        assert!(!entry_exists(&layout.line_sdk_link(&v("go1.21.3"))));
        assert!(layout.is_installed(&v("go1.21.2")));
    }

    #[test]
    fn remove_older_patch_repoints_sdk_link() {
        let sandbox = Sandbox::new(&["go1.21.1", "go1.21.2", "go1.21.3"]);
        let layout = &sandbox.layout;
        install_fake(layout, "go1.21.1");
        install_fake(layout, "go1.21.2");
        link_sdk_dir(&sandbox, "go1.21.2");

        remove(layout, &SymlinkLinker, &sandbox.catalog, "go1.21.2").unwrap();

        let link = layout.line_sdk_link(&v("go1.21.1"));
        assert_eq!(std::fs::read_link(&link).unwrap().to_str(), Some("go1.21.1"));
    }

    #[test]
    fn remove_last_patch_leaves_no_dangling_links() {
        let sandbox = Sandbox::new(&["go1.21.1", "go1.21.2"]);
        let layout = &sandbox.layout;
        install_fake(layout, "go1.21.1");
        link_all(&sandbox, "go1.21.1");
        SymlinkLinker
            .link(&layout.exact_alias(&v("go1.21.1")), &layout.line_alias(&v("go1.21.1")))
            .unwrap();
        link_sdk_dir(&sandbox, "go1.21.1");
        latest::refresh(layout, &SymlinkLinker, &sandbox.catalog).unwrap();

        remove(layout, &SymlinkLinker, &sandbox.catalog, "go1.21.1").unwrap();

        for link in [
            layout.line_alias(&v("go1.21.1")),
            layout.line_sdk_link(&v("go1.21.1")),
            layout.latest_alias(),
            layout.default_alias(),
        ] {
            assert!(!entry_exists(&link), "{} left behind", link.display());
        }
    }
}
