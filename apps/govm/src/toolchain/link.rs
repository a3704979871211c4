//! Alias creation and removal.
//!
//! An alias is a stable name in the alias directory that resolves to one
//! installed toolchain binary. Where the filesystem supports symlinks every
//! alias is a symlink; otherwise it is a byte copy of its target.

use std::path::{Path, PathBuf};

use tracing::debug;

use super::paths::entry_exists;
use crate::errors::{GovmError, GovmResult};

const PROBE_NAME: &str = ".govm-link-probe";

/// Creates and removes aliases.
pub trait Linker {
    /// Replaces whatever sits at `alias` with a fresh alias for `target`.
    ///
    /// # Errors
    ///
    /// Returns [`GovmError::LinkFailed`] if the old entry cannot be removed or
    /// the new one cannot be created.
    fn link(&self, target: &Path, alias: &Path) -> GovmResult<()>;

    /// Removes `alias` if present, including a broken symlink.
    ///
    /// # Errors
    ///
    /// Returns [`GovmError::LinkFailed`] if the entry exists but cannot be
    /// removed.
    fn unlink(&self, alias: &Path) -> GovmResult<()> {
        if entry_exists(alias) {
            std::fs::remove_file(alias).map_err(|e| GovmError::link_failed(alias, e))?;
            debug!("removed alias {}", alias.display());
        }
        Ok(())
    }

    /// Replaces whatever sits at `link` with a link to the directory
    /// `target`. Linkers that cannot link directories leave `link` alone.
    ///
    /// # Errors
    ///
    /// Returns [`GovmError::LinkFailed`] if the link cannot be written.
    fn link_dir(&self, target: &Path, link: &Path) -> GovmResult<()> {
        let _ = (target, link);
        Ok(())
    }

    /// Short name for logging.
    fn kind(&self) -> &'static str;
}

/// Aliases are symbolic links.
#[derive(Debug, Default, Clone, Copy)]
pub struct SymlinkLinker;

impl Linker for SymlinkLinker {
    fn link(&self, target: &Path, alias: &Path) -> GovmResult<()> {
        prepare(alias)?;
        let source = link_source(target, alias);
        create_symlink(&source, alias).map_err(|e| GovmError::link_failed(alias, e))?;
        debug!("linked {} -> {}", alias.display(), source.display());
        Ok(())
    }

    fn link_dir(&self, target: &Path, link: &Path) -> GovmResult<()> {
        if cfg!(windows) {
            return Ok(());
        }
        prepare(link)?;
        let source = link_source(target, link);
        create_symlink(&source, link).map_err(|e| GovmError::link_failed(link, e))?;
        debug!("linked {} -> {}", link.display(), source.display());
        Ok(())
    }

    fn kind(&self) -> &'static str {
        "symlink"
    }
}

/// Aliases are copies of their target, for filesystems without symlinks.
#[derive(Debug, Default, Clone, Copy)]
pub struct CopyLinker;

impl Linker for CopyLinker {
    fn link(&self, target: &Path, alias: &Path) -> GovmResult<()> {
        prepare(alias)?;
        std::fs::copy(target, alias).map_err(|e| GovmError::link_failed(alias, e))?;
        debug!("copied {} to {}", target.display(), alias.display());
        Ok(())
    }

    fn kind(&self) -> &'static str {
        "copy"
    }
}

/// Picks the linker for `bin_dir` by trying to create a probe symlink there.
///
/// # Errors
///
/// Returns an error if `bin_dir` cannot be created.
pub fn select_linker(bin_dir: &Path) -> GovmResult<Box<dyn Linker>> {
    std::fs::create_dir_all(bin_dir)
        .map_err(|e| GovmError::io_error(format!("create {}", bin_dir.display()), e))?;

    let probe = bin_dir.join(PROBE_NAME);
    let _ = std::fs::remove_file(&probe);
    let linker: Box<dyn Linker> = match create_symlink(Path::new(PROBE_NAME), &probe) {
        Ok(()) => {
            let _ = std::fs::remove_file(&probe);
            Box::new(SymlinkLinker)
        }
        Err(e) => {
            debug!("symlinks unavailable in {}: {e}", bin_dir.display());
            Box::new(CopyLinker)
        }
    };
    debug!("using {} aliases", linker.kind());
    Ok(linker)
}

/// Target recorded in the alias: the bare file name when the target sits next
/// to the alias, otherwise the path as given.
#[must_use]
pub fn link_source(target: &Path, alias: &Path) -> PathBuf {
    match (target.parent(), alias.parent(), target.file_name()) {
        (Some(t), Some(a), Some(name)) if t == a => PathBuf::from(name),
        _ => target.to_path_buf(),
    }
}

fn prepare(alias: &Path) -> GovmResult<()> {
    if let Some(parent) = alias.parent() {
        std::fs::create_dir_all(parent).map_err(|e| GovmError::link_failed(alias, e))?;
    }
    if entry_exists(alias) {
        std::fs::remove_file(alias).map_err(|e| GovmError::link_failed(alias, e))?;
    }
    Ok(())
}

fn create_symlink(source: &Path, alias: &Path) -> std::io::Result<()> {
    #[cfg(unix)]
    {
        std::os::unix::fs::symlink(source, alias)
    }

    #[cfg(windows)]
    {
        std::os::windows::fs::symlink_file(source, alias)
    }

    #[cfg(not(any(unix, windows)))]
    {
        let _ = (source, alias);
        Err(std::io::Error::new(
            std::io::ErrorKind::Unsupported,
            "symlinks are not supported on this platform",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_target(dir: &Path, name: &str, content: &[u8]) -> PathBuf {
        std::fs::create_dir_all(dir).unwrap();
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn link_source_is_relative_within_the_same_directory() {
        assert_eq!(
            link_source(Path::new("/bin/go1.21.3"), Path::new("/bin/go1.21")),
            PathBuf::from("go1.21.3")
        );
    }

    #[test]
    fn link_source_is_absolute_across_directories() {
        assert_eq!(
            link_source(
                Path::new("/sdk/go1.21.3/bin/go"),
                Path::new("/bin/go1.21.3")
            ),
            PathBuf::from("/sdk/go1.21.3/bin/go")
        );
    }

    #[cfg(unix)]
    #[test]
    fn symlink_linker_replaces_existing_entry() {
        let temp = tempfile::tempdir().unwrap();
        let bin = temp.path().join("bin");
        let old = write_target(&temp.path().join("old"), "go", b"old");
        let new = write_target(&temp.path().join("new"), "go", b"new");
        let alias = bin.join("go1.21");

        SymlinkLinker.link(&old, &alias).unwrap();
        SymlinkLinker.link(&new, &alias).unwrap();

        assert_eq!(std::fs::read_link(&alias).unwrap(), new);
        assert_eq!(std::fs::read(&alias).unwrap(), b"new");
    }

    #[cfg(unix)]
    #[test]
    fn symlink_linker_repairs_broken_links() {
        let temp = tempfile::tempdir().unwrap();
        let alias = temp.path().join("go1.21");
        std::os::unix::fs::symlink(temp.path().join("gone"), &alias).unwrap();

        let target = write_target(temp.path(), "go1.21.3", b"go");
        SymlinkLinker.link(&target, &alias).unwrap();

        assert_eq!(std::fs::read_link(&alias).unwrap(), PathBuf::from("go1.21.3"));
        assert!(alias.exists());
    }

    #[cfg(unix)]
    #[test]
    fn symlink_linker_links_directories_relatively() {
        let temp = tempfile::tempdir().unwrap();
        let sdk = temp.path().join("sdk");
        let old = sdk.join("go1.21.2");
        let new = sdk.join("go1.21.3");
        write_target(&old.join("bin"), "go", b"old");
        write_target(&new.join("bin"), "go", b"new");
        let link = sdk.join("go1.21.latest");

        SymlinkLinker.link_dir(&old, &link).unwrap();
        SymlinkLinker.link_dir(&new, &link).unwrap();

        assert_eq!(std::fs::read_link(&link).unwrap(), PathBuf::from("go1.21.3"));
        assert_eq!(std::fs::read(link.join("bin").join("go")).unwrap(), b"new");
    }

    #[test]
    fn copy_linker_skips_directory_links() {
        let temp = tempfile::tempdir().unwrap();
        let target = temp.path().join("go1.21.3");
        std::fs::create_dir_all(&target).unwrap();
        let link = temp.path().join("go1.21.latest");

        CopyLinker.link_dir(&target, &link).unwrap();
        assert!(!entry_exists(&link));
    }

    #[test]
    fn copy_linker_copies_target_bytes() {
        let temp = tempfile::tempdir().unwrap();
        let target = write_target(&temp.path().join("sdk"), "go", b"toolchain");
        let alias = temp.path().join("bin").join("go1.21.3");

        CopyLinker.link(&target, &alias).unwrap();

        assert!(alias.symlink_metadata().unwrap().file_type().is_file());
        assert_eq!(std::fs::read(&alias).unwrap(), b"toolchain");
    }

    #[test]
    fn copy_linker_fails_for_missing_target() {
        let temp = tempfile::tempdir().unwrap();
        let alias = temp.path().join("go1.21.3");
        let err = CopyLinker
            .link(&temp.path().join("missing"), &alias)
            .unwrap_err();
        assert!(matches!(err, GovmError::LinkFailed { .. }));
    }

    #[test]
    fn unlink_is_a_noop_for_missing_alias() {
        let temp = tempfile::tempdir().unwrap();
        SymlinkLinker.unlink(&temp.path().join("absent")).unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn unlink_removes_broken_symlink() {
        let temp = tempfile::tempdir().unwrap();
        let alias = temp.path().join("go1.20");
        std::os::unix::fs::symlink(temp.path().join("gone"), &alias).unwrap();

        SymlinkLinker.unlink(&alias).unwrap();
        assert!(!entry_exists(&alias));
    }

    #[cfg(unix)]
    #[test]
    fn select_linker_prefers_symlinks() {
        let temp = tempfile::tempdir().unwrap();
        let bin = temp.path().join("bin");
        let linker = select_linker(&bin).unwrap();
        assert_eq!(linker.kind(), "symlink");
        assert!(!entry_exists(&bin.join(PROBE_NAME)));
    }
}
