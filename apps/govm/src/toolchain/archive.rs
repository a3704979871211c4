//! Archive extraction for downloaded Go releases.
//!
//! Upstream archives wrap the whole toolchain in one `go/` directory, so both
//! extractors drop a fixed number of leading path components.

use anyhow::{Context, Result, bail};
use flate2::read::GzDecoder;
use std::path::{Component, Path, PathBuf};
use tar::Archive;

/// Leading components dropped from Go release archives (`go/`).
pub const GO_ARCHIVE_STRIP: usize = 1;

/// Extracts an archive (ZIP or tar.gz) into `dest_dir`.
///
/// The format is picked from the file extension.
///
/// # Errors
///
/// Returns an error if the archive cannot be read, holds an unsafe path, or a
/// file cannot be written.
pub fn unpack(archive_path: &Path, dest_dir: &Path, strip: usize) -> Result<()> {
    let path_str = archive_path.to_string_lossy();
    if path_str.ends_with(".zip") {
        extract_zip(archive_path, dest_dir, strip)?;
    } else if path_str.ends_with(".tar.gz") || path_str.ends_with(".tgz") {
        extract_tar_gz(archive_path, dest_dir, strip)?;
    } else {
        bail!("Unsupported archive format: {}", archive_path.display());
    }
    set_executable_permissions(dest_dir)
}

/// Extracts a tar.gz archive into `dest_dir`, dropping `strip` leading
/// components from every entry.
///
/// # Errors
///
/// Returns an error if the archive is unreadable or an entry escapes
/// `dest_dir`.
pub fn extract_tar_gz(archive_path: &Path, dest_dir: &Path, strip: usize) -> Result<()> {
    std::fs::create_dir_all(dest_dir)
        .with_context(|| format!("Failed to create directory: {}", dest_dir.display()))?;

    let file = std::fs::File::open(archive_path)
        .with_context(|| format!("Failed to open archive: {}", archive_path.display()))?;
    let mut archive = Archive::new(GzDecoder::new(file));

    for entry in archive
        .entries()
        .with_context(|| format!("Failed to read tar entries: {}", archive_path.display()))?
    {
        let mut entry = entry
            .with_context(|| format!("Failed to read tar entry: {}", archive_path.display()))?;

        let entry_path = entry
            .path()
            .with_context(|| "Failed to get entry path")?
            .into_owned();

        let Some(relative_path) = stripped(&entry_path, strip)? else {
            continue;
        };
        let output_path = dest_dir.join(&relative_path);

        if entry.header().entry_type().is_dir() {
            std::fs::create_dir_all(&output_path).with_context(|| {
                format!("Failed to create directory: {}", output_path.display())
            })?;
        } else {
            if let Some(parent) = output_path.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
            }

            entry
                .unpack(&output_path)
                .with_context(|| format!("Failed to extract: {}", output_path.display()))?;
        }
    }

    Ok(())
}

/// Extracts a ZIP archive into `dest_dir`, dropping `strip` leading
/// components from every entry.
///
/// # Errors
///
/// Returns an error if the archive is unreadable or an entry escapes
/// `dest_dir`.
pub fn extract_zip(archive_path: &Path, dest_dir: &Path, strip: usize) -> Result<()> {
    let file = std::fs::File::open(archive_path)
        .with_context(|| format!("Failed to open archive: {}", archive_path.display()))?;

    let mut archive = zip::ZipArchive::new(file)
        .with_context(|| format!("Failed to read ZIP archive: {}", archive_path.display()))?;

    std::fs::create_dir_all(dest_dir)
        .with_context(|| format!("Failed to create directory: {}", dest_dir.display()))?;

    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .with_context(|| format!("Failed to read archive entry {i}"))?;

        let entry_path = entry
            .enclosed_name()
            .with_context(|| format!("Invalid entry path in archive: entry {i}"))?;

        let Some(relative_path) = stripped(&entry_path, strip)? else {
            continue;
        };
        let output_path = dest_dir.join(&relative_path);

        if entry.is_dir() {
            std::fs::create_dir_all(&output_path).with_context(|| {
                format!("Failed to create directory: {}", output_path.display())
            })?;
            continue;
        }

        if let Some(parent) = output_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        let mut outfile = std::fs::File::create(&output_path)
            .with_context(|| format!("Failed to create file: {}", output_path.display()))?;
        std::io::copy(&mut entry, &mut outfile)
            .with_context(|| format!("Failed to extract: {}", output_path.display()))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Some(mode) = entry.unix_mode() {
                let perms = std::fs::Permissions::from_mode(mode & 0o777);
                std::fs::set_permissions(&output_path, perms).with_context(|| {
                    format!("Failed to set permissions: {}", output_path.display())
                })?;
            }
        }
    }

    Ok(())
}

/// Drops `strip` leading components from an entry path.
///
/// Returns `None` for entries that are consumed entirely by the strip (the
/// wrapper directory itself). Absolute paths and `..` are rejected.
fn stripped(entry_path: &Path, strip: usize) -> Result<Option<PathBuf>> {
    if entry_path.is_absolute()
        || entry_path
            .components()
            .any(|c| matches!(c, Component::ParentDir | Component::RootDir | Component::Prefix(_)))
    {
        bail!(
            "Refusing to extract path with parent directory or absolute reference: {}",
            entry_path.display()
        );
    }

    let rest: PathBuf = entry_path
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .skip(strip)
        .collect();

    Ok((!rest.as_os_str().is_empty()).then_some(rest))
}

/// Marks everything in `<dir>/bin` executable.
///
/// # Errors
///
/// Returns an error if the directory cannot be read or a permission cannot
/// be changed.
#[cfg(unix)]
pub fn set_executable_permissions(dir: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let bin_dir = dir.join("bin");
    if !bin_dir.is_dir() {
        return Ok(());
    }

    let entries = std::fs::read_dir(&bin_dir)
        .with_context(|| format!("Failed to read bin directory: {}", bin_dir.display()))?;

    for entry in entries {
        let entry = entry.with_context(|| "Failed to read directory entry")?;
        let path = entry.path();
        if path.is_file() {
            let mut perms = std::fs::metadata(&path)
                .with_context(|| format!("Failed to get metadata: {}", path.display()))?
                .permissions();
            perms.set_mode(0o755);
            std::fs::set_permissions(&path, perms)
                .with_context(|| format!("Failed to set permissions: {}", path.display()))?;
        }
    }

    Ok(())
}

/// Sets executable permissions (no-op on Windows).
#[cfg(not(unix))]
#[allow(clippy::unnecessary_wraps)]
pub fn set_executable_permissions(_dir: &Path) -> Result<()> {
    Ok(())
}
