//! Chart archive creation and extraction
//!
//! Provides functionality to extract upstream `.tgz` archives into a working
//! directory and to package a chart directory into a reproducible `.tgz`.

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use std::fs::File;
use std::io::Write;
use std::path::{Component, Path, PathBuf};
use tar::{Archive, Builder, EntryType, Header};
use walkdir::WalkDir;

use crate::error::{CoreError, Result};

/// Extract a `.tgz` archive into `dest`
///
/// If every entry of the archive lives under a single top-level directory
/// (as with `helm package` output or Git hosting tarballs), that directory
/// is stripped. When `subdirectory` is non-empty, only entries below it are
/// extracted and it becomes the root of `dest`.
pub fn extract_tgz(archive_path: &Path, subdirectory: &str, dest: &Path) -> Result<()> {
    let root = common_root(archive_path)?;
    let subdirectory = PathBuf::from(subdirectory.trim_matches('/'));

    let file = File::open(archive_path)?;
    let mut archive = Archive::new(GzDecoder::new(file));

    std::fs::create_dir_all(dest)?;

    for entry in archive.entries()? {
        let mut entry = entry?;
        let entry_type = entry.header().entry_type();
        if is_metadata_entry(entry_type) {
            continue;
        }

        let path = entry.path()?.into_owned();
        let Some(rel_path) = entry_destination(&path, root.as_deref(), &subdirectory)? else {
            continue;
        };
        let target = dest.join(&rel_path);

        if entry_type.is_dir() {
            std::fs::create_dir_all(&target)?;
        } else if entry_type.is_file() {
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)?;
            }
            entry.unpack(&target)?;
        } else {
            tracing::debug!(
                "Skipping unsupported archive entry {} ({:?})",
                path.display(),
                entry_type
            );
        }
    }

    Ok(())
}

/// Package a chart directory into a `.tgz` with all entries under `<name>/`
///
/// Entries are added in sorted order with a zero mtime so that the same
/// chart always produces the same bytes.
pub fn create_chart_archive(chart_dir: &Path, name: &str, output: &Path) -> Result<PathBuf> {
    if let Some(parent) = output.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file = File::create(output)?;
    let encoder = GzEncoder::new(file, Compression::default());
    let mut builder = Builder::new(encoder);

    for entry in WalkDir::new(chart_dir).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let rel_path = entry
            .path()
            .strip_prefix(chart_dir)
            .unwrap_or(entry.path());
        let archive_path = Path::new(name).join(rel_path);
        let content = std::fs::read(entry.path())?;
        add_bytes_to_archive(&mut builder, &archive_path, &content)?;
    }

    let encoder = builder.into_inner()?;
    encoder.finish()?;

    Ok(output.to_path_buf())
}

/// List the file paths stored in a `.tgz`
pub fn list_archive(archive_path: &Path) -> Result<Vec<String>> {
    let file = File::open(archive_path)?;
    let mut archive = Archive::new(GzDecoder::new(file));

    let mut paths = Vec::new();
    for entry in archive.entries()? {
        let entry = entry?;
        if entry.header().entry_type().is_file() {
            paths.push(entry.path()?.to_string_lossy().to_string());
        }
    }

    Ok(paths)
}

/// Top-level directory shared by every entry, if there is exactly one
fn common_root(archive_path: &Path) -> Result<Option<PathBuf>> {
    let file = File::open(archive_path)?;
    let mut archive = Archive::new(GzDecoder::new(file));

    let mut root: Option<PathBuf> = None;
    for entry in archive.entries()? {
        let entry = entry?;
        let entry_type = entry.header().entry_type();
        if is_metadata_entry(entry_type) {
            continue;
        }

        let components = normal_components(&entry.path()?)?;
        let Some(first) = components.first() else {
            continue;
        };
        if components.len() == 1 && !entry_type.is_dir() {
            // A file at the top level means there is no wrapping directory
            return Ok(None);
        }
        match &root {
            None => root = Some(PathBuf::from(first)),
            Some(existing) if existing.as_os_str() == first.as_str() => {}
            Some(_) => return Ok(None),
        }
    }

    Ok(root)
}

/// Where an entry lands relative to the destination, or `None` to skip it
fn entry_destination(
    path: &Path,
    root: Option<&Path>,
    subdirectory: &Path,
) -> Result<Option<PathBuf>> {
    let mut components = normal_components(path)?;
    if let Some(root) = root {
        if components.first().map(|c| Path::new(c) == root) == Some(true) {
            components.remove(0);
        }
    }

    let rel_path: PathBuf = components.iter().collect();
    let rel_path = if subdirectory.as_os_str().is_empty() {
        rel_path
    } else {
        match rel_path.strip_prefix(subdirectory) {
            Ok(stripped) => stripped.to_path_buf(),
            Err(_) => return Ok(None),
        }
    };

    if rel_path.as_os_str().is_empty() {
        return Ok(None);
    }
    Ok(Some(rel_path))
}

fn normal_components(path: &Path) -> Result<Vec<String>> {
    let mut components = Vec::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => components.push(part.to_string_lossy().to_string()),
            Component::CurDir => {}
            _ => {
                return Err(CoreError::Archive {
                    message: format!("Entry escapes the destination: {}", path.display()),
                });
            }
        }
    }
    Ok(components)
}

fn is_metadata_entry(entry_type: EntryType) -> bool {
    matches!(
        entry_type,
        EntryType::XGlobalHeader | EntryType::XHeader | EntryType::GNULongName
    )
}

/// Add bytes to a tar archive with a given path
fn add_bytes_to_archive<W: Write>(
    builder: &mut Builder<W>,
    archive_path: &Path,
    content: &[u8],
) -> Result<()> {
    let mut header = Header::new_gnu();
    header.set_size(content.len() as u64);
    header.set_mode(0o644);
    header.set_mtime(0); // Reproducible builds: use epoch time
    header.set_cksum();

    builder.append_data(&mut header, archive_path, content)?;

    Ok(())
}
