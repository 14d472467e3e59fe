//! Record and replay the difference between two chart trees
//!
//! A changes root holds three sibling directories:
//!
//! - `overlay/`: files added by the fork, and binary files it changed
//! - `exclude/`: files the fork removed, with their upstream content
//! - `patch/`: unified diffs for text files the fork changed, one
//!   `<path>.patch` per file
//!
//! Anything else under the changes root (such as `dependencies/`) is left
//! alone.

use chartfork_core::filesystem::{
    copy_file, list_files, path_exists, prune_empty_dirs, prune_empty_parents, remove_all,
};
use chartfork_core::paths::{
    GENERATED_CHANGES_EXCLUDE_DIR, GENERATED_CHANGES_OVERLAY_DIR, GENERATED_CHANGES_PATCH_DIR,
    PATCH_EXTENSION,
};
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{ChangeError, Result};
use crate::patch::{FilePatch, unified_diff};

/// Counts of what a changeset touched
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChangeSummary {
    pub added: usize,
    pub removed: usize,
    pub modified: usize,
}

impl ChangeSummary {
    pub fn is_empty(&self) -> bool {
        self.added == 0 && self.removed == 0 && self.modified == 0
    }
}

impl fmt::Display for ChangeSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} added, {} removed, {} modified",
            self.added, self.removed, self.modified
        )
    }
}

/// Record the changes turning `from_dir` into `to_dir` under `changes_root`
///
/// Previous overlay, exclude and patch directories are replaced. When the
/// trees are identical nothing is left behind.
pub fn generate_changes(from_dir: &Path, to_dir: &Path, changes_root: &Path) -> Result<ChangeSummary> {
    let overlay_dir = changes_root.join(GENERATED_CHANGES_OVERLAY_DIR);
    let exclude_dir = changes_root.join(GENERATED_CHANGES_EXCLUDE_DIR);
    let patch_dir = changes_root.join(GENERATED_CHANGES_PATCH_DIR);
    for dir in [&overlay_dir, &exclude_dir, &patch_dir] {
        remove_all(dir)?;
    }

    let from_files: BTreeSet<PathBuf> = list_files(from_dir)?.into_iter().collect();
    let to_files: BTreeSet<PathBuf> = list_files(to_dir)?.into_iter().collect();
    let mut summary = ChangeSummary::default();

    for rel_path in to_files.difference(&from_files) {
        debug!("Added {}", rel_path.display());
        copy_file(&to_dir.join(rel_path), &overlay_dir.join(rel_path))?;
        summary.added += 1;
    }

    for rel_path in from_files.difference(&to_files) {
        debug!("Removed {}", rel_path.display());
        copy_file(&from_dir.join(rel_path), &exclude_dir.join(rel_path))?;
        summary.removed += 1;
    }

    for rel_path in from_files.intersection(&to_files) {
        let old = std::fs::read(from_dir.join(rel_path))?;
        let new = std::fs::read(to_dir.join(rel_path))?;
        if old == new {
            continue;
        }

        debug!("Modified {}", rel_path.display());
        summary.modified += 1;

        let diff = match (String::from_utf8(old), String::from_utf8(new)) {
            (Ok(old), Ok(new)) => replayable_diff(&old, &new, &slash_path(rel_path)),
            _ => None,
        };
        match diff {
            Some(diff) => {
                let target = patch_dir.join(patch_file_name(rel_path));
                if let Some(parent) = target.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                std::fs::write(target, diff)?;
            }
            None => copy_file(&to_dir.join(rel_path), &overlay_dir.join(rel_path))?,
        }
    }

    prune_empty_dirs(changes_root)?;
    Ok(summary)
}

/// Replay the changes recorded under `changes_root` onto `dir`
///
/// Patches are applied first, then overlay files are copied in, then
/// excluded files are removed. A missing changes root is a no-op.
pub fn apply_changes(dir: &Path, changes_root: &Path) -> Result<ChangeSummary> {
    let mut summary = ChangeSummary::default();
    if !path_exists(changes_root)? {
        return Ok(summary);
    }

    let patch_dir = changes_root.join(GENERATED_CHANGES_PATCH_DIR);
    for patch_path in list_files(&patch_dir)? {
        if patch_path.extension().is_none_or(|ext| ext != PATCH_EXTENSION) {
            debug!("Skipping {}: not a patch", patch_path.display());
            continue;
        }

        let rel_path = patch_path.with_extension("");
        let target = dir.join(&rel_path);
        if !target.is_file() {
            return Err(ChangeError::PatchTargetMissing {
                patch: patch_dir.join(&patch_path).display().to_string(),
                path: target.display().to_string(),
            });
        }

        let text = std::fs::read_to_string(patch_dir.join(&patch_path))?;
        let patch = FilePatch::parse(&text, &slash_path(&patch_path))?;
        let original = std::fs::read_to_string(&target)?;
        std::fs::write(&target, patch.apply(&original, &slash_path(&rel_path))?)?;

        debug!("Patched {}", rel_path.display());
        summary.modified += 1;
    }

    let overlay_dir = changes_root.join(GENERATED_CHANGES_OVERLAY_DIR);
    for rel_path in list_files(&overlay_dir)? {
        copy_file(&overlay_dir.join(&rel_path), &dir.join(&rel_path))?;
        summary.added += 1;
    }

    let exclude_dir = changes_root.join(GENERATED_CHANGES_EXCLUDE_DIR);
    for rel_path in list_files(&exclude_dir)? {
        let target = dir.join(&rel_path);
        remove_all(&target)?;
        prune_empty_parents(dir, &target)?;
        summary.removed += 1;
    }

    Ok(summary)
}

/// A unified diff from `old` to `new`, if replaying it reproduces `new`
///
/// Text with line endings the patch format cannot carry, such as a bare
/// `\r`, is recorded as an overlay instead.
fn replayable_diff(old: &str, new: &str, path: &str) -> Option<String> {
    let diff = unified_diff(old, new, path);
    let replayed = FilePatch::parse(&diff, path).and_then(|patch| patch.apply(old, path));
    match replayed {
        Ok(replayed) if replayed == new => Some(diff),
        _ => {
            debug!("Recording {} as an overlay: its diff does not replay", path);
            None
        }
    }
}

fn patch_file_name(rel_path: &Path) -> PathBuf {
    let mut name = rel_path.as_os_str().to_owned();
    name.push(".");
    name.push(PATCH_EXTENSION);
    PathBuf::from(name)
}

fn slash_path(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
