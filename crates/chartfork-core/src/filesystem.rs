//! Filesystem helpers shared by pullers, the change engine and charts
//!
//! All helpers take already-joined paths; callers decide which root a
//! relative path is resolved against.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::{CoreError, Result};

/// Check whether a path exists, surfacing I/O errors other than "not found"
pub fn path_exists(path: &Path) -> Result<bool> {
    match std::fs::symlink_metadata(path) {
        Ok(_) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

/// Remove a file or directory tree; a missing path is not an error
pub fn remove_all(path: &Path) -> Result<()> {
    let metadata = match std::fs::symlink_metadata(path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e.into()),
    };
    if metadata.is_dir() {
        std::fs::remove_dir_all(path)?;
    } else {
        std::fs::remove_file(path)?;
    }
    Ok(())
}

/// Replace `dir` with the contents of `dir/subdirectory`, discarding siblings
pub fn make_subdirectory_root(dir: &Path, subdirectory: &str) -> Result<()> {
    let source = dir.join(subdirectory);
    if !source.is_dir() {
        return Err(CoreError::SubdirectoryNotFound {
            path: dir.display().to_string(),
            subdirectory: subdirectory.to_string(),
        });
    }

    let staging = sibling_path(dir, "subdirectory");
    remove_all(&staging)?;
    std::fs::rename(&source, &staging)?;
    remove_all(dir)?;
    std::fs::rename(&staging, dir)?;

    Ok(())
}

/// Remove every empty directory under `dir`, including `dir` itself
pub fn prune_empty_dirs(dir: &Path) -> Result<()> {
    if !dir.is_dir() {
        return Ok(());
    }

    // Children are yielded before their parents
    for entry in WalkDir::new(dir).contents_first(true) {
        let entry = entry?;
        if entry.file_type().is_dir() && is_empty_dir(entry.path())? {
            std::fs::remove_dir(entry.path())?;
        }
    }

    Ok(())
}

/// Remove empty ancestors of `path`, stopping at (and never removing) `root`
pub fn prune_empty_parents(root: &Path, path: &Path) -> Result<()> {
    let mut current = path.parent();
    while let Some(dir) = current {
        if dir == root || !dir.starts_with(root) {
            break;
        }
        if !dir.is_dir() || !is_empty_dir(dir)? {
            break;
        }
        std::fs::remove_dir(dir)?;
        current = dir.parent();
    }
    Ok(())
}

/// Recursively copy `src` into `dst`, overwriting existing files
pub fn copy_dir(src: &Path, dst: &Path) -> Result<()> {
    std::fs::create_dir_all(dst)?;

    for entry in WalkDir::new(src).min_depth(1).sort_by_file_name() {
        let entry = entry?;
        let rel_path = entry
            .path()
            .strip_prefix(src)
            .unwrap_or(entry.path());
        let target = dst.join(rel_path);

        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target)?;
        } else {
            copy_file(entry.path(), &target)?;
        }
    }

    Ok(())
}

/// Copy a single file, creating parent directories as needed
pub fn copy_file(src: &Path, dst: &Path) -> Result<()> {
    if let Some(parent) = dst.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::copy(src, dst)?;
    Ok(())
}

/// Relative paths of every regular file under `dir`, sorted
pub fn list_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    if !dir.is_dir() {
        return Ok(files);
    }

    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        if let Ok(rel_path) = entry.path().strip_prefix(dir) {
            files.push(rel_path.to_path_buf());
        }
    }

    Ok(files)
}

fn is_empty_dir(dir: &Path) -> Result<bool> {
    Ok(std::fs::read_dir(dir)?.next().is_none())
}

fn sibling_path(path: &Path, suffix: &str) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    path.with_file_name(format!(".{}-{}", name, suffix))
}

/// Removes a path when dropped
///
/// Used for transient files and directories that must not outlive the
/// operation that created them, whichever way that operation exits.
#[derive(Debug)]
#[must_use = "the path is removed as soon as the guard is dropped"]
pub struct RemoveOnDrop {
    path: PathBuf,
}

impl RemoveOnDrop {
    /// Guard `path`; nothing is created
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The guarded path
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RemoveOnDrop {
    fn drop(&mut self) {
        if let Err(e) = remove_all(&self.path) {
            tracing::warn!("Failed to clean up {}: {}", self.path.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(path: &Path, content: &str) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    #[test]
    fn test_path_exists() {
        let temp = TempDir::new().unwrap();
        assert!(path_exists(temp.path()).unwrap());
        assert!(!path_exists(&temp.path().join("missing")).unwrap());
    }

    #[test]
    fn test_remove_all_missing_is_ok() {
        let temp = TempDir::new().unwrap();
        remove_all(&temp.path().join("missing")).unwrap();

        let file = temp.path().join("a/b/c.txt");
        write(&file, "c");
        remove_all(&temp.path().join("a")).unwrap();
        assert!(!temp.path().join("a").exists());
    }

    #[test]
    fn test_make_subdirectory_root() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("charts");
        write(&dir.join("README.md"), "readme");
        write(&dir.join("charts/widget/Chart.yaml"), "name: widget\n");
        write(&dir.join("charts/widget/templates/a.yaml"), "a");

        make_subdirectory_root(&dir, "charts/widget").unwrap();

        assert!(dir.join("Chart.yaml").exists());
        assert!(dir.join("templates/a.yaml").exists());
        assert!(!dir.join("README.md").exists());
        assert!(!dir.join("charts").exists());
    }

    #[test]
    fn test_make_subdirectory_root_missing() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("charts");
        std::fs::create_dir_all(&dir).unwrap();

        let err = make_subdirectory_root(&dir, "nope").unwrap_err();
        assert!(matches!(err, CoreError::SubdirectoryNotFound { .. }));
        assert!(dir.exists());
    }

    #[test]
    fn test_prune_empty_dirs() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("out");
        std::fs::create_dir_all(dir.join("empty/nested")).unwrap();
        write(&dir.join("kept/file.txt"), "x");

        prune_empty_dirs(&dir).unwrap();

        assert!(!dir.join("empty").exists());
        assert!(dir.join("kept/file.txt").exists());
    }

    #[test]
    fn test_prune_empty_parents_stops_at_root() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("root");
        std::fs::create_dir_all(root.join("a/b")).unwrap();
        write(&root.join("a/keep.txt"), "x");

        prune_empty_parents(&root, &root.join("a/b/removed.txt")).unwrap();

        assert!(!root.join("a/b").exists());
        assert!(root.join("a").exists());

        std::fs::remove_file(root.join("a/keep.txt")).unwrap();
        prune_empty_parents(&root, &root.join("a/keep.txt")).unwrap();
        assert!(!root.join("a").exists());
        assert!(root.exists());
    }

    #[test]
    fn test_copy_dir_and_list_files() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("src");
        write(&src.join("b.txt"), "b");
        write(&src.join("nested/a.txt"), "a");
        let dst = temp.path().join("dst");
        write(&dst.join("b.txt"), "old");

        copy_dir(&src, &dst).unwrap();

        assert_eq!(std::fs::read_to_string(dst.join("b.txt")).unwrap(), "b");
        assert_eq!(
            list_files(&dst).unwrap(),
            vec![PathBuf::from("b.txt"), PathBuf::from("nested/a.txt")]
        );
    }

    #[test]
    fn test_remove_on_drop() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("transient");
        {
            let guard = RemoveOnDrop::new(&dir);
            write(&guard.path().join("file.txt"), "x");
            assert!(dir.exists());
        }
        assert!(!dir.exists());
    }
}
