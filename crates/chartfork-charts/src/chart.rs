//! The main chart of a package
//!
//! The main chart always comes from an upstream. Unless that upstream is
//! `local`, the working directory is rebuilt on every prepare: pull, pull
//! dependencies, replay the recorded changes. Generating a patch pulls a
//! pristine copy next to the working directory and records the difference.

use chartfork_change::{apply_changes, generate_changes};
use chartfork_core::filesystem::{path_exists, remove_all};
use chartfork_core::paths::{main_chart_changes_root, original_dir};
use chartfork_core::{ChartOptions, DEFAULT_WORKING_DIR, RemoveOnDrop};
use chartfork_puller::{Puller, from_options};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::dependencies::prepare_dependencies;
use crate::error::{ChartError, Result};
use crate::export::{ExportedChart, VersionOptions, export_helm_chart};

/// The main chart of a package
#[derive(Debug)]
pub struct Chart {
    /// Working directory, relative to the package
    pub working_dir: String,
    pub upstream: Box<dyn Puller>,
}

impl Chart {
    /// Build the main chart from the options inlined in `package.yaml`
    pub fn from_options(options: &ChartOptions) -> Result<Self> {
        let working_dir = match options.working_dir.trim() {
            "" => DEFAULT_WORKING_DIR.to_string(),
            dir => dir.to_string(),
        };
        let upstream = from_options(&options.upstream_options)
            .map_err(|e| ChartError::configuration(&working_dir, e.to_string()))?;

        Ok(Self {
            working_dir,
            upstream,
        })
    }

    /// Whether the chart lives inside the package
    pub fn is_local(&self) -> bool {
        self.upstream.is_within_package()
    }

    /// Directory the pristine upstream is pulled into while generating a patch
    pub fn original_dir(&self) -> String {
        original_dir(&self.working_dir)
    }

    /// Changes root, relative to the package
    pub fn generated_changes_root_dir(&self) -> PathBuf {
        main_chart_changes_root()
    }

    /// Rebuild the working directory from the upstream and the recorded changes
    pub fn prepare(&self, root: &Path, pkg: &Path) -> Result<()> {
        if self.is_local() {
            info!("Local chart {} does not need to be prepared", self.working_dir);
            return Ok(());
        }
        prepare_from_upstream(
            root,
            pkg,
            self.upstream.as_ref(),
            &self.working_dir,
            &self.generated_changes_root_dir(),
        )
    }

    /// Record the local edits of the working directory
    pub fn generate_patch(&self, root: &Path, pkg: &Path) -> Result<()> {
        if self.is_local() {
            info!("Local chart {} does not need to be patched", self.working_dir);
            return Ok(());
        }
        require_prepared(pkg, &self.working_dir)?;
        generate_patch_from_upstream(
            root,
            pkg,
            self.upstream.as_ref(),
            &self.working_dir,
            &self.generated_changes_root_dir(),
        )
    }

    /// Export the working directory as a versioned chart
    pub fn export(
        &self,
        root: &Path,
        pkg: &Path,
        versions: &VersionOptions,
        assets_dir: &Path,
        charts_dir: &Path,
    ) -> Result<ExportedChart> {
        export_helm_chart(root, pkg, &self.working_dir, versions, assets_dir, charts_dir)
    }
}

/// Fail with [`ChartError::NotPrepared`] unless `pkg/working_dir` exists
pub(crate) fn require_prepared(pkg: &Path, working_dir: &str) -> Result<PathBuf> {
    let path = pkg.join(working_dir);
    if !path_exists(&path).map_err(ChartError::transform("check", &path))? {
        return Err(ChartError::NotPrepared {
            path: path.display().to_string(),
        });
    }
    Ok(path)
}

/// Pull `upstream` into `working_dir`, prepare its dependencies and apply its changes
///
/// A failure leaves whatever was produced so far in place; the next
/// prepare starts by removing it.
pub(crate) fn prepare_from_upstream(
    root: &Path,
    pkg: &Path,
    upstream: &dyn Puller,
    working_dir: &str,
    changes_root: &Path,
) -> Result<()> {
    let path = pkg.join(working_dir);
    info!("Preparing {} from {}", working_dir, upstream);

    remove_all(&path).map_err(ChartError::transform("clean up", &path))?;
    upstream
        .pull(root, pkg, Path::new(working_dir))
        .map_err(ChartError::fetch(&path))?;
    prepare_dependencies(root, pkg, Path::new(working_dir), changes_root)?;

    let summary =
        apply_changes(&path, &pkg.join(changes_root)).map_err(ChartError::changeset("apply", &path))?;
    if !summary.is_empty() {
        info!("Applied changes to {}: {}", working_dir, summary);
    }
    Ok(())
}

/// Diff `working_dir` against a fresh pull of `upstream` into `changes_root`
///
/// The pristine copy lives in the original directory, which never survives
/// this call.
pub(crate) fn generate_patch_from_upstream(
    root: &Path,
    pkg: &Path,
    upstream: &dyn Puller,
    working_dir: &str,
    changes_root: &Path,
) -> Result<()> {
    let original = original_dir(working_dir);
    let original_path = pkg.join(&original);
    remove_all(&original_path).map_err(ChartError::transform("clean up", &original_path))?;
    let _original = RemoveOnDrop::new(&original_path);

    upstream
        .pull(root, pkg, Path::new(&original))
        .map_err(ChartError::fetch(&original_path))?;
    prepare_dependencies(root, pkg, Path::new(&original), changes_root)?;

    let path = pkg.join(working_dir);
    let summary = generate_changes(&original_path, &path, &pkg.join(changes_root))
        .map_err(ChartError::changeset("generate", &path))?;
    info!("Generated changes for {}: {}", working_dir, summary);
    Ok(())
}
