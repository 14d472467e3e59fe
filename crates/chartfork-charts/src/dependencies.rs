//! Chart dependencies pulled from their own upstream
//!
//! A chart's changes root may hold `dependencies/<name>/dependency.yaml`,
//! an upstream descriptor for a subchart. Each one is pulled into
//! `<chart>/charts/<name>` and gets its own changes applied from
//! `dependencies/<name>/generated-changes`, recursively.

use chartfork_change::apply_changes;
use chartfork_core::UpstreamOptions;
use chartfork_core::filesystem::{path_exists, remove_all};
use chartfork_core::paths::{
    CHART_DEPENDENCIES_DIR, CHART_METADATA_FILE, DEPENDENCY_OPTIONS_FILE,
    GENERATED_CHANGES_DEPENDENCIES_DIR, GENERATED_CHANGES_DIR,
};
use chartfork_puller::from_options;
use std::path::Path;
use tracing::{debug, info};

use crate::error::{ChartError, Result};

/// Pull every dependency declared under `changes_root` into `chart_dir`
///
/// `chart_dir` and `changes_root` are relative to `pkg`. Without a
/// `dependencies/` directory this is a no-op.
pub fn prepare_dependencies(root: &Path, pkg: &Path, chart_dir: &Path, changes_root: &Path) -> Result<()> {
    let dependencies_dir = changes_root.join(GENERATED_CHANGES_DEPENDENCIES_DIR);
    let absolute = pkg.join(&dependencies_dir);
    if !path_exists(&absolute).map_err(ChartError::transform("check", &absolute))? {
        return Ok(());
    }

    let mut names = Vec::new();
    for entry in std::fs::read_dir(&absolute)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            names.push(entry.file_name().to_string_lossy().to_string());
        }
    }
    names.sort();

    for name in names {
        prepare_dependency(root, pkg, chart_dir, &dependencies_dir.join(&name), &name).map_err(
            |source| ChartError::Dependency {
                name: name.clone(),
                path: pkg.join(chart_dir).display().to_string(),
                source: Box::new(source),
            },
        )?;
    }

    Ok(())
}

fn prepare_dependency(root: &Path, pkg: &Path, chart_dir: &Path, dependency_dir: &Path, name: &str) -> Result<()> {
    let options = load_dependency_options(&pkg.join(dependency_dir))?;
    let upstream = from_options(&options).map_err(ChartError::fetch(pkg.join(chart_dir)))?;
    if upstream.is_within_package() {
        return Err(ChartError::configuration(
            name,
            "dependencies must be pulled from a remote upstream",
        ));
    }

    let target = chart_dir.join(CHART_DEPENDENCIES_DIR).join(name);
    let absolute = pkg.join(&target);
    info!("Preparing dependency {} from {}", name, upstream);

    remove_all(&absolute).map_err(ChartError::transform("clean up", &absolute))?;
    upstream
        .pull(root, pkg, &target)
        .map_err(ChartError::fetch(&absolute))?;

    let changes_root = dependency_dir.join(GENERATED_CHANGES_DIR);
    prepare_dependencies(root, pkg, &target, &changes_root)?;
    apply_changes(&absolute, &pkg.join(&changes_root)).map_err(ChartError::changeset("apply", &absolute))?;

    point_to_local_copy(&pkg.join(chart_dir), name)
}

fn load_dependency_options(dependency_dir: &Path) -> Result<UpstreamOptions> {
    let path = dependency_dir.join(DEPENDENCY_OPTIONS_FILE);
    let content = std::fs::read_to_string(&path).map_err(|e| {
        ChartError::configuration(
            path.display().to_string(),
            format!("cannot read dependency options: {}", e),
        )
    })?;
    serde_yaml::from_str(&content)
        .map_err(|e| ChartError::configuration(path.display().to_string(), e.to_string()))
}

/// Make the `dependencies` entry called `name` point at the pulled copy
fn point_to_local_copy(chart_dir: &Path, name: &str) -> Result<()> {
    let metadata_path = chart_dir.join(CHART_METADATA_FILE);
    if !metadata_path.exists() {
        debug!("No {} in {}", CHART_METADATA_FILE, chart_dir.display());
        return Ok(());
    }

    let content = std::fs::read_to_string(&metadata_path)?;
    let mut metadata: serde_yaml::Value = serde_yaml::from_str(&content)
        .map_err(|e| ChartError::configuration(metadata_path.display().to_string(), e.to_string()))?;

    let repository = format!("file://./{}/{}", CHART_DEPENDENCIES_DIR, name);
    let entry = metadata
        .get_mut("dependencies")
        .and_then(|d| d.as_sequence_mut())
        .and_then(|deps| {
            deps.iter_mut()
                .find(|d| d.get("name").and_then(|n| n.as_str()) == Some(name))
        })
        .and_then(|d| d.as_mapping_mut());

    let Some(entry) = entry else {
        debug!("{} does not list dependency {}", metadata_path.display(), name);
        return Ok(());
    };
    if entry.get("repository").and_then(|r| r.as_str()) == Some(repository.as_str()) {
        return Ok(());
    }
    entry.insert("repository".into(), repository.into());

    let rewritten = serde_yaml::to_string(&metadata)
        .map_err(|e| ChartError::configuration(metadata_path.display().to_string(), e.to_string()))?;
    std::fs::write(&metadata_path, rewritten)?;
    Ok(())
}
