//! Chart export
//!
//! An exported chart lands twice in the repository: as a versioned archive
//! under `assets/<name>/` and unpacked under `charts/<name>/<version>/`.

use chartfork_core::filesystem::{copy_dir, path_exists, remove_all};
use chartfork_core::paths::CHART_METADATA_FILE;
use chartfork_core::{PackageOptions, create_chart_archive};
use semver::Version;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::{ChartError, Result};

/// Versioning rules applied when exporting
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionOptions {
    /// Replaces the version found in `Chart.yaml`
    pub version: Option<Version>,
    /// Folded into the patch component
    pub package_version: Option<u32>,
}

impl VersionOptions {
    /// Version a chart currently at `chart_version` is exported as
    ///
    /// A package version `n` turns patch `p` into `p * 100 + n`, so
    /// `1.2.3` with package version `1` is exported as `1.2.301`.
    pub fn resolve(&self, chart_version: &Version) -> Version {
        let mut version = self.version.clone().unwrap_or_else(|| chart_version.clone());
        if let Some(package_version) = self.package_version {
            version.patch = version.patch * 100 + u64::from(package_version);
        }
        version
    }
}

impl From<&PackageOptions> for VersionOptions {
    fn from(options: &PackageOptions) -> Self {
        Self {
            version: options.version.clone(),
            package_version: options.package_version,
        }
    }
}

/// Where a chart was exported to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedChart {
    pub name: String,
    pub version: Version,
    pub archive: PathBuf,
    pub chart_dir: PathBuf,
}

/// Export `pkg/chart_dir` into `root/assets_dir` and `root/charts_dir`
pub fn export_helm_chart(
    root: &Path,
    pkg: &Path,
    chart_dir: &str,
    versions: &VersionOptions,
    assets_dir: &Path,
    charts_dir: &Path,
) -> Result<ExportedChart> {
    let chart_path = pkg.join(chart_dir);
    if !path_exists(&chart_path).map_err(ChartError::transform("check", &chart_path))? {
        return Err(ChartError::NotPrepared {
            path: chart_path.display().to_string(),
        });
    }
    let export_error = |message: String| ChartError::Export {
        path: chart_path.display().to_string(),
        message,
    };

    let metadata_path = chart_path.join(CHART_METADATA_FILE);
    let content = std::fs::read_to_string(&metadata_path)
        .map_err(|e| export_error(format!("cannot read {}: {}", CHART_METADATA_FILE, e)))?;
    let mut metadata: serde_yaml::Value = serde_yaml::from_str(&content)
        .map_err(|e| export_error(format!("invalid {}: {}", CHART_METADATA_FILE, e)))?;

    let name = metadata
        .get("name")
        .and_then(|n| n.as_str())
        .ok_or_else(|| export_error(format!("{} has no name", CHART_METADATA_FILE)))?
        .to_string();
    let chart_version = metadata
        .get("version")
        .and_then(|v| v.as_str())
        .ok_or_else(|| export_error(format!("{} has no version", CHART_METADATA_FILE)))?;
    let chart_version = Version::parse(chart_version)
        .map_err(|e| export_error(format!("invalid chart version {}: {}", chart_version, e)))?;
    let version = versions.resolve(&chart_version);

    let archive = root
        .join(assets_dir)
        .join(&name)
        .join(format!("{}-{}.tgz", name, version));
    if archive.exists() {
        return Err(export_error(format!(
            "{} already exists; bump packageVersion or remove the archive",
            archive.display()
        )));
    }

    let unpacked = root.join(charts_dir).join(&name).join(version.to_string());
    remove_all(&unpacked).map_err(ChartError::transform("clean up", &unpacked))?;
    copy_dir(&chart_path, &unpacked).map_err(ChartError::transform("copy chart", &unpacked))?;

    if version != chart_version {
        if let Some(mapping) = metadata.as_mapping_mut() {
            mapping.insert("version".into(), version.to_string().into());
        }
        let rewritten = serde_yaml::to_string(&metadata)
            .map_err(|e| export_error(format!("cannot write {}: {}", CHART_METADATA_FILE, e)))?;
        std::fs::write(unpacked.join(CHART_METADATA_FILE), rewritten)?;
    }

    create_chart_archive(&unpacked, &name, &archive)
        .map_err(ChartError::transform("package chart", &archive))?;

    info!("Exported {} {} to {}", name, version, archive.display());

    Ok(ExportedChart {
        name,
        version,
        archive,
        chart_dir: unpacked,
    })
}
