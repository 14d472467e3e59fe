//! Packages
//!
//! A package is a directory under `packages/` holding a `package.yaml`, a
//! main chart and any number of additional charts. Additional charts are
//! processed in declaration order and modify the shared main chart one
//! after the other.

use chartfork_core::PackageOptions;
use chartfork_core::filesystem::remove_all;
use chartfork_core::paths::{
    PACKAGE_OPTIONS_FILE, PACKAGES_DIR, REPOSITORY_ASSETS_DIR, REPOSITORY_CHARTS_DIR,
};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::additional_chart::AdditionalChart;
use crate::chart::Chart;
use crate::error::{ChartError, Result};
use crate::export::{ExportedChart, VersionOptions};

/// A package and its charts
#[derive(Debug)]
pub struct Package {
    /// Name of the package directory
    pub name: String,
    /// Package directory, `<root>/packages/<name>`
    pub path: PathBuf,
    pub chart: Chart,
    pub additional_charts: Vec<AdditionalChart>,
    pub versions: VersionOptions,
    /// Skip this package when exporting charts
    pub do_not_release: bool,
}

impl Package {
    /// Load `packages/<name>/package.yaml` under `root`
    pub fn load(root: &Path, name: &str) -> Result<Self> {
        let path = root.join(PACKAGES_DIR).join(name);
        let options = PackageOptions::load(&path).map_err(|source| ChartError::PackageOptions {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_options(name, path, &options)
    }

    /// Build a package located at `path` from parsed options
    pub fn from_options(name: &str, path: PathBuf, options: &PackageOptions) -> Result<Self> {
        let chart = Chart::from_options(&options.main_chart_options)?;
        let additional_charts = options
            .additional_charts
            .iter()
            .map(AdditionalChart::from_options)
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            name: name.to_string(),
            path,
            chart,
            additional_charts,
            versions: VersionOptions::from(options),
            do_not_release: options.do_not_release,
        })
    }

    /// Prepare the main chart, then every additional chart with its main chart changes
    pub fn prepare(&self, root: &Path) -> Result<()> {
        info!("Preparing package {}", self.name);
        self.chart.prepare(root, &self.path)?;
        for additional_chart in &self.additional_charts {
            additional_chart.prepare(root, &self.path)?;
            additional_chart.apply_main_changes(&self.path)?;
        }
        Ok(())
    }

    /// Record the local edits of every chart
    ///
    /// Main chart changes made by additional charts are reverted while the
    /// patches are generated and re-applied afterwards. Whatever was
    /// reverted is re-applied even when reverting or generation fails.
    pub fn generate_patch(&self, root: &Path) -> Result<()> {
        info!("Generating patches for package {}", self.name);
        let mut reverted = self.additional_charts.len();
        let mut result = Ok(());
        for (index, additional_chart) in self.additional_charts.iter().enumerate().rev() {
            if let Err(err) = additional_chart.revert_main_changes(&self.path) {
                result = Err(err);
                break;
            }
            reverted = index;
        }

        if result.is_ok() {
            result = self.generate_chart_patches(root);
        }

        for additional_chart in &self.additional_charts[reverted..] {
            additional_chart.apply_main_changes(&self.path)?;
        }
        result
    }

    fn generate_chart_patches(&self, root: &Path) -> Result<()> {
        self.chart.generate_patch(root, &self.path)?;
        for additional_chart in &self.additional_charts {
            additional_chart.generate_patch(root, &self.path)?;
        }
        Ok(())
    }

    /// Export every chart to `assets/` and `charts/` under `root`
    pub fn generate_charts(&self, root: &Path) -> Result<Vec<ExportedChart>> {
        if self.do_not_release {
            info!("Skipping package {}: marked doNotRelease", self.name);
            return Ok(Vec::new());
        }

        let assets_dir = Path::new(REPOSITORY_ASSETS_DIR);
        let charts_dir = Path::new(REPOSITORY_CHARTS_DIR);
        let mut exported = vec![self.chart.export(
            root,
            &self.path,
            &self.versions,
            assets_dir,
            charts_dir,
        )?];
        for additional_chart in &self.additional_charts {
            exported.push(additional_chart.export(
                root,
                &self.path,
                &self.versions,
                assets_dir,
                charts_dir,
            )?);
        }
        Ok(exported)
    }

    /// Revert main chart changes and remove every working directory that can be rebuilt
    pub fn clean(&self) -> Result<()> {
        info!("Cleaning package {}", self.name);
        for additional_chart in self.additional_charts.iter().rev() {
            if self.path.join(&additional_chart.working_dir).exists() {
                additional_chart.revert_main_changes(&self.path)?;
            }
        }

        let mut removable: Vec<(&str, String)> = self
            .additional_charts
            .iter()
            .filter(|c| !c.is_local())
            .map(|c| (c.working_dir.as_str(), c.original_dir()))
            .collect();
        if !self.chart.is_local() {
            removable.push((self.chart.working_dir.as_str(), self.chart.original_dir()));
        }

        for (working_dir, original_dir) in removable {
            for dir in [working_dir, original_dir.as_str()] {
                let path = self.path.join(dir);
                remove_all(&path).map_err(ChartError::transform("remove", &path))?;
            }
        }
        Ok(())
    }
}

/// Names of the packages under `root`, sorted
pub fn list_packages(root: &Path) -> Result<Vec<String>> {
    let packages_dir = root.join(PACKAGES_DIR);
    if !packages_dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut names = Vec::new();
    for entry in std::fs::read_dir(&packages_dir)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() && entry.path().join(PACKAGE_OPTIONS_FILE).is_file() {
            names.push(entry.file_name().to_string_lossy().to_string());
        }
    }
    names.sort();
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FailingPuller, snapshot, upstream_chart, write};
    use chartfork_core::CrdChartOptions;
    use semver::Version;
    use tempfile::TempDir;

    const PACKAGE_YAML: &str = r#"url: local
workingDir: charts
packageVersion: 1
additionalCharts:
  - workingDir: charts-crd
    crdOptions:
      templateDirectory: crd-template
      crdDirectory: templates
      addCRDValidationToMainChart: true
"#;

    fn package(root: &Path) -> PathBuf {
        let pkg = root.join("packages/widget");
        write(&pkg, "package.yaml", PACKAGE_YAML);
        upstream_chart(&pkg.join("charts"));
        write(
            &pkg,
            "templates/crd-template/Chart.yaml",
            "apiVersion: v2\nname: widget-crd\nversion: 1.2.3\n",
        );
        pkg
    }

    #[test]
    fn test_list_packages() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "packages/zeta/package.yaml", "url: local\n");
        write(temp.path(), "packages/alpha/package.yaml", "url: local\n");
        std::fs::create_dir_all(temp.path().join("packages/not-a-package")).unwrap();

        assert_eq!(list_packages(temp.path()).unwrap(), vec!["alpha", "zeta"]);
        assert!(list_packages(&temp.path().join("missing")).unwrap().is_empty());
    }

    #[test]
    fn test_load() {
        let temp = TempDir::new().unwrap();
        package(temp.path());

        let package = Package::load(temp.path(), "widget").unwrap();

        assert_eq!(package.name, "widget");
        assert!(package.chart.is_local());
        assert_eq!(package.additional_charts.len(), 1);
        assert!(package.additional_charts[0].is_crd_chart());
        assert_eq!(package.versions.package_version, Some(1));
    }

    #[test]
    fn test_load_missing_package() {
        let temp = TempDir::new().unwrap();
        let err = Package::load(temp.path(), "missing").unwrap_err();
        assert!(matches!(err, ChartError::PackageOptions { .. }));
    }

    #[test]
    fn test_prepare_patch_and_clean() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        let pkg = package(root);
        let main_before = snapshot(&pkg.join("charts"));
        let package = Package::load(root, "widget").unwrap();

        package.prepare(root).unwrap();
        assert!(!pkg.join("charts/crds").exists());
        assert!(pkg.join("charts-crd/templates/widget.yaml").exists());
        assert!(pkg.join("charts/templates/validate-install-crd.yaml").exists());

        package.generate_patch(root).unwrap();
        // Main chart changes are back in place
        assert!(!pkg.join("charts/crds").exists());
        assert!(pkg.join("charts/templates/validate-install-crd.yaml").exists());

        package.clean().unwrap();
        assert!(!pkg.join("charts-crd").exists());
        assert_eq!(snapshot(&pkg.join("charts")), main_before);
    }

    #[test]
    fn test_generate_patch_reapplies_after_failure() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        let pkg = package(root);
        let mut package = Package::load(root, "widget").unwrap();
        package.prepare(root).unwrap();

        write(&pkg, "charts-extra/Chart.yaml", "name: extra\nversion: 1.0.0\n");
        package.additional_charts.push(AdditionalChart {
            working_dir: "charts-extra".to_string(),
            upstream: Some(Box::new(FailingPuller)),
            crd_options: None,
        });

        let err = package.generate_patch(root).unwrap_err();

        assert!(matches!(err, ChartError::SourceFetch { .. }));
        assert!(!pkg.join("charts/crds").exists());
        assert!(pkg.join("charts/templates/validate-install-crd.yaml").exists());
        assert!(!pkg.join("charts-extra-original").exists());
    }

    #[test]
    fn test_generate_patch_reapplies_after_revert_failure() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        let pkg = package(root);
        let mut package = Package::load(root, "widget").unwrap();
        package.prepare(root).unwrap();

        // Never prepared, so reverting it fails after charts-crd was reverted
        package.additional_charts.insert(
            0,
            AdditionalChart {
                working_dir: "charts-missing".to_string(),
                upstream: Some(Box::new(FailingPuller)),
                crd_options: None,
            },
        );

        let err = package.generate_patch(root).unwrap_err();

        assert!(matches!(err, ChartError::NotPrepared { .. }));
        assert!(!pkg.join("charts/crds").exists());
        assert!(pkg.join("charts-crd/templates/widget.yaml").exists());
        assert!(pkg.join("charts/templates/validate-install-crd.yaml").exists());
    }

    #[test]
    fn test_generate_charts() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        package(root);
        let package = Package::load(root, "widget").unwrap();
        package.prepare(root).unwrap();

        let exported = package.generate_charts(root).unwrap();

        let names: Vec<&str> = exported.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["widget", "widget-crd"]);
        assert!(exported.iter().all(|c| c.version == Version::new(1, 2, 301)));
        assert!(root.join("assets/widget/widget-1.2.301.tgz").exists());
        assert!(root.join("assets/widget-crd/widget-crd-1.2.301.tgz").exists());
        assert!(root.join("charts/widget-crd/1.2.301/templates/widget.yaml").exists());
    }

    #[test]
    fn test_do_not_release() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        let pkg = root.join("packages/widget");
        upstream_chart(&pkg.join("charts"));
        let options = PackageOptions {
            do_not_release: true,
            ..PackageOptions::parse("url: local\n").unwrap()
        };
        let package = Package::from_options("widget", pkg, &options).unwrap();

        assert!(package.generate_charts(root).unwrap().is_empty());
        assert!(!root.join("assets").exists());
    }

    #[test]
    fn test_invalid_additional_chart() {
        let options = PackageOptions {
            additional_charts: vec![chartfork_core::AdditionalChartOptions {
                working_dir: "charts-crd".to_string(),
                upstream_options: Some(chartfork_core::UpstreamOptions {
                    url: "local".to_string(),
                    ..Default::default()
                }),
                crd_options: Some(CrdChartOptions {
                    template_directory: "crd-template".to_string(),
                    crd_directory: "templates".to_string(),
                    add_crd_validation_to_main_chart: false,
                }),
            }],
            ..PackageOptions::parse("url: local\n").unwrap()
        };

        let err = Package::from_options("widget", PathBuf::from("packages/widget"), &options).unwrap_err();
        assert!(err.is_configuration());
    }
}
