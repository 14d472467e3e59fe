//! Package options (`package.yaml`)
//!
//! Every package carries a `package.yaml` describing where its main chart
//! comes from and which additional charts are produced alongside it:
//!
//! ```yaml
//! url: https://github.com/acme/widget.git
//! subdirectory: charts/widget
//! commit: 0a1b2c3
//! workingDir: charts
//! packageVersion: 1
//! additionalCharts:
//!   - workingDir: charts-crd
//!     crdOptions:
//!       templateDirectory: crd-template
//!       crdDirectory: templates
//!       addCRDValidationToMainChart: true
//! ```

use semver::Version;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{CoreError, Result};
use crate::paths::PACKAGE_OPTIONS_FILE;

/// Working directory used by a chart when `workingDir` is not set
pub const DEFAULT_WORKING_DIR: &str = "charts";

/// Directory inside a CRD chart receiving the CRDs when `crdDirectory` is not set
pub const DEFAULT_CRD_DIRECTORY: &str = "templates";

fn default_working_dir() -> String {
    DEFAULT_WORKING_DIR.to_string()
}

fn default_crd_directory() -> String {
    DEFAULT_CRD_DIRECTORY.to_string()
}

/// Where the content of a chart comes from
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpstreamOptions {
    /// Git URL (ending in `.git`), archive URL, or `local`
    #[serde(default)]
    pub url: String,

    /// Directory within the upstream to treat as the chart root
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subdirectory: Option<String>,

    /// Commit to pin a Git upstream to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit: Option<String>,

    /// Branch to clone from a Git upstream
    #[serde(
        default,
        rename = "chartRepoBranch",
        skip_serializing_if = "Option::is_none"
    )]
    pub branch: Option<String>,
}

/// Options for a chart generated from the CRDs of the main chart
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrdChartOptions {
    /// Template directory, relative to the package's `templates/` directory
    pub template_directory: String,

    /// Directory inside the CRD chart where CRDs are placed
    #[serde(default = "default_crd_directory")]
    pub crd_directory: String,

    /// Add a template to the main chart that refuses to install without the CRDs
    #[serde(default, rename = "addCRDValidationToMainChart")]
    pub add_crd_validation_to_main_chart: bool,
}

/// Options of the main chart of a package
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartOptions {
    /// Working directory of the chart, relative to the package
    #[serde(default = "default_working_dir")]
    pub working_dir: String,

    /// Upstream of the chart
    #[serde(flatten)]
    pub upstream_options: UpstreamOptions,
}

impl Default for ChartOptions {
    fn default() -> Self {
        Self {
            working_dir: default_working_dir(),
            upstream_options: UpstreamOptions::default(),
        }
    }
}

/// Options of a chart packaged alongside the main chart
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdditionalChartOptions {
    /// Working directory of the chart, relative to the package
    #[serde(default = "default_working_dir")]
    pub working_dir: String,

    /// Upstream of the chart
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upstream_options: Option<UpstreamOptions>,

    /// CRD chart options
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crd_options: Option<CrdChartOptions>,
}

/// Contents of a `package.yaml`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageOptions {
    /// Overrides the version of every exported chart
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<Version>,

    /// Folded into the patch component of exported chart versions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package_version: Option<u32>,

    /// Main chart options (inlined at the top level)
    #[serde(flatten)]
    pub main_chart_options: ChartOptions,

    /// Additional charts
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub additional_charts: Vec<AdditionalChartOptions>,

    /// Skip this package when exporting charts
    #[serde(default)]
    pub do_not_release: bool,
}

impl PackageOptions {
    /// Load `package.yaml` from a package directory
    pub fn load(package_dir: &Path) -> Result<Self> {
        let path = package_dir.join(PACKAGE_OPTIONS_FILE);
        if !path.exists() {
            return Err(CoreError::OptionsNotFound {
                path: path.display().to_string(),
            });
        }
        let content = std::fs::read_to_string(&path)?;
        Self::parse(&content).map_err(|e| CoreError::InvalidOptions {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Parse `package.yaml` content
    pub fn parse(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Working directory of the main chart, falling back to [`DEFAULT_WORKING_DIR`]
    pub fn main_chart_working_dir(&self) -> &str {
        let working_dir = self.main_chart_options.working_dir.trim();
        if working_dir.is_empty() {
            DEFAULT_WORKING_DIR
        } else {
            working_dir
        }
    }
}
