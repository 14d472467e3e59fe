//! Well-known locations inside a charts repository and its packages
//!
//! A repository looks like:
//!
//! ```text
//! <root>/
//! ├── packages/<name>/
//! │   ├── package.yaml
//! │   ├── templates/<crd-template>/
//! │   ├── generated-changes/
//! │   │   ├── overlay/ exclude/ patch/ dependencies/
//! │   │   └── additional-charts/<workingDir>/generated-changes/
//! │   └── <workingDir>/          (prepared, not committed)
//! ├── assets/<chart>/<chart>-<version>.tgz
//! └── charts/<chart>/<version>/
//! ```

use std::path::PathBuf;

/// Directory under the repository root holding one directory per package
pub const PACKAGES_DIR: &str = "packages";

/// Options file at the root of every package
pub const PACKAGE_OPTIONS_FILE: &str = "package.yaml";

/// Directory within a package holding templates for generated charts
pub const PACKAGE_TEMPLATES_DIR: &str = "templates";

/// Root of all changes recorded for a package
pub const GENERATED_CHANGES_DIR: &str = "generated-changes";

/// Subdirectory of the changes root holding changes for additional charts
pub const GENERATED_CHANGES_ADDITIONAL_CHART_DIR: &str = "additional-charts";

/// Subdirectory of a changes root holding dependency descriptors
pub const GENERATED_CHANGES_DEPENDENCIES_DIR: &str = "dependencies";

/// Descriptor file for a single dependency
pub const DEPENDENCY_OPTIONS_FILE: &str = "dependency.yaml";

/// Files added by local edits
pub const GENERATED_CHANGES_OVERLAY_DIR: &str = "overlay";

/// Files removed by local edits
pub const GENERATED_CHANGES_EXCLUDE_DIR: &str = "exclude";

/// Unified diffs of files modified by local edits
pub const GENERATED_CHANGES_PATCH_DIR: &str = "patch";

/// Extension of a single file's unified diff
pub const PATCH_EXTENSION: &str = "patch";

/// CRD directory of a Helm chart
pub const CHART_CRD_DIR: &str = "crds";

/// Templates directory of a Helm chart
pub const CHART_TEMPLATES_DIR: &str = "templates";

/// Subcharts directory of a Helm chart
pub const CHART_DEPENDENCIES_DIR: &str = "charts";

/// Helm chart metadata file
pub const CHART_METADATA_FILE: &str = "Chart.yaml";

/// Template injected into a main chart to refuse installs without its CRD chart
pub const CHART_VALIDATE_INSTALL_CRD_FILE: &str = "validate-install-crd.yaml";

/// Output directory for packaged chart archives
pub const REPOSITORY_ASSETS_DIR: &str = "assets";

/// Output directory for unpacked charts
pub const REPOSITORY_CHARTS_DIR: &str = "charts";

/// Changes root of a package's main chart
pub fn main_chart_changes_root() -> PathBuf {
    PathBuf::from(GENERATED_CHANGES_DIR)
}

/// Changes root of an additional chart, derived from its working directory only
pub fn additional_chart_changes_root(working_dir: &str) -> PathBuf {
    PathBuf::from(GENERATED_CHANGES_DIR)
        .join(GENERATED_CHANGES_ADDITIONAL_CHART_DIR)
        .join(working_dir)
        .join(GENERATED_CHANGES_DIR)
}

/// Transient directory holding the pristine upstream copy of a working directory
pub fn original_dir(working_dir: &str) -> String {
    format!("{}-original", working_dir)
}
