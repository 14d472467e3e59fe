//! Charts packaged alongside the main chart
//!
//! An additional chart is either pulled from its own upstream (and patched
//! like the main chart) or generated from a template kept in the package
//! and filled with the CRDs of the main chart. In the latter case the main
//! chart is modified too: its `crds/` move into the CRD chart and it may
//! gain a template refusing to install without them.

use chartfork_core::filesystem::{path_exists, remove_all};
use chartfork_core::paths::{
    CHART_CRD_DIR, PACKAGE_TEMPLATES_DIR, additional_chart_changes_root, original_dir,
};
use chartfork_core::{AdditionalChartOptions, CrdChartOptions, DEFAULT_WORKING_DIR, PackageOptions};
use chartfork_puller::{Puller, from_options};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::chart::{generate_patch_from_upstream, prepare_from_upstream, require_prepared};
use crate::crd;
use crate::dependencies::prepare_dependencies;
use crate::error::{ChartError, Result};
use crate::export::{ExportedChart, VersionOptions, export_helm_chart};

/// A chart packaged along with the main chart
#[derive(Debug)]
pub struct AdditionalChart {
    /// Working directory, relative to the package
    pub working_dir: String,
    /// Upstream of a forked chart
    pub upstream: Option<Box<dyn Puller>>,
    /// Options of a chart generated from the main chart's CRDs
    pub crd_options: Option<CrdChartOptions>,
}

/// Where the content of an additional chart comes from
#[derive(Clone, Copy)]
enum Source<'a> {
    Upstream(&'a dyn Puller),
    Crd(&'a CrdChartOptions),
}

impl AdditionalChart {
    /// Build an additional chart from its `package.yaml` entry
    ///
    /// Upstream and CRD chart options are mutually exclusive. Having
    /// neither is accepted here and reported by the lifecycle operations.
    pub fn from_options(options: &AdditionalChartOptions) -> Result<Self> {
        let working_dir = match options.working_dir.trim() {
            "" => DEFAULT_WORKING_DIR.to_string(),
            dir => dir.to_string(),
        };
        if options.upstream_options.is_some() && options.crd_options.is_some() {
            return Err(ChartError::configuration(
                working_dir,
                "upstreamOptions and crdOptions cannot both be set",
            ));
        }

        let upstream = options
            .upstream_options
            .as_ref()
            .map(from_options)
            .transpose()
            .map_err(|e| ChartError::configuration(&working_dir, e.to_string()))?;

        Ok(Self {
            working_dir,
            upstream,
            crd_options: options.crd_options.clone(),
        })
    }

    /// Directory the pristine upstream is pulled into while generating a patch
    pub fn original_dir(&self) -> String {
        original_dir(&self.working_dir)
    }

    /// Changes root, relative to the package
    pub fn generated_changes_root_dir(&self) -> PathBuf {
        additional_chart_changes_root(&self.working_dir)
    }

    /// Whether the chart lives inside the package
    pub fn is_local(&self) -> bool {
        self.upstream.as_ref().is_some_and(|u| u.is_within_package())
    }

    /// Whether the chart is generated from the main chart's CRDs
    pub fn is_crd_chart(&self) -> bool {
        self.crd_options.is_some()
    }

    fn source(&self) -> Result<Source<'_>> {
        match (&self.upstream, &self.crd_options) {
            (Some(upstream), None) => Ok(Source::Upstream(upstream.as_ref())),
            (None, Some(crd_options)) => Ok(Source::Crd(crd_options)),
            (None, None) => Err(ChartError::configuration(
                &self.working_dir,
                "no upstreamOptions or crdOptions provided",
            )),
            (Some(_), Some(_)) => Err(ChartError::configuration(
                &self.working_dir,
                "upstreamOptions and crdOptions cannot both be set",
            )),
        }
    }

    /// Build the working directory
    ///
    /// Forked charts are pulled and patched. CRD charts are generated from
    /// their template, which requires the main chart to still carry its
    /// `crds/`.
    pub fn prepare(&self, root: &Path, pkg: &Path) -> Result<()> {
        let crd_options = match self.source()? {
            Source::Upstream(upstream) if upstream.is_within_package() => {
                info!("Local chart {} does not need to be prepared", self.working_dir);
                return Ok(());
            }
            Source::Upstream(upstream) => {
                return prepare_from_upstream(
                    root,
                    pkg,
                    upstream,
                    &self.working_dir,
                    &self.generated_changes_root_dir(),
                );
            }
            Source::Crd(crd_options) => crd_options,
        };

        let path = pkg.join(&self.working_dir);
        info!("Preparing CRD chart {}", self.working_dir);
        remove_all(&path).map_err(ChartError::transform("clean up", &path))?;

        let main_crds = pkg.join(main_chart_working_dir(pkg)?).join(CHART_CRD_DIR);
        if !path_exists(&main_crds).map_err(ChartError::transform("check", &main_crds))? {
            return Err(ChartError::MissingCrds {
                path: main_crds.display().to_string(),
            });
        }

        let template = pkg
            .join(PACKAGE_TEMPLATES_DIR)
            .join(&crd_options.template_directory);
        crd::generate_crd_chart_from_template(&template, &path, &crd_options.crd_directory)
            .map_err(ChartError::transform("generate CRD chart", &path))?;

        prepare_dependencies(
            root,
            pkg,
            Path::new(&self.working_dir),
            &self.generated_changes_root_dir(),
        )
    }

    /// Record the local edits of the working directory
    ///
    /// CRD charts carry no patches; edits belong in their template.
    pub fn generate_patch(&self, root: &Path, pkg: &Path) -> Result<()> {
        let source = self.source()?;
        if let Source::Upstream(upstream) = source
            && upstream.is_within_package()
        {
            info!("Local chart {} does not need to be patched", self.working_dir);
            return Ok(());
        }
        require_prepared(pkg, &self.working_dir)?;

        match source {
            Source::Crd(crd_options) => {
                warn!(
                    "Patches are not supported for CRD charts; local changes to {} will be overwritten. Make them in {} instead",
                    self.working_dir,
                    Path::new(PACKAGE_TEMPLATES_DIR)
                        .join(&crd_options.template_directory)
                        .display()
                );
                Ok(())
            }
            Source::Upstream(upstream) => generate_patch_from_upstream(
                root,
                pkg,
                upstream,
                &self.working_dir,
                &self.generated_changes_root_dir(),
            ),
        }
    }

    /// Move the main chart's CRDs into this chart
    ///
    /// The main chart loses its `crds/` and, when configured, gains a
    /// template that fails to render until the CRDs are installed. A no-op
    /// for charts without CRD options.
    pub fn apply_main_changes(&self, pkg: &Path) -> Result<()> {
        let path = require_prepared(pkg, &self.working_dir)?;
        let Some(crd_options) = &self.crd_options else {
            return Ok(());
        };

        let main = pkg.join(main_chart_working_dir(pkg)?);
        let main_crds = main.join(CHART_CRD_DIR);
        let crd_dir = path.join(&crd_options.crd_directory);

        let copied = crd::copy_crds(&main_crds, &crd_dir)
            .map_err(ChartError::transform("copy CRDs", &crd_dir))?;
        crd::delete_crds(&main).map_err(ChartError::transform("delete CRDs", &main_crds))?;
        debug!("Moved {} CRD file(s) from {} to {}", copied, main_crds.display(), crd_dir.display());

        if crd_options.add_crd_validation_to_main_chart {
            crd::add_crd_validation(&main, &crd_dir)
                .map_err(ChartError::transform("add CRD validation", &main))?;
        }
        Ok(())
    }

    /// Undo [`apply_main_changes`](Self::apply_main_changes)
    pub fn revert_main_changes(&self, pkg: &Path) -> Result<()> {
        let path = require_prepared(pkg, &self.working_dir)?;
        let Some(crd_options) = &self.crd_options else {
            return Ok(());
        };

        let main = pkg.join(main_chart_working_dir(pkg)?);
        let main_crds = main.join(CHART_CRD_DIR);
        let crd_dir = path.join(&crd_options.crd_directory);

        let template_crd_dir = pkg
            .join(PACKAGE_TEMPLATES_DIR)
            .join(&crd_options.template_directory)
            .join(&crd_options.crd_directory);
        let copied = crd::copy_crds_from_chart(&crd_dir, &main_crds, &template_crd_dir)
            .map_err(ChartError::transform("copy CRDs", &main_crds))?;
        debug!("Moved {} CRD file(s) back to {}", copied, main_crds.display());

        if crd_options.add_crd_validation_to_main_chart {
            crd::remove_crd_validation(&main)
                .map_err(ChartError::transform("remove CRD validation", &main))?;
        }
        Ok(())
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

fn main_chart_working_dir(pkg: &Path) -> Result<String> {
    let options = PackageOptions::load(pkg).map_err(|source| ChartError::PackageOptions {
        path: pkg.display().to_string(),
        source,
    })?;
    Ok(options.main_chart_working_dir().to_string())
}
