//! CLI commands

pub mod charts;
pub mod clean;
pub mod list;
pub mod patch;
pub mod prepare;

use chartfork_charts::{ChartError, Package, list_packages};
use chartfork_core::CoreError;
use std::path::Path;
use tracing::debug;

use crate::error::{CliError, Result};

/// Load the package named on the command line, or every package under `root`
pub fn selected_packages(root: &Path, package: Option<&str>) -> Result<Vec<Package>> {
    let names = match package {
        Some(name) => vec![name.to_string()],
        None => list_packages(root)?,
    };
    debug!("Selected {} package(s) under {}", names.len(), root.display());

    names
        .iter()
        .map(|name| {
            debug!("Loading package {}", name);
            Package::load(root, name).map_err(|err| match err {
                ChartError::PackageOptions {
                    source: CoreError::OptionsNotFound { .. },
                    ..
                } => CliError::configuration_with_help(
                    err.to_string(),
                    format!("Known packages: {}", known_packages(root)),
                ),
                other => CliError::from(other),
            })
        })
        .collect()
}

fn known_packages(root: &Path) -> String {
    match list_packages(root) {
        Ok(names) if !names.is_empty() => names.join(", "),
        _ => "none".to_string(),
    }
}
