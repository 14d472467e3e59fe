//! chartfork charts - the package lifecycle
//!
//! This crate drives the charts of a package through their lifecycle:
//!
//! - **prepare**: pull each chart, pull its dependencies and replay its
//!   recorded changes; generate CRD charts and move the main chart's CRDs
//!   into them
//! - **patch**: diff each working directory against a fresh pull and record
//!   the result under `generated-changes/`
//! - **export**: package the working directories as versioned charts
//! - **clean**: undo the main chart changes and drop rebuildable directories

pub mod additional_chart;
pub mod chart;
pub mod crd;
pub mod dependencies;
pub mod error;
pub mod export;
pub mod package;

#[cfg(test)]
pub(crate) mod testing;

pub use additional_chart::AdditionalChart;
pub use chart::Chart;
pub use dependencies::prepare_dependencies;
pub use error::{ChartError, Result};
pub use export::{ExportedChart, VersionOptions, export_helm_chart};
pub use package::{Package, list_packages};
