//! chartfork Core - Core types and utilities for forked Helm chart management
//!
//! This crate provides the foundations shared by every other crate:
//! - `options`: The `package.yaml` model
//! - `paths`: Well-known repository and package locations
//! - `filesystem`: Path checks, recursive removal, copies and scope guards
//! - `archive`: `.tgz` extraction and reproducible chart packaging

pub mod archive;
pub mod error;
pub mod filesystem;
pub mod options;
pub mod paths;

pub use archive::{create_chart_archive, extract_tgz, list_archive};
pub use error::{CoreError, Result};
pub use filesystem::RemoveOnDrop;
pub use options::{
    AdditionalChartOptions, ChartOptions, CrdChartOptions, DEFAULT_CRD_DIRECTORY,
    DEFAULT_WORKING_DIR, PackageOptions, UpstreamOptions,
};
