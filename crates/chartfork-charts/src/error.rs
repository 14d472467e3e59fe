//! Error types for package lifecycle operations

use chartfork_change::ChangeError;
use chartfork_core::CoreError;
use chartfork_puller::PullError;
use thiserror::Error;

/// Result type for package lifecycle operations
pub type Result<T> = std::result::Result<T, ChartError>;

/// Errors that can occur while preparing, patching or exporting a chart
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ChartError {
    /// Missing, conflicting or malformed chart options
    #[error("invalid options for {chart}: {message}")]
    Configuration { chart: String, message: String },

    /// The working directory has not been prepared
    #[error("working directory {path} has not been prepared yet\nHint: Run `chartfork prepare` first")]
    NotPrepared { path: String },

    /// A CRD chart was requested but the main chart carries no CRDs
    #[error("unable to prepare a CRD chart since there are no CRDs at {path}\nHint: Run `chartfork clean` to move CRDs back into the main chart, then prepare again")]
    MissingCrds { path: String },

    /// Pulling the upstream failed
    #[error("failed to pull upstream into {path}: {source}")]
    SourceFetch {
        path: String,
        #[source]
        source: PullError,
    },

    /// Applying or generating a changeset failed
    #[error("failed to {action} changes for {path}: {source}")]
    Changeset {
        action: &'static str,
        path: String,
        #[source]
        source: ChangeError,
    },

    /// A filesystem step of the lifecycle failed
    #[error("failed to {action} at {path}: {source}")]
    Transform {
        action: &'static str,
        path: String,
        #[source]
        source: CoreError,
    },

    /// Preparing a dependency failed
    #[error("failed to prepare dependency {name} of {path}: {source}")]
    Dependency {
        name: String,
        path: String,
        #[source]
        source: Box<ChartError>,
    },

    /// Exporting a chart failed
    #[error("failed to export {path}: {message}")]
    Export { path: String, message: String },

    /// `package.yaml` could not be loaded
    #[error("failed to load package options for {path}: {source}")]
    PackageOptions {
        path: String,
        #[source]
        source: CoreError,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ChartError {
    pub(crate) fn configuration(chart: impl Into<String>, message: impl Into<String>) -> Self {
        ChartError::Configuration {
            chart: chart.into(),
            message: message.into(),
        }
    }

    pub(crate) fn transform(action: &'static str, path: impl AsRef<std::path::Path>) -> impl FnOnce(CoreError) -> Self {
        let path = path.as_ref().display().to_string();
        move |source| ChartError::Transform {
            action,
            path,
            source,
        }
    }

    pub(crate) fn fetch(path: impl AsRef<std::path::Path>) -> impl FnOnce(PullError) -> Self {
        let path = path.as_ref().display().to_string();
        move |source| ChartError::SourceFetch { path, source }
    }

    pub(crate) fn changeset(action: &'static str, path: impl AsRef<std::path::Path>) -> impl FnOnce(ChangeError) -> Self {
        let path = path.as_ref().display().to_string();
        move |source| ChartError::Changeset {
            action,
            path,
            source,
        }
    }

    /// Whether the error stems from options rather than from the filesystem or network
    pub fn is_configuration(&self) -> bool {
        match self {
            ChartError::Configuration { .. } | ChartError::PackageOptions { .. } => true,
            ChartError::SourceFetch { source, .. } => source.is_configuration(),
            ChartError::Dependency { source, .. } => source.is_configuration(),
            _ => false,
        }
    }
}
