//! CLI error types with exit code handling
//!
//! Library errors are flattened into a [`CliError`] carrying the message,
//! an optional hint and the exit code of their category.

use chartfork_charts::ChartError;
use miette::Diagnostic;
use thiserror::Error;

use crate::exit_codes;

/// CLI-specific error type that includes exit code information
#[derive(Error, Debug, Diagnostic, Clone)]
pub enum CliError {
    /// Invalid package.yaml or chart options
    #[error("Configuration error: {message}")]
    #[diagnostic(code(chartfork::cli::configuration))]
    Configuration {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Upstream could not be pulled
    #[error("Source error: {message}")]
    #[diagnostic(code(chartfork::cli::source))]
    Source { message: String },

    /// Package is not in the state the command needs
    #[error("Package error: {message}")]
    #[diagnostic(code(chartfork::cli::package))]
    Package {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Recorded changes could not be applied or generated
    #[error("Patch error: {message}")]
    #[diagnostic(
        code(chartfork::cli::patch),
        help("Run `chartfork prepare` against the upstream and fix the conflicting file by hand, then `chartfork patch`")
    )]
    Patch { message: String },

    /// IO error (file not found, permissions, etc.)
    #[error("IO error: {message}")]
    #[diagnostic(code(chartfork::cli::io))]
    Io { message: String },

    /// Anything else
    #[error("{message}")]
    #[diagnostic(code(chartfork::cli::error))]
    Other { message: String },
}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Configuration { .. } => exit_codes::CONFIG_ERROR,
            CliError::Source { .. } => exit_codes::SOURCE_ERROR,
            CliError::Package { .. } => exit_codes::PACKAGE_ERROR,
            CliError::Patch { .. } => exit_codes::PATCH_ERROR,
            CliError::Io { .. } => exit_codes::IO_ERROR,
            CliError::Other { .. } => exit_codes::ERROR,
        }
    }

    /// Create a configuration error with help text
    pub fn configuration_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
            help: Some(help.into()),
        }
    }
}

/// Split `message\nHint: help` as rendered by library errors
fn split_hint(message: String) -> (String, Option<String>) {
    match message.split_once("\nHint: ") {
        Some((message, hint)) => (message.to_string(), Some(hint.to_string())),
        None => (message, None),
    }
}

impl From<ChartError> for CliError {
    fn from(err: ChartError) -> Self {
        let (message, help) = split_hint(err.to_string());
        if err.is_configuration() {
            return CliError::Configuration { message, help };
        }
        match err {
            ChartError::NotPrepared { .. } | ChartError::MissingCrds { .. } => {
                CliError::Package { message, help }
            }
            ChartError::SourceFetch { .. } | ChartError::Dependency { .. } => CliError::Source { message },
            ChartError::Changeset { .. } => CliError::Patch { message },
            ChartError::Io(_) | ChartError::Transform { .. } => CliError::Io { message },
            _ => CliError::Other { message },
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::Io {
            message: err.to_string(),
        }
    }
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
