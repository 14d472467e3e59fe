//! Error types for pulling upstream charts

use chartfork_core::CoreError;
use thiserror::Error;

/// Upstream pull errors
#[derive(Debug, Error)]
pub enum PullError {
    // ============ Configuration Errors ============
    #[error("Invalid upstream URL: {url} - {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error(
        "A commit or branch is required to pull {repository}; set commit or chartRepoBranch in package.yaml"
    )]
    MissingRef { repository: String },

    // ============ Source Errors ============
    #[error("Git error: {0}")]
    Git(#[from] git2::Error),

    #[error("HTTP error: {status} - {message}")]
    HttpError { status: u16, message: String },

    #[error("Network error: {message}")]
    NetworkError { message: String },

    #[error("Local chart not found at {path}")]
    LocalNotFound { path: String },

    // ============ IO Errors ============
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PullError {
    /// Whether this error comes from the upstream configuration rather than the fetch
    pub fn is_configuration(&self) -> bool {
        matches!(self, PullError::InvalidUrl { .. } | PullError::MissingRef { .. })
    }

    pub(crate) fn invalid_url(url: &str, reason: impl Into<String>) -> Self {
        PullError::InvalidUrl {
            url: url.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type for pull operations
pub type Result<T> = std::result::Result<T, PullError>;

impl From<reqwest::Error> for PullError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_connect() {
            PullError::NetworkError {
                message: format!("Connection failed: {}", e),
            }
        } else if let Some(status) = e.status() {
            PullError::HttpError {
                status: status.as_u16(),
                message: e.to_string(),
            }
        } else {
            PullError::NetworkError {
                message: e.to_string(),
            }
        }
    }
}
