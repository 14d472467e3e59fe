//! Unified upstream trait
//!
//! Provides a single interface for all upstream kinds (Git, archive, local)

use chartfork_core::UpstreamOptions;
use std::fmt;
use std::path::Path;

use crate::archive::ArchiveSource;
use crate::error::{PullError, Result};
use crate::github::GithubRepository;
use crate::local::{LOCAL_URL, LocalSource};

/// Something able to place a chart at a path inside a package
pub trait Puller: fmt::Debug + fmt::Display + Send + Sync {
    /// Materialize the chart at `pkg/path`
    ///
    /// `root` is the repository root, `pkg` the package directory and
    /// `path` is relative to `pkg`.
    fn pull(&self, root: &Path, pkg: &Path, path: &Path) -> Result<()>;

    /// Normalized options describing this upstream
    fn options(&self) -> UpstreamOptions;

    /// Whether the chart already lives inside the package
    fn is_within_package(&self) -> bool;
}

/// Create an upstream from options, dispatching on the URL shape
///
/// - `local`: the chart is kept inside the package
/// - `*.git`: a GitHub repository
/// - `http(s)://…/*.tgz` or `*.tar.gz`: a chart archive
pub fn from_options(options: &UpstreamOptions) -> Result<Box<dyn Puller>> {
    let url = options.url.trim();

    if url.is_empty() {
        return Err(PullError::invalid_url(url, "no upstream URL provided"));
    }
    if url == LOCAL_URL {
        return Ok(Box::new(LocalSource::new()));
    }
    if url.ends_with(".git") {
        return Ok(Box::new(GithubRepository::from_options(options)?));
    }
    if url.starts_with("http://") || url.starts_with("https://") {
        return Ok(Box::new(ArchiveSource::from_options(options)?));
    }

    Err(PullError::invalid_url(
        url,
        "expected a Git repository (*.git), a chart archive (*.tgz) or 'local'",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(url: &str) -> UpstreamOptions {
        UpstreamOptions {
            url: url.to_string(),
            commit: Some("abc123".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_dispatch_git() {
        let puller = from_options(&options("https://github.com/acme/widget.git")).unwrap();
        assert!(!puller.is_within_package());
        assert_eq!(puller.to_string(), "acme/widget@abc123");
        assert_eq!(puller.options().url, "https://github.com/acme/widget.git");
    }

    #[test]
    fn test_dispatch_archive() {
        let puller = from_options(&options("https://example.com/widget-1.0.0.tgz")).unwrap();
        assert!(!puller.is_within_package());
        assert_eq!(puller.to_string(), "https://example.com/widget-1.0.0.tgz");
    }

    #[test]
    fn test_dispatch_local() {
        let puller = from_options(&options("local")).unwrap();
        assert!(puller.is_within_package());
    }

    #[test]
    fn test_dispatch_rejects_unknown_urls() {
        for url in ["", "ftp://example.com/widget", "https://example.com/widget.zip"] {
            let err = from_options(&options(url)).unwrap_err();
            assert!(err.is_configuration(), "{url} should be rejected, got {err}");
        }
    }
}
