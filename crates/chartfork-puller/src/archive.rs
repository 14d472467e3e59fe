//! Chart archive upstream
//!
//! Downloads a `.tgz` over HTTP(S) and extracts it into the target path.

use chartfork_core::filesystem::prune_empty_dirs;
use chartfork_core::{RemoveOnDrop, UpstreamOptions, extract_tgz};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use url::Url;

use crate::error::{PullError, Result};
use crate::puller::Puller;

/// File name, relative to the package, the archive is downloaded to
pub const CHART_ARCHIVE_FILE: &str = "chart.tgz";

/// A URL pointing to a `.tgz` chart archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveSource {
    /// Download link for the archive
    pub url: String,
    /// Directory within the archive to treat as the chart root
    pub subdirectory: Option<String>,
}

impl ArchiveSource {
    /// Create from upstream options; the URL must be an http(s) link to a tarball
    pub fn from_options(options: &UpstreamOptions) -> Result<Self> {
        let url = options.url.trim();
        let parsed = Url::parse(url).map_err(|e| PullError::invalid_url(url, e.to_string()))?;

        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(PullError::invalid_url(
                url,
                "archives can only be downloaded over http(s)",
            ));
        }
        let path = parsed.path();
        if !(path.ends_with(".tgz") || path.ends_with(".tar.gz")) {
            return Err(PullError::invalid_url(
                url,
                "URL does not seem to point to a .tgz archive",
            ));
        }

        Ok(Self {
            url: url.to_string(),
            subdirectory: options.subdirectory.clone(),
        })
    }
}

impl Puller for ArchiveSource {
    fn pull(&self, _root: &Path, pkg: &Path, path: &Path) -> Result<()> {
        info!("Pulling {} from upstream into {}", self, path.display());

        let archive = RemoveOnDrop::new(pkg.join(CHART_ARCHIVE_FILE));
        download_archive(&self.url, archive.path())?;

        let dest = pkg.join(path);
        std::fs::create_dir_all(&dest)?;
        let _prune = PruneOnDrop(dest.clone());

        let subdirectory = self.subdirectory.as_deref().unwrap_or_default();
        extract_tgz(archive.path(), subdirectory, &dest)?;

        Ok(())
    }

    fn options(&self) -> UpstreamOptions {
        UpstreamOptions {
            url: self.url.clone(),
            subdirectory: self.subdirectory.clone(),
            ..Default::default()
        }
    }

    fn is_within_package(&self) -> bool {
        false
    }
}

impl fmt::Display for ArchiveSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.url)?;
        if let Some(subdirectory) = &self.subdirectory {
            write!(f, "[path={}]", subdirectory)?;
        }
        Ok(())
    }
}

/// Prunes empty directories under a path when dropped
struct PruneOnDrop(PathBuf);

impl Drop for PruneOnDrop {
    fn drop(&mut self) {
        if let Err(e) = prune_empty_dirs(&self.0) {
            tracing::warn!("Failed to prune empty directories in {}: {}", self.0.display(), e);
        }
    }
}

/// Download `url` to `dest`
pub fn download_archive(url: &str, dest: &Path) -> Result<()> {
    debug!("Downloading {} to {}", url, dest.display());

    let client = reqwest::blocking::Client::builder()
        .user_agent(concat!("chartfork/", env!("CARGO_PKG_VERSION")))
        .build()?;
    let response = client.get(url).send()?;

    let status = response.status();
    if !status.is_success() {
        return Err(PullError::HttpError {
            status: status.as_u16(),
            message: format!("GET {} returned {}", url, status),
        });
    }

    let data = response.bytes()?;
    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(dest, &data)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chartfork_core::create_chart_archive;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn archive_bytes() -> Vec<u8> {
        let temp = TempDir::new().unwrap();
        let chart = temp.path().join("chart");
        std::fs::create_dir_all(chart.join("templates")).unwrap();
        std::fs::create_dir_all(chart.join("crds")).unwrap();
        std::fs::write(chart.join("Chart.yaml"), "name: widget\nversion: 1.0.0\n").unwrap();
        std::fs::write(chart.join("templates/service.yaml"), "kind: Service\n").unwrap();
        std::fs::write(chart.join("crds/widget.yaml"), "kind: CustomResourceDefinition\n").unwrap();

        let output = temp.path().join("widget.tgz");
        create_chart_archive(&chart, "widget", &output).unwrap();
        std::fs::read(output).unwrap()
    }

    fn source(url: String, subdirectory: Option<&str>) -> ArchiveSource {
        ArchiveSource::from_options(&UpstreamOptions {
            url,
            subdirectory: subdirectory.map(String::from),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_from_options_validates_url() {
        let ok = |url: &str| {
            ArchiveSource::from_options(&UpstreamOptions {
                url: url.to_string(),
                ..Default::default()
            })
        };
        assert!(ok("https://example.com/charts/widget-1.0.0.tgz").is_ok());
        assert!(ok("http://example.com/widget.tar.gz?raw=true").is_ok());
        assert!(ok("https://example.com/widget.zip").is_err());
        assert!(ok("file:///tmp/widget.tgz").is_err());
        assert!(ok("not a url").is_err());
    }

    #[test]
    fn test_options_keep_subdirectory() {
        let source = source("https://example.com/widget.tgz".to_string(), Some("templates"));
        let options = source.options();
        assert_eq!(options.url, "https://example.com/widget.tgz");
        assert_eq!(options.subdirectory.as_deref(), Some("templates"));
        assert_eq!(source.to_string(), "https://example.com/widget.tgz[path=templates]");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_pull_extracts_and_cleans_up() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/widget-1.0.0.tgz"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(archive_bytes()))
            .mount(&server)
            .await;

        let temp = TempDir::new().unwrap();
        let pkg = temp.path().to_path_buf();
        let source = source(format!("{}/widget-1.0.0.tgz", server.uri()), None);

        let pkg_clone = pkg.clone();
        tokio::task::spawn_blocking(move || source.pull(&pkg_clone, &pkg_clone, Path::new("charts")))
            .await
            .unwrap()
            .unwrap();

        assert!(pkg.join("charts/Chart.yaml").exists());
        assert!(pkg.join("charts/templates/service.yaml").exists());
        assert!(!pkg.join(CHART_ARCHIVE_FILE).exists());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_pull_with_subdirectory() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/widget.tgz"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(archive_bytes()))
            .mount(&server)
            .await;

        let temp = TempDir::new().unwrap();
        let pkg = temp.path().to_path_buf();
        let source = source(format!("{}/widget.tgz", server.uri()), Some("crds"));

        let pkg_clone = pkg.clone();
        tokio::task::spawn_blocking(move || source.pull(&pkg_clone, &pkg_clone, Path::new("charts-crd")))
            .await
            .unwrap()
            .unwrap();

        assert!(pkg.join("charts-crd/widget.yaml").exists());
        assert!(!pkg.join("charts-crd/Chart.yaml").exists());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_pull_corrupt_archive_leaves_no_garbage() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/widget.tgz"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"not a tarball".to_vec()))
            .mount(&server)
            .await;

        let temp = TempDir::new().unwrap();
        let pkg = temp.path().to_path_buf();
        let source = source(format!("{}/widget.tgz", server.uri()), None);

        let pkg_clone = pkg.clone();
        let result = tokio::task::spawn_blocking(move || {
            source.pull(&pkg_clone, &pkg_clone, Path::new("charts"))
        })
        .await
        .unwrap();

        assert!(result.is_err());
        assert!(!pkg.join(CHART_ARCHIVE_FILE).exists());
        assert!(!pkg.join("charts").exists());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_download_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let temp = TempDir::new().unwrap();
        let dest = temp.path().join(CHART_ARCHIVE_FILE);
        let url = format!("{}/missing.tgz", server.uri());

        let result = tokio::task::spawn_blocking(move || download_archive(&url, &dest))
            .await
            .unwrap();

        assert!(matches!(result, Err(PullError::HttpError { status: 404, .. })));
    }
}
