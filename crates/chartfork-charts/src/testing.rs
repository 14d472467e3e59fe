//! Upstream doubles and fixtures shared by the lifecycle tests

use chartfork_core::UpstreamOptions;
use chartfork_core::filesystem::{copy_dir, list_files};
use chartfork_puller::{PullError, Puller};
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

pub(crate) const WIDGET_CRD: &str = r#"apiVersion: apiextensions.k8s.io/v1
kind: CustomResourceDefinition
metadata:
  name: widgets.acme.io
spec:
  group: acme.io
  names:
    kind: Widget
    plural: widgets
  scope: Namespaced
  versions:
    - name: v1
      served: true
      storage: true
"#;

/// Copies a directory prepared by the test
#[derive(Debug)]
pub(crate) struct FixturePuller {
    pub source: PathBuf,
}

impl Puller for FixturePuller {
    fn pull(&self, _root: &Path, pkg: &Path, path: &Path) -> chartfork_puller::Result<()> {
        copy_dir(&self.source, &pkg.join(path))?;
        Ok(())
    }

    fn options(&self) -> UpstreamOptions {
        UpstreamOptions {
            url: format!("file://{}", self.source.display()),
            ..Default::default()
        }
    }

    fn is_within_package(&self) -> bool {
        false
    }
}

impl fmt::Display for FixturePuller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fixture:{}", self.source.display())
    }
}

/// Leaves a partial download behind, then fails
#[derive(Debug)]
pub(crate) struct FailingPuller;

impl Puller for FailingPuller {
    fn pull(&self, _root: &Path, pkg: &Path, path: &Path) -> chartfork_puller::Result<()> {
        let dest = pkg.join(path);
        std::fs::create_dir_all(&dest)?;
        std::fs::write(dest.join("Chart.yaml"), "name: partial\n")?;
        Err(PullError::NetworkError {
            message: "connection reset by peer".to_string(),
        })
    }

    fn options(&self) -> UpstreamOptions {
        UpstreamOptions {
            url: "https://example.com/unreachable.tgz".to_string(),
            ..Default::default()
        }
    }

    fn is_within_package(&self) -> bool {
        false
    }
}

impl fmt::Display for FailingPuller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("unreachable")
    }
}

pub(crate) fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

/// Every file under `dir` with its content
pub(crate) fn snapshot(dir: &Path) -> Vec<(PathBuf, Vec<u8>)> {
    list_files(dir)
        .unwrap()
        .into_iter()
        .map(|rel| {
            let content = std::fs::read(dir.join(&rel)).unwrap();
            (rel, content)
        })
        .collect()
}

/// A small upstream chart carrying one CRD
pub(crate) fn upstream_chart(dir: &Path) {
    write(dir, "Chart.yaml", "apiVersion: v2\nname: widget\nversion: 1.2.3\n");
    write(dir, "values.yaml", "replicas: 1\nimage:\n  repository: acme/widget\n  tag: latest\n");
    write(dir, "templates/deployment.yaml", "kind: Deployment\nmetadata:\n  name: widget\n");
    write(dir, "templates/NOTES.txt", "Thanks for installing widget\n");
    write(dir, "crds/widget.yaml", WIDGET_CRD);
}

/// Log output collected by [`capture_logs`]
#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Run `f` and return its result with the warnings it logged
pub(crate) fn capture_logs<T>(f: impl FnOnce() -> T) -> (T, String) {
    let logs = CapturedLogs::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::WARN)
        .finish();

    let result = tracing::subscriber::with_default(subscriber, f);
    let output = String::from_utf8_lossy(&logs.0.lock().unwrap()).to_string();
    (result, output)
}
