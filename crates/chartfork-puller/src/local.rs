//! In-package upstream
//!
//! Some packages keep the chart itself inside the package; there is nothing
//! to fetch and nothing to patch.

use chartfork_core::UpstreamOptions;
use chartfork_core::filesystem::path_exists;
use std::fmt;
use std::path::Path;

use crate::error::{PullError, Result};
use crate::puller::Puller;

/// URL marking a chart that already lives inside its package
pub const LOCAL_URL: &str = "local";

/// A chart kept inside its package
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalSource;

impl LocalSource {
    pub fn new() -> Self {
        Self
    }
}

impl Puller for LocalSource {
    fn pull(&self, _root: &Path, pkg: &Path, path: &Path) -> Result<()> {
        let chart = pkg.join(path);
        if !path_exists(&chart)? {
            return Err(PullError::LocalNotFound {
                path: chart.display().to_string(),
            });
        }
        Ok(())
    }

    fn options(&self) -> UpstreamOptions {
        UpstreamOptions {
            url: LOCAL_URL.to_string(),
            ..Default::default()
        }
    }

    fn is_within_package(&self) -> bool {
        true
    }
}

impl fmt::Display for LocalSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(LOCAL_URL)
    }
}
