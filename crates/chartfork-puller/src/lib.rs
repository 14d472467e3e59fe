//! chartfork upstream sources
//!
//! This crate pulls charts from their upstream into a package:
//!
//! - **GitHub repositories**: cloned with libgit2 at a pinned commit or branch
//! - **Chart archives**: `.tgz` files downloaded over HTTP(S)
//! - **Local charts**: charts that already live inside the package
//!
//! ## Example
//!
//! ```rust,no_run
//! use chartfork_core::UpstreamOptions;
//! use chartfork_puller::from_options;
//! use std::path::Path;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let upstream = from_options(&UpstreamOptions {
//!     url: "https://github.com/acme/widget.git".to_string(),
//!     commit: Some("0a1b2c3".to_string()),
//!     ..Default::default()
//! })?;
//!
//! upstream.pull(Path::new("."), Path::new("packages/widget"), Path::new("charts"))?;
//! # Ok(())
//! # }
//! ```

pub mod archive;
pub mod error;
pub mod github;
pub mod local;
pub mod puller;

// Re-exports for convenience
pub use archive::{ArchiveSource, CHART_ARCHIVE_FILE, download_archive};
pub use error::{PullError, Result};
pub use github::GithubRepository;
pub use local::{LOCAL_URL, LocalSource};
pub use puller::{Puller, from_options};
