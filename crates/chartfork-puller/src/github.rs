//! GitHub repository upstream
//!
//! Charts are cloned over HTTPS with libgit2, pinned to a commit (or a branch
//! head), stripped of their `.git` directory and optionally narrowed to a
//! subdirectory.

use chartfork_core::UpstreamOptions;
use chartfork_core::filesystem::{make_subdirectory_root, remove_all};
use git2::build::{CheckoutBuilder, RepoBuilder};
use git2::{FetchOptions, Repository};
use std::fmt;
use std::path::Path;
use tracing::{debug, info};
use url::Url;

use crate::error::{PullError, Result};
use crate::puller::Puller;

const HTTPS_URL_FMT_PREFIX: &str = "https://github.com";

/// A repository hosted on GitHub
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GithubRepository {
    /// Directory within the repository to treat as the chart root
    pub subdirectory: Option<String>,
    /// Commit to check out after cloning
    pub commit: Option<String>,
    /// Account owning the repository, e.g. `rancher`
    owner: String,
    /// Repository name, e.g. `charts`
    name: String,
    /// Branch to clone
    branch: Option<String>,
}

impl GithubRepository {
    /// Create from upstream options; the URL must end in `.git`
    pub fn from_options(options: &UpstreamOptions) -> Result<Self> {
        let url = options.url.trim();
        if !url.ends_with(".git") {
            return Err(PullError::invalid_url(
                url,
                "URL does not seem to point to a Git repository",
            ));
        }

        let (owner, name) = parse_owner_and_name(url)?;

        Ok(Self {
            subdirectory: options.subdirectory.clone(),
            commit: options.commit.clone(),
            owner,
            name,
            branch: options.branch.clone(),
        })
    }

    /// Repository owner
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Repository name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Branch to clone, if any
    pub fn branch(&self) -> Option<&str> {
        self.branch.as_deref()
    }

    /// HTTPS clone URL
    pub fn https_url(&self) -> String {
        format!("{}/{}/{}.git", HTTPS_URL_FMT_PREFIX, self.owner, self.name)
    }

    /// SSH clone URL
    pub fn ssh_url(&self) -> String {
        format!("git@github.com:{}/{}.git", self.owner, self.name)
    }

    /// Clone `remote` into `dest` and shape it into a chart directory
    fn pull_from(&self, remote: &str, dest: &Path) -> Result<()> {
        if self.commit.is_none() && self.branch.is_none() {
            return Err(PullError::MissingRef {
                repository: self.to_string(),
            });
        }

        checkout_upstream(remote, dest, self.branch.as_deref(), self.commit.as_deref())?;
        remove_all(&dest.join(".git"))?;

        if let Some(subdirectory) = self.subdirectory.as_deref().filter(|s| !s.is_empty()) {
            make_subdirectory_root(dest, subdirectory)?;
        }

        Ok(())
    }
}

impl Puller for GithubRepository {
    fn pull(&self, _root: &Path, pkg: &Path, path: &Path) -> Result<()> {
        info!("Pulling {} from upstream into {}", self, path.display());
        self.pull_from(&self.https_url(), &pkg.join(path))
    }

    fn options(&self) -> UpstreamOptions {
        UpstreamOptions {
            url: self.https_url(),
            subdirectory: self.subdirectory.clone(),
            commit: self.commit.clone(),
            branch: self.branch.clone(),
        }
    }

    fn is_within_package(&self) -> bool {
        false
    }
}

impl fmt::Display for GithubRepository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)?;
        if let Some(commit) = &self.commit {
            write!(f, "@{}", commit)?;
        }
        if let Some(subdirectory) = &self.subdirectory {
            write!(f, "[path={}]", subdirectory)?;
        }
        Ok(())
    }
}

/// Owner and name are the last two path segments of the URL
fn parse_owner_and_name(url: &str) -> Result<(String, String)> {
    let trimmed = url.trim_end_matches(".git");

    let segments: Vec<String> = match Url::parse(trimmed) {
        Ok(parsed) if parsed.has_host() => parsed
            .path_segments()
            .map(|segments| {
                segments
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default(),
        _ => {
            // scp-like syntax: git@github.com:owner/name
            let path = match trimmed.split_once(':') {
                Some((host, path)) if host.contains('@') => path,
                _ => trimmed,
            };
            path.split('/')
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        }
    };

    if segments.len() < 2 {
        return Err(PullError::invalid_url(
            url,
            "URL does not seem to be valid for a Git repository",
        ));
    }

    let name = segments[segments.len() - 1].clone();
    let owner = segments[segments.len() - 2].clone();
    Ok((owner, name))
}

/// Clone `remote` into `dest`, selecting `branch` and pinning `commit`
///
/// The branch selects what is fetched; the commit, when present, decides
/// the final state of the work tree.
pub(crate) fn checkout_upstream(
    remote: &str,
    dest: &Path,
    branch: Option<&str>,
    commit: Option<&str>,
) -> Result<Repository> {
    let mut builder = RepoBuilder::new();

    if let Some(branch) = branch {
        let branch = branch.to_string();
        builder.branch(&branch);
        builder.remote_create(move |repo, name, url| {
            let refspec = format!("+refs/heads/{0}:refs/remotes/{1}/{0}", branch, name);
            repo.remote_with_fetch(name, url, &refspec)
        });

        if commit.is_none() {
            let mut fetch = FetchOptions::new();
            fetch.depth(1);
            builder.fetch_options(fetch);
        }
    }

    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent)?;
    }

    debug!("Cloning {} into {}", remote, dest.display());
    let repo = builder.clone(remote, dest)?;

    if let Some(commit) = commit {
        debug!("Checking out {} in {}", commit, dest.display());
        let target = repo.revparse_single(commit)?.peel_to_commit()?;
        repo.checkout_tree(target.as_object(), Some(CheckoutBuilder::new().force()))?;
        repo.set_head_detached(target.id())?;
    }

    Ok(repo)
}
