// Copyright 2026 Oxide Computer Company

//! Remote URL parsing and view URL construction.

use git_file_id::{GitHash, normalize_path};
use std::fmt;

/// A Git hosting service recognized in remote URLs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HostingService {
    /// github.com
    GitHub,
    /// gitlab.com
    GitLab,
    /// bitbucket.org
    Bitbucket,
}

impl HostingService {
    const ALL: [HostingService; 3] =
        [HostingService::GitHub, HostingService::GitLab, HostingService::Bitbucket];

    /// Returns the service's host name.
    pub fn host(&self) -> &'static str {
        match self {
            HostingService::GitHub => "github.com",
            HostingService::GitLab => "gitlab.com",
            HostingService::Bitbucket => "bitbucket.org",
        }
    }

    fn from_host(host: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.host() == host)
    }
}

impl fmt::Display for HostingService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.host())
    }
}

/// The owner and name of a repository, parsed from a remote URL.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoteRepo {
    /// The hosting service.
    pub service: HostingService,
    /// The repository owner (user, organization, or group).
    pub owner: String,
    /// The repository name. May contain `/` for nested groups.
    pub repo: String,
}

impl RemoteRepo {
    /// Returns a permalink to `file_path` at `commit` on the hosting
    /// service's web UI.
    pub fn blob_url(&self, commit: &GitHash, file_path: &str) -> String {
        blob_url(self.service, &self.owner, &self.repo, commit, file_path)
    }
}

/// Parses an SSH (`git@host:owner/repo.git`) or HTTPS
/// (`https://host/owner/repo.git`) remote URL.
///
/// Only github.com, gitlab.com and bitbucket.org are recognized. The
/// `.git` suffix is optional. Returns `None` for anything else.
pub fn parse_remote_url(url: &str) -> Option<RemoteRepo> {
    let url = url.trim();
    let (host, path) = if let Some(rest) = url.strip_prefix("git@") {
        rest.split_once(':')?
    } else if let Some(rest) = url.strip_prefix("https://") {
        rest.split_once('/')?
    } else {
        return None;
    };
    let service = HostingService::from_host(host)?;

    let (owner, repo) = path.split_once('/')?;
    let repo = match repo.strip_suffix(".git") {
        Some(stripped) if !stripped.is_empty() => stripped,
        _ => repo,
    };
    if owner.is_empty() || repo.is_empty() {
        return None;
    }
    Some(RemoteRepo { service, owner: owner.to_owned(), repo: repo.to_owned() })
}

/// Builds a permalink to `file_path` at `commit` on `service`'s web UI.
///
/// ```
/// use git_file_id_backend::{HostingService, blob_url};
///
/// let commit = "abc123def456abc123def456abc123def456abc1".parse().unwrap();
/// assert_eq!(
///     blob_url(HostingService::GitHub, "octocat", "hello", &commit, "./src/a.rs"),
///     "https://github.com/octocat/hello/blob/abc123def456abc123def456abc123def456abc1/src/a.rs",
/// );
/// ```
pub fn blob_url(
    service: HostingService,
    owner: &str,
    repo: &str,
    commit: &GitHash,
    file_path: &str,
) -> String {
    let normalized = normalize_path(file_path);
    let path = normalized.trim_start_matches('/');
    match service {
        HostingService::GitHub => {
            format!("https://github.com/{owner}/{repo}/blob/{commit}/{path}")
        }
        HostingService::GitLab => {
            format!("https://gitlab.com/{owner}/{repo}/-/blob/{commit}/{path}")
        }
        HostingService::Bitbucket => {
            format!("https://bitbucket.org/{owner}/{repo}/src/{commit}/{path}")
        }
    }
}
