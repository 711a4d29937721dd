// Copyright 2026 Oxide Computer Company

//! Reading file metadata from the GitHub REST API.

use crate::{EnvError, HostingService, blob_url, env::read_env};
use git_file_id::{GitHash, IdentifyError, MetadataSource, RawMetadata, normalize_path};
use reqwest::{StatusCode, Url, header::HeaderMap};
use serde_json::Value;
use std::{fmt, time::Duration};
use tracing::debug;

/// The public GitHub API.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// The default timeout for one HTTP request.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

const USER_AGENT: &str = concat!("git-file-id/", env!("CARGO_PKG_VERSION"));
const ACCEPT: &str = "application/vnd.github.v3+json";

/// Configuration for [`GitHubClient`].
#[derive(Clone)]
pub struct GitHubConfig {
    /// The API base URL, e.g. `https://api.github.com` or a GitHub
    /// Enterprise `https://host/api/v3`.
    pub api_url: String,
    /// A personal access token. Unauthenticated requests are subject to a
    /// much lower rate limit.
    pub token: Option<String>,
    /// The timeout for each request.
    pub timeout: Duration,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        GitHubConfig {
            api_url: DEFAULT_API_URL.to_owned(),
            token: None,
            timeout: DEFAULT_HTTP_TIMEOUT,
        }
    }
}

impl GitHubConfig {
    /// Reads `$GITHUB_API_URL` and `$GITHUB_TOKEN`, using defaults for
    /// whichever is unset.
    pub fn from_env() -> Result<Self, EnvError> {
        Ok(GitHubConfig {
            api_url: read_env("GITHUB_API_URL")?
                .unwrap_or_else(|| DEFAULT_API_URL.to_owned()),
            token: read_env("GITHUB_TOKEN")?,
            timeout: DEFAULT_HTTP_TIMEOUT,
        })
    }

    /// Replaces the token if `token` is `Some`.
    pub fn with_token(mut self, token: Option<String>) -> Self {
        if token.is_some() {
            self.token = token;
        }
        self
    }
}

impl fmt::Debug for GitHubConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GitHubConfig")
            .field("api_url", &self.api_url)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Which API endpoint a request went to. Error classification depends on
/// it: a 404 from the contents endpoint means the repository is missing,
/// while a 404 from the commits endpoint means the file is.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Endpoint {
    Contents,
    Commits,
}

/// A client for the parts of the GitHub REST API needed to identify files.
#[derive(Clone)]
pub struct GitHubClient {
    client: reqwest::Client,
    base_url: Url,
    token: Option<String>,
}

impl fmt::Debug for GitHubClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GitHubClient")
            .field("base_url", &self.base_url.as_str())
            .field("authenticated", &self.token.is_some())
            .finish()
    }
}

impl GitHubClient {
    /// Creates a client from `config`.
    pub fn new(config: GitHubConfig) -> Result<Self, EnvError> {
        let base_url = Url::parse(&config.api_url).map_err(|err| {
            EnvError::InvalidBaseUrl { url: config.api_url.clone(), message: err.to_string() }
        })?;
        if base_url.cannot_be_a_base() {
            return Err(EnvError::InvalidBaseUrl {
                url: config.api_url,
                message: "not a hierarchical URL".to_owned(),
            });
        }

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(EnvError::HttpClient)?;
        Ok(GitHubClient { client, base_url, token: config.token })
    }

    /// Creates a client configured from the environment. See
    /// [`GitHubConfig::from_env`].
    pub fn from_env() -> Result<Self, EnvError> {
        Self::new(GitHubConfig::from_env()?)
    }

    /// Returns true if requests carry a token.
    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    /// Reads the metadata of `file_path` on `branch` of `owner/repo`.
    ///
    /// Makes two requests: the contents endpoint for the blob hash, then
    /// the commits endpoint for the latest commit touching the file.
    pub async fn fetch(
        &self,
        owner: &str,
        repo: &str,
        file_path: &str,
        branch: &str,
    ) -> Result<RawMetadata, IdentifyError> {
        let path = normalize_path(file_path);
        let target = Target { owner, repo, file_path };

        let contents_url = self.contents_url(owner, repo, &path, branch);
        let contents = self.get_json(contents_url, Endpoint::Contents, &target).await?;
        let file_hash = parse_contents(&contents, file_path)?;

        let commits_url = self.commits_url(owner, repo, &path, branch);
        let commits = self.get_json(commits_url, Endpoint::Commits, &target).await?;
        let (commit_hash, last_modified) = parse_latest_commit(&commits, file_path)?;

        let html_url = commit_hash
            .parse::<GitHash>()
            .ok()
            .map(|commit| blob_url(HostingService::GitHub, owner, repo, &commit, &path));

        Ok(RawMetadata {
            source: Some(MetadataSource::GithubApi.to_string()),
            owner: Some(owner.to_owned()),
            repo: Some(repo.to_owned()),
            branch: Some(branch.to_owned()),
            commit_hash: Some(commit_hash),
            file_hash: Some(file_hash),
            file_path: Some(path),
            last_modified: Some(last_modified),
            html_url,
            repo_path: None,
        })
    }

    /// `/repos/{owner}/{repo}/contents/{path}?ref={branch}`
    fn contents_url(&self, owner: &str, repo: &str, path: &str, branch: &str) -> Url {
        let mut url = self.endpoint(["repos", owner, repo, "contents"]);
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.extend(path.split('/').filter(|s| !s.is_empty()));
        }
        url.query_pairs_mut().append_pair("ref", branch);
        url
    }

    /// `/repos/{owner}/{repo}/commits?path={path}&sha={branch}&per_page=1`
    fn commits_url(&self, owner: &str, repo: &str, path: &str, branch: &str) -> Url {
        let mut url = self.endpoint(["repos", owner, repo, "commits"]);
        url.query_pairs_mut()
            .append_pair("path", path)
            .append_pair("sha", branch)
            .append_pair("per_page", "1");
        url
    }

    fn endpoint<'a>(&self, segments: impl IntoIterator<Item = &'a str>) -> Url {
        let mut url = self.base_url.clone();
        // The base URL was checked to be hierarchical in `new`.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn get_json(
        &self,
        url: Url,
        endpoint: Endpoint,
        target: &Target<'_>,
    ) -> Result<Value, IdentifyError> {
        debug!(url = %url, "GitHub API request");
        let network_error = |err: reqwest::Error| IdentifyError::NetworkError {
            url: url.to_string(),
            message: err.to_string(),
        };

        let mut request = self.client.get(url.clone()).header(reqwest::header::ACCEPT, ACCEPT);
        if let Some(token) = &self.token {
            request = request.header(reqwest::header::AUTHORIZATION, format!("token {token}"));
        }
        let response = request.send().await.map_err(network_error)?;
        let status = response.status();
        let rate_limit = RateLimit::from_headers(response.headers());
        let body = response.text().await.map_err(network_error)?;
        debug!(url = %url, status = status.as_u16(), "GitHub API response");

        if !status.is_success() {
            return Err(classify_failure(endpoint, status, rate_limit, &body, url.as_str(), target));
        }
        serde_json::from_str(&body).map_err(|err| IdentifyError::ParseError {
            what: format!("GitHub API response from {url}"),
            message: err.to_string(),
        })
    }
}

/// What a request was for, used to fill in errors.
struct Target<'a> {
    owner: &'a str,
    repo: &'a str,
    file_path: &'a str,
}

/// The `X-RateLimit-*` response headers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct RateLimit {
    remaining: Option<u64>,
    reset: Option<i64>,
}

impl RateLimit {
    fn from_headers(headers: &HeaderMap) -> Self {
        let get = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(|s| s.trim().to_owned())
        };
        RateLimit {
            remaining: get("x-ratelimit-remaining").and_then(|s| s.parse().ok()),
            reset: get("x-ratelimit-reset").and_then(|s| s.parse().ok()),
        }
    }
}

/// Maps an unsuccessful response to an error.
fn classify_failure(
    endpoint: Endpoint,
    status: StatusCode,
    rate_limit: RateLimit,
    body: &str,
    url: &str,
    target: &Target<'_>,
) -> IdentifyError {
    let message = error_message(status, body);
    match status.as_u16() {
        404 => match endpoint {
            Endpoint::Contents => IdentifyError::RepositoryNotFound {
                path: format!("{}/{}", target.owner, target.repo),
            },
            Endpoint::Commits => IdentifyError::FileNotFound {
                file_path: target.file_path.to_owned(),
                reason: "not found on GitHub".to_owned(),
            },
        },
        401 | 403 | 429 => {
            let rate_limited = status == StatusCode::TOO_MANY_REQUESTS
                || rate_limit.remaining == Some(0)
                || message.to_lowercase().contains("rate limit");
            if rate_limited {
                IdentifyError::RateLimitExceeded {
                    reset_time: rate_limit.reset,
                    remaining: rate_limit.remaining.unwrap_or(0),
                }
            } else {
                IdentifyError::AuthenticationFailed { status: status.as_u16() }
            }
        }
        code => IdentifyError::ApiError { status: code, url: url.to_owned(), message },
    }
}

/// Returns GitHub's `message` field if the body has one, else the body
/// itself, else the status's reason phrase.
fn error_message(status: StatusCode, body: &str) -> String {
    let from_json = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_owned));
    match from_json {
        Some(message) => message,
        None if !body.trim().is_empty() => body.trim().to_owned(),
        None => status.canonical_reason().unwrap_or("unknown error").to_owned(),
    }
}

/// Extracts the blob hash from a contents response.
fn parse_contents(value: &Value, file_path: &str) -> Result<String, IdentifyError> {
    let kind = value.get("type").and_then(Value::as_str);
    if kind != Some("file") {
        return Err(IdentifyError::FileNotFound {
            file_path: file_path.to_owned(),
            reason: match kind {
                Some(kind) => format!("path is a {kind}, not a file"),
                None => "path is not a file".to_owned(),
            },
        });
    }
    value
        .get("sha")
        .and_then(Value::as_str)
        .map(str::to_owned)
        .ok_or_else(|| IdentifyError::ParseError {
            what: "GitHub contents response".to_owned(),
            message: "missing \"sha\"".to_owned(),
        })
}

/// Extracts the commit hash and committer date of the first entry of a
/// commits response.
fn parse_latest_commit(
    value: &Value,
    file_path: &str,
) -> Result<(String, String), IdentifyError> {
    let parse_error = |message: &str| IdentifyError::ParseError {
        what: "GitHub commits response".to_owned(),
        message: message.to_owned(),
    };
    let commits = value.as_array().ok_or_else(|| parse_error("expected an array"))?;
    let Some(latest) = commits.first() else {
        return Err(IdentifyError::FileNotFound {
            file_path: file_path.to_owned(),
            reason: "no commits touch the file".to_owned(),
        });
    };
    let sha = latest
        .get("sha")
        .and_then(Value::as_str)
        .ok_or_else(|| parse_error("missing \"sha\""))?;
    let date = latest
        .pointer("/commit/committer/date")
        .and_then(Value::as_str)
        .ok_or_else(|| parse_error("missing \"commit.committer.date\""))?;
    Ok((sha.to_owned(), date.to_owned()))
}
