// Copyright 2026 Oxide Computer Company

//! Reading file metadata from a local Git working copy.

use crate::{EnvError, env::read_env_or, parse_remote_url};
use camino::{Utf8Path, Utf8PathBuf};
use fs_err::tokio as fs;
use git_file_id::{
    GitHash, IdentifyError, MetadataSource, RawMetadata, is_valid_hash,
    resolve_relative,
};
use std::{io, process::Stdio, time::Duration};
use tokio::process::Command;
use tracing::debug;

/// The default timeout for a git command.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

/// The timeout for the repository-root probe.
pub const ROOT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Reads file metadata by running the `git` command line.
///
/// Use [`LocalGit::from_env`] to honor `$GIT`, or
/// [`LocalGit::with_binary`] to name the executable directly.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LocalGit {
    binary: String,
    timeout: Duration,
}

impl LocalGit {
    /// Creates a backend using the `$GIT` environment variable or `"git"`.
    ///
    /// Returns an error if `$GIT` is set but is not valid UTF-8.
    pub fn from_env() -> Result<Self, EnvError> {
        Ok(Self::with_binary(read_env_or("GIT", "git")?))
    }

    /// Creates a backend that runs `binary`.
    pub fn with_binary(binary: impl Into<String>) -> Self {
        LocalGit { binary: binary.into(), timeout: DEFAULT_COMMAND_TIMEOUT }
    }

    /// Sets the timeout applied to each git command.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns the path to the git binary.
    pub fn binary(&self) -> &str {
        &self.binary
    }

    /// Returns the root of the working copy containing `path`.
    pub async fn repository_root(
        &self,
        path: &Utf8Path,
    ) -> Result<Utf8PathBuf, IdentifyError> {
        let not_found =
            || IdentifyError::RepositoryNotFound { path: path.to_string() };

        // Use metadata() so that a missing path is reported as such rather
        // than as a failure to spawn git in a nonexistent directory.
        match fs::metadata(path).await {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => return Err(not_found()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(not_found());
            }
            Err(err) => {
                return Err(IdentifyError::CommandExecutionFailed {
                    command: format!("stat {path}"),
                    exit_status: "not run".to_owned(),
                    exit_code: None,
                    stderr: err.to_string(),
                });
            }
        }

        let output = self
            .run(path, &["rev-parse", "--show-toplevel"], ROOT_PROBE_TIMEOUT)
            .await
            .map_err(|err| match err {
                // git ran and refused: not a work tree.
                IdentifyError::CommandExecutionFailed {
                    exit_code: Some(_), ..
                } => not_found(),
                other => other,
            })?;
        if output.is_empty() {
            return Err(not_found());
        }
        Ok(Utf8PathBuf::from(output))
    }

    /// Returns true if `file_path` (relative to `root`) is tracked.
    pub async fn is_tracked(
        &self,
        root: &Utf8Path,
        file_path: &str,
    ) -> Result<bool, IdentifyError> {
        let result = self
            .run(
                root,
                &["ls-files", "--error-unmatch", "--", file_path],
                self.timeout,
            )
            .await;
        match result {
            Ok(output) => Ok(!output.is_empty()),
            Err(IdentifyError::CommandExecutionFailed {
                exit_code: Some(_), ..
            }) => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Reads the metadata of `file_path` in the working copy containing
    /// `repo_path`.
    ///
    /// `file_path` may be relative to the repository root, or absolute.
    pub async fn fetch(
        &self,
        repo_path: &Utf8Path,
        file_path: &str,
    ) -> Result<RawMetadata, IdentifyError> {
        let root = self.repository_root(repo_path).await?;
        let relative = if Utf8Path::new(file_path).is_absolute() {
            // git reports the root with symlinks resolved, so an absolute
            // path reached through a symlink must be resolved too.
            // The final component is kept as is: a tracked symlink is
            // identified as itself, not as its target.
            let path = Utf8Path::new(file_path);
            let file = match (path.parent(), path.file_name()) {
                (Some(parent), Some(name)) => canonical_or_lexical(parent).await.join(name),
                _ => path.to_owned(),
            };
            resolve_relative(&canonical_or_lexical(&root).await, file.as_str())
        } else {
            resolve_relative(&root, file_path)
        };

        if !self.is_tracked(&root, &relative).await? {
            return Err(IdentifyError::FileNotFound {
                file_path: relative,
                reason: "not tracked by Git".to_owned(),
            });
        }

        // One log call, so the hash and the date describe the same commit.
        let log = self
            .run_git(&root, &["log", "-1", "--pretty=format:%H%n%cI", "--", &relative])
            .await?;
        let Some((commit_hash, last_modified)) = parse_log_output(&log) else {
            return Err(IdentifyError::FileNotFound {
                file_path: relative,
                reason: "no commits touch the file".to_owned(),
            });
        };
        let branch = self
            .run_git(&root, &["rev-parse", "--abbrev-ref", "HEAD"])
            .await?;

        let ls_tree = self
            .run_git(&root, &["ls-tree", "HEAD", "--", &relative])
            .await?;
        let Some(file_hash) = ls_tree.lines().find_map(parse_ls_tree_line) else {
            return Err(IdentifyError::FileNotFound {
                file_path: relative,
                reason: "not a blob at HEAD".to_owned(),
            });
        };

        let (owner, repo, html_url) = self.repo_identity(&root, &commit_hash, &relative).await;

        Ok(RawMetadata {
            source: Some(MetadataSource::LocalGit.to_string()),
            owner: Some(owner),
            repo: Some(repo),
            branch: Some(branch),
            commit_hash: Some(commit_hash),
            file_hash: Some(file_hash.to_string()),
            file_path: Some(relative),
            last_modified: Some(last_modified),
            html_url,
            repo_path: Some(root.into_string()),
        })
    }

    /// Resolves the owner and repository name from the `origin` remote,
    /// falling back to `git config user.name` (or `unknown`) and the root
    /// directory's name. Also returns a view URL when the remote names a
    /// known hosting service.
    async fn repo_identity(
        &self,
        root: &Utf8Path,
        commit_hash: &str,
        file_path: &str,
    ) -> (String, String, Option<String>) {
        let remote = self
            .run_git(root, &["remote", "get-url", "origin"])
            .await
            .ok()
            .and_then(|url| parse_remote_url(&url));
        if let Some(remote) = remote {
            let html_url = commit_hash
                .parse::<GitHash>()
                .ok()
                .map(|commit| remote.blob_url(&commit, file_path));
            return (remote.owner, remote.repo, html_url);
        }

        let repo = root.file_name().unwrap_or(root.as_str()).to_owned();
        let owner = match self.run_git(root, &["config", "user.name"]).await {
            Ok(name) if !name.is_empty() => name,
            _ => "unknown".to_owned(),
        };
        (owner, repo, None)
    }

    async fn run_git(
        &self,
        cwd: &Utf8Path,
        args: &[&str],
    ) -> Result<String, IdentifyError> {
        self.run(cwd, args, self.timeout).await
    }

    /// Runs git in `cwd` and returns its trimmed standard output.
    ///
    /// Standard error mentioning "not a git repository" is reported as
    /// [`IdentifyError::RepositoryNotFound`]; every other failure,
    /// including a timeout, as [`IdentifyError::CommandExecutionFailed`].
    async fn run(
        &self,
        cwd: &Utf8Path,
        args: &[&str],
        timeout: Duration,
    ) -> Result<String, IdentifyError> {
        let command = format!("{} {}", self.binary, args.join(" "));
        debug!(command = %command, cwd = %cwd, "running git");

        let mut cmd = Command::new(&self.binary);
        cmd.current_dir(cwd)
            .args(args)
            .env("LC_ALL", "C")
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let output = match tokio::time::timeout(timeout, cmd.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(err)) => {
                return Err(IdentifyError::CommandExecutionFailed {
                    command,
                    exit_status: format!("failed to spawn {:?}", self.binary),
                    exit_code: None,
                    stderr: err.to_string(),
                });
            }
            Err(_) => {
                return Err(IdentifyError::CommandExecutionFailed {
                    command,
                    exit_status: format!("timed out after {}s", timeout.as_secs()),
                    exit_code: None,
                    stderr: String::new(),
                });
            }
        };

        if output.status.success() {
            return Ok(String::from_utf8_lossy(&output.stdout).trim().to_owned());
        }

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_owned();
        if stderr.to_lowercase().contains("not a git repository") {
            return Err(IdentifyError::RepositoryNotFound { path: cwd.to_string() });
        }
        Err(IdentifyError::CommandExecutionFailed {
            command,
            exit_status: output.status.to_string(),
            exit_code: output.status.code(),
            stderr,
        })
    }
}

/// Resolves symlinks in `path`, or returns it unchanged if that fails
/// (for instance because the path does not exist).
async fn canonical_or_lexical(path: &Utf8Path) -> Utf8PathBuf {
    match fs::canonicalize(path).await {
        Ok(resolved) => {
            Utf8PathBuf::from_path_buf(resolved).unwrap_or_else(|_| path.to_owned())
        }
        Err(_) => path.to_owned(),
    }
}

/// Splits `git log --pretty=format:%H%n%cI` output into the commit hash
/// and the committer date. Returns `None` if no commit was printed.
fn parse_log_output(output: &str) -> Option<(String, String)> {
    let (hash, date) = output.split_once('\n')?;
    let (hash, date) = (hash.trim(), date.trim());
    if hash.is_empty() || date.is_empty() {
        return None;
    }
    Some((hash.to_owned(), date.to_owned()))
}

/// Parses the blob hash out of one line of `git ls-tree` output, in the
/// format `<mode> blob <hash>\t<path>`.
fn parse_ls_tree_line(line: &str) -> Option<GitHash> {
    let (info, _path) = line.split_once('\t')?;
    let mut fields = info.split(' ');
    let mode = fields.next()?;
    let kind = fields.next()?;
    let hash = fields.next()?;
    if fields.next().is_some()
        || mode.is_empty()
        || !mode.bytes().all(|b| b.is_ascii_digit())
        || kind != "blob"
        || !is_valid_hash(hash)
    {
        return None;
    }
    hash.parse().ok()
}
