// Copyright 2026 Oxide Computer Company

//! Integration tests for git-file-id-backend.

mod batch;
mod github;

use anyhow::Result;
use atomicwrites::{AtomicFile, OverwriteBehavior};
use camino::Utf8Path;
use std::{io::Write, process::Command};

// ---------------------------------------------------------------------------
// Test helpers
// ---------------------------------------------------------------------------

/// Returns a `Command` for git, respecting the `$GIT` environment variable.
pub(crate) fn git_command() -> Command {
    let bin = std::env::var("GIT").unwrap_or_else(|_| "git".to_string());
    Command::new(bin)
}

/// Runs git in `dir`, asserting success, and returns trimmed stdout.
pub(crate) fn git(dir: &Utf8Path, args: &[&str]) -> Result<String> {
    let output = git_command().args(args).current_dir(dir).output()?;
    assert!(
        output.status.success(),
        "git {} failed: {}",
        args.join(" "),
        String::from_utf8_lossy(&output.stderr)
    );
    Ok(String::from_utf8(output.stdout)?.trim().to_string())
}

/// Writes content to a file atomically, creating parent directories.
pub(crate) fn write_file(
    path: impl AsRef<Utf8Path>,
    content: impl AsRef<[u8]>,
) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    AtomicFile::new(path, OverwriteBehavior::AllowOverwrite)
        .write(|f| f.write_all(content.as_ref()))?;
    Ok(())
}

/// Initializes a git repository and configures the user.
pub(crate) fn init_git_repo(repo_root: &Utf8Path) -> Result<()> {
    git(repo_root, &["init"])?;
    git(repo_root, &["config", "user.email", "test@example.com"])?;
    git(repo_root, &["config", "user.name", "Test User"])?;
    Ok(())
}

/// Writes `contents` to `file_path` and commits it. Returns the commit
/// hash.
pub(crate) fn commit_file(
    repo_root: &Utf8Path,
    file_path: &str,
    contents: &str,
) -> Result<String> {
    write_file(repo_root.join(file_path), contents)?;
    git(repo_root, &["add", "--", file_path])?;
    git(repo_root, &["commit", "-m", &format!("Update {file_path}")])?;
    git(repo_root, &["rev-parse", "HEAD"])
}
