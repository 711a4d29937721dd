// Copyright 2026 Oxide Computer Company

//! Metadata backends and batch identification for Git file identifiers.
//!
//! [`git_file_id`] turns file metadata into identifiers. This crate is the
//! I/O side: it reads that metadata from a local working copy (by running
//! `git`) or from the GitHub REST API, and runs many lookups concurrently.
//!
//! # Identifying a single file
//!
//! ```no_run
//! use git_file_id::{BatchInput, IdentifierOptions};
//! use git_file_id_backend::{DefaultBackend, identify};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let backend = DefaultBackend::from_env()?;
//! let input = BatchInput::local(".", "src/lib.rs");
//! let file = identify(&backend, &input, &IdentifierOptions::default()).await?;
//! println!("{} {}", file.identifier.short(), file.metadata.file_path());
//! # Ok(())
//! # }
//! ```
//!
//! # Batches
//!
//! ```no_run
//! use git_file_id::parse_batch_inputs;
//! use git_file_id_backend::{BatchOptions, BatchProcessor, DefaultBackend};
//! use std::sync::Arc;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let inputs = parse_batch_inputs(r#"[
//!     {"type": "local", "repoPath": ".", "filePath": "README.md"},
//!     {"type": "github", "owner": "octocat", "repo": "Hello-World", "filePath": "README"}
//! ]"#)?;
//!
//! let backend = Arc::new(DefaultBackend::from_env()?);
//! let results = BatchProcessor::new(BatchOptions::default())
//!     .on_progress(|done, total| eprintln!("{done}/{total}"))
//!     .process(backend, inputs)
//!     .await?;
//! for result in &results {
//!     println!("{} {:?}", result.file_path, result.identifier());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Environment
//!
//! * `$GIT`: the git executable (default `git`).
//! * `$GITHUB_TOKEN`: a token sent with GitHub API requests.
//! * `$GITHUB_API_URL`: the API base URL (default
//!   `https://api.github.com`).

#![deny(missing_docs)]

mod backend;
mod batch;
mod env;
mod errors;
mod github;
mod local;
mod url;

pub use backend::{DefaultBackend, IdentifiedFile, MetadataBackend, identify};
pub use batch::{
    BatchOptions, BatchProcessor, DEFAULT_CONCURRENCY, ProgressCallback,
    run_batch,
};
pub use errors::{BatchError, EnvError};
pub use github::{
    DEFAULT_API_URL, DEFAULT_HTTP_TIMEOUT, GitHubClient, GitHubConfig,
};
pub use local::{DEFAULT_COMMAND_TIMEOUT, LocalGit, ROOT_PROBE_TIMEOUT};
pub use url::{HostingService, RemoteRepo, blob_url, parse_remote_url};
