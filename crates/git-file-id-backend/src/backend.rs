// Copyright 2026 Oxide Computer Company

//! The seam between metadata sources and the batch orchestrator.

use crate::{EnvError, GitHubClient, LocalGit};
use async_trait::async_trait;
use git_file_id::{
    BatchInput, IdentifierOptions, Identifier, IdentifyError, NormalizedMetadata,
    RawMetadata, generate_identifier, normalize,
};
use std::sync::Arc;

/// A source of raw file metadata.
#[async_trait]
pub trait MetadataBackend: Send + Sync {
    /// Reads the metadata for one input.
    async fn fetch(&self, input: &BatchInput) -> Result<RawMetadata, IdentifyError>;
}

#[async_trait]
impl<T> MetadataBackend for Arc<T>
where
    T: MetadataBackend + ?Sized,
{
    async fn fetch(&self, input: &BatchInput) -> Result<RawMetadata, IdentifyError> {
        (**self).fetch(input).await
    }
}

/// Dispatches local inputs to [`LocalGit`] and GitHub inputs to
/// [`GitHubClient`].
#[derive(Clone, Debug)]
pub struct DefaultBackend {
    local: LocalGit,
    github: GitHubClient,
}

impl DefaultBackend {
    /// Creates a backend from its two halves.
    pub fn new(local: LocalGit, github: GitHubClient) -> Self {
        DefaultBackend { local, github }
    }

    /// Creates a backend configured from the environment (`$GIT`,
    /// `$GITHUB_TOKEN`, `$GITHUB_API_URL`).
    pub fn from_env() -> Result<Self, EnvError> {
        Ok(Self::new(LocalGit::from_env()?, GitHubClient::from_env()?))
    }

    /// Returns the local half.
    pub fn local(&self) -> &LocalGit {
        &self.local
    }

    /// Returns the GitHub half.
    pub fn github(&self) -> &GitHubClient {
        &self.github
    }
}

#[async_trait]
impl MetadataBackend for DefaultBackend {
    async fn fetch(&self, input: &BatchInput) -> Result<RawMetadata, IdentifyError> {
        match input {
            BatchInput::Local { repo_path, file_path } => {
                self.local.fetch(repo_path, file_path).await
            }
            BatchInput::Github { owner, repo, file_path, branch } => {
                self.github.fetch(owner, repo, file_path, branch).await
            }
        }
    }
}

/// A file's identifier together with the metadata it was computed from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IdentifiedFile {
    /// The generated identifier.
    pub identifier: Identifier,
    /// The normalized metadata.
    pub metadata: NormalizedMetadata,
}

/// Runs the full pipeline for one input: fetch, normalize, identify.
pub async fn identify<B>(
    backend: &B,
    input: &BatchInput,
    options: &IdentifierOptions,
) -> Result<IdentifiedFile, IdentifyError>
where
    B: MetadataBackend + ?Sized,
{
    let raw = backend.fetch(input).await?;
    let metadata = normalize(&raw)?;
    let identifier = generate_identifier(&metadata, options);
    Ok(IdentifiedFile { identifier, metadata })
}
