// Copyright 2026 Oxide Computer Company

//! Raw and normalized file metadata.

use crate::{
    GitHash, IdentifyError, UnknownVariantError, canonical, hash::validate_hash,
    normalize_path,
};
use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::{fmt, str::FromStr};

/// The backend a metadata record came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MetadataSource {
    /// A local working copy, read through the `git` command line.
    #[serde(rename = "local-git")]
    LocalGit,
    /// The GitHub REST API.
    #[serde(rename = "github-api")]
    GithubApi,
}

impl MetadataSource {
    /// Returns the wire name of the source.
    pub fn as_str(&self) -> &'static str {
        match self {
            MetadataSource::LocalGit => "local-git",
            MetadataSource::GithubApi => "github-api",
        }
    }
}

impl fmt::Display for MetadataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetadataSource {
    type Err = UnknownVariantError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "local-git" => Ok(MetadataSource::LocalGit),
            "github-api" => Ok(MetadataSource::GithubApi),
            _ => Err(UnknownVariantError {
                kind: "metadata source",
                value: s.to_owned(),
                expected: "local-git, github-api",
            }),
        }
    }
}

/// Metadata as produced by a backend, before validation.
///
/// Every field is optional so that incomplete records can be represented
/// and rejected by [`normalize`]. Field names serialize in camelCase.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawMetadata {
    /// `local-git` or `github-api`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Repository owner.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    /// Repository name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo: Option<String>,
    /// Branch name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    /// The latest commit touching the file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit_hash: Option<String>,
    /// The blob hash of the file's contents.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_hash: Option<String>,
    /// Path of the file within the repository.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    /// Committer timestamp of the latest commit, ISO 8601.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<String>,
    /// A URL for viewing the file, if the backend provides one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html_url: Option<String>,
    /// The local repository root, for local records.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo_path: Option<String>,
}

impl RawMetadata {
    /// Returns true if no field is set.
    pub fn is_empty(&self) -> bool {
        *self == RawMetadata::default()
    }
}

impl From<&NormalizedMetadata> for RawMetadata {
    fn from(meta: &NormalizedMetadata) -> Self {
        RawMetadata {
            source: Some(meta.source.as_str().to_owned()),
            owner: Some(meta.owner.clone()),
            repo: Some(meta.repo.clone()),
            branch: Some(meta.branch.clone()),
            commit_hash: Some(meta.commit_hash.to_string()),
            file_hash: Some(meta.file_hash.to_string()),
            file_path: Some(meta.file_path.clone()),
            last_modified: Some(meta.last_modified.clone()),
            html_url: meta.html_url.clone(),
            repo_path: meta.repo_path.clone(),
        }
    }
}

/// Validated, canonical file metadata.
///
/// Construct via [`normalize`]. Instances are immutable.
///
/// # Invariants
///
/// - Both hashes are 40 lowercase hex characters.
/// - `file_path` is normalized with [`normalize_path`].
/// - `last_modified` is `YYYY-MM-DDTHH:MM:SSZ` when the input could be
///   parsed as a timestamp, and the input verbatim otherwise.
///
/// Two records are semantically equal iff their [`canonicalize`] output is
/// byte-identical; `html_url` and `repo_path` do not participate.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedMetadata {
    source: MetadataSource,
    owner: String,
    repo: String,
    branch: String,
    commit_hash: GitHash,
    file_hash: GitHash,
    file_path: String,
    last_modified: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    html_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    repo_path: Option<String>,
}

impl NormalizedMetadata {
    /// Returns the backend the record came from.
    pub fn source(&self) -> MetadataSource {
        self.source
    }

    /// Returns the repository owner.
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Returns the repository name.
    pub fn repo(&self) -> &str {
        &self.repo
    }

    /// Returns the branch name.
    pub fn branch(&self) -> &str {
        &self.branch
    }

    /// Returns the latest commit touching the file.
    pub fn commit_hash(&self) -> GitHash {
        self.commit_hash
    }

    /// Returns the blob hash of the file's contents.
    pub fn file_hash(&self) -> GitHash {
        self.file_hash
    }

    /// Returns the normalized file path.
    pub fn file_path(&self) -> &str {
        &self.file_path
    }

    /// Returns the normalized last-modified timestamp.
    pub fn last_modified(&self) -> &str {
        &self.last_modified
    }

    /// Returns the view URL, if any.
    pub fn html_url(&self) -> Option<&str> {
        self.html_url.as_deref()
    }

    /// Returns the local repository root, if any.
    pub fn repo_path(&self) -> Option<&str> {
        self.repo_path.as_deref()
    }

    /// Returns the record as a camelCase JSON object, including `htmlUrl`
    /// and `repoPath` when present.
    pub fn to_value(&self) -> Value {
        let mut map = self.identity_fields();
        if let Some(url) = &self.html_url {
            map.insert("htmlUrl".to_owned(), Value::String(url.clone()));
        }
        if let Some(path) = &self.repo_path {
            map.insert("repoPath".to_owned(), Value::String(path.clone()));
        }
        Value::Object(map)
    }

    /// The fields that determine file identity.
    fn identity_fields(&self) -> Map<String, Value> {
        let mut map = Map::new();
        let mut put = |key: &str, value: String| {
            map.insert(key.to_owned(), Value::String(value));
        };
        put("branch", self.branch.clone());
        put("commitHash", self.commit_hash.to_string());
        put("fileHash", self.file_hash.to_string());
        put("filePath", self.file_path.clone());
        put("lastModified", self.last_modified.clone());
        put("owner", self.owner.clone());
        put("repo", self.repo.clone());
        put("source", self.source.as_str().to_owned());
        map
    }
}

/// Validates and canonicalizes raw metadata.
///
/// Checks, in order: presence of every required field, the source, then
/// both hashes (which are lowercased). The file path is normalized and the
/// timestamp reformatted to UTC with second precision. An unparsable
/// timestamp is kept verbatim rather than rejected.
pub fn normalize(raw: &RawMetadata) -> Result<NormalizedMetadata, IdentifyError> {
    fn require<'a>(
        value: &'a Option<String>,
        field: &str,
    ) -> Result<&'a str, IdentifyError> {
        value.as_deref().ok_or_else(|| IdentifyError::MissingField {
            field: field.to_owned(),
        })
    }

    let source = require(&raw.source, "source")?;
    let owner = require(&raw.owner, "owner")?;
    let repo = require(&raw.repo, "repo")?;
    let branch = require(&raw.branch, "branch")?;
    let commit_hash = require(&raw.commit_hash, "commitHash")?;
    let file_hash = require(&raw.file_hash, "fileHash")?;
    let file_path = require(&raw.file_path, "filePath")?;
    let last_modified = require(&raw.last_modified, "lastModified")?;

    let source: MetadataSource = source
        .parse()
        .map_err(|_| IdentifyError::InvalidSource { value: source.to_owned() })?;
    let commit_hash = validate_hash(commit_hash, Some("commitHash"))?;
    let file_hash = validate_hash(file_hash, Some("fileHash"))?;

    Ok(NormalizedMetadata {
        source,
        owner: owner.to_owned(),
        repo: repo.to_owned(),
        branch: branch.to_owned(),
        commit_hash,
        file_hash,
        file_path: normalize_path(file_path),
        last_modified: normalize_timestamp(last_modified),
        html_url: raw.html_url.clone(),
        repo_path: raw.repo_path.clone(),
    })
}

/// Returns the canonical serialization of `meta`: the identity fields
/// (everything except `htmlUrl` and `repoPath`) as compact JSON with sorted
/// keys. This string is the sole input to identifier generation.
///
/// See the [`canonical`](crate::canonical) module for the exact grammar.
pub fn canonicalize(meta: &NormalizedMetadata) -> String {
    canonical::to_canonical_string(&Value::Object(meta.identity_fields()))
}

/// Reformats an ISO 8601 timestamp as `YYYY-MM-DDTHH:MM:SSZ` in UTC.
///
/// Timestamps without an offset are taken to be UTC. Input that cannot be
/// parsed is returned unchanged.
pub fn normalize_timestamp(input: &str) -> String {
    match parse_timestamp(input.trim()) {
        Some(dt) => dt.to_rfc3339_opts(SecondsFormat::Secs, true),
        None => input.to_owned(),
    }
}

fn parse_timestamp(input: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Some(dt.with_timezone(&Utc));
    }
    // RFC 3339 requires the `T`; ISO 8601 also allows a space.
    if let Ok(dt) = DateTime::parse_from_str(input, "%Y-%m-%d %H:%M:%S%.f%:z") {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"]
    {
        if let Ok(naive) = NaiveDateTime::parse_from_str(input, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
