// Copyright 2026 Oxide Computer Company

//! The typed batch data model.
//!
//! Batch input files are untyped JSON; [`parse_batch_inputs`] and
//! [`BatchInput::from_value`] are the only places where that JSON is turned
//! into [`BatchInput`] values. Everything downstream works on the typed
//! form.

use crate::{BatchInputError, NormalizedMetadata};
use camino::Utf8PathBuf;
use serde::{Serialize, Serializer, ser::SerializeMap};
use serde_json::{Map, Value};

/// The branch used for GitHub inputs that do not name one.
pub const DEFAULT_BRANCH: &str = "main";

/// One unit of batch work.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BatchInput {
    /// A file in a local working copy.
    Local {
        /// Any path inside the repository.
        repo_path: Utf8PathBuf,
        /// The file, relative to the repository root or absolute.
        file_path: String,
    },
    /// A file in a GitHub repository.
    Github {
        /// The repository owner.
        owner: String,
        /// The repository name.
        repo: String,
        /// The file, relative to the repository root.
        file_path: String,
        /// The branch to read.
        branch: String,
    },
}

impl BatchInput {
    /// Creates a local input.
    pub fn local(
        repo_path: impl Into<Utf8PathBuf>,
        file_path: impl Into<String>,
    ) -> Self {
        BatchInput::Local {
            repo_path: repo_path.into(),
            file_path: file_path.into(),
        }
    }

    /// Creates a GitHub input on [`DEFAULT_BRANCH`].
    pub fn github(
        owner: impl Into<String>,
        repo: impl Into<String>,
        file_path: impl Into<String>,
    ) -> Self {
        BatchInput::Github {
            owner: owner.into(),
            repo: repo.into(),
            file_path: file_path.into(),
            branch: DEFAULT_BRANCH.to_owned(),
        }
    }

    /// Returns the input's type name, `local` or `github`.
    pub fn type_name(&self) -> &'static str {
        match self {
            BatchInput::Local { .. } => "local",
            BatchInput::Github { .. } => "github",
        }
    }

    /// Returns the requested file path.
    pub fn file_path(&self) -> &str {
        match self {
            BatchInput::Local { file_path, .. }
            | BatchInput::Github { file_path, .. } => file_path,
        }
    }

    /// Checks that the fields required by the input's type are non-empty.
    ///
    /// `index` is the input's position in its batch and is reported in the
    /// error.
    pub fn validate(&self, index: usize) -> Result<(), BatchInputError> {
        let missing = |field| BatchInputError::MissingField {
            index,
            input_type: self.type_name(),
            field,
        };
        match self {
            BatchInput::Local { repo_path, .. } => {
                if repo_path.as_str().is_empty() {
                    return Err(missing("repoPath"));
                }
            }
            BatchInput::Github { owner, repo, .. } => {
                if owner.is_empty() {
                    return Err(missing("owner"));
                }
                if repo.is_empty() {
                    return Err(missing("repo"));
                }
            }
        }
        Ok(())
    }

    /// Converts one element of a batch input document.
    ///
    /// Keys are accepted in camelCase (`filePath`, `repoPath`) or
    /// snake_case (`file_path`, `repo_path`). A missing or empty `branch`
    /// defaults to [`DEFAULT_BRANCH`]. The result is validated with
    /// [`validate`](Self::validate).
    pub fn from_value(index: usize, value: &Value) -> Result<Self, BatchInputError> {
        let object = value
            .as_object()
            .ok_or(BatchInputError::NotAnObject { index })?;

        let input = match string_field(object, &["type"]) {
            Some("local") => BatchInput::Local {
                repo_path: string_field(object, &["repoPath", "repo_path"])
                    .unwrap_or_default()
                    .into(),
                file_path: require_file_path(index, "local", object)?,
            },
            Some("github") => BatchInput::Github {
                owner: string_field(object, &["owner"])
                    .unwrap_or_default()
                    .to_owned(),
                repo: string_field(object, &["repo"]).unwrap_or_default().to_owned(),
                file_path: require_file_path(index, "github", object)?,
                branch: string_field(object, &["branch"])
                    .filter(|b| !b.is_empty())
                    .unwrap_or(DEFAULT_BRANCH)
                    .to_owned(),
            },
            other => {
                return Err(BatchInputError::UnknownType {
                    index,
                    value: other.unwrap_or_default().to_owned(),
                });
            }
        };
        input.validate(index)?;
        Ok(input)
    }
}

fn string_field<'a>(object: &'a Map<String, Value>, names: &[&str]) -> Option<&'a str> {
    names
        .iter()
        .find_map(|name| object.get(*name).and_then(Value::as_str))
}

fn require_file_path(
    index: usize,
    input_type: &'static str,
    object: &Map<String, Value>,
) -> Result<String, BatchInputError> {
    match string_field(object, &["filePath", "file_path"]) {
        Some(path) if !path.is_empty() => Ok(path.to_owned()),
        _ => Err(BatchInputError::MissingField {
            index,
            input_type,
            field: "filePath",
        }),
    }
}

/// Parses a batch input document: a JSON array of input objects.
///
/// Every element is converted and validated before this returns, so a
/// malformed element rejects the whole document.
pub fn parse_batch_inputs(json: &str) -> Result<Vec<BatchInput>, BatchInputError> {
    let value: Value =
        serde_json::from_str(json).map_err(BatchInputError::InvalidJson)?;
    let items = value.as_array().ok_or(BatchInputError::NotAnArray)?;
    items
        .iter()
        .enumerate()
        .map(|(index, item)| BatchInput::from_value(index, item))
        .collect()
}

/// Whether a batch item succeeded.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchStatus {
    /// The item produced an identifier.
    Success,
    /// The item failed; see the error message.
    Error,
}

/// What a batch item produced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BatchOutcome {
    /// Metadata was fetched, normalized, and identified.
    Success {
        /// The full identifier.
        identifier: String,
        /// The short identifier.
        short: String,
        /// The normalized metadata the identifier was computed from.
        metadata: NormalizedMetadata,
    },
    /// Some stage of the item's pipeline failed.
    Error {
        /// The error's message.
        message: String,
    },
}

/// The outcome of one batch item.
///
/// Serializes as `{filePath, identifier, status, short?, metadata?,
/// error?}`, with `identifier` set to `null` on error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BatchResult {
    /// The file path from the input.
    pub file_path: String,
    /// The item's outcome.
    pub outcome: BatchOutcome,
}

impl BatchResult {
    /// Creates a failed result.
    pub fn error(file_path: impl Into<String>, message: impl Into<String>) -> Self {
        BatchResult {
            file_path: file_path.into(),
            outcome: BatchOutcome::Error { message: message.into() },
        }
    }

    /// Returns the item's status.
    pub fn status(&self) -> BatchStatus {
        match self.outcome {
            BatchOutcome::Success { .. } => BatchStatus::Success,
            BatchOutcome::Error { .. } => BatchStatus::Error,
        }
    }

    /// Returns the full identifier on success.
    pub fn identifier(&self) -> Option<&str> {
        match &self.outcome {
            BatchOutcome::Success { identifier, .. } => Some(identifier),
            BatchOutcome::Error { .. } => None,
        }
    }

    /// Returns the error message on failure.
    pub fn error_message(&self) -> Option<&str> {
        match &self.outcome {
            BatchOutcome::Success { .. } => None,
            BatchOutcome::Error { message } => Some(message),
        }
    }
}

impl Serialize for BatchResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("filePath", &self.file_path)?;
        map.serialize_entry("identifier", &self.identifier())?;
        map.serialize_entry("status", &self.status())?;
        match &self.outcome {
            BatchOutcome::Success { short, metadata, .. } => {
                map.serialize_entry("short", short)?;
                map.serialize_entry("metadata", &metadata.to_value())?;
            }
            BatchOutcome::Error { message } => {
                map.serialize_entry("error", message)?;
            }
        }
        map.end()
    }
}
