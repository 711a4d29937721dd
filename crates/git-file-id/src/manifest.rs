// Copyright 2026 Oxide Computer Company

//! Manifests and change reports.

use crate::{BatchOutcome, BatchResult, IdentifyError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// A snapshot of file identifiers, keyed by file path.
///
/// Serializes as a flat JSON object with keys in sorted order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Manifest(BTreeMap<String, String>);

impl Manifest {
    /// Creates an empty manifest.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `identifier` for `file_path`, replacing any previous value.
    pub fn insert(&mut self, file_path: impl Into<String>, identifier: impl Into<String>) {
        self.0.insert(file_path.into(), identifier.into());
    }

    /// Returns the identifier recorded for `file_path`.
    pub fn get(&self, file_path: &str) -> Option<&str> {
        self.0.get(file_path).map(String::as_str)
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the manifest has no entries.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over `(file_path, identifier)` pairs in path order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl FromIterator<(String, String)> for Manifest {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Manifest(iter.into_iter().collect())
    }
}

/// Builds a manifest from the successful entries of `results`.
///
/// Failed entries are skipped. If a path appears more than once, the last
/// successful entry wins.
pub fn build_manifest(results: &[BatchResult]) -> Manifest {
    results
        .iter()
        .filter_map(|result| match &result.outcome {
            BatchOutcome::Success { identifier, .. } => {
                Some((result.file_path.clone(), identifier.clone()))
            }
            BatchOutcome::Error { .. } => None,
        })
        .collect()
}

/// Serializes a manifest as a JSON object with sorted keys.
///
/// With `pretty`, the output is indented by two spaces.
pub fn serialize_manifest(manifest: &Manifest, pretty: bool) -> String {
    let result = if pretty {
        serde_json::to_string_pretty(manifest)
    } else {
        serde_json::to_string(manifest)
    };
    // A map of strings always serializes.
    result.unwrap_or_default()
}

/// Parses a manifest from JSON.
///
/// The document must be an object whose values are all strings.
pub fn deserialize_manifest(json: &str) -> Result<Manifest, IdentifyError> {
    serde_json::from_str(json).map_err(|error| IdentifyError::ParseError {
        what: "manifest".to_owned(),
        message: error.to_string(),
    })
}

/// A file that failed during the current run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeError {
    /// The file path from the input.
    pub file_path: String,
    /// The error message.
    pub error: String,
}

/// The differences between a batch run and a previous manifest.
///
/// The lists partition the union of both path sets. Paths that failed in
/// the current run appear only in `errors`, and are never reported as
/// removed.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ChangeReport {
    /// Paths not present in the previous manifest.
    pub added: Vec<String>,
    /// Paths whose identifier differs from the previous manifest.
    pub modified: Vec<String>,
    /// Paths whose identifier matches the previous manifest.
    pub unchanged: Vec<String>,
    /// Paths in the previous manifest that the current run did not see.
    pub removed: Vec<String>,
    /// Paths that failed in the current run.
    pub errors: Vec<ChangeError>,
}

impl ChangeReport {
    /// Returns true if any path was added, modified, or removed.
    pub fn has_changes(&self) -> bool {
        !self.added.is_empty() || !self.modified.is_empty() || !self.removed.is_empty()
    }
}

/// Compares a batch run against a previous manifest.
///
/// Current entries keep their input order within each list; `removed` is
/// in path order.
pub fn diff(current: &[BatchResult], previous: &Manifest) -> ChangeReport {
    let mut report = ChangeReport::default();
    let mut seen = BTreeSet::new();

    for result in current {
        if result.file_path.is_empty() {
            continue;
        }
        seen.insert(result.file_path.as_str());

        let identifier = match &result.outcome {
            BatchOutcome::Success { identifier, .. } => identifier,
            BatchOutcome::Error { message } => {
                report.errors.push(ChangeError {
                    file_path: result.file_path.clone(),
                    error: message.clone(),
                });
                continue;
            }
        };

        let bucket = match previous.get(&result.file_path) {
            None => &mut report.added,
            Some(prev) if prev != identifier => &mut report.modified,
            Some(_) => &mut report.unchanged,
        };
        bucket.push(result.file_path.clone());
    }

    report.removed = previous
        .iter()
        .filter(|(path, _)| !seen.contains(path))
        .map(|(path, _)| path.to_owned())
        .collect();
    report
}
