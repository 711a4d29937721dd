// Copyright 2026 Oxide Computer Company

//! Error types for file identification.

use std::borrow::Cow;
use thiserror::Error;

/// An error that occurs while fetching, normalizing, or identifying file
/// metadata.
///
/// Every variant carries its structured payload as named fields. Use
/// [`code`](Self::code) for a stable machine-readable code and
/// [`context`](Self::context) for the payload as key/value pairs.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum IdentifyError {
    /// The path or `owner/repo` pair does not name an accessible repository.
    #[error("repository not found: {path}")]
    RepositoryNotFound {
        /// A local path, or `owner/repo` for a remote repository.
        path: String,
    },

    /// The file is not tracked, has no history, or is not a regular file.
    #[error("file not found: {file_path} ({reason})")]
    FileNotFound {
        /// The file path that was requested.
        file_path: String,
        /// Why the file was considered missing.
        reason: String,
    },

    /// A hash was not a 40-character hexadecimal string.
    #[error(
        "invalid Git hash{}: expected 40 hexadecimal characters, got {value:?}",
        label.as_deref().map(|l| format!(" ({l})")).unwrap_or_default()
    )]
    InvalidHash {
        /// The offending value.
        value: String,
        /// Which field held the value (e.g. `commitHash`), if known.
        label: Option<String>,
    },

    /// The remote API rate limit was exhausted.
    #[error(
        "GitHub API rate limit exceeded ({remaining} requests remaining{})",
        reset_time.map(|t| format!(", resets at {t}")).unwrap_or_default()
    )]
    RateLimitExceeded {
        /// Unix timestamp at which the limit resets, if reported.
        reset_time: Option<i64>,
        /// Requests remaining in the current window.
        remaining: u64,
    },

    /// The remote API rejected the credentials (or their absence).
    #[error(
        "GitHub API authentication failed (HTTP {status}); \
         provide a valid GITHUB_TOKEN"
    )]
    AuthenticationFailed {
        /// The HTTP status code returned.
        status: u16,
    },

    /// An external command could not be run, timed out, or exited with an
    /// error.
    #[error("command `{command}` failed ({exit_status}): {stderr}")]
    CommandExecutionFailed {
        /// The command line that was run.
        command: String,
        /// A human-readable description of how the command ended (e.g.
        /// "exit status: 128" or "timed out after 30s").
        exit_status: String,
        /// The exit code, if the process exited normally.
        exit_code: Option<i32>,
        /// Captured standard error, trimmed.
        stderr: String,
    },

    /// A required metadata field was absent.
    #[error("missing required field: {field}")]
    MissingField {
        /// The camelCase field name.
        field: String,
    },

    /// The `source` field named an unrecognized backend.
    #[error(
        "invalid source {value:?}: expected \"local-git\" or \"github-api\""
    )]
    InvalidSource {
        /// The value that was supplied.
        value: String,
    },

    /// A network request could not be completed.
    #[error("network error accessing {url}: {message}")]
    NetworkError {
        /// The URL being requested.
        url: String,
        /// The transport-level failure.
        message: String,
    },

    /// A remote API returned an unexpected HTTP status.
    #[error("GitHub API error (HTTP {status}) for {url}: {message}")]
    ApiError {
        /// The HTTP status code returned.
        status: u16,
        /// The URL that was requested.
        url: String,
        /// The response body or status reason.
        message: String,
    },

    /// JSON input (a manifest or an API response) was malformed.
    #[error("failed to parse {what}: {message}")]
    ParseError {
        /// What was being parsed (e.g. "manifest").
        what: String,
        /// Details about the parsing failure.
        message: String,
    },
}

impl IdentifyError {
    /// Returns the stable machine-readable code for this error.
    pub fn code(&self) -> Cow<'static, str> {
        match self {
            IdentifyError::RepositoryNotFound { .. } => {
                "REPOSITORY_NOT_FOUND".into()
            }
            IdentifyError::FileNotFound { .. } => "FILE_NOT_FOUND".into(),
            IdentifyError::InvalidHash { .. } => "INVALID_HASH".into(),
            IdentifyError::RateLimitExceeded { .. } => {
                "RATE_LIMIT_EXCEEDED".into()
            }
            IdentifyError::AuthenticationFailed { .. } => {
                "AUTHENTICATION_FAILED".into()
            }
            IdentifyError::CommandExecutionFailed { .. } => {
                "GIT_COMMAND_FAILED".into()
            }
            IdentifyError::MissingField { .. } => "MISSING_FIELD".into(),
            IdentifyError::InvalidSource { .. } => "INVALID_SOURCE".into(),
            IdentifyError::NetworkError { .. } => "NETWORK_ERROR".into(),
            IdentifyError::ApiError { status, .. } => {
                format!("HTTP_{status}").into()
            }
            IdentifyError::ParseError { .. } => "PARSE_ERROR".into(),
        }
    }

    /// Returns the structured payload of this error as key/value pairs, in
    /// field declaration order. Absent optional fields are omitted.
    pub fn context(&self) -> Vec<(&'static str, String)> {
        match self {
            IdentifyError::RepositoryNotFound { path } => {
                vec![("path", path.clone())]
            }
            IdentifyError::FileNotFound { file_path, reason } => {
                vec![("file_path", file_path.clone()), ("reason", reason.clone())]
            }
            IdentifyError::InvalidHash { value, label } => {
                let mut context = vec![("hash_value", value.clone())];
                if let Some(label) = label {
                    context.push(("hash_type", label.clone()));
                }
                context
            }
            IdentifyError::RateLimitExceeded { reset_time, remaining } => {
                let mut context = Vec::new();
                if let Some(reset_time) = reset_time {
                    context.push(("reset_time", reset_time.to_string()));
                }
                context.push(("remaining", remaining.to_string()));
                context
            }
            IdentifyError::AuthenticationFailed { status } => {
                vec![("status", status.to_string())]
            }
            IdentifyError::CommandExecutionFailed {
                command,
                exit_status,
                exit_code,
                stderr,
            } => {
                let mut context = vec![
                    ("command", command.clone()),
                    ("exit_status", exit_status.clone()),
                ];
                if let Some(code) = exit_code {
                    context.push(("exit_code", code.to_string()));
                }
                if !stderr.is_empty() {
                    context.push(("stderr", stderr.clone()));
                }
                context
            }
            IdentifyError::MissingField { field } => {
                vec![("field", field.clone())]
            }
            IdentifyError::InvalidSource { value } => {
                vec![("source", value.clone())]
            }
            IdentifyError::NetworkError { url, message } => {
                vec![("url", url.clone()), ("message", message.clone())]
            }
            IdentifyError::ApiError { status, url, message } => vec![
                ("status", status.to_string()),
                ("url", url.clone()),
                ("message", message.clone()),
            ],
            IdentifyError::ParseError { what, message } => {
                vec![("what", what.clone()), ("message", message.clone())]
            }
        }
    }
}

/// An error that occurs while parsing an [`Algorithm`](crate::Algorithm),
/// [`Encoding`](crate::Encoding), or
/// [`MetadataSource`](crate::MetadataSource) from a string.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("unknown {kind} {value:?} (expected one of: {expected})")]
pub struct UnknownVariantError {
    /// What was being parsed.
    pub kind: &'static str,
    /// The value that was supplied.
    pub value: String,
    /// The accepted spellings, comma-separated.
    pub expected: &'static str,
}

/// An error that occurs while converting untyped JSON into
/// [`BatchInput`](crate::BatchInput) values, or while validating them.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BatchInputError {
    /// The input document was not valid JSON.
    #[error("batch input is not valid JSON")]
    InvalidJson(#[source] serde_json::Error),

    /// The input document was valid JSON but not an array.
    #[error("batch input must be a JSON array")]
    NotAnArray,

    /// An array element was not a JSON object.
    #[error("batch input #{index} is not a JSON object")]
    NotAnObject {
        /// The position of the element in the input.
        index: usize,
    },

    /// The `type` field was missing or not one of `local` and `github`.
    #[error(
        "batch input #{index} has invalid type {value:?} \
         (expected \"github\" or \"local\")"
    )]
    UnknownType {
        /// The position of the element in the input.
        index: usize,
        /// The value of the `type` field, or an empty string if absent.
        value: String,
    },

    /// A field required for the input's type was missing or empty.
    #[error("batch input #{index} ({input_type}) requires {field}")]
    MissingField {
        /// The position of the element in the input.
        index: usize,
        /// The input type (`local` or `github`).
        input_type: &'static str,
        /// The camelCase name of the missing field.
        field: &'static str,
    },
}
