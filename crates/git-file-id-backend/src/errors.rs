// Copyright 2026 Oxide Computer Company

//! Error types for metadata backends and batch processing.

use git_file_id::{BatchInputError, IdentifyError};
use std::ffi::OsString;
use thiserror::Error;

/// An error from reading configuration from the environment.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EnvError {
    /// The environment variable is set but is not valid UTF-8.
    #[error("${var} environment variable is not valid UTF-8: {value:?}")]
    NonUtf8 {
        /// The environment variable name.
        var: &'static str,
        /// The non-UTF-8 value.
        value: OsString,
    },

    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client")]
    HttpClient(#[source] reqwest::Error),

    /// The configured API base URL is not a valid URL.
    #[error("invalid API base URL {url:?}: {message}")]
    InvalidBaseUrl {
        /// The configured value.
        url: String,
        /// Why the value could not be used.
        message: String,
    },
}

/// An error that aborts a whole batch.
///
/// Per-item failures are normally recorded in that item's
/// [`BatchResult`](git_file_id::BatchResult); this error is only returned
/// for malformed input, or for the first failure when
/// [`continue_on_error`](crate::BatchOptions::continue_on_error) is off.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BatchError {
    /// An input failed validation, so no work was started.
    #[error("invalid batch input")]
    InvalidInput(#[from] BatchInputError),

    /// An item failed and the batch was configured to stop.
    #[error("batch aborted: failed to process {file_path}")]
    ItemFailed {
        /// The position of the failed input.
        index: usize,
        /// The file path of the failed input.
        file_path: String,
        /// The item's error.
        #[source]
        error: IdentifyError,
    },

    /// A worker task panicked or was cancelled.
    #[error("batch worker task failed")]
    TaskFailed(#[source] tokio::task::JoinError),
}
