// Copyright 2026 Oxide Computer Company

//! Deterministic identifiers for files tracked in Git.
//!
//! A *file identifier* (e.g.
//! `sha256:3f2a9c0b1d4e...`) is a digest over the Git metadata of one
//! version of one file: the repository, branch, latest commit touching the
//! file, the file's blob hash, its path, and the commit time. Equal
//! metadata always produces an equal identifier, regardless of which
//! backend it was read from or how that backend spells paths and hashes.
//! This makes identifiers usable as cache keys for "this exact version of
//! this file" without reading the file's contents.
//!
//! This crate is the pure core: it validates and normalizes metadata,
//! computes identifiers, and compares them. It performs no I/O. To read
//! metadata from a local checkout or from GitHub, and to process many files
//! concurrently, see the `git-file-id-backend` crate.
//!
//! # Examples
//!
//! ```
//! use git_file_id::{
//!     IdentifierOptions, RawMetadata, canonicalize, generate_identifier,
//!     normalize,
//! };
//!
//! let raw = RawMetadata {
//!     source: Some("github-api".to_owned()),
//!     owner: Some("octocat".to_owned()),
//!     repo: Some("hello-world".to_owned()),
//!     branch: Some("main".to_owned()),
//!     commit_hash: Some("ABC123DEF456ABC123DEF456ABC123DEF456ABC1".to_owned()),
//!     file_hash: Some("def456abc123def456abc123def456abc123def4".to_owned()),
//!     file_path: Some("./src\\index.js".to_owned()),
//!     last_modified: Some("2024-01-15T12:30:00+02:00".to_owned()),
//!     ..Default::default()
//! };
//!
//! // Normalization lowercases hashes, cleans up the path, and converts the
//! // timestamp to UTC.
//! let meta = normalize(&raw).unwrap();
//! assert_eq!(meta.file_path(), "src/index.js");
//! assert_eq!(meta.last_modified(), "2024-01-15T10:30:00Z");
//! assert!(canonicalize(&meta).starts_with(r#"{"branch":"main","#));
//!
//! let id = generate_identifier(&meta, &IdentifierOptions::default());
//! assert!(id.full().starts_with("sha256:"));
//! assert!(id.full().ends_with(id.digest()));
//! ```
//!
//! # Detecting changes
//!
//! A [`Manifest`] records the identifier of each file in a snapshot. After
//! a later run, [`diff`] sorts the current results into added, modified,
//! unchanged, removed, and failed files:
//!
//! ```
//! use git_file_id::{BatchResult, Manifest, diff};
//!
//! let mut previous = Manifest::new();
//! previous.insert("src/old.rs", "sha256:aaaa");
//!
//! let current = vec![BatchResult::error("src/new.rs", "file not found")];
//! let report = diff(&current, &previous);
//! assert_eq!(report.removed, ["src/old.rs"]);
//! assert_eq!(report.errors.len(), 1);
//! ```

#![deny(missing_docs)]

mod batch;
pub mod canonical;
mod change;
mod errors;
mod hash;
mod identifier;
mod manifest;
mod metadata;
mod path;

pub use batch::{
    BatchInput, BatchOutcome, BatchResult, BatchStatus, DEFAULT_BRANCH,
    parse_batch_inputs,
};
pub use change::{has_changed, identifiers_equal};
pub use errors::{BatchInputError, IdentifyError, UnknownVariantError};
pub use hash::{GIT_HASH_LEN, GitHash, is_valid_hash, validate_hash};
pub use identifier::{
    Algorithm, DEFAULT_SHORT_LEN, Encoding, Identifier, IdentifierOptions,
    ShortForm, generate_identifier,
};
pub use manifest::{
    ChangeError, ChangeReport, Manifest, build_manifest, deserialize_manifest,
    diff, serialize_manifest,
};
pub use metadata::{
    MetadataSource, NormalizedMetadata, RawMetadata, canonicalize, normalize,
    normalize_timestamp,
};
pub use path::{normalize_path, resolve_relative};
