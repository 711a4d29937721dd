// Copyright 2026 Oxide Computer Company

//! Git object hash validation.

use crate::IdentifyError;
use serde::{Serialize, Serializer};
use std::{fmt, str::FromStr};

/// The number of hex characters in a Git object hash.
pub const GIT_HASH_LEN: usize = 40;

/// A Git object hash (commit or blob).
///
/// This type guarantees the contained value is 20 bytes, displayed as 40
/// lowercase hex characters. Parsing is case-insensitive.
///
/// ```
/// use git_file_id::GitHash;
///
/// let hash: GitHash =
///     "0123456789ABCDEF0123456789abcdef01234567".parse().unwrap();
/// assert_eq!(hash.to_string(), "0123456789abcdef0123456789abcdef01234567");
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GitHash([u8; 20]);

impl GitHash {
    /// Returns the raw bytes of the hash.
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }
}

impl FromStr for GitHash {
    type Err = IdentifyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        validate_hash(s, None)
    }
}

impl fmt::Display for GitHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        hex::encode(self.0).fmt(f)
    }
}

impl fmt::Debug for GitHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GitHash({self})")
    }
}

impl Serialize for GitHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Returns true if `s` is exactly 40 hexadecimal characters, in either case.
pub fn is_valid_hash(s: &str) -> bool {
    s.len() == GIT_HASH_LEN && s.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Validates `s` as a Git hash and returns it in canonical form.
///
/// `label` names the field being validated (e.g. `commitHash`) and is
/// carried in the error.
pub fn validate_hash(
    s: &str,
    label: Option<&str>,
) -> Result<GitHash, IdentifyError> {
    let invalid = || IdentifyError::InvalidHash {
        value: s.to_owned(),
        label: label.map(str::to_owned),
    };
    if !is_valid_hash(s) {
        return Err(invalid());
    }
    let mut bytes = [0; 20];
    hex::decode_to_slice(s, &mut bytes).map_err(|_| invalid())?;
    Ok(GitHash(bytes))
}
