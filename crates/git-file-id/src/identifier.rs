// Copyright 2026 Oxide Computer Company

//! Identifier generation.

use crate::{NormalizedMetadata, UnknownVariantError, canonicalize};
use base64::Engine;
use serde::Serialize;
use sha1::Sha1;
use sha2::{Digest, Sha256};
use std::{fmt, str::FromStr};

/// The number of encoded digest characters in a short identifier when no
/// explicit length is requested.
pub const DEFAULT_SHORT_LEN: usize = 12;

/// The digest algorithm used to compute an identifier.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Algorithm {
    /// SHA-256.
    #[default]
    Sha256,
    /// SHA-1.
    Sha1,
}

impl Algorithm {
    /// Returns the name used as the identifier prefix.
    pub fn as_str(&self) -> &'static str {
        match self {
            Algorithm::Sha256 => "sha256",
            Algorithm::Sha1 => "sha1",
        }
    }

    fn digest(&self, input: &[u8]) -> Vec<u8> {
        match self {
            Algorithm::Sha256 => Sha256::digest(input).to_vec(),
            Algorithm::Sha1 => Sha1::digest(input).to_vec(),
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Algorithm {
    type Err = UnknownVariantError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sha256" => Ok(Algorithm::Sha256),
            "sha1" => Ok(Algorithm::Sha1),
            _ => Err(UnknownVariantError {
                kind: "algorithm",
                value: s.to_owned(),
                expected: "sha256, sha1",
            }),
        }
    }
}

/// How the digest bytes are rendered in the identifier.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Encoding {
    /// Lowercase hexadecimal.
    #[default]
    Hex,
    /// Standard base64 with padding.
    Base64,
}

impl Encoding {
    /// Returns the name of the encoding.
    pub fn as_str(&self) -> &'static str {
        match self {
            Encoding::Hex => "hex",
            Encoding::Base64 => "base64",
        }
    }

    fn encode(&self, bytes: &[u8]) -> String {
        match self {
            Encoding::Hex => hex::encode(bytes),
            Encoding::Base64 => {
                base64::engine::general_purpose::STANDARD.encode(bytes)
            }
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Encoding {
    type Err = UnknownVariantError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hex" => Ok(Encoding::Hex),
            "base64" => Ok(Encoding::Base64),
            _ => Err(UnknownVariantError {
                kind: "encoding",
                value: s.to_owned(),
                expected: "hex, base64",
            }),
        }
    }
}

/// Whether the short identifier keeps the `<algorithm>:` prefix.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ShortForm {
    /// Only the truncated digest, e.g. `3f2a9c0b1d4e`.
    #[default]
    Digest,
    /// The prefix followed by the truncated digest, e.g.
    /// `sha256:3f2a9c0b1d4e`.
    Prefixed,
}

/// Options controlling identifier generation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IdentifierOptions {
    /// The digest algorithm.
    pub algorithm: Algorithm,
    /// The digest encoding.
    pub encoding: Encoding,
    /// The number of encoded digest characters in the short form.
    /// Defaults to [`DEFAULT_SHORT_LEN`].
    pub truncate: Option<usize>,
    /// Whether the short form keeps the algorithm prefix.
    pub short_form: ShortForm,
}

/// A generated identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct Identifier {
    identifier: String,
    short: String,
    algorithm: Algorithm,
}

impl Identifier {
    /// Returns the full identifier, `<algorithm>:<encoded digest>`.
    pub fn full(&self) -> &str {
        &self.identifier
    }

    /// Returns the short display form.
    pub fn short(&self) -> &str {
        &self.short
    }

    /// Returns the algorithm used.
    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// Returns the encoded digest without the algorithm prefix.
    pub fn digest(&self) -> &str {
        let prefix_len = self.algorithm.as_str().len() + 1;
        &self.identifier[prefix_len..]
    }

    /// Consumes the identifier, returning the full and short strings.
    pub fn into_parts(self) -> (String, String) {
        (self.identifier, self.short)
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.identifier)
    }
}

/// Computes the identifier of `meta`.
///
/// The digest is taken over [`canonicalize`]`(meta)`, so the result is a
/// pure function of the metadata and `options`.
///
/// ```
/// use git_file_id::{IdentifierOptions, RawMetadata, generate_identifier, normalize};
///
/// let raw: RawMetadata = serde_json::from_str(r#"{
///     "source": "local-git", "owner": "o", "repo": "r", "branch": "main",
///     "commitHash": "0123456789abcdef0123456789abcdef01234567",
///     "fileHash": "89abcdef0123456789abcdef0123456789abcdef",
///     "filePath": "README.md", "lastModified": "2024-01-15T10:30:00Z"
/// }"#).unwrap();
/// let id = generate_identifier(&normalize(&raw).unwrap(), &IdentifierOptions::default());
/// assert!(id.full().starts_with("sha256:"));
/// assert_eq!(id.short().len(), 12);
/// ```
pub fn generate_identifier(
    meta: &NormalizedMetadata,
    options: &IdentifierOptions,
) -> Identifier {
    let canonical = canonicalize(meta);
    let digest = options.algorithm.digest(canonical.as_bytes());
    let encoded = options.encoding.encode(&digest);

    let len = options.truncate.unwrap_or(DEFAULT_SHORT_LEN).min(encoded.len());
    // Both encodings produce ASCII, so byte slicing is on a char boundary.
    let truncated = &encoded[..len];
    let short = match options.short_form {
        ShortForm::Digest => truncated.to_owned(),
        ShortForm::Prefixed => format!("{}:{truncated}", options.algorithm),
    };

    Identifier {
        identifier: format!("{}:{encoded}", options.algorithm),
        short,
        algorithm: options.algorithm,
    }
}
