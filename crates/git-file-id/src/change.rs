// Copyright 2026 Oxide Computer Company

//! Pairwise change detection.

use crate::RawMetadata;

/// Returns true if the file described by `b` may differ from the one
/// described by `a`.
///
/// The comparison is conservative: when sameness cannot be shown, the
/// file is reported as changed.
///
/// 1. If either side is absent or has no fields set, it has changed.
/// 2. If both sides carry a `fileHash`, the hashes decide.
/// 3. Otherwise, if both sides carry a `commitHash`, those decide.
/// 4. Otherwise it has changed.
///
/// Hashes compare case-insensitively. An empty hash string counts as
/// absent.
pub fn has_changed(a: Option<&RawMetadata>, b: Option<&RawMetadata>) -> bool {
    let (Some(a), Some(b)) = (a, b) else {
        return true;
    };
    if a.is_empty() || b.is_empty() {
        return true;
    }

    if let (Some(x), Some(y)) = (present(&a.file_hash), present(&b.file_hash)) {
        return !x.eq_ignore_ascii_case(y);
    }
    if let (Some(x), Some(y)) = (present(&a.commit_hash), present(&b.commit_hash))
    {
        return !x.eq_ignore_ascii_case(y);
    }
    true
}

/// Returns true if both identifiers are present, non-empty, and equal.
pub fn identifiers_equal(a: Option<&str>, b: Option<&str>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => !a.is_empty() && a == b,
        _ => false,
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}
