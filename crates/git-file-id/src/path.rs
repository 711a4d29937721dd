// Copyright 2026 Oxide Computer Company

//! Lexical path normalization.

use camino::Utf8Path;

/// Normalizes a file path to a slash-delimited, relative form.
///
/// Applied in order:
///
/// 1. Backslashes become forward slashes.
/// 2. One leading `./` is stripped.
/// 3. All trailing `/` are stripped.
/// 4. Runs of `/` collapse into a single `/`.
///
/// If the result still starts with `./` (as `././a` does), the
/// steps are repeated until it does not, so `normalize_path` is idempotent.
///
/// This is purely lexical: `..` segments are kept and the file system is
/// never consulted.
///
/// ```
/// use git_file_id::normalize_path;
///
/// assert_eq!(normalize_path("./src/index.py"), "src/index.py");
/// assert_eq!(normalize_path("src\\utils\\path.py"), "src/utils/path.py");
/// assert_eq!(normalize_path("src//utils///file.py"), "src/utils/file.py");
/// ```
pub fn normalize_path(path: &str) -> String {
    let slashed = path.replace('\\', "/");
    let stripped = slashed.strip_prefix("./").unwrap_or(&slashed);
    let trimmed = stripped.trim_end_matches('/');

    let mut out = String::with_capacity(trimmed.len());
    let mut prev_slash = false;
    for c in trimmed.chars() {
        if c == '/' {
            if prev_slash {
                continue;
            }
            prev_slash = true;
        } else {
            prev_slash = false;
        }
        out.push(c);
    }

    // Stripping "./" can expose another one (e.g. "././a" or "./.\\a"),
    // which a second pass would remove. Loop until stable so the function
    // is idempotent.
    if out != path && out.starts_with("./") {
        return normalize_path(&out);
    }
    out
}

/// Makes `file_path` relative to `repo_root` when it is absolute and lies
/// beneath the root, then normalizes it with [`normalize_path`].
///
/// Paths outside the root, and relative paths, are only normalized.
pub fn resolve_relative(repo_root: &Utf8Path, file_path: &str) -> String {
    let path = Utf8Path::new(file_path);
    if path.is_absolute() {
        if let Ok(relative) = path.strip_prefix(repo_root) {
            return normalize_path(relative.as_str());
        }
    }
    normalize_path(file_path)
}
