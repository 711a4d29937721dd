// Copyright 2026 Oxide Computer Company

//! Environment variable helpers.

use crate::EnvError;

/// Reads an environment variable, trimmed of surrounding whitespace.
///
/// Returns `None` if the variable is unset or blank, and an error if it is
/// set but not valid UTF-8.
pub(crate) fn read_env(var: &'static str) -> Result<Option<String>, EnvError> {
    match std::env::var(var) {
        Ok(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                Ok(None)
            } else {
                Ok(Some(trimmed.to_owned()))
            }
        }
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(std::env::VarError::NotUnicode(value)) => {
            Err(EnvError::NonUtf8 { var, value })
        }
    }
}

/// Like [`read_env`], falling back to `default` if the variable is unset
/// or blank.
pub(crate) fn read_env_or(
    var: &'static str,
    default: &str,
) -> Result<String, EnvError> {
    Ok(read_env(var)?.unwrap_or_else(|| default.to_owned()))
}
