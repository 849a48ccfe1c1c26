//! Shared utility functions for CLI commands

use std::path::{Path, PathBuf};

use crate::error::{CliError, Result};

/// Read the first line of a version file, trimmed
pub fn read_version_file(path: &Path) -> Result<String> {
    let content = std::fs::read_to_string(path).map_err(|e| CliError::Io {
        message: format!("{}: {}", path.display(), e),
    })?;
    Ok(content.lines().next().unwrap_or_default().trim().to_string())
}

/// Pick a version from an explicit value, falling back to a version file
///
/// An explicit value is used verbatim; a value read from a file is trimmed.
/// Returns `None` when neither yields a non-empty string.
pub fn resolve_version(explicit: Option<&str>, file: Option<&Path>) -> Result<Option<String>> {
    let version = match (explicit.filter(|v| !v.is_empty()), file) {
        (Some(value), _) => value.to_string(),
        (None, Some(path)) => read_version_file(path)?,
        (None, None) => String::new(),
    };
    Ok(Some(version).filter(|v| !v.is_empty()))
}

/// Resolve `path` against the working directory
#[must_use]
pub fn in_working_dir(working_dir: &Path, path: &Path) -> PathBuf {
    working_dir.join(path)
}
