//! Glob expansion for multi-file import and delete.

use anyhow::{Context, Result};
use glob::glob;
use std::path::PathBuf;
use tracing::warn;

/// Files matching `pattern`, sorted. Directories are skipped.
///
/// A pattern without wildcards is a valid pattern matching itself, so plain
/// paths work too.
///
/// # Errors
/// The pattern is malformed or a matched entry cannot be read.
pub fn expand_glob(pattern: &str) -> Result<Vec<PathBuf>> {
    let paths = glob(pattern).with_context(|| format!("invalid glob pattern: {pattern}"))?;
    let mut result = Vec::new();
    for entry in paths {
        let path =
            entry.with_context(|| format!("error reading glob entry for pattern: {pattern}"))?;
        if path.is_file() {
            result.push(path);
        }
    }
    result.sort();
    Ok(result)
}

/// Expand every pattern in order; each pattern's matches are sorted.
///
/// A pattern with no matches contributes nothing and is logged.
///
/// # Errors
/// See [`expand_glob`].
pub fn expand_patterns<P: AsRef<str>>(patterns: &[P]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for pattern in patterns {
        let pattern = pattern.as_ref();
        let matched = expand_glob(pattern)?;
        if matched.is_empty() {
            warn!(pattern, "no files match");
        }
        files.extend(matched);
    }
    Ok(files)
}
