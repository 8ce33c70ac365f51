//! Path normalization that keeps a significant trailing separator
//!
//! A trailing separator on a user supplied path carries meaning: `dir/` names the *contents*
//! of `dir` while `dir` names the directory itself. Turning a path into its absolute form
//! drops that separator, so every helper here re-applies it based on the original input.

use std::path::{Component, Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum NormalizeError {
    #[error("cannot resolve {path:?} against the current directory: {source}")]
    CurrentDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot express {path:?} relative to {base:?}")]
    NotRelative { path: PathBuf, base: PathBuf },
}

/// Returns true if the raw path string ends with a path separator.
pub fn has_trailing_separator(path: &Path) -> bool {
    path.as_os_str()
        .as_encoded_bytes()
        .last()
        .is_some_and(|byte| std::path::is_separator(*byte as char))
}

/// Re-appends a separator to `normalized` if `original` ended with one.
pub fn preserve_trailing_separator(original: &Path, normalized: PathBuf) -> PathBuf {
    if !has_trailing_separator(original) || has_trailing_separator(&normalized) {
        return normalized;
    }
    let mut raw = normalized.into_os_string();
    raw.push(std::path::MAIN_SEPARATOR_STR);
    PathBuf::from(raw)
}

// lexical cleanup of an absolute path: drops `.` and resolves `..` without touching the
// filesystem, `..` at the root stays at the root
fn clean(path: &Path) -> PathBuf {
    let mut cleaned = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !matches!(
                    cleaned.components().next_back(),
                    None | Some(Component::RootDir) | Some(Component::Prefix(_))
                ) {
                    cleaned.pop();
                }
            }
            other => cleaned.push(other.as_os_str()),
        }
    }
    cleaned
}

fn absolute(path: &Path) -> Result<PathBuf, NormalizeError> {
    if path.is_absolute() {
        return Ok(clean(path));
    }
    let cwd = std::env::current_dir().map_err(|source| NormalizeError::CurrentDir {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(clean(&cwd.join(path)))
}

/// Converts `path` to a clean absolute path, resolving relative paths against the current
/// working directory.
///
/// A trailing separator on the input is kept on the output:
///
/// ```
/// let normalized = common::path::normalize(std::path::Path::new("/data/./photos/")).unwrap();
/// assert_eq!(normalized, std::path::PathBuf::from("/data/photos/"));
/// assert!(common::path::has_trailing_separator(&normalized));
/// ```
pub fn normalize(path: &Path) -> Result<PathBuf, NormalizeError> {
    Ok(preserve_trailing_separator(path, absolute(path)?))
}

/// Checks whether `path` denotes the current working directory.
pub fn is_current_dir(path: &Path) -> Result<bool, NormalizeError> {
    let cwd = std::env::current_dir().map_err(|source| NormalizeError::CurrentDir {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(absolute(path)? == clean(&cwd))
}

/// Expresses the absolute `path` relative to the absolute directory `base`.
///
/// Fails when no relative form exists, e.g. the two paths live on different volumes. The
/// trailing separator of `path`, if any, is carried over to the result.
pub fn relative_to(path: &Path, base: &Path) -> Result<PathBuf, NormalizeError> {
    let not_relative = || NormalizeError::NotRelative {
        path: path.to_path_buf(),
        base: base.to_path_buf(),
    };
    if !path.is_absolute() || !base.is_absolute() {
        return Err(not_relative());
    }
    let target = clean(path);
    let base_clean = clean(base);
    let target_parts: Vec<Component> = target.components().collect();
    let base_parts: Vec<Component> = base_clean.components().collect();
    if target_parts.first() != base_parts.first() {
        return Err(not_relative());
    }
    let common = target_parts
        .iter()
        .zip(&base_parts)
        .take_while(|(lhs, rhs)| lhs == rhs)
        .count();
    let mut relative = PathBuf::new();
    for _ in common..base_parts.len() {
        relative.push("..");
    }
    for part in &target_parts[common..] {
        relative.push(part.as_os_str());
    }
    if relative.as_os_str().is_empty() {
        relative.push(".");
    }
    Ok(preserve_trailing_separator(path, relative))
}
