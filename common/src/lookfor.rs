//! Copy utility lookup
//!
//! Resolution order:
//! 1. absolute paths are accepted as given
//! 2. the platform executable suffix is appended when expected and missing
//! 3. a file with that name relative to the current directory wins
//! 4. otherwise each `PATH` directory is scanned (non-recursively) in order

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
#[error("executable {name:?} not found in the current directory or PATH")]
pub struct NotFound {
    pub name: String,
}

#[cfg(windows)]
const EXE_SUFFIX: Option<&str> = Some("exe");
#[cfg(not(windows))]
const EXE_SUFFIX: Option<&str> = None;

// windows file names are case-insensitive, everything else compares exactly
const CASE_INSENSITIVE: bool = cfg!(windows);

fn names_match(expected: &str, found: &str, case_insensitive: bool) -> bool {
    if case_insensitive {
        expected.to_lowercase() == found.to_lowercase()
    } else {
        expected == found
    }
}

/// Compares an executable name with a directory entry name using the platform's rules.
pub fn name_matches(expected: &str, found: &str) -> bool {
    names_match(expected, found, CASE_INSENSITIVE)
}

fn with_exe_suffix(name: &str) -> String {
    match EXE_SUFFIX {
        Some(suffix)
            if !Path::new(name)
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case(suffix)) =>
        {
            format!("{name}.{suffix}")
        }
        _ => name.to_string(),
    }
}

fn scan(name: &str, search_path: &OsStr, case_insensitive: bool) -> Option<PathBuf> {
    for dir in std::env::split_paths(search_path) {
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(error) => {
                tracing::trace!("skipping search path entry {:?}: {}", &dir, error);
                continue;
            }
        };
        // the last match within a directory wins, the first directory with a match wins
        let mut found = None;
        for entry in entries.flatten() {
            let file_name = entry.file_name();
            let Some(file_name) = file_name.to_str() else {
                continue;
            };
            if !names_match(name, file_name, case_insensitive) {
                continue;
            }
            if entry.file_type().is_ok_and(|file_type| !file_type.is_dir()) {
                found = Some(dir.join(file_name));
            }
        }
        if found.is_some() {
            return found;
        }
    }
    None
}

/// Scans the directories listed in `search_path` (formatted like `PATH`) for `name`.
pub fn search(name: &str, search_path: &OsStr) -> Option<PathBuf> {
    scan(name, search_path, CASE_INSENSITIVE)
}

/// Resolves the copy utility `name` to an absolute path.
pub fn exe(name: &str) -> Result<PathBuf, NotFound> {
    let not_found = || NotFound {
        name: name.to_string(),
    };
    if name.is_empty() {
        return Err(not_found());
    }
    if Path::new(name).is_absolute() {
        return Ok(PathBuf::from(name));
    }
    let name = with_exe_suffix(name);
    let local = Path::new(&name);
    if local.is_file() {
        return crate::path::normalize(local).map_err(|error| {
            tracing::debug!("cannot normalize {:?}: {}", local, error);
            not_found()
        });
    }
    let search_path = std::env::var_os("PATH").unwrap_or_default();
    let found = search(&name, &search_path).ok_or_else(not_found)?;
    tracing::debug!("resolved {:?} to {:?}", &name, &found);
    Ok(found)
}
