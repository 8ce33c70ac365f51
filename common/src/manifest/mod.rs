//! Manifest format, streaming reader and generator
//!
//! A manifest is a UTF-8 text file with one `SOURCE;DESTINATION` mapping per line:
//!
//! ```text
//! /home/user/photos/;/mnt/backup/photos/
//! docs/report.pdf;/mnt/backup/docs/
//! ```
//!
//! A source ending with a separator stands for the contents of that directory rather than the
//! directory itself. There is no escaping, so a path containing `;` cannot be expressed.

use std::path::{Path, PathBuf};

mod generate;
mod reader;

pub use generate::{Mapping, WriteSummary, collect, write_manifest};
pub use reader::{ManifestReader, parse_line};

pub const SEPARATOR: char = ';';

/// One source to destination mapping with both sides normalized to absolute paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    source: PathBuf,
    destination: PathBuf,
}

impl ManifestEntry {
    /// Builds an entry from raw paths, normalizing both sides.
    pub fn normalized(
        source: &Path,
        destination: &Path,
    ) -> Result<Self, crate::path::NormalizeError> {
        Ok(Self {
            source: crate::path::normalize(source)?,
            destination: crate::path::normalize(destination)?,
        })
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// True if the source names the contents of a directory (trailing separator).
    pub fn copies_contents(&self) -> bool {
        crate::path::has_trailing_separator(&self.source)
    }
}

impl std::fmt::Display for ManifestEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "{} => {}",
            self.source.display(),
            self.destination.display()
        )
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("empty line at line {line}")]
    Blank { line: usize },

    #[error("{reason} at line {line}")]
    Syntax { line: usize, reason: &'static str },

    #[error("cannot normalize paths at line {line}: {source}")]
    Normalize {
        line: usize,
        #[source]
        source: crate::path::NormalizeError,
    },

    #[error("failed reading manifest at line {line}: {source}")]
    Io {
        line: usize,
        #[source]
        source: std::io::Error,
    },
}

impl ManifestError {
    /// Recoverable errors affect only their own line; reading may continue.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, ManifestError::Io { .. })
    }

    /// 1-based line number the error refers to.
    pub fn line(&self) -> usize {
        match self {
            ManifestError::Blank { line }
            | ManifestError::Syntax { line, .. }
            | ManifestError::Normalize { line, .. }
            | ManifestError::Io { line, .. } => *line,
        }
    }
}
