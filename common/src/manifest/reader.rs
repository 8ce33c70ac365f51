use anyhow::Context;
use std::path::Path;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use super::{ManifestEntry, ManifestError, SEPARATOR};

/// Parses a single manifest line (without its terminator) into a normalized entry.
pub fn parse_line(text: &str, line: usize) -> Result<ManifestEntry, ManifestError> {
    if text.is_empty() {
        return Err(ManifestError::Blank { line });
    }
    let mut fields = text.split(SEPARATOR);
    let (source, destination) = match (fields.next(), fields.next(), fields.next()) {
        (Some(source), Some(destination), None) => (source, destination),
        (_, _, Some(_)) => {
            return Err(ManifestError::Syntax {
                line,
                reason: "too many fields",
            });
        }
        _ => {
            return Err(ManifestError::Syntax {
                line,
                reason: "missing separator",
            });
        }
    };
    if source.is_empty() || destination.is_empty() {
        return Err(ManifestError::Syntax {
            line,
            reason: "empty field",
        });
    }
    ManifestEntry::normalized(Path::new(source), Path::new(destination))
        .map_err(|source| ManifestError::Normalize { line, source })
}

enum Source {
    Lines(Box<dyn AsyncBufRead + Send + Unpin>),
    Single(Option<ManifestEntry>),
}

/// Streaming manifest reader: yields one entry per line without buffering the whole file.
pub struct ManifestReader {
    source: Source,
    line: usize,
}

impl std::fmt::Debug for ManifestReader {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let kind = match self.source {
            Source::Lines(_) => "lines",
            Source::Single(_) => "single",
        };
        f.debug_struct("ManifestReader")
            .field("source", &kind)
            .field("line", &self.line)
            .finish()
    }
}

impl ManifestReader {
    pub async fn open(path: &Path) -> anyhow::Result<Self> {
        let file = tokio::fs::File::open(path)
            .await
            .with_context(|| format!("cannot open manifest {:?}", path))?;
        tracing::debug!("reading manifest {:?}", path);
        Ok(Self::from_reader(tokio::io::BufReader::new(file)))
    }

    pub fn from_reader<R>(reader: R) -> Self
    where
        R: AsyncBufRead + Send + Unpin + 'static,
    {
        Self {
            source: Source::Lines(Box::new(reader)),
            line: 0,
        }
    }

    /// A stream holding exactly one entry, used when source and destination come straight
    /// from the command line.
    pub fn from_pair(entry: ManifestEntry) -> Self {
        Self {
            source: Source::Single(Some(entry)),
            line: 0,
        }
    }

    /// Number of lines consumed so far.
    pub fn line(&self) -> usize {
        self.line
    }

    /// Reads the next entry. `Ok(None)` marks the end of input.
    ///
    /// Lines of any length are accepted: the buffered reader keeps filling until it sees the
    /// terminator or the end of input. Both `\n` and `\r\n` terminators are handled.
    pub async fn read_entry(&mut self) -> Result<Option<ManifestEntry>, ManifestError> {
        let reader = match &mut self.source {
            Source::Single(entry) => {
                let entry = entry.take();
                if entry.is_some() {
                    self.line += 1;
                }
                return Ok(entry);
            }
            Source::Lines(reader) => reader,
        };
        let mut buffer = Vec::new();
        let read = reader
            .read_until(b'\n', &mut buffer)
            .await
            .map_err(|source| ManifestError::Io {
                line: self.line + 1,
                source,
            })?;
        if read == 0 {
            return Ok(None);
        }
        self.line += 1;
        if buffer.last() == Some(&b'\n') {
            buffer.pop();
            if buffer.last() == Some(&b'\r') {
                buffer.pop();
            }
        }
        let text = std::str::from_utf8(&buffer).map_err(|_| ManifestError::Syntax {
            line: self.line,
            reason: "invalid UTF-8",
        })?;
        parse_line(text, self.line).map(Some)
    }
}
