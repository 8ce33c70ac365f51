use std::io::Write;
use std::path::{Path, PathBuf};

use super::Level;

const TIMESTAMP_FORMAT: &str = "%Y/%m/%dT%H:%M:%S%.6f";

/// Append-only text log bound to a single file.
///
/// All writes go through a mutex owned by this file, so one `LogFile` can be shared between
/// tasks. After [`LogFile::close`] the handle is released and every further write is
/// silently discarded: it reports zero bytes written and no error.
#[derive(Debug)]
pub struct LogFile {
    path: PathBuf,
    file: std::sync::Mutex<Option<std::fs::File>>,
}

impl LogFile {
    /// Opens (or creates) the log at `path` in append mode, adding a `.log` extension if
    /// missing and creating parent directories as needed.
    pub(crate) fn open(path: &Path) -> std::io::Result<Self> {
        let path = if path.extension().is_some_and(|ext| ext == "log") {
            path.to_path_buf()
        } else {
            let mut raw = path.as_os_str().to_owned();
            raw.push(".log");
            PathBuf::from(raw)
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)?;
        Ok(Self {
            path,
            file: std::sync::Mutex::new(Some(file)),
        })
    }

    fn handle(&self) -> std::sync::MutexGuard<'_, Option<std::fs::File>> {
        self.file
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_closed(&self) -> bool {
        self.handle().is_none()
    }

    /// Appends raw bytes. Returns the number of bytes written, zero once closed.
    pub fn write(&self, entry: &[u8]) -> std::io::Result<usize> {
        match self.handle().as_mut() {
            Some(file) => {
                file.write_all(entry)?;
                Ok(entry.len())
            }
            None => Ok(0),
        }
    }

    /// Appends a timestamped, newline-terminated entry.
    pub fn log(&self, level: Level, entry: &str) -> std::io::Result<()> {
        let timestamp = chrono::Local::now().format(TIMESTAMP_FORMAT);
        self.write(format!("{timestamp} [{level}] {entry}\n").as_bytes())?;
        Ok(())
    }

    /// Flushes and releases the underlying file. Closing an already closed file is a no-op.
    pub fn close(&self) -> std::io::Result<()> {
        match self.handle().take() {
            Some(file) => file.sync_all(),
            None => Ok(()),
        }
    }
}
