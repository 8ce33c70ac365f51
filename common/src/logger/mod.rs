//! Hierarchical run logs
//!
//! A log directory holds the main transcript (`migrate.log`) and a `files/` subdirectory with
//! one log per transferred entry:
//!
//! ```text
//! logs/
//! ├── migrate.log
//! └── files/
//!     └── home_user_photos.log
//! ```
//!
//! Locking is per resource: every [`LogFile`] has its own mutex and the map of per-entry files
//! has another, so writers working on unrelated entries never contend.

use anyhow::{Context, anyhow};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

mod logfile;

pub use logfile::LogFile;

pub const MAIN_LOG: &str = "migrate.log";
pub const FILES_DIR: &str = "files";

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Level {
    Info,
    Warn,
    Error,
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let name = match self {
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
        };
        write!(f, "{name}")
    }
}

/// Turns an entry identifier (usually its source path) into a flat file name.
pub fn sanitize_identifier(identifier: &str) -> String {
    let name: String = identifier
        .trim_start_matches(std::path::is_separator)
        .chars()
        .map(|c| {
            if std::path::is_separator(c)
                || matches!(c, ':' | '*' | '?' | '"' | '<' | '>' | '|')
                || c.is_control()
            {
                '_'
            } else {
                c
            }
        })
        .collect();
    if name.is_empty() { "_".to_string() } else { name }
}

// name of the per-entry log file for `identifier`, always ending in `.log`
fn log_file_name(identifier: &str) -> String {
    let name = sanitize_identifier(identifier);
    if Path::new(&name).extension().is_some_and(|ext| ext == "log") {
        name
    } else {
        format!("{name}.log")
    }
}

#[derive(Debug)]
pub struct Logger {
    dir: PathBuf,
    main: Arc<LogFile>,
    // keyed by log file name
    files: std::sync::Mutex<HashMap<String, Arc<LogFile>>>,
    closed: AtomicBool,
}

impl Logger {
    /// Prepares the log directory (and its `files/` subdirectory) and opens the main log.
    pub fn open(dir: &Path) -> anyhow::Result<Self> {
        let dir = crate::path::normalize(dir)
            .with_context(|| format!("cannot resolve log directory {:?}", dir))?;
        match std::fs::metadata(&dir) {
            Ok(metadata) if !metadata.is_dir() => {
                return Err(anyhow!("log path {:?} exists and is not a directory", &dir));
            }
            Ok(_) => {}
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {}
            Err(error) => {
                return Err(error)
                    .with_context(|| format!("failed reading metadata from {:?}", &dir));
            }
        }
        let files_dir = dir.join(FILES_DIR);
        std::fs::create_dir_all(&files_dir)
            .with_context(|| format!("cannot create log directory {:?}", &files_dir))?;
        let main_path = dir.join(MAIN_LOG);
        let main = LogFile::open(&main_path)
            .with_context(|| format!("cannot open main log {:?}", &main_path))?;
        tracing::debug!("logging to {:?}", &dir);
        Ok(Self {
            dir,
            main: Arc::new(main),
            files: std::sync::Mutex::new(HashMap::new()),
            closed: AtomicBool::new(false),
        })
    }

    /// Absolute path of the log directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn main(&self) -> &LogFile {
        &self.main
    }

    /// Appends a timestamped entry to the main transcript, mirroring it to the console
    /// diagnostics.
    pub fn log(&self, level: Level, entry: &str) -> std::io::Result<()> {
        match level {
            Level::Info => tracing::info!("{}", entry),
            Level::Warn => tracing::warn!("{}", entry),
            Level::Error => tracing::error!("{}", entry),
        }
        self.main.log(level, entry)
    }

    /// Appends raw bytes to the main transcript.
    pub fn write(&self, entry: &[u8]) -> std::io::Result<usize> {
        self.main.write(entry)
    }

    fn files(&self) -> std::sync::MutexGuard<'_, HashMap<String, Arc<LogFile>>> {
        self.files
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Returns the per-entry log for `identifier`, creating it on first use.
    ///
    /// Identifiers that flatten to the same file name share one [`LogFile`]. If the file cannot
    /// be created the main transcript is returned instead and the reason is recorded there.
    /// After [`Logger::close`] the closed main transcript is returned, so late writes are
    /// discarded.
    pub fn file(&self, identifier: &str) -> Arc<LogFile> {
        let mut files = self.files();
        if self.closed.load(Ordering::Acquire) {
            return self.main.clone();
        }
        let name = log_file_name(identifier);
        if let Some(file) = files.get(&name) {
            return file.clone();
        }
        match LogFile::open(&self.dir.join(FILES_DIR).join(&name)) {
            Ok(file) => {
                let file = Arc::new(file);
                files.insert(name, file.clone());
                file
            }
            Err(error) => {
                let _ = self.log(
                    Level::Error,
                    &format!(
                        "Cannot create log file for {identifier}. Logging to main log file instead."
                    ),
                );
                let _ = self.log(Level::Error, &error.to_string());
                self.main.clone()
            }
        }
    }

    /// Number of per-entry log files opened so far.
    pub fn file_count(&self) -> usize {
        self.files().len()
    }

    /// Closes every per-entry log and then the main transcript.
    ///
    /// Errors closing per-entry logs are recorded in the main transcript and otherwise
    /// ignored. Every file is closed even if the transcript cannot be written; the first
    /// transcript error is returned. Only the first call does any work.
    pub fn close(&self) -> std::io::Result<()> {
        let mut files = self.files();
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        let mut res = self.main.log(Level::Info, "Closing log files.");
        for (_, file) in files.drain() {
            if let Err(error) = file.close() {
                let _ = self.main.log(
                    Level::Error,
                    &format!(
                        "Error closing log file for {}. Ignoring error: {}",
                        file.path().display(),
                        error
                    ),
                );
            }
        }
        let closed = self.main.close();
        if res.is_ok() {
            res = closed;
        }
        res
    }
}

impl Drop for Logger {
    fn drop(&mut self) {
        if let Err(error) = self.close() {
            tracing::warn!("failed closing logs in {:?}: {}", &self.dir, error);
        }
    }
}
