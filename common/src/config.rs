//! Configuration types for runtime and execution settings

use std::path::PathBuf;

use crate::manifest::ManifestEntry;

/// Log directory used when none is given
pub const DEFAULT_LOG_DIR: &str = "logs";

/// Manifest file name used when none is given
pub const DEFAULT_MANIFEST: &str = "manifest.txt";

#[cfg(windows)]
pub const DEFAULT_UTILITY: &str = "robocopy";
#[cfg(windows)]
pub const DEFAULT_UTILITY_ARGS: &str = "/E /COPY:DAT";

#[cfg(not(windows))]
pub const DEFAULT_UTILITY: &str = "rsync";
#[cfg(not(windows))]
pub const DEFAULT_UTILITY_ARGS: &str = "-avr";

/// Runtime configuration for tokio and thread pools
#[derive(Debug, Clone, Copy, Default)]
pub struct RuntimeConfig {
    /// Number of worker threads (0 = number of CPU cores)
    pub max_workers: usize,
    /// Number of blocking threads (0 = tokio default of 512)
    pub max_blocking_threads: usize,
}

/// Output and logging configuration
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputConfig {
    /// Suppress error output
    pub quiet: bool,
    /// Verbosity level: 0=ERROR, 1=INFO, 2=DEBUG, 3=TRACE
    pub verbose: u8,
    /// Print summary statistics at the end
    pub print_summary: bool,
}

/// Settings of a transfer run, fixed once the run starts
#[derive(Debug, Clone)]
pub struct TransferConfig {
    /// Log the commands instead of running them
    pub dry_run: bool,
    /// Resolved absolute path of the copy utility
    pub utility: PathBuf,
    /// Arguments passed to the utility ahead of source and destination
    pub utility_args: String,
}

impl TransferConfig {
    /// Utility arguments as separate argv elements.
    pub fn args(&self) -> impl Iterator<Item = &str> {
        self.utility_args.split_whitespace()
    }

    /// The command line that would be run for `entry`, as shown in dry-run logs.
    pub fn render(&self, entry: &ManifestEntry) -> String {
        let mut parts = vec![self.utility.display().to_string()];
        parts.extend(self.args().map(str::to_string));
        parts.push(entry.source().display().to_string());
        parts.push(entry.destination().display().to_string());
        parts.join(" ")
    }
}

/// Settings for writing a generated manifest
#[derive(Debug, Clone, Copy)]
pub struct GenerateConfig {
    /// Truncate an existing manifest instead of appending to it
    pub overwrite: bool,
    /// Write sources relative to the manifest's directory
    pub relative_source: bool,
    /// Write destinations relative to the manifest's directory
    pub relative_destination: bool,
}

impl Default for GenerateConfig {
    fn default() -> Self {
        Self {
            overwrite: false,
            relative_source: true,
            relative_destination: false,
        }
    }
}
