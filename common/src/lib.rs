//! Common utilities and types for the migrate tool
//!
//! The `migrate` binary moves files and directories by handing each source and destination
//! pair to an external copy utility (`rsync` on POSIX, `robocopy` on Windows). This crate
//! holds everything except argument parsing.
//!
//! # Core Modules
//!
//! - [`path`] - Lexical path normalization that keeps a significant trailing separator
//! - [`lookfor`] - Locating the copy utility in the working directory or on `PATH`
//! - [`logger`] - Main transcript plus one log file per failed entry
//! - [`manifest`] - Streaming manifest reader and manifest generation
//! - [`transfer`] - Running the copy utility for each manifest entry
//!
//! # Manifest
//!
//! One `SOURCE;DESTINATION` pair per line. A source ending with a separator stands for the
//! contents of a directory:
//!
//! ```text
//! /home/user/photos/;/mnt/backup/photos/
//! ```
//!
//! # Error Handling
//!
//! Errors that end a run are [`Error`] values, each mapped to an [`ExitStatus`]. Problems with a
//! single manifest line or a single copy are logged and the run continues.

pub mod config;
pub mod error;
pub mod exit;
pub mod logger;
pub mod lookfor;
pub mod manifest;
pub mod path;
pub mod transfer;

#[cfg(test)]
mod testutils;

pub use config::{GenerateConfig, OutputConfig, RuntimeConfig, TransferConfig};
pub use error::Error;
pub use exit::ExitStatus;

fn init_tracing(output: &OutputConfig) {
    let level = if output.quiet {
        "off"
    } else {
        match output.verbose {
            0 => "error",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    // a subscriber installed earlier (tests, embedding programs) wins
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn build_runtime(runtime: &RuntimeConfig) -> anyhow::Result<tokio::runtime::Runtime> {
    let mut builder = tokio::runtime::Builder::new_multi_thread();
    builder.enable_all();
    if runtime.max_workers > 0 {
        builder.worker_threads(runtime.max_workers);
    }
    if runtime.max_blocking_threads > 0 {
        builder.max_blocking_threads(runtime.max_blocking_threads);
    }
    Ok(builder.build()?)
}

/// Sets up console diagnostics and the tokio runtime, then drives `func` to completion.
///
/// On success the summary is printed to stdout when requested. Errors are reported through
/// `tracing` and returned so the caller can pick the exit status.
pub fn run<Fut, Summary>(
    output: OutputConfig,
    runtime: RuntimeConfig,
    func: impl FnOnce() -> Fut,
) -> Result<Summary, Error>
where
    Summary: std::fmt::Display,
    Fut: std::future::Future<Output = Result<Summary, Error>>,
{
    init_tracing(&output);
    let runtime = build_runtime(&runtime)
        .map_err(|error| Error::Internal(error.context("failed to start the tokio runtime")))?;
    let res = runtime.block_on(func());
    match &res {
        Ok(summary) => {
            if output.print_summary {
                println!("{summary}");
            }
        }
        Err(error) => {
            tracing::error!("{:#}", error);
        }
    }
    res
}
