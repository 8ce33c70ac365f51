//! Run-level errors
//!
//! Everything here aborts the run. Problems confined to a single manifest entry are reported
//! through [`crate::manifest::ManifestError`] or the per-entry logs and never surface as an
//! [`Error`].

use crate::exit::ExitStatus;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{0}")]
    Usage(String),

    #[error("{0:#}")]
    Log(#[source] anyhow::Error),

    #[error("{0:#}")]
    ManifestRead(#[source] anyhow::Error),

    #[error("{0:#}")]
    ManifestWrite(#[source] anyhow::Error),

    #[error(transparent)]
    UtilNotFound(#[from] crate::lookfor::NotFound),

    #[error("{0:#}")]
    NotFound(#[source] anyhow::Error),

    #[error("{0:#}")]
    Internal(#[source] anyhow::Error),
}

impl Error {
    /// Wraps a failed write to the main transcript.
    pub fn logging(error: std::io::Error) -> Self {
        Error::Log(anyhow::Error::new(error).context("failed writing to the main log"))
    }

    pub fn exit_status(&self) -> ExitStatus {
        match self {
            Error::Usage(_) => ExitStatus::Usage,
            Error::Log(_) => ExitStatus::LogError,
            Error::ManifestRead(_) => ExitStatus::ManifestRead,
            Error::ManifestWrite(_) => ExitStatus::ManifestWrite,
            Error::UtilNotFound(_) => ExitStatus::UtilNotFound,
            Error::NotFound(_) => ExitStatus::NotFound,
            Error::Internal(_) => ExitStatus::Internal,
        }
    }
}
