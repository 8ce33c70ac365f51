//! `migrate` - batch file migration through an external copy utility
//!
//! `migrate` reads a manifest of `SOURCE;DESTINATION` pairs and hands each pair to `rsync`
//! (or `robocopy` on Windows). Every step is recorded in a log directory, and a failing pair
//! gets its own log file without stopping the rest of the run.
//!
//! # Commands
//!
//! ```bash
//! # build a manifest with one line per child of ~/photos
//! migrate generate ~/photos/ /mnt/backup/photos/
//!
//! # see what would be run, then run it
//! migrate run --dryrun manifest.txt
//! migrate run manifest.txt
//!
//! # copy a single pair without a manifest
//! migrate run ~/docs /mnt/backup/
//! ```
//!
//! # Logs
//!
//! ```text
//! logs/
//! ├── migrate.log
//! └── files/
//!     └── home_user_photos_broken.log
//! ```

pub mod generate;
pub mod run;

pub use generate::GenerateRequest;
pub use run::RunRequest;

/// The fixed set of subcommands.
#[derive(Debug, Clone)]
pub enum Command {
    Run(RunRequest),
    Generate(GenerateRequest),
}

/// What a finished command reports with `--summary`.
#[derive(Debug)]
pub enum Report {
    Run(common::transfer::Summary),
    Generate(common::manifest::WriteSummary),
}

impl std::fmt::Display for Report {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Report::Run(summary) => write!(f, "{summary}"),
            Report::Generate(summary) => write!(f, "{summary}"),
        }
    }
}

impl Command {
    /// Usage lines shown after a usage error.
    pub fn usage(&self) -> &'static str {
        match self {
            Command::Run(_) => run::USAGE,
            Command::Generate(_) => generate::USAGE,
        }
    }

    pub async fn execute(self) -> Result<Report, common::Error> {
        match self {
            Command::Run(request) => run::run(request).await.map(Report::Run),
            Command::Generate(request) => generate::generate(request).await.map(Report::Generate),
        }
    }
}

/// Usage lines of every subcommand.
pub fn usage() -> String {
    format!("{}{}", run::USAGE, generate::USAGE)
}
