//! Copy executor and the run loop over a stream of manifest entries
//!
//! Each entry is handed to the external copy utility on its own. A failing entry is recorded
//! in the main transcript and in its per-entry log and the run moves on to the next one; only
//! failures of the logs or of the manifest stream itself end the run.

use std::process::Stdio;
use tracing::instrument;

use crate::config::TransferConfig;
use crate::error::Error;
use crate::logger::{Level, LogFile, Logger};
use crate::manifest::{ManifestEntry, ManifestReader};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Outcome {
    DryRun,
    Copied,
    Failed,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Summary {
    pub entries_attempted: usize,
    pub entries_succeeded: usize,
    pub entries_failed: usize,
    pub lines_skipped: usize,
}

impl Summary {
    fn record(&mut self, outcome: Outcome) {
        self.entries_attempted += 1;
        match outcome {
            Outcome::DryRun | Outcome::Copied => self.entries_succeeded += 1,
            Outcome::Failed => self.entries_failed += 1,
        }
    }
}

impl std::fmt::Display for Summary {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "entries attempted: {}\n\
            entries succeeded: {}\n\
            entries failed: {}\n\
            manifest lines skipped: {}\n",
            self.entries_attempted,
            self.entries_succeeded,
            self.entries_failed,
            self.lines_skipped
        )
    }
}

fn write_detail(
    file: &LogFile,
    detail: &str,
    utility: &str,
    stdout: &[u8],
    stderr: &[u8],
) -> std::io::Result<()> {
    file.log(Level::Error, detail)?;
    file.log(Level::Error, &format!("{utility} output:"))?;
    file.write(stdout)?;
    file.write(stderr)?;
    Ok(())
}

fn record_failure(
    logger: &Logger,
    entry: &ManifestEntry,
    config: &TransferConfig,
    reason: &str,
    stdout: &[u8],
    stderr: &[u8],
) -> Result<(), Error> {
    let source = entry.source().display().to_string();
    logger
        .log(Level::Error, &format!("Error copying {source}."))
        .map_err(Error::logging)?;
    let file = logger.file(&source);
    let detail = format!("Error copying {source}: {reason}");
    let utility = config.utility.display().to_string();
    if let Err(error) = write_detail(&file, &detail, &utility, stdout, stderr) {
        logger
            .log(
                Level::Error,
                &format!("Cannot write log file for {source}: {error}"),
            )
            .map_err(Error::logging)?;
    }
    Ok(())
}

/// Runs the copy utility for one entry, or only logs the command in dry-run mode.
///
/// A failed copy is not an error: it is logged and reported as [`Outcome::Failed`]. Errors are
/// returned only when the main transcript cannot be written.
#[instrument(skip(config, logger))]
pub async fn execute(
    entry: &ManifestEntry,
    config: &TransferConfig,
    logger: &Logger,
) -> Result<Outcome, Error> {
    if config.dry_run {
        logger
            .log(Level::Info, &format!("  {}", config.render(entry)))
            .map_err(Error::logging)?;
        return Ok(Outcome::DryRun);
    }
    logger
        .log(
            Level::Info,
            &format!(
                "Copying {} to {}.",
                entry.source().display(),
                entry.destination().display()
            ),
        )
        .map_err(Error::logging)?;
    let output = tokio::process::Command::new(&config.utility)
        .args(config.args())
        .arg(entry.source())
        .arg(entry.destination())
        .stdin(Stdio::null())
        .output()
        .await;
    match output {
        Ok(output) if output.status.success() => {
            tracing::debug!(
                "{} output:\n{}",
                config.utility.display(),
                String::from_utf8_lossy(&output.stdout)
            );
            Ok(Outcome::Copied)
        }
        Ok(output) => {
            record_failure(
                logger,
                entry,
                config,
                &output.status.to_string(),
                &output.stdout,
                &output.stderr,
            )?;
            Ok(Outcome::Failed)
        }
        Err(error) => {
            record_failure(logger, entry, config, &error.to_string(), &[], &[])?;
            Ok(Outcome::Failed)
        }
    }
}

/// Consumes `reader` one entry at a time, executing each entry as it is read.
///
/// Malformed and blank manifest lines are logged as warnings and skipped. Failing to read the
/// manifest stream itself ends the run.
pub async fn run_manifest(
    reader: &mut ManifestReader,
    config: &TransferConfig,
    logger: &Logger,
) -> Result<Summary, Error> {
    let mut summary = Summary::default();
    loop {
        match reader.read_entry().await {
            Ok(Some(entry)) => summary.record(execute(&entry, config, logger).await?),
            Ok(None) => break,
            Err(error) if error.is_recoverable() => {
                logger
                    .log(Level::Warn, &format!("Error: {error}"))
                    .map_err(Error::logging)?;
                summary.lines_skipped += 1;
            }
            Err(error) => {
                let _ = logger.log(Level::Error, &format!("Error reading manifest: {error}"));
                return Err(Error::ManifestRead(error.into()));
            }
        }
    }
    logger
        .log(
            Level::Info,
            &format!(
                "Done. {} entries attempted, {} succeeded, {} failed, {} manifest lines skipped.",
                summary.entries_attempted,
                summary.entries_succeeded,
                summary.entries_failed,
                summary.lines_skipped
            ),
        )
        .map_err(Error::logging)?;
    Ok(summary)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::logger::{FILES_DIR, MAIN_LOG};
    use crate::testutils;
    use std::path::{Path, PathBuf};

    fn config(dir: &Path, dry_run: bool) -> TransferConfig {
        let script = testutils::fake_utility(dir);
        TransferConfig {
            dry_run,
            utility: PathBuf::from("/bin/sh"),
            utility_args: script.display().to_string(),
        }
    }

    fn manifest_reader(lines: &[String]) -> ManifestReader {
        let contents = lines.join("\n");
        ManifestReader::from_reader(std::io::Cursor::new(contents.into_bytes()))
    }

    fn read_main(dir: &Path) -> String {
        std::fs::read_to_string(dir.join(MAIN_LOG)).unwrap()
    }

    #[tokio::test]
    async fn one_failure_does_not_stop_the_run() {
        let tmp_dir = testutils::setup_test_dir();
        let root = tmp_dir.path();
        std::fs::write(root.join("bad.txt"), "bad").unwrap();
        std::fs::create_dir(root.join("out")).unwrap();
        let log_dir = root.join("logs");
        let logger = Logger::open(&log_dir).unwrap();
        let config = config(root, false);
        let mut reader = manifest_reader(&[
            format!("{};{}", root.join("src/0.txt").display(), root.join("out/0.txt").display()),
            format!("{};{}", root.join("bad.txt").display(), root.join("out/bad.txt").display()),
            format!("{};{}", root.join("src/bar").display(), root.join("out/bar").display()),
        ]);
        let summary = run_manifest(&mut reader, &config, &logger).await.unwrap();
        assert_eq!(
            summary,
            Summary {
                entries_attempted: 3,
                entries_succeeded: 2,
                entries_failed: 1,
                lines_skipped: 0,
            }
        );
        assert!(root.join("out/0.txt").is_file());
        assert!(root.join("out/bar/nested/2.txt").is_file());
        assert!(!root.join("out/bad.txt").exists());
        logger.close().unwrap();
        let per_entry: Vec<_> = std::fs::read_dir(log_dir.join(FILES_DIR))
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .collect();
        assert_eq!(per_entry.len(), 1);
        let detail = std::fs::read_to_string(&per_entry[0]).unwrap();
        assert!(detail.contains("[ERROR] Error copying"));
        assert!(detail.contains("exit status: 23"));
        assert!(detail.contains("/bin/sh output:"));
        assert!(detail.contains("copying "));
        assert!(detail.contains("cannot copy "));
        let main = read_main(&log_dir);
        assert_eq!(main.matches("[ERROR] Error copying").count(), 1);
        assert!(main.contains("3 entries attempted, 2 succeeded, 1 failed"));
    }

    #[tokio::test]
    async fn dry_run_touches_nothing() {
        let tmp_dir = testutils::setup_test_dir();
        let root = tmp_dir.path();
        let log_dir = root.join("logs");
        let logger = Logger::open(&log_dir).unwrap();
        let config = config(root, true);
        let source = root.join("src").join("");
        let destination = root.join("out");
        let entry = ManifestEntry::normalized(&source, &destination).unwrap();
        let mut reader = ManifestReader::from_pair(entry.clone());
        let summary = run_manifest(&mut reader, &config, &logger).await.unwrap();
        assert_eq!(summary.entries_attempted, 1);
        assert!(!destination.exists());
        logger.close().unwrap();
        let main = read_main(&log_dir);
        assert!(main.contains(&format!("[INFO]   {}", config.render(&entry))));
        assert!(!main.contains("Copying "));
    }

    #[tokio::test]
    async fn missing_utility_fails_the_entry_only() {
        let tmp_dir = testutils::setup_test_dir();
        let root = tmp_dir.path();
        let log_dir = root.join("logs");
        let logger = Logger::open(&log_dir).unwrap();
        let config = TransferConfig {
            dry_run: false,
            utility: root.join("no-such-utility"),
            utility_args: String::new(),
        };
        let entry = ManifestEntry::normalized(&root.join("src"), &root.join("out")).unwrap();
        assert_eq!(
            execute(&entry, &config, &logger).await.unwrap(),
            Outcome::Failed
        );
        assert_eq!(logger.file_count(), 1);
    }

    #[tokio::test]
    async fn malformed_lines_are_warned_and_skipped() {
        let tmp_dir = testutils::setup_test_dir();
        let root = tmp_dir.path();
        let log_dir = root.join("logs");
        let logger = Logger::open(&log_dir).unwrap();
        let config = config(root, true);
        let mut reader = manifest_reader(&[
            "/a;/b".to_string(),
            "no-separator".to_string(),
            String::new(),
            "/c;/d".to_string(),
        ]);
        let summary = run_manifest(&mut reader, &config, &logger).await.unwrap();
        assert_eq!(summary.entries_attempted, 2);
        assert_eq!(summary.lines_skipped, 2);
        logger.close().unwrap();
        let main = read_main(&log_dir);
        assert!(main.contains("[WARN] Error: missing separator at line 2"));
        assert!(main.contains("[WARN] Error: empty line at line 3"));
    }
}
