use anyhow::{Context, anyhow};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

use crate::config::GenerateConfig;
use crate::error::Error;
use crate::logger::{Level, Logger};
use crate::path::has_trailing_separator;

use super::SEPARATOR;

/// Source to destination mappings keyed by source path; inserting an existing source replaces
/// its destination.
pub type Mapping = BTreeMap<PathBuf, PathBuf>;

#[derive(Debug, Default, Copy, Clone)]
pub struct WriteSummary {
    pub entries_written: usize,
    pub entries_skipped: usize,
}

impl std::fmt::Display for WriteSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        writeln!(f, "entries written: {}", self.entries_written)?;
        writeln!(f, "entries skipped: {}", self.entries_skipped)
    }
}

// records a per-source failure in the transcript and the source's own log
fn record_failure(
    logger: &Logger,
    source: &Path,
    summary: &str,
    detail: &str,
) -> Result<(), Error> {
    logger.log(Level::Error, summary).map_err(Error::logging)?;
    let identifier = source.to_string_lossy();
    if let Err(error) = logger.file(&identifier).log(Level::Error, detail) {
        logger
            .log(
                Level::Error,
                &format!("Cannot write log file for {identifier}: {error}"),
            )
            .map_err(Error::logging)?;
    }
    Ok(())
}

fn scan_failure(logger: &Logger, source: &Path, summary: &str, error: anyhow::Error) -> Error {
    let detail = format!("{summary}: {error:#}");
    let summary = format!("{summary} for {}", source.display());
    if let Err(log_error) = record_failure(logger, source, &summary, &detail) {
        return log_error;
    }
    Error::ManifestWrite(error.context(summary))
}

/// Adds the mappings for `source` to `mapping`.
///
/// A file, or a directory named without a trailing separator, maps as a single entry. A
/// directory with a trailing separator (or the current directory) maps each of its immediate
/// children; nested directories are not expanded. Both paths are expected to be normalized.
pub async fn collect(
    logger: &Logger,
    source: &Path,
    destination: &Path,
    mapping: &mut Mapping,
) -> Result<(), Error> {
    logger
        .log(
            Level::Info,
            &format!("Generating mapping for {}", source.display()),
        )
        .map_err(Error::logging)?;
    let metadata = match tokio::fs::metadata(source).await {
        Ok(metadata) => metadata,
        Err(error) => {
            return Err(scan_failure(
                logger,
                source,
                "Error generating mapping",
                error.into(),
            ));
        }
    };
    let contents_only = has_trailing_separator(source);
    let mut files = vec![];
    if metadata.is_dir() {
        let is_cwd = match crate::path::is_current_dir(source) {
            Ok(is_cwd) => is_cwd,
            Err(error) => {
                return Err(
                    scan_failure(logger, source, "Error checking directory", error.into()),
                );
            }
        };
        if contents_only || is_cwd {
            let mut entries = match tokio::fs::read_dir(source).await {
                Ok(entries) => entries,
                Err(error) => {
                    return Err(scan_failure(
                        logger,
                        source,
                        "Error reading directory contents",
                        error.into(),
                    ));
                }
            };
            loop {
                match entries.next_entry().await {
                    Ok(Some(entry)) => files.push(entry.path()),
                    Ok(None) => break,
                    Err(error) => {
                        return Err(scan_failure(
                            logger,
                            source,
                            "Error reading directory contents",
                            error.into(),
                        ));
                    }
                }
            }
            files.sort();
        }
    }
    if files.is_empty() && !contents_only {
        files.push(source.to_path_buf());
    }
    for file in files {
        logger
            .log(Level::Info, &format!("Found {}", file.display()))
            .map_err(Error::logging)?;
        mapping.insert(file, destination.to_path_buf());
    }
    Ok(())
}

fn manifest_side(path: &Path, base: &Path, relative: bool) -> anyhow::Result<String> {
    let path = if relative {
        crate::path::relative_to(path, base)?
    } else {
        path.to_path_buf()
    };
    let text = path
        .to_str()
        .ok_or_else(|| anyhow!("path {:?} is not valid UTF-8", &path))?;
    if text.contains(SEPARATOR) {
        return Err(anyhow!(
            "path {:?} contains the manifest separator '{}'",
            &path,
            SEPARATOR
        ));
    }
    Ok(text.to_string())
}

/// Writes `mapping` to the manifest at `manifest` (absolute), one `source;destination` line
/// per mapping.
///
/// Paths are optionally rewritten relative to the manifest's directory. Entries that cannot
/// be expressed are skipped and logged rather than aborting the whole manifest.
pub async fn write_manifest(
    logger: &Logger,
    manifest: &Path,
    mapping: &Mapping,
    config: &GenerateConfig,
) -> Result<WriteSummary, Error> {
    logger
        .log(
            Level::Info,
            &format!("Opening manifest file at {}", manifest.display()),
        )
        .map_err(Error::logging)?;
    let mut options = tokio::fs::OpenOptions::new();
    options.create(true).write(true);
    if config.overwrite {
        options.truncate(true);
    } else {
        options.append(true);
    }
    let file = match options.open(manifest).await {
        Ok(file) => file,
        Err(error) => {
            logger
                .log(Level::Error, &format!("Error opening manifest: {error}"))
                .map_err(Error::logging)?;
            return Err(Error::ManifestWrite(
                anyhow::Error::new(error).context(format!("cannot open manifest {:?}", manifest)),
            ));
        }
    };
    let base = manifest.parent().unwrap_or(manifest);
    let mut writer = tokio::io::BufWriter::new(file);
    let mut summary = WriteSummary::default();
    for (source, destination) in mapping {
        logger
            .log(
                Level::Info,
                &format!("Writing manifest entry for {}", source.display()),
            )
            .map_err(Error::logging)?;
        let sides = manifest_side(source, base, config.relative_source)
            .context("Error creating src path")
            .and_then(|source_text| {
                manifest_side(destination, base, config.relative_destination)
                    .context("Error creating dest path")
                    .map(|destination_text| (source_text, destination_text))
            });
        let line = match sides {
            Ok((source_text, destination_text)) => {
                format!("{source_text}{SEPARATOR}{destination_text}\n")
            }
            Err(error) => {
                record_failure(
                    logger,
                    source,
                    &format!(
                        "Unable to create manifest entry for {}. Skipping.",
                        source.display()
                    ),
                    &format!("{error:#}"),
                )?;
                summary.entries_skipped += 1;
                continue;
            }
        };
        if let Err(error) = writer.write_all(line.as_bytes()).await {
            record_failure(
                logger,
                source,
                &format!(
                    "Unable to write manifest entry for {}. Skipping.",
                    source.display()
                ),
                &format!("Error writing manifest entry: {error}"),
            )?;
            summary.entries_skipped += 1;
            continue;
        }
        summary.entries_written += 1;
    }
    writer
        .flush()
        .await
        .with_context(|| format!("failed writing manifest {:?}", manifest))
        .map_err(Error::ManifestWrite)?;
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::ManifestReader;
    use crate::testutils;

    fn logger(tmp_dir: &tempfile::TempDir) -> Logger {
        Logger::open(&tmp_dir.path().join("logs")).unwrap()
    }

    #[tokio::test]
    async fn directory_without_separator_is_one_entry() {
        let tmp_dir = testutils::setup_test_dir();
        let logger = logger(&tmp_dir);
        let src = tmp_dir.path().join("src");
        let dst = tmp_dir.path().join("dst/");
        let mut mapping = Mapping::new();
        collect(&logger, &src, &dst, &mut mapping).await.unwrap();
        assert_eq!(mapping.len(), 1);
        assert_eq!(mapping.get(&src), Some(&dst));
    }

    #[tokio::test]
    async fn directory_with_separator_lists_children() {
        let tmp_dir = testutils::setup_test_dir();
        let logger = logger(&tmp_dir);
        let src = tmp_dir.path().join("src").join("");
        let dst = tmp_dir.path().join("dst").join("");
        let mut mapping = Mapping::new();
        collect(&logger, &src, &dst, &mut mapping).await.unwrap();
        let sources: Vec<PathBuf> = mapping.keys().cloned().collect();
        let root = tmp_dir.path().join("src");
        assert_eq!(
            sources,
            vec![root.join("0.txt"), root.join("bar"), root.join("baz")]
        );
        assert!(mapping.values().all(|d| d == &dst));
        assert!(!mapping.keys().any(|s| s.ends_with("1.txt") || s.ends_with("2.txt")));
    }

    #[tokio::test]
    async fn single_file_is_one_entry() {
        let tmp_dir = testutils::setup_test_dir();
        let logger = logger(&tmp_dir);
        let src = tmp_dir.path().join("src").join("0.txt");
        let dst = tmp_dir.path().join("dst");
        let mut mapping = Mapping::new();
        collect(&logger, &src, &dst, &mut mapping).await.unwrap();
        assert_eq!(mapping.into_iter().collect::<Vec<_>>(), vec![(src, dst)]);
    }

    #[tokio::test]
    async fn later_entries_replace_earlier_ones() {
        let tmp_dir = testutils::setup_test_dir();
        let logger = logger(&tmp_dir);
        let src = tmp_dir.path().join("src").join("0.txt");
        let mut mapping = Mapping::new();
        collect(&logger, &src, Path::new("/first"), &mut mapping)
            .await
            .unwrap();
        collect(&logger, &src, Path::new("/second"), &mut mapping)
            .await
            .unwrap();
        assert_eq!(mapping.len(), 1);
        assert_eq!(mapping[&src], PathBuf::from("/second"));
    }

    #[tokio::test]
    async fn missing_source_is_fatal_and_logged() {
        let tmp_dir = testutils::setup_test_dir();
        let logger = logger(&tmp_dir);
        let src = tmp_dir.path().join("missing");
        let mut mapping = Mapping::new();
        let error = collect(&logger, &src, Path::new("/dst"), &mut mapping)
            .await
            .unwrap_err();
        assert!(matches!(error, Error::ManifestWrite(_)));
        assert_eq!(logger.file_count(), 1);
        logger.close().unwrap();
        let main =
            std::fs::read_to_string(tmp_dir.path().join("logs").join("migrate.log")).unwrap();
        assert!(main.contains("[ERROR] Error generating mapping"));
    }

    #[tokio::test]
    async fn absolute_manifest_round_trips() {
        let tmp_dir = testutils::setup_test_dir();
        let logger = logger(&tmp_dir);
        let src = tmp_dir.path().join("src").join("");
        let dst = tmp_dir.path().join("dst").join("");
        let manifest = tmp_dir.path().join("manifest.txt");
        let mut mapping = Mapping::new();
        collect(&logger, &src, &dst, &mut mapping).await.unwrap();
        let config = GenerateConfig {
            overwrite: true,
            relative_source: false,
            relative_destination: false,
        };
        let summary = write_manifest(&logger, &manifest, &mapping, &config)
            .await
            .unwrap();
        assert_eq!(summary.entries_written, 3);
        assert_eq!(summary.entries_skipped, 0);
        let mut reader = ManifestReader::open(&manifest).await.unwrap();
        let mut read_back = Mapping::new();
        while let Some(entry) = reader.read_entry().await.unwrap() {
            read_back.insert(
                entry.source().to_path_buf(),
                entry.destination().to_path_buf(),
            );
        }
        assert_eq!(read_back, mapping);
        assert!(
            read_back
                .values()
                .all(|d| has_trailing_separator(d))
        );
    }

    #[tokio::test]
    async fn relative_sides_keep_trailing_separator() {
        let tmp_dir = testutils::setup_test_dir();
        let logger = logger(&tmp_dir);
        let manifest = tmp_dir.path().join("manifest.txt");
        let mut mapping = Mapping::new();
        mapping.insert(
            tmp_dir.path().join("src").join("bar").join(""),
            tmp_dir.path().join("dst").join(""),
        );
        let config = GenerateConfig {
            overwrite: true,
            relative_source: true,
            relative_destination: true,
        };
        write_manifest(&logger, &manifest, &mapping, &config)
            .await
            .unwrap();
        assert_eq!(std::fs::read_to_string(&manifest).unwrap(), "src/bar/;dst/\n");
    }

    #[tokio::test]
    async fn append_unless_overwrite() {
        let tmp_dir = testutils::setup_test_dir();
        let logger = logger(&tmp_dir);
        let manifest = tmp_dir.path().join("manifest.txt");
        let mut mapping = Mapping::new();
        mapping.insert(PathBuf::from("/a"), PathBuf::from("/b"));
        let append = GenerateConfig {
            overwrite: false,
            relative_source: false,
            relative_destination: false,
        };
        write_manifest(&logger, &manifest, &mapping, &append)
            .await
            .unwrap();
        write_manifest(&logger, &manifest, &mapping, &append)
            .await
            .unwrap();
        assert_eq!(std::fs::read_to_string(&manifest).unwrap(), "/a;/b\n/a;/b\n");
        let overwrite = GenerateConfig {
            overwrite: true,
            ..append
        };
        write_manifest(&logger, &manifest, &mapping, &overwrite)
            .await
            .unwrap();
        assert_eq!(std::fs::read_to_string(&manifest).unwrap(), "/a;/b\n");
    }

    #[tokio::test]
    async fn unrepresentable_entries_are_skipped() {
        let tmp_dir = testutils::setup_test_dir();
        let logger = logger(&tmp_dir);
        let manifest = tmp_dir.path().join("manifest.txt");
        let mut mapping = Mapping::new();
        mapping.insert(PathBuf::from("/a;b"), PathBuf::from("/dst"));
        mapping.insert(PathBuf::from("/c"), PathBuf::from("/dst"));
        let config = GenerateConfig {
            overwrite: true,
            relative_source: false,
            relative_destination: false,
        };
        let summary = write_manifest(&logger, &manifest, &mapping, &config)
            .await
            .unwrap();
        assert_eq!(summary.entries_written, 1);
        assert_eq!(summary.entries_skipped, 1);
        assert_eq!(std::fs::read_to_string(&manifest).unwrap(), "/c;/dst\n");
        assert_eq!(logger.file_count(), 1);
    }
}
