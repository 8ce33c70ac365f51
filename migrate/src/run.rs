use std::path::{Path, PathBuf};
use tracing::instrument;

use common::Error;
use common::config::TransferConfig;
use common::logger::{Level, Logger};
use common::manifest::{ManifestEntry, ManifestReader};
use common::transfer::Summary;

pub const USAGE: &str = "  migrate run [FLAGS] SRC DEST\n  migrate run [FLAGS] [MANIFEST]\n";

#[derive(Debug, Clone)]
pub struct RunRequest {
    pub dry_run: bool,
    /// Copy utility name or path, resolved before the run starts
    pub utility: String,
    pub utility_args: String,
    pub log_dir: PathBuf,
    /// Either `[]`, `[MANIFEST]` or `[SRC, DEST]`
    pub paths: Vec<PathBuf>,
}

#[derive(Debug, PartialEq, Eq)]
enum Input {
    Manifest(PathBuf),
    Pair(PathBuf, PathBuf),
}

fn is_empty(path: &Path) -> bool {
    path.as_os_str().is_empty()
}

fn input(paths: &[PathBuf]) -> Result<Input, Error> {
    match paths {
        [] => Ok(Input::Manifest(PathBuf::from(common::config::DEFAULT_MANIFEST))),
        [manifest] if !is_empty(manifest) => Ok(Input::Manifest(manifest.clone())),
        [source, destination] if !is_empty(source) && !is_empty(destination) => {
            Ok(Input::Pair(source.clone(), destination.clone()))
        }
        [_] | [_, _] => Err(Error::Usage("paths must not be empty".to_string())),
        _ => Err(Error::Usage(format!(
            "expected at most 2 paths, got {}",
            paths.len()
        ))),
    }
}

async fn open_input(logger: &Logger, input: Input) -> Result<ManifestReader, Error> {
    match input {
        Input::Manifest(manifest) => match ManifestReader::open(&manifest).await {
            Ok(reader) => Ok(reader),
            Err(error) => {
                logger
                    .log(Level::Error, &format!("Error reading manifest: {error:#}"))
                    .map_err(Error::logging)?;
                Err(Error::ManifestRead(error))
            }
        },
        Input::Pair(source, destination) => {
            match ManifestEntry::normalized(&source, &destination) {
                Ok(entry) => Ok(ManifestReader::from_pair(entry)),
                Err(error) => {
                    logger
                        .log(
                            Level::Warn,
                            &format!(
                                "Cannot normalize paths for {} => {}.",
                                source.display(),
                                destination.display()
                            ),
                        )
                        .map_err(Error::logging)?;
                    Err(Error::ManifestRead(error.into()))
                }
            }
        }
    }
}

/// Copies every entry of the manifest (or the single SRC DEST pair) with the copy utility.
///
/// Setup failures (logs, utility, manifest) end the run before anything is copied. Once
/// copying starts, failed entries are only logged.
#[instrument]
pub async fn run(request: RunRequest) -> Result<Summary, Error> {
    let input = input(&request.paths)?;
    let logger = Logger::open(&request.log_dir).map_err(Error::Log)?;
    println!("Logging to {}.", logger.dir().display());
    let utility = match common::lookfor::exe(&request.utility) {
        Ok(utility) => utility,
        Err(error) => {
            logger
                .log(Level::Error, &error.to_string())
                .map_err(Error::logging)?;
            return Err(error.into());
        }
    };
    let mut reader = open_input(&logger, input).await?;
    let config = TransferConfig {
        dry_run: request.dry_run,
        utility,
        utility_args: request.utility_args,
    };
    if config.dry_run {
        println!("Running in dry run mode. Check logs.");
        logger
            .log(Level::Info, "Running in dry run mode.")
            .map_err(Error::logging)?;
    }
    logger
        .log(
            Level::Info,
            &format!("Copying files with {}.", config.utility.display()),
        )
        .map_err(Error::logging)?;
    let summary = common::transfer::run_manifest(&mut reader, &config, &logger).await?;
    logger.close().map_err(Error::logging)?;
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths(paths: &[&str]) -> Vec<PathBuf> {
        paths.iter().map(PathBuf::from).collect()
    }

    #[test]
    fn default_manifest_without_paths() {
        assert_eq!(
            input(&[]).unwrap(),
            Input::Manifest(PathBuf::from("manifest.txt"))
        );
    }

    #[test]
    fn one_path_is_a_manifest_two_are_a_pair() {
        assert_eq!(
            input(&paths(&["list.txt"])).unwrap(),
            Input::Manifest(PathBuf::from("list.txt"))
        );
        assert_eq!(
            input(&paths(&["src/", "dst"])).unwrap(),
            Input::Pair(PathBuf::from("src/"), PathBuf::from("dst"))
        );
    }

    #[test]
    fn empty_or_extra_paths_are_usage_errors() {
        let cases: [&[&str]; 3] = [&[""], &["src", ""], &["a", "b", "c"]];
        for bad in cases {
            let error = input(&paths(bad)).unwrap_err();
            assert!(matches!(error, Error::Usage(_)), "{bad:?}");
        }
    }
}
