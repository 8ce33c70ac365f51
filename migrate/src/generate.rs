use std::path::PathBuf;
use tracing::instrument;

use common::config::GenerateConfig;
use common::logger::Logger;
use common::manifest::{Mapping, WriteSummary};
use common::{Error, path};

pub const USAGE: &str = "  migrate generate SRC DEST [MANIFEST]\n";

#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub source: PathBuf,
    pub destination: PathBuf,
    /// Defaults to `manifest.txt` in the working directory
    pub manifest: Option<PathBuf>,
    pub log_dir: PathBuf,
    pub config: GenerateConfig,
}

fn normalize(path: &std::path::Path) -> Result<PathBuf, Error> {
    path::normalize(path).map_err(|error| Error::NotFound(error.into()))
}

/// Scans SRC and writes its mappings to the manifest.
#[instrument]
pub async fn generate(request: GenerateRequest) -> Result<WriteSummary, Error> {
    if request.source.as_os_str().is_empty() || request.destination.as_os_str().is_empty() {
        return Err(Error::Usage("SRC and DEST must not be empty".to_string()));
    }
    let source = normalize(&request.source)?;
    let destination = normalize(&request.destination)?;
    let manifest = match request.manifest {
        Some(manifest) if !manifest.as_os_str().is_empty() => manifest,
        _ => PathBuf::from(common::config::DEFAULT_MANIFEST),
    };
    // drop any trailing separator so the parent is the manifest's directory
    let manifest: PathBuf = normalize(&manifest)?.components().collect();
    let logger = Logger::open(&request.log_dir).map_err(Error::Log)?;
    println!("Logging to {}.", logger.dir().display());
    let mut mapping = Mapping::new();
    common::manifest::collect(&logger, &source, &destination, &mut mapping).await?;
    let summary =
        common::manifest::write_manifest(&logger, &manifest, &mapping, &request.config).await?;
    logger.close().map_err(Error::logging)?;
    Ok(summary)
}
