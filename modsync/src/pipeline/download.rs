//! Mirrors one package version.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::error::PipelineError;
use super::manifest::parse_requirements;
use super::traits::{BoxFuture, DependencySink, RequestProcessor};
use crate::config::MirrorConfig;
use crate::fetch::{ArtifactFetcher, FetchError, FetchOutcome, FetchResult};
use crate::package::{is_valid_semver, validate_path, PackageVersion};
use crate::proxy::{ProxyEndpoints, VERSION_ARTIFACTS};

/// Result of one step when the proxy may refuse the path.
enum Step {
    Continue,
    Unmirrorable,
}

/// Fetches every artifact of a package version into `output_dir`.
#[derive(Debug, Clone)]
pub struct DownloadPipeline {
    fetcher: ArtifactFetcher,
    endpoints: ProxyEndpoints,
    output_dir: PathBuf,
}

impl DownloadPipeline {
    pub fn new(
        fetcher: ArtifactFetcher,
        endpoints: ProxyEndpoints,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            fetcher,
            endpoints,
            output_dir: output_dir.into(),
        }
    }

    /// Builds a pipeline for the proxy and directories in `config`.
    pub fn from_config(config: &MirrorConfig) -> FetchResult<Self> {
        let fetcher = ArtifactFetcher::new(&config.temp_dir, config.http_timeout)?;
        Ok(Self::new(
            fetcher,
            ProxyEndpoints::new(config.proxy_url.clone()),
            &config.output_dir,
        ))
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// `<output>/<path>/@v`
    pub fn cache_dir(&self, path: &str) -> PathBuf {
        self.output_dir.join(path).join("@v")
    }

    /// Mirrors `version`, submitting each declared dependency to `deps`.
    ///
    /// A path the proxy reports as unmirrorable ends the download early
    /// and successfully.
    pub async fn download_one(
        &self,
        version: &PackageVersion,
        deps: &dyn DependencySink,
    ) -> Result<(), PipelineError> {
        if !is_valid_semver(version.version()) {
            return Err(PipelineError::InvalidVersion(version.version().to_string()));
        }
        validate_path(version.path())?;

        let cache_dir = self.cache_dir(version.path());
        tokio::fs::create_dir_all(&cache_dir)
            .await
            .map_err(|source| PipelineError::CreateDir {
                path: cache_dir.clone(),
                source,
            })?;

        let list = self
            .fetcher
            .fetch(
                &cache_dir.join("list"),
                &self.endpoints.list_url(version.path()),
                false,
            )
            .await;
        if let Step::Unmirrorable = tolerate(version, "list", list)? {
            return Ok(());
        }

        let mod_path = cache_dir.join(format!("{}.mod", version.version()));
        let manifest = self
            .fetcher
            .fetch(&mod_path, &self.endpoints.artifact_url(version, ".mod"), true)
            .await;
        if let Step::Unmirrorable = tolerate(version, ".mod", manifest)? {
            return Ok(());
        }

        self.submit_requirements(&mod_path, deps).await?;

        for suffix in VERSION_ARTIFACTS {
            let target = cache_dir.join(format!("{}{}", version.version(), suffix));
            self.fetcher
                .fetch(&target, &self.endpoints.artifact_url(version, suffix), true)
                .await
                .map_err(|source| PipelineError::Fetch {
                    artifact: suffix,
                    source,
                })?;
        }

        self.fetcher
            .fetch(
                &cache_dir.join("latest"),
                &self.endpoints.latest_url(version.path()),
                false,
            )
            .await
            .map_err(|source| PipelineError::Fetch {
                artifact: "latest",
                source,
            })?;

        debug!(path = version.path(), version = version.version(), "Mirrored");
        Ok(())
    }

    async fn submit_requirements(
        &self,
        mod_path: &Path,
        deps: &dyn DependencySink,
    ) -> Result<(), PipelineError> {
        let source = tokio::fs::read_to_string(mod_path)
            .await
            .map_err(|source| PipelineError::ReadManifest {
                path: mod_path.to_path_buf(),
                source,
            })?;
        let requirements =
            parse_requirements(&source).map_err(|source| PipelineError::Manifest {
                path: mod_path.to_path_buf(),
                source,
            })?;

        for requirement in requirements {
            debug!(path = %requirement.path, version = %requirement.version, "Dependency discovered");
            deps.submit(PackageVersion::unpublished(
                requirement.path,
                requirement.version,
            ));
        }
        Ok(())
    }
}

impl RequestProcessor for DownloadPipeline {
    fn process<'a>(
        &'a self,
        version: &'a PackageVersion,
        deps: &'a dyn DependencySink,
    ) -> BoxFuture<'a, Result<(), PipelineError>> {
        Box::pin(self.download_one(version, deps))
    }
}

fn tolerate(
    version: &PackageVersion,
    artifact: &'static str,
    result: Result<FetchOutcome, FetchError>,
) -> Result<Step, PipelineError> {
    match result {
        Ok(_) => Ok(Step::Continue),
        Err(err) if err.is_unmirrorable() => {
            info!(path = version.path(), version = version.version(), artifact, "Path cannot be mirrored, skipping");
            Ok(Step::Unmirrorable)
        }
        Err(source) => Err(PipelineError::Fetch { artifact, source }),
    }
}
