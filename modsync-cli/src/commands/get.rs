//! `modsync get` - mirror one module version and its dependencies.

use std::path::Path;
use std::sync::Arc;

use clap::Args;
use modsync::fetch::ArtifactFetcher;
use modsync::pipeline::DownloadPipeline;
use modsync::proxy::{latest_version, ProxyEndpoints};
use modsync::{DownloadOrchestrator, MirrorConfig, PackageVersion, PackageVersionBatch};
use tokio_util::sync::CancellationToken;

use super::common::{self, MirrorArgs};
use crate::error::CliError;

/// Version keyword resolved through the proxy.
pub const LATEST: &str = "latest";

#[derive(Debug, Args)]
pub struct GetArgs {
    /// Module path, e.g. golang.org/x/exp
    pub module: String,

    /// Semantic version to mirror, or `latest`
    #[arg(long, default_value = LATEST)]
    pub module_version: String,

    #[command(flatten)]
    pub mirror: MirrorArgs,
}

pub fn run(args: GetArgs, config_path: Option<&Path>) -> Result<(), CliError> {
    if args.module.trim().is_empty() {
        return Err(CliError::InvalidArgument(
            "must provide a module name".to_string(),
        ));
    }

    let file = common::load_config_file(config_path)?;
    let config = common::resolve_config(&args.mirror, &file, 1)
        .with_write_checkpoint(false)
        .with_skip_pseudo_versions(false);
    config.validate()?;

    let runtime = common::runtime()?;
    let shutdown = common::shutdown_on_ctrlc()?;
    runtime.block_on(get_module(config, args.module, args.module_version, shutdown))
}

async fn get_module(
    config: MirrorConfig,
    module: String,
    version: String,
    shutdown: CancellationToken,
) -> Result<(), CliError> {
    let target = if version == LATEST {
        let fetcher = ArtifactFetcher::new(&config.temp_dir, config.http_timeout)?;
        let endpoints = ProxyEndpoints::new(config.proxy_url.clone());
        latest_version(&fetcher, &endpoints, &module).await?
    } else {
        PackageVersion::unpublished(module, version)
    };
    let identity = target.identity();
    println!("Mirroring {}", identity);

    let pipeline = DownloadPipeline::from_config(&config)?;
    let orchestrator = DownloadOrchestrator::start_with_token(config, Arc::new(pipeline), shutdown)?;

    let outcome = async {
        orchestrator
            .enqueue_batch(PackageVersionBatch::from(vec![target]))
            .await?;
        let report = orchestrator.await_inflight().await?;
        orchestrator.cleanup().await?;
        Ok::<_, CliError>(report)
    }
    .await;
    orchestrator.shutdown().await;
    let report = outcome?;

    println!(
        "Completed: {}  Skipped: {}  Retried: {}  Failed: {}",
        report.stats.completed, report.stats.skipped, report.stats.retried, report.stats.failed
    );

    if orchestrator.is_completed(&identity) {
        Ok(())
    } else {
        Err(CliError::Incomplete(identity))
    }
}
