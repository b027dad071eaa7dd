//! `modsync sync` - follow the module index and mirror everything it lists.
//!
//! Each round scrapes one page after the checkpoint, mirrors it with its
//! dependency closure, advances the checkpoint and clears the staging
//! directory. When the index is caught up the loop idles or, with
//! `--stop-when-caught-up`, exits.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use clap::Args;
use modsync::checkpoint::CheckpointStore;
use modsync::index::{IndexClient, SinceSource, MAX_SCRAPE_LIMIT};
use modsync::orchestrator::OrchestratorError;
use modsync::package::format_timestamp;
use modsync::pipeline::DownloadPipeline;
use modsync::{DownloadOrchestrator, MirrorConfig};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use super::common::{self, IndexArgs, MirrorArgs};
use crate::error::CliError;

/// Smallest accepted batch size.
pub const MIN_BATCH_SIZE: usize = 2;

/// Workers used when neither flag nor config file sets them.
pub const DEFAULT_SYNC_WORKERS: usize = 10;

/// Pause after a batch this small or smaller.
const CAUGHT_UP_THRESHOLD: usize = 1;
const CAUGHT_UP_SLEEP: Duration = Duration::from_secs(60);
const SCRAPE_RETRY_DELAY: Duration = Duration::from_secs(5);

#[derive(Debug, Args)]
pub struct SyncArgs {
    #[command(flatten)]
    pub mirror: MirrorArgs,

    #[command(flatten)]
    pub index: IndexArgs,

    /// Records per batch; a failed batch restarts from the last checkpoint
    #[arg(short, long)]
    pub batch_size: Option<usize>,

    /// Skip pseudo-versions unless required by another module
    #[arg(long)]
    pub skip_pseudo_versions: bool,

    /// Exit once the index has no more new records
    #[arg(long)]
    pub stop_when_caught_up: bool,
}

/// Validates the batch size range.
pub fn check_batch_size(size: usize) -> Result<usize, CliError> {
    if (MIN_BATCH_SIZE..=MAX_SCRAPE_LIMIT).contains(&size) {
        Ok(size)
    } else {
        Err(CliError::InvalidArgument(format!(
            "batch size must be between {} and {} inclusive, got {}",
            MIN_BATCH_SIZE, MAX_SCRAPE_LIMIT, size
        )))
    }
}

pub fn run(args: SyncArgs, config_path: Option<&Path>) -> Result<(), CliError> {
    let file = common::load_config_file(config_path)?;
    let batch_size =
        check_batch_size(args.batch_size.or(file.batch_size).unwrap_or(MAX_SCRAPE_LIMIT))?;

    let mut config = common::resolve_config(&args.mirror, &file, DEFAULT_SYNC_WORKERS)
        .with_index_url(args.index.resolve(&file))
        .with_queue_capacity(batch_size);
    if args.skip_pseudo_versions {
        config = config.with_skip_pseudo_versions(true);
    }
    config.validate()?;

    let runtime = common::runtime()?;
    let shutdown = common::shutdown_on_ctrlc()?;
    runtime.block_on(sync_loop(config, args.stop_when_caught_up, shutdown))
}

async fn sync_loop(
    config: MirrorConfig,
    stop_when_caught_up: bool,
    shutdown: CancellationToken,
) -> Result<(), CliError> {
    let batch_size = config.queue_capacity;
    let index = IndexClient::new(
        config.index_url.clone(),
        SinceSource::Checkpoint(CheckpointStore::new(config.checkpoint_file.clone())),
        config.http_timeout,
    )?;
    let pipeline = DownloadPipeline::from_config(&config)?;
    let orchestrator =
        DownloadOrchestrator::start_with_token(config, Arc::new(pipeline), shutdown.clone())?;

    let result = loop {
        if shutdown.is_cancelled() {
            break Ok(());
        }

        let batch = match index.scrape(batch_size).await {
            Ok(batch) => batch,
            Err(err) => {
                error!(err = %err, "Failed to scrape index");
                if !common::sleep_or_cancel(SCRAPE_RETRY_DELAY, &shutdown).await {
                    break Ok(());
                }
                continue;
            }
        };

        let records = batch.len();
        let max_ts = batch.max_timestamp();
        if let Err(err) = drain_batch(&orchestrator, batch).await {
            break match err {
                OrchestratorError::Cancelled => Ok(()),
                err => Err(err.into()),
            };
        }
        info!(records, max_ts = %format_timestamp(&max_ts), "Finished writing batch");

        if records <= CAUGHT_UP_THRESHOLD {
            if stop_when_caught_up {
                info!("Index caught up, stopping");
                break Ok(());
            }
            info!("Very few modules collected, sleeping for 60 seconds before trying again");
            if !common::sleep_or_cancel(CAUGHT_UP_SLEEP, &shutdown).await {
                break Ok(());
            }
        }
    };

    orchestrator.shutdown().await;
    result
}

async fn drain_batch(
    orchestrator: &DownloadOrchestrator,
    batch: modsync::PackageVersionBatch,
) -> Result<(), OrchestratorError> {
    orchestrator.enqueue_batch(batch).await?;
    orchestrator.await_inflight().await?;
    orchestrator.cleanup().await
}
