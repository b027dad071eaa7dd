//! Common types and utilities shared across CLI commands.

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Args;
use modsync::config::{ConfigFile, DEFAULT_OUTPUT_DIR};
use modsync::index::DEFAULT_INDEX_URL;
use modsync::MirrorConfig;
use tokio::runtime::Runtime;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::error::CliError;

/// Mirror location and proxy settings shared by `sync` and `get`.
#[derive(Debug, Clone, Default, Args)]
pub struct MirrorArgs {
    /// Root of the local mirror
    #[arg(short, long, env = "OUTPUT_DIR")]
    pub output_dir: Option<PathBuf>,

    /// Staging directory for downloads (default: <output-dir>/tmp)
    #[arg(long)]
    pub temp_dir: Option<PathBuf>,

    /// Checkpoint file (default: <output-dir>/MAX_TS)
    #[arg(long, env = "MIN_TS_FILE")]
    pub checkpoint_file: Option<PathBuf>,

    /// Module proxy base URL
    #[arg(long, env = "GO_PROXY")]
    pub proxy_url: Option<String>,

    /// Number of concurrent download workers
    #[arg(short = 'c', long)]
    pub workers: Option<usize>,

    /// Retries per module version after the first failure
    #[arg(long)]
    pub retries: Option<u32>,

    /// HTTP request timeout in seconds
    #[arg(long)]
    pub timeout_secs: Option<u64>,
}

/// Index location shared by `sync` and `list`.
#[derive(Debug, Clone, Default, Args)]
pub struct IndexArgs {
    /// Module index base URL
    #[arg(long, env = "GO_INDEX")]
    pub index_url: Option<String>,
}

impl IndexArgs {
    /// Command line, then config file, then the public index.
    pub fn resolve(&self, file: &ConfigFile) -> String {
        self.index_url
            .clone()
            .or_else(|| file.index_url.clone())
            .unwrap_or_else(|| DEFAULT_INDEX_URL.to_string())
    }
}

/// Builds the mirror configuration.
///
/// Each setting comes from the first source that has it: command line
/// (or its environment variable), config file, `fallback_workers` for the
/// worker count, then the library default.
pub fn resolve_config(
    args: &MirrorArgs,
    file: &ConfigFile,
    fallback_workers: usize,
) -> MirrorConfig {
    let output_dir = args
        .output_dir
        .clone()
        .or_else(|| file.output_dir.clone())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR));
    let mut config = MirrorConfig::new(output_dir);

    if let Some(dir) = args.temp_dir.clone().or_else(|| file.temp_dir.clone()) {
        config = config.with_temp_dir(dir);
    }
    if let Some(path) = args
        .checkpoint_file
        .clone()
        .or_else(|| file.checkpoint_file.clone())
    {
        config = config.with_checkpoint_file(path);
    }
    if let Some(url) = args.proxy_url.clone().or_else(|| file.proxy_url.clone()) {
        config = config.with_proxy_url(url);
    }
    if let Some(url) = file.index_url.clone() {
        config = config.with_index_url(url);
    }
    if let Some(retries) = args.retries.or(file.retries) {
        config = config.with_retries(retries);
    }
    if let Some(secs) = args.timeout_secs.or(file.timeout_secs) {
        config = config.with_http_timeout(Duration::from_secs(secs));
    }
    if let Some(skip) = file.skip_pseudo_versions {
        config = config.with_skip_pseudo_versions(skip);
    }

    let workers = args.workers.or(file.workers).unwrap_or(fallback_workers);
    config.with_workers(workers)
}

/// Loads the config file given on the command line, or the default one.
pub fn load_config_file(path: Option<&Path>) -> Result<ConfigFile, CliError> {
    Ok(ConfigFile::discover(path)?)
}

/// Multi-threaded runtime for async commands.
pub fn runtime() -> Result<Runtime, CliError> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| CliError::Runtime(format!("failed to start async runtime: {}", e)))
}

/// Token cancelled on Ctrl-C.
pub fn shutdown_on_ctrlc() -> Result<CancellationToken, CliError> {
    let token = CancellationToken::new();
    let handler_token = token.clone();
    ctrlc::set_handler(move || {
        info!("Interrupt received, shutting down");
        handler_token.cancel();
    })
    .map_err(|e| CliError::Runtime(format!("failed to install Ctrl-C handler: {}", e)))?;
    Ok(token)
}

/// Sleeps for `duration` unless `token` is cancelled first.
///
/// Returns `false` if cancelled.
pub async fn sleep_or_cancel(duration: Duration, token: &CancellationToken) -> bool {
    tokio::select! {
        _ = token.cancelled() => false,
        _ = tokio::time::sleep(duration) => true,
    }
}
