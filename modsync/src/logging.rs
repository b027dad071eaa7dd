//! Tracing subscriber setup for binaries.
//!
//! Events go to stderr. With a log file, they are also written there
//! through a non-blocking appender whose [`WorkerGuard`] must be held
//! until exit so buffered lines are flushed.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{fmt, EnvFilter, Registry};

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "info";

/// Filter used in verbose mode.
pub const VERBOSE_FILTER: &str = "info,modsync=debug,modsync_cli=debug";

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("log file path has no file name: {0}")]
    InvalidLogFile(PathBuf),

    #[error("failed to install tracing subscriber: {0}")]
    Init(#[from] TryInitError),
}

/// Builds the level filter; `verbose` wins over `RUST_LOG`.
pub fn filter(verbose: bool) -> EnvFilter {
    if verbose {
        return EnvFilter::new(VERBOSE_FILTER);
    }
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Installs the global subscriber.
pub fn init(verbose: bool, log_file: Option<&Path>) -> Result<Option<WorkerGuard>, LoggingError> {
    let (file_layer, guard) = match log_file {
        Some(path) => {
            let name = path
                .file_name()
                .ok_or_else(|| LoggingError::InvalidLogFile(path.to_path_buf()))?;
            let dir = match path.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent,
                _ => Path::new("."),
            };
            let (writer, guard) =
                tracing_appender::non_blocking(tracing_appender::rolling::never(dir, name));
            let layer = fmt::layer().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    Registry::default()
        .with(filter(verbose))
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .try_init()?;

    Ok(guard)
}
