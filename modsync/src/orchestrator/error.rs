//! Orchestrator errors.

use std::path::PathBuf;

use thiserror::Error;

use crate::checkpoint::CheckpointError;
use crate::config::ConfigError;

/// Errors surfaced to the driver of the orchestrator.
///
/// Failures of individual requests are never reported here; they are
/// logged and counted.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("orchestrator was cancelled")]
    Cancelled,

    #[error("download queue is closed")]
    QueueClosed,

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),

    #[error("checkpoint task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
