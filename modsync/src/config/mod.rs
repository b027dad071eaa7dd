//! Mirror configuration.
//!
//! [`MirrorConfig`] is built once at startup and handed by value to the
//! orchestrator. [`ConfigFile`] holds optional overrides read from INI.

mod file;

pub use file::{default_config_path, ConfigFile};

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::fetch::DEFAULT_TIMEOUT_SECS;
use crate::index::{DEFAULT_INDEX_URL, MAX_SCRAPE_LIMIT};
use crate::proxy::DEFAULT_PROXY_URL;

/// Default mirror root.
pub const DEFAULT_OUTPUT_DIR: &str = "go_pkg";

/// Default number of queue workers.
pub const DEFAULT_WORKERS: usize = 1;

/// Default attempts after the first failure.
pub const DEFAULT_RETRIES: u32 = 10;

/// Default interval between drain checks.
pub const DEFAULT_DRAIN_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load config file {path}: {source}")]
    Load { path: PathBuf, source: ini::Error },

    #[error("invalid value for [{section}] {key}: {value}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
    },

    #[error("{0}")]
    Invalid(String),
}

/// Everything the mirror needs to run.
#[derive(Debug, Clone)]
pub struct MirrorConfig {
    /// Root of the local mirror tree.
    pub output_dir: PathBuf,

    /// Staging directory for in-flight downloads.
    ///
    /// Must be on the same file system as `output_dir`.
    pub temp_dir: PathBuf,

    /// File holding the index checkpoint.
    pub checkpoint_file: PathBuf,

    /// Module proxy base URL.
    pub proxy_url: String,

    /// Module index base URL.
    pub index_url: String,

    /// Number of queue workers.
    pub workers: usize,

    /// Bounded queue capacity; also the scrape page size.
    pub queue_capacity: usize,

    /// Retries granted to each request after its first failure.
    pub retries: u32,

    /// Skip pseudo-versions unless they were discovered as dependencies.
    pub skip_pseudo_versions: bool,

    /// Persist the checkpoint after each drained batch.
    pub write_checkpoint: bool,

    /// HTTP request timeout.
    pub http_timeout: Duration,

    /// How often the drain barrier re-checks outstanding work.
    pub drain_poll_interval: Duration,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self::new(PathBuf::from(DEFAULT_OUTPUT_DIR))
    }
}

impl MirrorConfig {
    /// Creates a configuration rooted at `output_dir`.
    ///
    /// The temp directory and checkpoint file default to `<output>/tmp`
    /// and `<output>/MAX_TS`.
    pub fn new(output_dir: PathBuf) -> Self {
        Self {
            temp_dir: output_dir.join("tmp"),
            checkpoint_file: output_dir.join("MAX_TS"),
            output_dir,
            proxy_url: DEFAULT_PROXY_URL.to_string(),
            index_url: DEFAULT_INDEX_URL.to_string(),
            workers: DEFAULT_WORKERS,
            queue_capacity: MAX_SCRAPE_LIMIT,
            retries: DEFAULT_RETRIES,
            skip_pseudo_versions: false,
            write_checkpoint: true,
            http_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            drain_poll_interval: DEFAULT_DRAIN_POLL_INTERVAL,
        }
    }

    pub fn with_temp_dir(mut self, path: PathBuf) -> Self {
        self.temp_dir = path;
        self
    }

    pub fn with_checkpoint_file(mut self, path: PathBuf) -> Self {
        self.checkpoint_file = path;
        self
    }

    pub fn with_proxy_url(mut self, url: impl Into<String>) -> Self {
        self.proxy_url = url.into();
        self
    }

    pub fn with_index_url(mut self, url: impl Into<String>) -> Self {
        self.index_url = url.into();
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    pub fn with_skip_pseudo_versions(mut self, skip: bool) -> Self {
        self.skip_pseudo_versions = skip;
        self
    }

    pub fn with_write_checkpoint(mut self, write: bool) -> Self {
        self.write_checkpoint = write;
        self
    }

    pub fn with_http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = timeout;
        self
    }

    pub fn with_drain_poll_interval(mut self, interval: Duration) -> Self {
        self.drain_poll_interval = interval;
        self
    }

    /// Checks invariants the orchestrator relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == 0 {
            return Err(ConfigError::Invalid("workers must be at least 1".into()));
        }
        if self.queue_capacity == 0 {
            return Err(ConfigError::Invalid(
                "queue capacity must be at least 1".into(),
            ));
        }
        if self.proxy_url.trim().is_empty() {
            return Err(ConfigError::Invalid("proxy URL is empty".into()));
        }
        if self.index_url.trim().is_empty() {
            return Err(ConfigError::Invalid("index URL is empty".into()));
        }
        if self.drain_poll_interval.is_zero() {
            return Err(ConfigError::Invalid(
                "drain poll interval must be non-zero".into(),
            ));
        }
        Ok(())
    }
}
