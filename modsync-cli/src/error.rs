//! CLI error type.

use std::fmt;

use modsync::config::ConfigError;
use modsync::fetch::FetchError;
use modsync::index::IndexError;
use modsync::orchestrator::OrchestratorError;

/// Errors reported by CLI commands. All of them exit with status 1.
#[derive(Debug)]
pub enum CliError {
    /// Bad command line value
    InvalidArgument(String),
    /// Config file or resolved configuration is unusable
    Config(ConfigError),
    /// Tokio runtime or signal handler setup failed
    Runtime(String),
    /// Module index query failed
    Index(IndexError),
    /// Proxy request failed outside the download queue
    Fetch(FetchError),
    /// Orchestrator failed or was interrupted
    Orchestrator(OrchestratorError),
    /// Writing command output failed
    Output(String),
    /// The requested module was not mirrored
    Incomplete(String),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::InvalidArgument(msg) => write!(f, "{}", msg),
            CliError::Config(e) => write!(f, "Configuration error: {}", e),
            CliError::Runtime(msg) => write!(f, "Runtime error: {}", msg),
            CliError::Index(e) => write!(f, "Index error: {}", e),
            CliError::Fetch(e) => write!(f, "Proxy error: {}", e),
            CliError::Orchestrator(e) => write!(f, "Download error: {}", e),
            CliError::Output(msg) => write!(f, "Output error: {}", msg),
            CliError::Incomplete(module) => write!(f, "Failed to mirror {}", module),
        }
    }
}

impl std::error::Error for CliError {}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::Config(e)
    }
}

impl From<IndexError> for CliError {
    fn from(e: IndexError) -> Self {
        CliError::Index(e)
    }
}

impl From<FetchError> for CliError {
    fn from(e: FetchError) -> Self {
        CliError::Fetch(e)
    }
}

impl From<OrchestratorError> for CliError {
    fn from(e: OrchestratorError) -> Self {
        CliError::Orchestrator(e)
    }
}
