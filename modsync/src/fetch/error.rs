//! Fetch errors.

use std::io;
use std::path::PathBuf;

use reqwest::StatusCode;
use thiserror::Error;

/// Response body fragment the proxy uses for paths it refuses to serve.
pub const UNMIRRORABLE_MARKER: &str = "invalid escaped module path";

/// Result type for fetch operations.
pub type FetchResult<T> = Result<T, FetchError>;

/// Errors that can occur while fetching a remote resource.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The HTTP client could not be constructed.
    #[error("failed to create HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    /// Transport-level failure (DNS, connect, reset, body read).
    #[error("request to {url} failed: {source}")]
    Request { url: String, source: reqwest::Error },

    /// The request did not complete within the client timeout.
    #[error("request to {url} timed out after {timeout_secs}s")]
    Timeout { url: String, timeout_secs: u64 },

    /// The server answered with a non-success status.
    #[error("server responded with {status} for {url}: {body}")]
    Status {
        url: String,
        status: StatusCode,
        body: String,
    },

    /// A JSON response could not be decoded.
    #[error("failed to decode response from {url}: {source}")]
    Decode {
        url: String,
        source: serde_json::Error,
    },

    /// Local file system failure.
    #[error("I/O error on {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
}

impl FetchError {
    /// Returns `true` if the proxy reported that the path cannot be escaped.
    ///
    /// Such packages can never be mirrored; callers treat this as success
    /// with nothing written.
    pub fn is_unmirrorable(&self) -> bool {
        matches!(self, Self::Status { body, .. } if body.contains(UNMIRRORABLE_MARKER))
    }

    /// HTTP status, if the error came from a response.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}
