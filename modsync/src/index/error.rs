//! Index scraper errors.

use reqwest::StatusCode;
use thiserror::Error;

/// Errors that abort a scrape. Individual undecodable records never do.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("failed to create HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("scrape limit must be positive")]
    InvalidLimit,

    #[error("index request to {url} failed: {source}")]
    Request { url: String, source: reqwest::Error },

    #[error("index responded with {status}: {body}")]
    Status { status: StatusCode, body: String },
}
