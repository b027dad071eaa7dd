//! Module index scraper.
//!
//! The index service lists newly published package versions in publish
//! order:
//!
//! ```text
//! GET <index>/index?since=<RFC3339>&limit=<n>
//!
//! {"Path":"golang.org/x/text","Version":"v0.3.0","Timestamp":"2019-04-10T19:08:52.997264Z"}
//! {"Path":"...","Version":"...","Timestamp":"..."}
//! ```
//!
//! [`IndexClient::scrape`] turns one page into a [`PackageVersionBatch`].

mod client;
mod error;

pub use client::{parse_records, IndexClient, SinceSource, DEFAULT_INDEX_URL, MAX_SCRAPE_LIMIT};
pub use error::IndexError;
