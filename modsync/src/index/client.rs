//! HTTP client for the module index.

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::Client;
use tracing::{debug, error, warn};

use super::error::IndexError;
use crate::checkpoint::CheckpointStore;
use crate::package::{epoch, format_timestamp, PackageVersion, PackageVersionBatch};

/// Default public module index.
pub const DEFAULT_INDEX_URL: &str = "https://index.golang.org";

/// Largest page the public index serves; larger limits are truncated remotely.
pub const MAX_SCRAPE_LIMIT: usize = 2000;

/// Where the lower bound of the next scrape comes from.
#[derive(Debug, Clone)]
pub enum SinceSource {
    /// A fixed timestamp, e.g. for listing.
    Explicit(DateTime<Utc>),
    /// Re-read from the checkpoint file before every scrape.
    Checkpoint(CheckpointStore),
}

/// Pages through the module index.
#[derive(Debug, Clone)]
pub struct IndexClient {
    client: Client,
    base_url: String,
    since: SinceSource,
}

impl IndexClient {
    /// Creates a client for the index at `base_url`.
    pub fn new(
        base_url: impl Into<String>,
        since: SinceSource,
        timeout: Duration,
    ) -> Result<Self, IndexError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("modsync/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(IndexError::Client)?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            since,
        })
    }

    /// Pins the lower bound to `ts` for subsequent scrapes.
    pub fn set_since(&mut self, ts: DateTime<Utc>) {
        self.since = SinceSource::Explicit(ts);
    }

    /// The lower bound the next scrape will use.
    ///
    /// A checkpoint that cannot be loaded falls back to the epoch.
    pub fn resolve_since(&self) -> DateTime<Utc> {
        match &self.since {
            SinceSource::Explicit(ts) => *ts,
            SinceSource::Checkpoint(store) => match store.load() {
                Ok(ts) => ts,
                Err(err) => {
                    error!(err = %err, "Failed to load checkpoint, using 1970-01-01");
                    epoch()
                }
            },
        }
    }

    /// `<index>/index`
    pub fn index_url(&self) -> String {
        format!("{}/index", self.base_url)
    }

    /// Fetches up to `limit` records newer than the resolved lower bound.
    ///
    /// An exhausted index yields an empty batch.
    pub async fn scrape(&self, limit: usize) -> Result<PackageVersionBatch, IndexError> {
        if limit == 0 {
            return Err(IndexError::InvalidLimit);
        }

        let since = format_timestamp(&self.resolve_since());
        let url = self.index_url();
        debug!(url = %url, since = %since, limit, "Scraping index");

        let request_err = |source| IndexError::Request {
            url: url.clone(),
            source,
        };
        let response = self
            .client
            .get(&url)
            .query(&[("since", since.as_str()), ("limit", &limit.to_string())])
            .send()
            .await
            .map_err(request_err)?;

        let status = response.status();
        let body = response.text().await.map_err(request_err)?;
        if !status.is_success() {
            return Err(IndexError::Status { status, body });
        }

        debug!(collected_bytes = body.len(), "Index page received");
        let batch = parse_records(&body);
        debug!(records = batch.len(), "Index page decoded");
        Ok(batch)
    }
}

/// Decodes newline-delimited index records.
///
/// Blank lines are ignored. A line that fails to decode is logged and
/// skipped; it never fails the batch.
pub fn parse_records(body: &str) -> PackageVersionBatch {
    body.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(|line| match serde_json::from_str::<PackageVersion>(line) {
            Ok(pv) => Some(pv),
            Err(err) => {
                warn!(err = %err, record = line, "Skipping undecodable index record");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use tempfile::TempDir;

    const PAGE: &str = concat!(
        r#"{"Path":"golang.org/x/text","Version":"v0.3.0","Timestamp":"2019-04-10T19:08:52.997264Z"}"#,
        "\n",
        r#"{"Path":"golang.org/x/net","Version":"v0.1.0","Timestamp":"2019-04-10T19:10:00.000001Z"}"#,
        "\n",
    );

    fn ts(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn client(base: String, since: SinceSource) -> IndexClient {
        IndexClient::new(base, since, Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_parse_records_skips_bad_lines() {
        let body = format!("{PAGE}{{\"Path\": 42}}\nnot json at all\n\n");
        let batch = parse_records(&body);

        assert_eq!(batch.len(), 2);
        assert_eq!(batch.max_timestamp(), ts("2019-04-10T19:10:00.000001Z"));
    }

    #[test]
    fn test_parse_records_empty_body() {
        assert!(parse_records("").is_empty());
        assert!(parse_records("\n\n").is_empty());
    }

    #[tokio::test]
    async fn test_scrape_sends_since_and_limit() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/index")
                    .query_param("since", "2019-04-10T00:00:00.000000Z")
                    .query_param("limit", "10");
                then.status(200).body(PAGE);
            })
            .await;

        let index = client(
            server.base_url(),
            SinceSource::Explicit(ts("2019-04-10T00:00:00Z")),
        );
        let batch = index.scrape(10).await.unwrap();

        mock.assert_async().await;
        assert_eq!(batch.len(), 2);
        assert_eq!(
            batch.iter().next().map(PackageVersion::identity),
            Some("golang.org/x/text@v0.3.0".to_string())
        );
    }

    #[tokio::test]
    async fn test_scrape_empty_page() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/index");
                then.status(200).body("");
            })
            .await;

        let index = client(server.base_url(), SinceSource::Explicit(epoch()));
        assert!(index.scrape(2000).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_scrape_error_status() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/index");
                then.status(503).body("try later");
            })
            .await;

        let index = client(server.base_url(), SinceSource::Explicit(epoch()));
        match index.scrape(5).await {
            Err(IndexError::Status { status, body }) => {
                assert_eq!(status.as_u16(), 503);
                assert_eq!(body, "try later");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_scrape_rejects_zero_limit() {
        let index = client("http://127.0.0.1:9".to_string(), SinceSource::Explicit(epoch()));
        assert!(matches!(index.scrape(0).await, Err(IndexError::InvalidLimit)));
    }

    #[test]
    fn test_checkpoint_source_reads_file() {
        let dir = TempDir::new().unwrap();
        let store = CheckpointStore::new(dir.path().join("MAX_TS"));
        store.store(ts("2024-02-03T04:05:06.123456Z")).unwrap();

        let index = client("http://localhost".to_string(), SinceSource::Checkpoint(store));
        assert_eq!(index.resolve_since(), ts("2024-02-03T04:05:06.123456Z"));
    }

    #[test]
    fn test_missing_checkpoint_falls_back_to_epoch() {
        let dir = TempDir::new().unwrap();
        let store = CheckpointStore::new(dir.path().join("MAX_TS"));

        let index = client("http://localhost".to_string(), SinceSource::Checkpoint(store));
        assert_eq!(index.resolve_since(), epoch());
    }

    #[test]
    fn test_set_since_overrides_checkpoint() {
        let dir = TempDir::new().unwrap();
        let store = CheckpointStore::new(dir.path().join("MAX_TS"));
        store.store(ts("2024-01-01T00:00:00Z")).unwrap();

        let mut index = client("http://localhost/".to_string(), SinceSource::Checkpoint(store));
        index.set_since(ts("2020-01-01T00:00:00Z"));

        assert_eq!(index.resolve_since(), ts("2020-01-01T00:00:00Z"));
        assert_eq!(index.index_url(), "http://localhost/index");
    }
}
