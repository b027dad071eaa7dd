//! `modsync list` - print index records as JSON lines.

use std::io::{self, Write};
use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use clap::Args;
use modsync::fetch::DEFAULT_TIMEOUT_SECS;
use modsync::index::{IndexClient, SinceSource, MAX_SCRAPE_LIMIT};
use modsync::package::epoch;
use modsync::PackageVersionBatch;

use super::common::{self, IndexArgs};
use crate::error::CliError;

#[derive(Debug, Args)]
pub struct ListArgs {
    /// Maximum number of records to print
    #[arg(long, default_value_t = 100)]
    pub limit: usize,

    /// Only list records published at or after this RFC 3339 timestamp
    #[arg(long)]
    pub since: Option<DateTime<Utc>>,

    #[command(flatten)]
    pub index: IndexArgs,
}

pub fn run(args: ListArgs, config_path: Option<&Path>) -> Result<(), CliError> {
    let file = common::load_config_file(config_path)?;
    let timeout = Duration::from_secs(file.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS));
    let index = IndexClient::new(
        args.index.resolve(&file),
        SinceSource::Explicit(args.since.unwrap_or_else(epoch)),
        timeout,
    )?;

    let runtime = common::runtime()?;
    let stdout = io::stdout();
    runtime.block_on(list_records(index, args.limit, &mut stdout.lock()))?;
    Ok(())
}

/// Pages through the index, writing up to `limit` records to `out`.
///
/// Stops early on an empty page or a page identical to the previous one.
async fn list_records(
    mut index: IndexClient,
    limit: usize,
    out: &mut impl Write,
) -> Result<usize, CliError> {
    let mut printed = 0;
    let mut previous = PackageVersionBatch::new();

    while printed < limit {
        let batch = index.scrape(MAX_SCRAPE_LIMIT).await?;
        if batch.is_empty() || batch == previous {
            break;
        }
        index.set_since(batch.max_timestamp());

        for record in &batch {
            let line = record
                .to_json()
                .map_err(|e| CliError::Output(e.to_string()))?;
            writeln!(out, "{}", line).map_err(|e| CliError::Output(e.to_string()))?;
            printed += 1;
            if printed >= limit {
                return Ok(printed);
            }
        }
        previous = batch;
    }

    Ok(printed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    const A: &str = r#"{"Path":"a/b","Version":"v1.0.0","Timestamp":"2024-01-01T00:00:00Z"}"#;
    const B: &str = r#"{"Path":"c/d","Version":"v2.0.0","Timestamp":"2024-01-02T00:00:00Z"}"#;

    async fn index_with_pages(server: &MockServer) -> IndexClient {
        server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/index")
                    .query_param("since", "1970-01-01T00:00:00.000000Z");
                then.status(200).body(format!("{A}\n{B}\n"));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/index")
                    .query_param("since", "2024-01-02T00:00:00.000000Z");
                then.status(200).body(format!("{B}\n"));
            })
            .await;
        IndexClient::new(
            server.base_url(),
            SinceSource::Explicit(epoch()),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_list_stops_at_limit() {
        let server = MockServer::start_async().await;
        let index = index_with_pages(&server).await;
        let mut out = Vec::new();

        let printed = list_records(index, 1, &mut out).await.unwrap();

        assert_eq!(printed, 1);
        assert_eq!(String::from_utf8(out).unwrap().lines().count(), 1);
    }

    #[tokio::test]
    async fn test_list_stops_when_page_repeats() {
        let server = MockServer::start_async().await;
        let index = index_with_pages(&server).await;
        let mut out = Vec::new();

        let printed = list_records(index, 100, &mut out).await.unwrap();

        let text = String::from_utf8(out).unwrap();
        assert_eq!(printed, 3);
        assert!(text.lines().next().unwrap().contains(r#""Path":"a/b""#));
    }
}
