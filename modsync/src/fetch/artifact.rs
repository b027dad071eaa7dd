//! HTTP artifact fetcher with atomic placement.

use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use super::error::{FetchError, FetchResult};

/// Default timeout for HTTP requests in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 300; // 5 minutes

/// Permission bits for mirrored files.
#[cfg(unix)]
const ARTIFACT_MODE: u32 = 0o644;

/// What [`ArtifactFetcher::fetch`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The resource was downloaded and moved into place.
    Downloaded { bytes: u64 },
    /// The target already existed and the network was not touched.
    Skipped,
}

/// Downloads single resources into the mirror.
///
/// Cloning is cheap; clones share the underlying connection pool.
#[derive(Debug, Clone)]
pub struct ArtifactFetcher {
    client: Client,
    temp_dir: PathBuf,
    timeout: Duration,
}

impl ArtifactFetcher {
    /// Creates a fetcher staging downloads in `temp_dir`.
    ///
    /// `temp_dir` should live on the same file system as the mirror so the
    /// final rename is atomic.
    pub fn new(temp_dir: impl Into<PathBuf>, timeout: Duration) -> FetchResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("modsync/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(FetchError::Client)?;

        Ok(Self {
            client,
            temp_dir: temp_dir.into(),
            timeout,
        })
    }

    /// Directory used for in-flight downloads.
    pub fn temp_dir(&self) -> &Path {
        &self.temp_dir
    }

    /// Request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Downloads `url` to `target`.
    ///
    /// With `skip_if_exists`, an existing regular file at `target` is left
    /// alone and no request is made. Use it only for immutable resources.
    pub async fn fetch(
        &self,
        target: &Path,
        url: &str,
        skip_if_exists: bool,
    ) -> FetchResult<FetchOutcome> {
        if skip_if_exists && is_file(target).await {
            debug!(url, target = %target.display(), "Artifact present, skipping");
            return Ok(FetchOutcome::Skipped);
        }

        debug!(url, target = %target.display(), "Downloading");
        let response = self.get(url).await?;
        let bytes = self.write_atomically(response, url, target).await?;

        Ok(FetchOutcome::Downloaded { bytes })
    }

    /// GETs `url` and decodes the body as JSON.
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> FetchResult<T> {
        let response = self.get(url).await?;
        let body = response
            .bytes()
            .await
            .map_err(|e| self.request_error(url, e))?;

        serde_json::from_slice(&body).map_err(|source| FetchError::Decode {
            url: url.to_string(),
            source,
        })
    }

    /// Sends a GET and turns any non-success status into an error.
    async fn get(&self, url: &str) -> FetchResult<Response> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.request_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Status {
                url: url.to_string(),
                status,
                body,
            });
        }

        Ok(response)
    }

    async fn write_atomically(
        &self,
        mut response: Response,
        url: &str,
        target: &Path,
    ) -> FetchResult<u64> {
        let staged = tempfile::Builder::new()
            .prefix("modsync-")
            .tempfile_in(&self.temp_dir)
            .map_err(|source| FetchError::Io {
                path: self.temp_dir.clone(),
                source,
            })?;

        // The TempPath removes the staged file on drop until it is persisted.
        let (file, staged_path) = staged.into_parts();
        let io_err = |source| FetchError::Io {
            path: staged_path.to_path_buf(),
            source,
        };

        let mut file = tokio::fs::File::from_std(file);
        let mut written = 0u64;
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| self.request_error(url, e))?
        {
            file.write_all(&chunk).await.map_err(io_err)?;
            written += chunk.len() as u64;
        }
        file.flush().await.map_err(io_err)?;
        drop(file);

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(&staged_path, std::fs::Permissions::from_mode(ARTIFACT_MODE))
                .await
                .map_err(io_err)?;
        }

        staged_path.persist(target).map_err(|e| FetchError::Io {
            path: target.to_path_buf(),
            source: e.error,
        })?;

        debug!(url, target = %target.display(), bytes = written, "Artifact written");
        Ok(written)
    }

    fn request_error(&self, url: &str, error: reqwest::Error) -> FetchError {
        if error.is_timeout() {
            FetchError::Timeout {
                url: url.to_string(),
                timeout_secs: self.timeout.as_secs(),
            }
        } else {
            FetchError::Request {
                url: url.to_string(),
                source: error,
            }
        }
    }
}

async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use tempfile::TempDir;

    fn fetcher(dir: &TempDir) -> ArtifactFetcher {
        let tmp = dir.path().join("tmp");
        std::fs::create_dir_all(&tmp).unwrap();
        ArtifactFetcher::new(tmp, Duration::from_secs(10)).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_writes_body_verbatim() {
        let server = MockServer::start_async().await;
        let body: Vec<u8> = (0..=255u8).cycle().take(200_000).collect();
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/x/y/@v/v1.0.0.zip");
                then.status(200).body(body.clone());
            })
            .await;

        let dir = TempDir::new().unwrap();
        let target = dir.path().join("v1.0.0.zip");
        let outcome = fetcher(&dir)
            .fetch(&target, &server.url("/x/y/@v/v1.0.0.zip"), true)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(outcome, FetchOutcome::Downloaded { bytes: 200_000 });
        assert_eq!(std::fs::read(&target).unwrap(), body);
    }

    #[tokio::test]
    async fn test_fetch_leaves_temp_dir_empty() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/list");
                then.status(200).body("v1.0.0\nv1.1.0\n");
            })
            .await;

        let dir = TempDir::new().unwrap();
        let fetcher = fetcher(&dir);
        fetcher
            .fetch(&dir.path().join("list"), &server.url("/list"), false)
            .await
            .unwrap();

        let leftovers = std::fs::read_dir(fetcher.temp_dir()).unwrap().count();
        assert_eq!(leftovers, 0);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_fetch_sets_file_mode() {
        use std::os::unix::fs::PermissionsExt;

        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/info");
                then.status(200).body("{}");
            })
            .await;

        let dir = TempDir::new().unwrap();
        let target = dir.path().join("v1.0.0.info");
        fetcher(&dir)
            .fetch(&target, &server.url("/info"), false)
            .await
            .unwrap();

        let mode = std::fs::metadata(&target).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o644);
    }

    #[tokio::test]
    async fn test_skip_if_exists_makes_no_request() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/mod");
                then.status(200).body("module changed\n");
            })
            .await;

        let dir = TempDir::new().unwrap();
        let target = dir.path().join("v1.0.0.mod");
        std::fs::write(&target, "module x/y\n").unwrap();

        let outcome = fetcher(&dir)
            .fetch(&target, &server.url("/mod"), true)
            .await
            .unwrap();

        assert_eq!(outcome, FetchOutcome::Skipped);
        assert_eq!(mock.hits_async().await, 0);
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "module x/y\n");
    }

    #[tokio::test]
    async fn test_mutable_resource_is_refetched() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/list");
                then.status(200).body("v1.0.0\nv1.1.0\n");
            })
            .await;

        let dir = TempDir::new().unwrap();
        let target = dir.path().join("list");
        std::fs::write(&target, "v1.0.0\n").unwrap();

        fetcher(&dir)
            .fetch(&target, &server.url("/list"), false)
            .await
            .unwrap();

        assert_eq!(std::fs::read_to_string(&target).unwrap(), "v1.0.0\nv1.1.0\n");
    }

    #[tokio::test]
    async fn test_error_status_leaves_target_untouched() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/zip");
                then.status(500).body("upstream exploded");
            })
            .await;

        let dir = TempDir::new().unwrap();
        let target = dir.path().join("v1.0.0.zip");
        let err = fetcher(&dir)
            .fetch(&target, &server.url("/zip"), true)
            .await
            .unwrap_err();

        match err {
            FetchError::Status { status, body, .. } => {
                assert_eq!(status.as_u16(), 500);
                assert_eq!(body, "upstream exploded");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(!target.exists());
    }

    #[tokio::test]
    async fn test_get_json() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/x/y/@latest");
                then.status(200)
                    .body(r#"{"Version":"v1.2.0","Time":"2024-05-01T10:00:00Z"}"#);
            })
            .await;

        let dir = TempDir::new().unwrap();
        let value: serde_json::Value = fetcher(&dir)
            .get_json(&server.url("/x/y/@latest"))
            .await
            .unwrap();

        assert_eq!(value["Version"], "v1.2.0");
    }

    #[tokio::test]
    async fn test_get_json_decode_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/bad");
                then.status(200).body("not json");
            })
            .await;

        let dir = TempDir::new().unwrap();
        let result: FetchResult<serde_json::Value> =
            fetcher(&dir).get_json(&server.url("/bad")).await;

        assert!(matches!(result, Err(FetchError::Decode { .. })));
    }
}
