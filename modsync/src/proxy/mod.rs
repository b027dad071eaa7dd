//! Module proxy URL layout and the `@latest` query.
//!
//! Resources served per package path:
//!
//! ```text
//! <proxy>/<path>/@v/list               version list (mutable)
//! <proxy>/<path>/@latest               latest version pointer (mutable)
//! <proxy>/<path>/@v/<version>.info     version metadata
//! <proxy>/<path>/@v/<version>.mod      manifest
//! <proxy>/<path>/@v/<version>.zip      archive
//! ```

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::fetch::{ArtifactFetcher, FetchResult};
use crate::package::PackageVersion;

/// Default public module proxy.
pub const DEFAULT_PROXY_URL: &str = "https://proxy.golang.org";

/// Per-version artifact suffixes, in download order after the manifest.
pub const VERSION_ARTIFACTS: [&str; 2] = [".info", ".zip"];

/// Builds proxy URLs for a given base.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyEndpoints {
    base: String,
}

impl Default for ProxyEndpoints {
    fn default() -> Self {
        Self::new(DEFAULT_PROXY_URL)
    }
}

impl ProxyEndpoints {
    /// Creates endpoints for `base`; a trailing slash is ignored.
    pub fn new(base: impl Into<String>) -> Self {
        let base = base.into();
        Self {
            base: base.trim_end_matches('/').to_string(),
        }
    }

    /// The base URL without trailing slash.
    pub fn base(&self) -> &str {
        &self.base
    }

    /// `<proxy>/<path>/@v/list`
    pub fn list_url(&self, path: &str) -> String {
        format!("{}/{}/@v/list", self.base, path)
    }

    /// `<proxy>/<path>/@latest`
    pub fn latest_url(&self, path: &str) -> String {
        format!("{}/{}/@latest", self.base, path)
    }

    /// `<proxy>/<path>/@v/<version>` followed by `suffix` (`.info`, `.mod`, `.zip`).
    pub fn artifact_url(&self, version: &PackageVersion, suffix: &str) -> String {
        format!(
            "{}/{}/@v/{}{}",
            self.base,
            version.path(),
            version.version(),
            suffix
        )
    }
}

/// Response of the `@latest` endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LatestVersion {
    pub version: String,
    pub time: DateTime<Utc>,
}

impl LatestVersion {
    /// Converts to a record for `path`, using `time` as the publish time.
    pub fn into_package_version(self, path: impl Into<String>) -> PackageVersion {
        PackageVersion::new(path, self.version, self.time)
    }
}

/// Asks the proxy for the latest version of `path`.
pub async fn latest_version(
    fetcher: &ArtifactFetcher,
    endpoints: &ProxyEndpoints,
    path: &str,
) -> FetchResult<PackageVersion> {
    let latest: LatestVersion = fetcher.get_json(&endpoints.latest_url(path)).await?;
    Ok(latest.into_package_version(path))
}
