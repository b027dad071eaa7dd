//! Queue entries and their outcomes.

use std::fmt;

use chrono::{DateTime, Utc};

use crate::package::PackageVersion;

/// A package version waiting to be mirrored.
#[derive(Debug, Clone)]
pub struct DownloadRequest {
    pub version: PackageVersion,

    /// Discovered as a dependency; exempt from the pseudo-version skip.
    pub required: bool,

    /// Further attempts allowed after a failure.
    pub retries_remaining: u32,

    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl DownloadRequest {
    /// A request for a record scraped from the index.
    pub fn new(version: PackageVersion, retries: u32) -> Self {
        Self {
            version,
            required: false,
            retries_remaining: retries,
            created_at: Utc::now(),
            finished_at: None,
        }
    }

    /// A request for a dependency declared by another manifest.
    pub fn dependency(version: PackageVersion, retries: u32) -> Self {
        Self {
            required: true,
            ..Self::new(version, retries)
        }
    }

    /// Dedup key, `path@version`.
    pub fn identity(&self) -> String {
        self.version.identity()
    }

    pub(crate) fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }
}

/// How a worker finished with a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestOutcome {
    Completed,
    Failed,
    Retried,
    Skipped,
}

impl fmt::Display for RequestOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Retried => "retried",
            Self::Skipped => "skipped",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_request_is_optional() {
        let req = DownloadRequest::new(PackageVersion::unpublished("x/y", "v1.0.0"), 3);

        assert!(!req.required);
        assert_eq!(req.retries_remaining, 3);
        assert_eq!(req.identity(), "x/y@v1.0.0");
        assert!(req.finished_at.is_none());
    }

    #[test]
    fn test_dependency_is_required() {
        let req = DownloadRequest::dependency(PackageVersion::unpublished("a/b", "v0.1.0"), 1);
        assert!(req.required);
        assert_eq!(req.retries_remaining, 1);
    }

    #[test]
    fn test_outcome_display() {
        assert_eq!(RequestOutcome::Retried.to_string(), "retried");
        assert_eq!(RequestOutcome::Skipped.to_string(), "skipped");
    }
}
