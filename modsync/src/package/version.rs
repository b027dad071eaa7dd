//! A single package version and the pure classification functions on it.

use std::fmt;
use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One entry of the module index, e.g. `https://index.golang.org/index?limit=1`.
///
/// Serialised with the index field names; `Timestamp` comes first.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PackageVersion {
    #[serde(default = "super::epoch")]
    timestamp: DateTime<Utc>,
    path: String,
    version: String,
}

impl PackageVersion {
    /// Creates a record with a publish timestamp.
    pub fn new(
        path: impl Into<String>,
        version: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            timestamp,
            path: path.into(),
            version: version.into(),
        }
    }

    /// Creates a record without a meaningful timestamp.
    ///
    /// Used for dependencies discovered in manifests; the timestamp is the
    /// epoch and never feeds the checkpoint.
    pub fn unpublished(path: impl Into<String>, version: impl Into<String>) -> Self {
        Self::new(path, version, super::epoch())
    }

    /// Module path, e.g. `golang.org/x/text`.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Version string, e.g. `v0.3.0`.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Publish time reported by the index.
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Identity string `path@version`, the dedup key.
    pub fn identity(&self) -> String {
        format!("{}@{}", self.path, self.version)
    }

    /// Returns `true` if the version looks like a pseudo-version.
    pub fn is_pseudo_version(&self) -> bool {
        is_pseudo_version(&self.version)
    }

    /// Serialises the record as a single JSON line.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl fmt::Display for PackageVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.path, self.version)
    }
}

fn pseudo_version_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        // vX.Y.Z-[N.][N.]yyyymmddhhmmss-<12 hex commit>
        Regex::new(r"v\d+\.\d+\.\d+-(\d+\.)?(\d+\.)?\d{8}\d{6}-[a-f0-9]{12}").unwrap()
    })
}

/// Returns `true` if `version` has the shape of a pseudo-version.
///
/// Pseudo-versions encode a commit time and hash, e.g.
/// `v0.0.0-20191109021931-daa7c04131f5`.
pub fn is_pseudo_version(version: &str) -> bool {
    pseudo_version_pattern().is_match(version)
}

/// Returns `true` if `version` is a valid `v`-prefixed semantic version.
///
/// Accepts the full `vMAJOR.MINOR.PATCH[-pre][+build]` form as well as the
/// `vMAJOR` and `vMAJOR.MINOR` shorthands.
pub fn is_valid_semver(version: &str) -> bool {
    let Some(rest) = version.strip_prefix('v') else {
        return false;
    };

    if semver::Version::parse(rest).is_ok() {
        return true;
    }

    let parts: Vec<&str> = rest.split('.').collect();
    parts.len() <= 2 && parts.iter().all(|p| is_numeric_identifier(p))
}

fn is_numeric_identifier(part: &str) -> bool {
    !part.is_empty()
        && part.bytes().all(|b| b.is_ascii_digit())
        && (part == "0" || !part.starts_with('0'))
}

/// Reasons a package path cannot be mapped onto the local mirror.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("package path is empty")]
    Empty,

    #[error("package path must be relative: {0}")]
    Absolute(String),

    #[error("package path contains an invalid segment: {0}")]
    InvalidSegment(String),
}

/// Checks that `path` stays inside the output directory when joined to it.
pub fn validate_path(path: &str) -> Result<(), PathError> {
    if path.is_empty() {
        return Err(PathError::Empty);
    }
    let bytes = path.as_bytes();
    let has_drive = bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':';
    if path.starts_with('/') || path.contains('\\') || has_drive {
        return Err(PathError::Absolute(path.to_string()));
    }
    if path
        .split('/')
        .any(|segment| segment.is_empty() || segment == "." || segment == "..")
    {
        return Err(PathError::InvalidSegment(path.to_string()));
    }
    Ok(())
}
