//! Pipeline errors.

use std::path::PathBuf;

use thiserror::Error;

use super::manifest::ManifestError;
use crate::fetch::FetchError;
use crate::package::PathError;

/// Why a package version could not be mirrored.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid semantic version: {0}")]
    InvalidVersion(String),

    #[error("invalid package path: {0}")]
    InvalidPath(#[from] PathError),

    #[error("failed to create {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to fetch {artifact}: {source}")]
    Fetch {
        artifact: &'static str,
        source: FetchError,
    },

    #[error("failed to read manifest {path}: {source}")]
    ReadManifest {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse manifest {path}: {source}")]
    Manifest {
        path: PathBuf,
        source: ManifestError,
    },
}

impl PipelineError {
    /// Whether another attempt could succeed.
    ///
    /// Validation failures are deterministic and never retryable.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::InvalidVersion(_) | Self::InvalidPath(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_errors_are_not_retryable() {
        assert!(!PipelineError::InvalidVersion("1.0".to_string()).is_retryable());
        assert!(!PipelineError::InvalidPath(PathError::Empty).is_retryable());
    }

    #[test]
    fn test_io_and_manifest_errors_are_retryable() {
        let io = PipelineError::CreateDir {
            path: PathBuf::from("/out/x/@v"),
            source: std::io::Error::other("disk full"),
        };
        let manifest = PipelineError::Manifest {
            path: PathBuf::from("v1.0.0.mod"),
            source: ManifestError::UnterminatedBlock {
                directive: "require".to_string(),
                line: 3,
            },
        };

        assert!(io.is_retryable());
        assert!(manifest.is_retryable());
        assert!(io.to_string().contains("disk full"));
    }
}
