//! Persistent scrape checkpoint.
//!
//! The checkpoint is a single text file holding one timestamp in
//! [`TIMESTAMP_FORMAT`](crate::package::TIMESTAMP_FORMAT). It is read when a
//! scrape starts and overwritten once a batch has fully drained, so a
//! restarted mirror resumes from the last completed batch.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::debug;

use crate::package::format_timestamp;

/// Errors reading or writing the checkpoint file.
#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("failed to read checkpoint {path}: {source}")]
    Read { path: PathBuf, source: io::Error },

    #[error("failed to write checkpoint {path}: {source}")]
    Write { path: PathBuf, source: io::Error },

    #[error("checkpoint {path} holds an invalid timestamp {value:?}: {source}")]
    Parse {
        path: PathBuf,
        value: String,
        source: chrono::ParseError,
    },
}

/// Reads and writes the checkpoint timestamp at a fixed location.
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    path: PathBuf,
}

impl CheckpointStore {
    /// Creates a store for the file at `path`. Nothing is touched on disk.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the checkpoint file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the stored timestamp.
    pub fn load(&self) -> Result<DateTime<Utc>, CheckpointError> {
        let raw = fs::read_to_string(&self.path).map_err(|source| CheckpointError::Read {
            path: self.path.clone(),
            source,
        })?;
        let value = raw.trim();

        DateTime::parse_from_rfc3339(value)
            .map(|ts| ts.with_timezone(&Utc))
            .map_err(|source| CheckpointError::Parse {
                path: self.path.clone(),
                value: value.to_string(),
                source,
            })
    }

    /// Overwrites the checkpoint with `ts`.
    ///
    /// The new content is written to a sibling temporary file and renamed
    /// into place, so the file always holds either the old or the new value.
    pub fn store(&self, ts: DateTime<Utc>) -> Result<(), CheckpointError> {
        let write_err = |source| CheckpointError::Write {
            path: self.path.clone(),
            source,
        };

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir).map_err(write_err)?;

        let mut tmp = tempfile::NamedTempFile::new_in(&dir).map_err(write_err)?;
        tmp.write_all(format_timestamp(&ts).as_bytes())
            .map_err(write_err)?;
        tmp.persist(&self.path).map_err(|e| write_err(e.error))?;

        debug!(path = %self.path.display(), ts = %format_timestamp(&ts), "Checkpoint stored");
        Ok(())
    }

    /// Stores `ts` unless the current checkpoint is already at or past it.
    ///
    /// An unreadable checkpoint counts as absent. Returns `true` if the file
    /// was written.
    pub fn advance(&self, ts: DateTime<Utc>) -> Result<bool, CheckpointError> {
        if let Ok(current) = self.load() {
            if current >= ts {
                debug!(
                    current = %format_timestamp(&current),
                    candidate = %format_timestamp(&ts),
                    "Checkpoint not advanced"
                );
                return Ok(false);
            }
        }
        self.store(ts)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn ts(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn test_store_then_load() {
        let dir = TempDir::new().unwrap();
        let store = CheckpointStore::new(dir.path().join("MAX_TS"));
        let value = ts("2019-04-10T19:08:52.997264Z");

        store.store(value).unwrap();

        assert_eq!(
            fs::read_to_string(store.path()).unwrap(),
            "2019-04-10T19:08:52.997264Z"
        );
        assert_eq!(store.load().unwrap(), value);
    }

    #[test]
    fn test_store_creates_parent_directory() {
        let dir = TempDir::new().unwrap();
        let store = CheckpointStore::new(dir.path().join("nested/out/MAX_TS"));

        store.store(Utc.timestamp_opt(0, 0).unwrap()).unwrap();
        assert!(store.path().exists());
    }

    #[test]
    fn test_load_missing_file() {
        let dir = TempDir::new().unwrap();
        let store = CheckpointStore::new(dir.path().join("MAX_TS"));

        assert!(matches!(store.load(), Err(CheckpointError::Read { .. })));
    }

    #[test]
    fn test_load_tolerates_trailing_newline() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("MAX_TS");
        fs::write(&path, "2024-01-02T03:04:05.000006Z\n").unwrap();

        let store = CheckpointStore::new(path);
        assert_eq!(store.load().unwrap(), ts("2024-01-02T03:04:05.000006Z"));
    }

    #[test]
    fn test_load_garbage() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("MAX_TS");
        fs::write(&path, "yesterday").unwrap();

        let store = CheckpointStore::new(path);
        assert!(matches!(store.load(), Err(CheckpointError::Parse { .. })));
    }

    #[test]
    fn test_advance_never_moves_backwards() {
        let dir = TempDir::new().unwrap();
        let store = CheckpointStore::new(dir.path().join("MAX_TS"));

        assert!(store.advance(ts("2024-01-01T00:00:00Z")).unwrap());
        assert!(!store.advance(ts("2023-01-01T00:00:00Z")).unwrap());
        assert!(!store.advance(ts("2024-01-01T00:00:00Z")).unwrap());
        assert!(store.advance(ts("2024-06-01T00:00:00Z")).unwrap());

        assert_eq!(store.load().unwrap(), ts("2024-06-01T00:00:00Z"));
    }

    #[test]
    fn test_advance_overwrites_unreadable_checkpoint() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("MAX_TS");
        fs::write(&path, "not a timestamp").unwrap();

        let store = CheckpointStore::new(path);
        assert!(store.advance(ts("2024-01-01T00:00:00Z")).unwrap());
        assert_eq!(store.load().unwrap(), ts("2024-01-01T00:00:00Z"));
    }
}
