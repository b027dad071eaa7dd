//! Package-version records as published by the module index.
//!
//! A [`PackageVersion`] is one immutable release identified by its path and
//! version. Its identity string (`path@version`) is the dedup key used by
//! the orchestrator. A [`PackageVersionBatch`] is the ordered result of a
//! single index scrape and knows its maximum timestamp, which is what the
//! checkpoint advances to.

mod batch;
mod version;

use chrono::{DateTime, Utc};

pub use batch::PackageVersionBatch;
pub use version::{
    is_pseudo_version, is_valid_semver, validate_path, PackageVersion, PathError,
};

/// Format used for the index `since` parameter and the checkpoint file.
///
/// RFC 3339 in UTC with microsecond precision, e.g.
/// `2019-04-10T19:08:52.997264Z`.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6fZ";

/// Formats a timestamp with [`TIMESTAMP_FORMAT`].
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// The minimum timestamp: `1970-01-01T00:00:00Z`.
pub fn epoch() -> DateTime<Utc> {
    DateTime::<Utc>::UNIX_EPOCH
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_timestamp_has_microseconds() {
        let ts = DateTime::parse_from_rfc3339("2019-04-10T19:08:52.997264Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(format_timestamp(&ts), "2019-04-10T19:08:52.997264Z");
    }

    #[test]
    fn test_format_timestamp_pads_whole_seconds() {
        assert_eq!(format_timestamp(&epoch()), "1970-01-01T00:00:00.000000Z");
    }
}
