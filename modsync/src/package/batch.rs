//! Ordered batch of package versions from one index scrape.

use chrono::{DateTime, Utc};

use super::PackageVersion;

/// The records returned by one scrape, in index order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageVersionBatch {
    versions: Vec<PackageVersion>,
}

impl PackageVersionBatch {
    /// Creates an empty batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Maximum publish timestamp in the batch.
    ///
    /// An empty batch reports the epoch.
    pub fn max_timestamp(&self) -> DateTime<Utc> {
        self.versions
            .iter()
            .map(PackageVersion::timestamp)
            .max()
            .unwrap_or_else(super::epoch)
    }

    /// Appends a record.
    pub fn push(&mut self, version: PackageVersion) {
        self.versions.push(version);
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.versions.len()
    }

    /// Returns `true` if the batch has no records.
    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    /// Iterates over the records in order.
    pub fn iter(&self) -> std::slice::Iter<'_, PackageVersion> {
        self.versions.iter()
    }
}

impl From<Vec<PackageVersion>> for PackageVersionBatch {
    fn from(versions: Vec<PackageVersion>) -> Self {
        Self { versions }
    }
}

impl FromIterator<PackageVersion> for PackageVersionBatch {
    fn from_iter<I: IntoIterator<Item = PackageVersion>>(iter: I) -> Self {
        Self {
            versions: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for PackageVersionBatch {
    type Item = PackageVersion;
    type IntoIter = std::vec::IntoIter<PackageVersion>;

    fn into_iter(self) -> Self::IntoIter {
        self.versions.into_iter()
    }
}

impl<'a> IntoIterator for &'a PackageVersionBatch {
    type Item = &'a PackageVersion;
    type IntoIter = std::slice::Iter<'a, PackageVersion>;

    fn into_iter(self) -> Self::IntoIter {
        self.versions.iter()
    }
}
