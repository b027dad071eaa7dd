//! Concurrent membership set backed by `DashSet`.

use std::borrow::Borrow;
use std::hash::Hash;

use dashmap::DashSet;

/// A thread-safe set.
///
/// Shard-level locking comes from `dashmap`; every method is a single
/// critical section, which makes [`ConcurrentSet::insert`] usable as an
/// atomic claim on a key.
#[derive(Debug)]
pub struct ConcurrentSet<T>
where
    T: Eq + Hash,
{
    inner: DashSet<T>,
}

impl<T> Default for ConcurrentSet<T>
where
    T: Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ConcurrentSet<T>
where
    T: Eq + Hash,
{
    /// Creates an empty set.
    pub fn new() -> Self {
        Self {
            inner: DashSet::new(),
        }
    }

    /// Inserts `value`, returning `true` if it was not present.
    ///
    /// The check and the insert happen under the same shard lock, so exactly
    /// one of several concurrent callers inserting the same value sees `true`.
    pub fn insert(&self, value: T) -> bool {
        self.inner.insert(value)
    }

    /// Removes `value`, returning `true` if it was present.
    pub fn remove<Q>(&self, value: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.inner.remove(value).is_some()
    }

    /// Returns `true` if `value` is in the set.
    pub fn contains<Q>(&self, value: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.inner.contains(value)
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns `true` if the set has no members.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Removes every member.
    pub fn clear(&self) {
        self.inner.clear();
    }
}

impl<T> ConcurrentSet<T>
where
    T: Eq + Hash + Clone,
{
    /// Snapshot of the members, in arbitrary order.
    pub fn values(&self) -> Vec<T> {
        self.inner.iter().map(|v| v.key().clone()).collect()
    }
}
