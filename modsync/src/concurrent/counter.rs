//! Atomic counter.

use std::sync::atomic::{AtomicI64, Ordering};

/// A thread-safe signed counter.
///
/// Signed so that an unbalanced decrement shows up as a negative value in
/// logs instead of wrapping.
#[derive(Debug, Default)]
pub struct ConcurrentCounter {
    value: AtomicI64,
}

impl ConcurrentCounter {
    /// Creates a counter at zero.
    pub fn new() -> Self {
        Self {
            value: AtomicI64::new(0),
        }
    }

    /// Adds one and returns the new value.
    pub fn increment(&self) -> i64 {
        self.add(1)
    }

    /// Subtracts one and returns the new value.
    pub fn decrement(&self) -> i64 {
        self.add(-1)
    }

    /// Adds `delta` and returns the new value.
    pub fn add(&self, delta: i64) -> i64 {
        self.value.fetch_add(delta, Ordering::SeqCst) + delta
    }

    /// Current value.
    pub fn value(&self) -> i64 {
        self.value.load(Ordering::SeqCst)
    }

    /// Sets the counter back to zero.
    pub fn reset(&self) {
        self.value.store(0, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_increment_decrement() {
        let counter = ConcurrentCounter::new();
        assert_eq!(counter.increment(), 1);
        assert_eq!(counter.increment(), 2);
        assert_eq!(counter.decrement(), 1);
        assert_eq!(counter.value(), 1);
    }

    #[test]
    fn test_reset() {
        let counter = ConcurrentCounter::new();
        counter.add(42);
        counter.reset();
        assert_eq!(counter.value(), 0);
    }

    #[test]
    fn test_parallel_updates_balance_out() {
        let counter = Arc::new(ConcurrentCounter::new());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let counter = Arc::clone(&counter);
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        counter.increment();
                        counter.decrement();
                    }
                    counter.increment();
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(counter.value(), 8);
    }
}
