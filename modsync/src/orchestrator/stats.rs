//! Observational counters.

use crate::concurrent::ConcurrentCounter;

use super::request::RequestOutcome;

/// Live counters for the current batch.
///
/// Nothing reads these for correctness decisions.
#[derive(Debug, Default)]
pub struct DownloadStats {
    pub inflight: ConcurrentCounter,
    pub skipped: ConcurrentCounter,
    pub failed: ConcurrentCounter,
    pub completed: ConcurrentCounter,
    pub retried: ConcurrentCounter,
}

/// Point-in-time copy of [`DownloadStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub inflight: i64,
    pub skipped: i64,
    pub failed: i64,
    pub completed: i64,
    pub retried: i64,
}

impl DownloadStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, outcome: RequestOutcome) {
        match outcome {
            RequestOutcome::Completed => self.completed.increment(),
            RequestOutcome::Failed => self.failed.increment(),
            RequestOutcome::Retried => self.retried.increment(),
            RequestOutcome::Skipped => self.skipped.increment(),
        };
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            inflight: self.inflight.value(),
            skipped: self.skipped.value(),
            failed: self.failed.value(),
            completed: self.completed.value(),
            retried: self.retried.value(),
        }
    }

    pub fn reset(&self) {
        self.inflight.reset();
        self.skipped.reset();
        self.failed.reset();
        self.completed.reset();
        self.retried.reset();
    }
}
