//! Download orchestration.
//!
//! A fixed pool of workers drains one bounded queue of
//! [`DownloadRequest`]s. Workers feed dependencies and retries back through
//! an unbounded lane that a forwarder task moves into the queue, so a
//! worker never waits on queue capacity.
//!
//! ```text
//!  enqueue_batch ──► ┌──────────────┐ ──► worker 1 ─┐
//!   (backpressure)   │ bounded queue│ ──► worker 2 ─┼─► RequestProcessor
//!                    └──────▲───────┘ ──► worker N ─┘        │
//!                           │                                │
//!                      forwarder ◄── feedback lane ◄─────────┘
//!                                   (deps, retries)
//! ```
//!
//! Each request is counted as outstanding from admission until a worker
//! has fully handled it. [`DownloadOrchestrator::await_inflight`] returns
//! once nothing is outstanding and then commits the batch checkpoint.

mod download;
mod error;
mod request;
mod stats;

pub use download::{DownloadOrchestrator, DrainReport};
pub use error::OrchestratorError;
pub use request::{DownloadRequest, RequestOutcome};
pub use stats::{DownloadStats, StatsSnapshot};
