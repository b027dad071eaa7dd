//! Worker pool and completion barrier.

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::error::OrchestratorError;
use super::request::{DownloadRequest, RequestOutcome};
use super::stats::{DownloadStats, StatsSnapshot};
use crate::checkpoint::CheckpointStore;
use crate::concurrent::{ConcurrentCounter, ConcurrentSet};
use crate::config::MirrorConfig;
use crate::package::{format_timestamp, PackageVersion, PackageVersionBatch};
use crate::pipeline::{DependencySink, RequestProcessor};

type SharedReceiver = Arc<tokio::sync::Mutex<mpsc::Receiver<DownloadRequest>>>;

/// What a drained batch produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrainReport {
    /// Counters as they stood when the batch drained.
    pub stats: StatsSnapshot,

    /// Checkpoint value written for the batch, if any.
    pub checkpoint: Option<DateTime<Utc>>,
}

/// State shared by the workers and the orchestrator handle.
struct Shared {
    processor: Arc<dyn RequestProcessor>,
    inflight: ConcurrentSet<String>,
    completed: ConcurrentSet<String>,
    stats: DownloadStats,
    /// Requests admitted but not yet fully handled by a worker.
    outstanding: ConcurrentCounter,
    feedback: mpsc::UnboundedSender<DownloadRequest>,
    retries: u32,
    skip_pseudo_versions: bool,
}

/// Mirrors batches of package versions and their dependency closure.
///
/// Must be started inside a Tokio runtime.
pub struct DownloadOrchestrator {
    shared: Arc<Shared>,
    queue: mpsc::Sender<DownloadRequest>,
    shutdown: CancellationToken,
    handles: Mutex<Vec<JoinHandle<()>>>,
    checkpoint: CheckpointStore,
    /// Maximum timestamp of the last non-empty batch not yet committed.
    pending_checkpoint: Mutex<Option<DateTime<Utc>>>,
    config: MirrorConfig,
}

impl DownloadOrchestrator {
    /// Validates `config` and spawns the workers and the feedback forwarder.
    pub fn start(
        config: MirrorConfig,
        processor: Arc<dyn RequestProcessor>,
    ) -> Result<Self, OrchestratorError> {
        Self::start_with_token(config, processor, CancellationToken::new())
    }

    /// Like [`start`](Self::start), stopping when `shutdown` is cancelled.
    pub fn start_with_token(
        config: MirrorConfig,
        processor: Arc<dyn RequestProcessor>,
        shutdown: CancellationToken,
    ) -> Result<Self, OrchestratorError> {
        config.validate()?;

        let (queue_tx, queue_rx) = mpsc::channel(config.queue_capacity);
        let (feedback_tx, feedback_rx) = mpsc::unbounded_channel();

        let shared = Arc::new(Shared {
            processor,
            inflight: ConcurrentSet::new(),
            completed: ConcurrentSet::new(),
            stats: DownloadStats::new(),
            outstanding: ConcurrentCounter::new(),
            feedback: feedback_tx,
            retries: config.retries,
            skip_pseudo_versions: config.skip_pseudo_versions,
        });

        let receiver: SharedReceiver = Arc::new(tokio::sync::Mutex::new(queue_rx));
        let mut handles = Vec::with_capacity(config.workers + 1);
        for id in 0..config.workers {
            handles.push(tokio::spawn(run_worker(
                id,
                Arc::clone(&shared),
                Arc::clone(&receiver),
                shutdown.clone(),
            )));
        }
        handles.push(tokio::spawn(forward_feedback(
            feedback_rx,
            queue_tx.clone(),
            shutdown.clone(),
        )));

        info!(
            workers = config.workers,
            capacity = config.queue_capacity,
            retries = config.retries,
            skip_pseudo_versions = config.skip_pseudo_versions,
            "Download orchestrator started"
        );

        Ok(Self {
            shared,
            queue: queue_tx,
            shutdown,
            handles: Mutex::new(handles),
            checkpoint: CheckpointStore::new(config.checkpoint_file.clone()),
            pending_checkpoint: Mutex::new(None),
            config,
        })
    }

    pub fn config(&self) -> &MirrorConfig {
        &self.config
    }

    /// Token that stops the workers when cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Submits every record of `batch` as an optional request.
    ///
    /// Waits for queue capacity, so a slow pool slows the caller down.
    pub async fn enqueue_batch(&self, batch: PackageVersionBatch) -> Result<(), OrchestratorError> {
        let temp_dir = &self.config.temp_dir;
        tokio::fs::create_dir_all(temp_dir)
            .await
            .map_err(|source| OrchestratorError::Io {
                path: temp_dir.clone(),
                source,
            })?;

        if !batch.is_empty() {
            let max = batch.max_timestamp();
            let mut pending = self.pending_checkpoint.lock();
            *pending = Some((*pending).map_or(max, |prev| prev.max(max)));
        }

        debug!(records = batch.len(), "Enqueueing batch");
        for version in batch {
            self.submit(DownloadRequest::new(version, self.config.retries))
                .await?;
        }
        Ok(())
    }

    async fn submit(&self, request: DownloadRequest) -> Result<(), OrchestratorError> {
        let permit = tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => return Err(OrchestratorError::Cancelled),
            permit = self.queue.reserve() => permit.map_err(|_| OrchestratorError::QueueClosed)?,
        };
        // Counted only once the send can no longer be abandoned.
        self.shared.outstanding.increment();
        permit.send(request);
        Ok(())
    }

    /// Waits until every admitted request, including discovered
    /// dependencies and retries, has been handled.
    ///
    /// Then resets the counters and, when enabled, advances the checkpoint
    /// to the maximum timestamp of the batches submitted since the last
    /// drain.
    pub async fn await_inflight(&self) -> Result<DrainReport, OrchestratorError> {
        let mut ticker = tokio::time::interval(self.config.drain_poll_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => return Err(OrchestratorError::Cancelled),
                _ = ticker.tick() => {}
            }

            let outstanding = self.shared.outstanding.value();
            if outstanding == 0 {
                break;
            }
            let stats = self.shared.stats.snapshot();
            info!(
                queued = self.queued(),
                outstanding,
                inflight = stats.inflight,
                completed = stats.completed,
                skipped = stats.skipped,
                retried = stats.retried,
                failed = stats.failed,
                "Waiting for downloads"
            );
        }

        let stats = self.shared.stats.snapshot();
        self.shared.stats.reset();

        let pending = self.pending_checkpoint.lock().take();
        let checkpoint = match pending {
            Some(ts) if self.config.write_checkpoint => {
                let store = self.checkpoint.clone();
                if tokio::task::spawn_blocking(move || store.advance(ts)).await?? {
                    info!(checkpoint = %format_timestamp(&ts), "Checkpoint advanced");
                }
                Some(ts)
            }
            _ => None,
        };

        info!(
            completed = stats.completed,
            skipped = stats.skipped,
            retried = stats.retried,
            failed = stats.failed,
            "Batch drained"
        );
        Ok(DrainReport { stats, checkpoint })
    }

    /// Removes the temp directory and anything left in it.
    pub async fn cleanup(&self) -> Result<(), OrchestratorError> {
        let temp_dir = &self.config.temp_dir;
        match tokio::fs::remove_dir_all(temp_dir).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(OrchestratorError::Io {
                path: temp_dir.clone(),
                source,
            }),
        }
    }

    /// Cancels the workers and waits for them to exit.
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        let handles = std::mem::take(&mut *self.handles.lock());
        for result in futures::future::join_all(handles).await {
            if let Err(err) = result {
                warn!(err = %err, "Orchestrator task ended abnormally");
            }
        }
        debug!("Download orchestrator stopped");
    }

    /// Whether `identity` (`path@version`) has been mirrored in this process.
    pub fn is_completed(&self, identity: &str) -> bool {
        self.shared.completed.contains(identity)
    }

    /// Identities mirrored in this process.
    pub fn completed(&self) -> Vec<String> {
        self.shared.completed.values()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.shared.stats.snapshot()
    }

    /// Requests sitting in the bounded queue.
    pub fn queued(&self) -> usize {
        self.queue.max_capacity() - self.queue.capacity()
    }

    /// Requests admitted but not yet handled.
    pub fn outstanding(&self) -> i64 {
        self.shared.outstanding.value()
    }

    pub fn checkpoint_store(&self) -> &CheckpointStore {
        &self.checkpoint
    }

    pub fn temp_dir(&self) -> &Path {
        &self.config.temp_dir
    }
}

impl Drop for DownloadOrchestrator {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

impl Shared {
    /// Admits `request` through the feedback lane.
    fn feed_back(&self, request: DownloadRequest) {
        self.outstanding.increment();
        if self.feedback.send(request).is_err() {
            // Forwarder is gone; the orchestrator is shutting down.
            self.outstanding.decrement();
        }
    }

    async fn handle(&self, request: DownloadRequest) {
        let key = request.identity();

        if self.claim(&key) {
            self.stats.inflight.increment();
            let (outcome, retry) = self.attempt(request).await;
            self.stats.record(outcome);
            self.inflight.remove(key.as_str());
            self.stats.inflight.decrement();

            // Released before requeueing so the retry is not taken for a duplicate.
            if let Some(retry) = retry {
                self.feed_back(retry);
            }
        } else {
            debug!(package = %key, "Already handled, dropping");
        }

        self.outstanding.decrement();
    }

    /// Marks `key` in flight unless it is in flight or completed already.
    ///
    /// Terminal failures are not remembered: a failed key discovered again
    /// is claimed afresh with a new retry budget.
    fn claim(&self, key: &str) -> bool {
        if self.completed.contains(key) || !self.inflight.insert(key.to_string()) {
            return false;
        }
        // Completion may have landed between the check and the insert.
        if self.completed.contains(key) {
            self.inflight.remove(key);
            return false;
        }
        true
    }

    async fn attempt(
        &self,
        mut request: DownloadRequest,
    ) -> (RequestOutcome, Option<DownloadRequest>) {
        if !request.required && self.skip_pseudo_versions && request.version.is_pseudo_version() {
            debug!(
                path = request.version.path(),
                version = request.version.version(),
                "Skipping pseudo-version"
            );
            return (RequestOutcome::Skipped, None);
        }

        let result = self.processor.process(&request.version, self).await;
        match result {
            Ok(()) => {
                self.completed.insert(request.identity());
                request.finish();
                debug!(
                    path = request.version.path(),
                    version = request.version.version(),
                    elapsed_ms = elapsed_ms(&request),
                    "Download completed"
                );
                (RequestOutcome::Completed, None)
            }
            Err(err) if err.is_retryable() && request.retries_remaining > 0 => {
                request.retries_remaining -= 1;
                warn!(
                    path = request.version.path(),
                    version = request.version.version(),
                    retries_remaining = request.retries_remaining,
                    err = %err,
                    "Download failed, retrying"
                );
                (RequestOutcome::Retried, Some(request))
            }
            Err(err) => {
                request.finish();
                error!(
                    path = request.version.path(),
                    version = request.version.version(),
                    err = %err,
                    "Download failed"
                );
                (RequestOutcome::Failed, None)
            }
        }
    }
}

impl DependencySink for Shared {
    fn submit(&self, version: PackageVersion) {
        self.feed_back(DownloadRequest::dependency(version, self.retries));
    }
}

fn elapsed_ms(request: &DownloadRequest) -> i64 {
    request
        .finished_at
        .map(|end| (end - request.created_at).num_milliseconds())
        .unwrap_or_default()
}

async fn run_worker(
    id: usize,
    shared: Arc<Shared>,
    receiver: SharedReceiver,
    shutdown: CancellationToken,
) {
    debug!(worker = id, "Worker started");
    loop {
        let next = {
            let mut rx = receiver.lock().await;
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => None,
                request = rx.recv() => request,
            }
        };
        let Some(request) = next else {
            break;
        };

        tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            _ = shared.handle(request) => {}
        }
    }
    debug!(worker = id, "Worker stopped");
}

async fn forward_feedback(
    mut feedback: mpsc::UnboundedReceiver<DownloadRequest>,
    queue: mpsc::Sender<DownloadRequest>,
    shutdown: CancellationToken,
) {
    loop {
        let request = tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            request = feedback.recv() => request,
        };
        let Some(request) = request else {
            break;
        };

        tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            sent = queue.send(request) => {
                if sent.is_err() {
                    break;
                }
            }
        }
    }
    debug!("Feedback forwarder stopped");
}
