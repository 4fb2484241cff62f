use chrono::{DateTime, Utc};
use crossbeam_channel::{bounded, unbounded, Receiver, Sender, TryRecvError, TrySendError};
use std::any::Any;
use std::cell::Cell;
use std::collections::HashSet;
use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, trace};

use crate::cancel::CancelToken;
use crate::config::{PipelineSettings, ScanConfig};
use crate::error::Error;
use crate::platform;
use crate::progress::ProgressReporter;
use crate::record::FileRecord;
use crate::results::ResultSet;
use crate::scanner::{absolute_path, TreeWalker, WalkStats};

/// Lifecycle of one scan: `Idle → Running → Completed | Cancelled | Failed`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanState {
    Idle,
    Running,
    Completed,
    Cancelled,
    Failed(String),
}

impl ScanState {
    pub fn name(&self) -> &'static str {
        match self {
            ScanState::Idle => "idle",
            ScanState::Running => "running",
            ScanState::Completed => "completed",
            ScanState::Cancelled => "cancelled",
            ScanState::Failed(_) => "failed",
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(
            self,
            ScanState::Completed | ScanState::Cancelled | ScanState::Failed(_)
        )
    }
}

/// What the worker saw, available once the scan has finished.
#[derive(Debug, Clone, Default)]
pub struct ScanSummary {
    /// Records handed to the channel.
    pub published: usize,
    /// Records discarded because the channel was full.
    pub dropped: usize,
    pub walk: WalkStats,
    pub duration: Duration,
}

/// Outcome of a single [`ScanPipeline::poll`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollReport {
    /// New records added to the result set by this poll.
    pub received: usize,
    pub state: ScanState,
}

struct ActiveScan {
    cancel: CancelToken,
    receiver: Receiver<FileRecord>,
    worker: JoinHandle<Result<ScanSummary, String>>,
    started: Instant,
}

/// Runs one background scan at a time and collects its results.
///
/// The worker thread walks the tree, filters and publishes [`FileRecord`]s
/// into a channel. The owner calls [`poll`](Self::poll) on a fixed cadence to
/// drain a bounded batch into the [`ResultSet`]; results are only ever
/// written from the owner's thread.
pub struct ScanPipeline {
    settings: PipelineSettings,
    reporter: Arc<dyn ProgressReporter>,
    state: ScanState,
    active: Option<ActiveScan>,
    results: ResultSet,
    summary: Option<ScanSummary>,
    failure: Option<String>,
}

impl ScanPipeline {
    pub fn new(settings: PipelineSettings, reporter: Arc<dyn ProgressReporter>) -> Self {
        Self {
            settings,
            reporter,
            state: ScanState::Idle,
            active: None,
            results: ResultSet::new(),
            summary: None,
            failure: None,
        }
    }

    pub fn state(&self) -> &ScanState {
        &self.state
    }

    pub fn results(&self) -> &ResultSet {
        &self.results
    }

    pub fn results_mut(&mut self) -> &mut ResultSet {
        &mut self.results
    }

    pub fn summary(&self) -> Option<&ScanSummary> {
        self.summary.as_ref()
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Validates `config` and launches the worker.
    ///
    /// Fails without side effects unless the pipeline is idle or the root is
    /// not a directory. Previous results are discarded on success.
    pub fn start(&mut self, mut config: ScanConfig) -> Result<(), Error> {
        if self.state != ScanState::Idle {
            return Err(Error::ScanNotIdle(self.state.name()));
        }

        let root = absolute_path(&config.root);
        if !root.is_dir() {
            return Err(Error::InvalidRoot(root));
        }
        config.root = root;
        let config = config.normalized();

        let (sender, receiver) = if self.settings.lossless {
            unbounded()
        } else {
            bounded(self.settings.channel_capacity.max(1))
        };
        let cancel = CancelToken::new();
        let worker_cancel = cancel.clone();
        let reporter = Arc::clone(&self.reporter);

        let worker = thread::Builder::new()
            .name("hoard-scan".to_string())
            .spawn(move || run_worker(&config, &sender, &worker_cancel, reporter.as_ref()))?;

        self.results.clear();
        self.summary = None;
        self.failure = None;
        self.active = Some(ActiveScan {
            cancel,
            receiver,
            worker,
            started: Instant::now(),
        });
        self.state = ScanState::Running;
        Ok(())
    }

    /// Asks the worker to stop. No-op unless a scan is running.
    pub fn cancel(&self) {
        if let Some(active) = &self.active {
            if !active.cancel.is_cancelled() {
                info!("Cancelling scan");
            }
            active.cancel.cancel();
        }
    }

    /// Drains up to one batch of pending records. When the worker has
    /// finished and the channel is empty, the scan moves to its final state.
    pub fn poll(&mut self) -> PollReport {
        let Some(active) = self.active.as_ref() else {
            return PollReport {
                received: 0,
                state: self.state.clone(),
            };
        };

        let batch = self.settings.drain_batch.max(1);
        let mut pulled = 0;
        let mut received = 0;
        let mut worker_done = false;
        while pulled < batch {
            match active.receiver.try_recv() {
                Ok(record) => {
                    pulled += 1;
                    if self.results.insert(record) {
                        received += 1;
                    }
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    worker_done = true;
                    break;
                }
            }
        }

        if worker_done {
            self.finish();
        }
        PollReport {
            received,
            state: self.state.clone(),
        }
    }

    /// Polls every drain interval until the scan finishes, calling `on_tick`
    /// after each poll.
    pub fn run_until_done<F>(&mut self, mut on_tick: F) -> ScanState
    where
        F: FnMut(&mut Self, &PollReport),
    {
        loop {
            let report = self.poll();
            on_tick(self, &report);
            if report.state != ScanState::Running {
                return report.state;
            }
            thread::sleep(self.settings.drain_interval());
        }
    }

    /// Returns the worker failure once, after a `Failed` scan.
    pub fn take_failure(&mut self) -> Option<Error> {
        self.failure.take().map(Error::WorkerFailed)
    }

    /// Returns a finished pipeline to `Idle` so it can start again.
    /// Returns false while a scan is running.
    pub fn reset(&mut self) -> bool {
        if self.state == ScanState::Running {
            return false;
        }
        self.state = ScanState::Idle;
        true
    }

    fn finish(&mut self) {
        let Some(active) = self.active.take() else {
            return;
        };
        let elapsed = active.started.elapsed();

        self.state = match active.worker.join() {
            Ok(Ok(summary)) => {
                if summary.dropped > 0 {
                    debug!(
                        "{} records were dropped because the channel was full",
                        summary.dropped
                    );
                }
                self.summary = Some(summary);
                if active.cancel.is_cancelled() {
                    ScanState::Cancelled
                } else {
                    ScanState::Completed
                }
            }
            Ok(Err(message)) => self.fail(message),
            Err(payload) => self.fail(panic_message(payload.as_ref())),
        };

        info!(
            "Scan {} with {} results in {:.2}s",
            self.state.name(),
            self.results.len(),
            elapsed.as_secs_f64()
        );
        self.reporter
            .on_scan_complete(self.results.len(), elapsed.as_secs_f64());
    }

    fn fail(&mut self, message: String) -> ScanState {
        error!("Scan worker failed: {}", message);
        self.failure = Some(message.clone());
        ScanState::Failed(message)
    }
}

impl Drop for ScanPipeline {
    fn drop(&mut self) {
        self.cancel();
    }
}

fn run_worker(
    config: &ScanConfig,
    sender: &Sender<FileRecord>,
    cancel: &CancelToken,
    reporter: &dyn ProgressReporter,
) -> Result<ScanSummary, String> {
    panic::catch_unwind(AssertUnwindSafe(|| scan_tree(config, sender, cancel, reporter)))
        .map_err(|payload| panic_message(payload.as_ref()))
}

fn scan_tree(
    config: &ScanConfig,
    sender: &Sender<FileRecord>,
    cancel: &CancelToken,
    reporter: &dyn ProgressReporter,
) -> ScanSummary {
    let started = Instant::now();
    info!("Scanning {}", config.root.display());
    reporter.on_scan_start(&config.root);

    let published = Cell::new(0usize);
    let mut dropped = 0usize;
    let mut seen: HashSet<PathBuf> = HashSet::new();

    let mut walker = TreeWalker::new(config, cancel.clone())
        .with_progress(|dir| reporter.on_scan_progress(published.get(), dir));

    for path in walker.by_ref() {
        if !config.extensions.matches(&path) {
            continue;
        }

        let metadata = if config.follow_symlinks {
            fs::metadata(&path)
        } else {
            fs::symlink_metadata(&path)
        };
        let metadata = match metadata {
            Ok(m) => m,
            Err(err) => {
                trace!("Cannot stat {}: {}", path.display(), err);
                continue;
            }
        };

        let size = metadata.len();
        if size < config.min_size_bytes {
            continue;
        }

        let created_at: DateTime<Utc> = platform::created_time(&metadata).into();
        if !config.in_created_range(&created_at) {
            continue;
        }

        let normalized = absolute_path(&path);
        if !seen.insert(normalized.clone()) {
            continue;
        }

        match sender.try_send(FileRecord::new(normalized, size, created_at)) {
            Ok(()) => published.set(published.get() + 1),
            Err(TrySendError::Full(_)) => dropped += 1,
            Err(TrySendError::Disconnected(_)) => {
                debug!("Result consumer went away, stopping scan");
                break;
            }
        }
    }

    let walk = walker.stats();
    ScanSummary {
        published: published.get(),
        dropped,
        walk,
        duration: started.elapsed(),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "scan worker panicked".to_string()
    }
}
