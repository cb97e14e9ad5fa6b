//! Generic batch executor with bounded concurrency and retry
//!
//! This module splits an input sequence into fixed-size chunks and runs
//! them through a supplied async processor under a concurrency gate.
//! Chunks retry with scaled backoff, failures either propagate (fail-fast)
//! or accumulate (continue), and a cooperative abort flag stops chunks
//! that have not started yet.

pub mod gate;

pub use gate::{ConcurrencyGate, GatePermit};

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use log::{debug, warn};
use tokio::task::JoinSet;

/// Error type for batch execution
#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    /// A second job was started while one was still running
    #[error("batch executor is already running a job")]
    Busy,

    /// The job was aborted via `abort()`
    #[error("batch job aborted")]
    Aborted,

    /// A chunk failed under the fail-fast strategy
    #[error("batch chunk {index} failed: {message}")]
    ChunkFailed { index: usize, message: String },

    /// A chunk task panicked or was cancelled by the runtime
    #[error("batch chunk task failed to complete: {0}")]
    TaskFailed(String),
}

/// How chunk failures are handled
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ErrorStrategy {
    /// First failure aborts remaining chunk scheduling and propagates
    FailFast,
    /// Failures accumulate in the outcome while processing proceeds
    #[default]
    Continue,
}

/// Progress callback: (processed item count, total item count)
pub type ProgressCallback = Arc<dyn Fn(usize, usize) + Send + Sync>;

/// Error callback: (error, failed chunk items, chunk index)
pub type ErrorCallback<T> = Arc<dyn Fn(&anyhow::Error, &[T], usize) + Send + Sync>;

/// Configuration for one batch job
#[derive(Clone)]
pub struct BatchOptions<T> {
    /// Chunk length (clamped to at least 1)
    pub batch_size: usize,
    /// Maximum chunks in flight at once (clamped to at least 1)
    pub max_concurrency: usize,
    /// Pause inserted after each successful chunk
    pub batch_delay: Duration,
    /// Failure handling strategy
    pub error_strategy: ErrorStrategy,
    /// Extra attempts after the first failure of a chunk
    pub retry_count: usize,
    /// Base backoff; attempt N sleeps `retry_delay * N` before retrying
    pub retry_delay: Duration,
    /// Invoked after each successful chunk with cumulative progress
    pub on_progress: Option<ProgressCallback>,
    /// Invoked once per failed chunk (after retries are exhausted)
    pub on_error: Option<ErrorCallback<T>>,
}

impl<T> Default for BatchOptions<T> {
    fn default() -> Self {
        Self {
            batch_size: 10,
            max_concurrency: 4,
            batch_delay: Duration::ZERO,
            error_strategy: ErrorStrategy::default(),
            retry_count: 0,
            retry_delay: Duration::from_millis(100),
            on_progress: None,
            on_error: None,
        }
    }
}

/// One failed chunk with the items it carried
#[derive(Debug, Clone)]
pub struct BatchFailure<T> {
    pub batch_index: usize,
    pub items: Vec<T>,
    pub error: String,
}

/// Counters for one completed batch job
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchStats {
    pub total_items: usize,
    pub processed_items: usize,
    pub failed_items: usize,
    pub total_batches: usize,
    pub successful_batches: usize,
    pub failed_batches: usize,
    /// Wall-clock processing time in milliseconds
    pub duration_ms: u64,
}

/// Results, failures, and counters from one batch job
#[derive(Debug)]
pub struct BatchOutcome<T, R> {
    /// Successful chunk outputs, reassembled in chunk order
    pub results: Vec<R>,
    pub failures: Vec<BatchFailure<T>>,
    pub stats: BatchStats,
}

/// What one chunk task reported back
enum ChunkReport<T, R> {
    Success { items: usize, output: Vec<R> },
    Failure { items: Vec<T>, error: anyhow::Error },
    /// Chunk observed the abort flag before doing any work
    Skipped,
}

/// Generic batch executor. One job at a time per instance.
pub struct BatchExecutor {
    busy: AtomicBool,
    aborted: Arc<AtomicBool>,
}

impl Default for BatchExecutor {
    fn default() -> Self {
        Self::new()
    }
}

/// Clears the busy flag when the job ends, on every exit path
struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl BatchExecutor {
    #[must_use]
    pub fn new() -> Self {
        Self {
            busy: AtomicBool::new(false),
            aborted: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Request cooperative cancellation of the running job.
    ///
    /// Chunks not yet started will not start; the running `process()` call
    /// returns `BatchError::Aborted` once in-flight chunks settle.
    pub fn abort(&self) {
        self.aborted.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::SeqCst)
    }

    /// Run `processor` over `items` in chunks under the configured bounds.
    ///
    /// Results are reassembled in chunk order, so callers that need input
    /// order get it as long as the processor preserves order within a
    /// chunk.
    ///
    /// # Errors
    ///
    /// * `BatchError::Busy` if a job is already running on this instance
    /// * `BatchError::Aborted` if `abort()` was called during the job
    /// * `BatchError::ChunkFailed` for the first failure under fail-fast
    pub async fn process<T, R, F, Fut>(
        &self,
        items: Vec<T>,
        processor: F,
        options: BatchOptions<T>,
    ) -> Result<BatchOutcome<T, R>, BatchError>
    where
        T: Clone + Send + 'static,
        R: Send + 'static,
        F: Fn(Vec<T>) -> Fut + Clone + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Vec<R>>> + Send + 'static,
    {
        if self
            .busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(BatchError::Busy);
        }
        let _busy = BusyGuard(&self.busy);
        self.aborted.store(false, Ordering::SeqCst);

        let started = Instant::now();
        let total_items = items.len();
        let batch_size = options.batch_size.max(1);
        let chunks: Vec<Vec<T>> = items
            .chunks(batch_size)
            .map(<[T]>::to_vec)
            .collect();
        let total_batches = chunks.len();

        let mut stats = BatchStats {
            total_items,
            total_batches,
            ..BatchStats::default()
        };

        if chunks.is_empty() {
            stats.duration_ms = started.elapsed().as_millis() as u64;
            return Ok(BatchOutcome {
                results: Vec::new(),
                failures: Vec::new(),
                stats,
            });
        }

        let gate = ConcurrencyGate::new(options.max_concurrency);
        let mut tasks: JoinSet<(usize, ChunkReport<T, R>)> = JoinSet::new();

        for (index, chunk) in chunks.into_iter().enumerate() {
            let gate = gate.clone();
            let aborted = Arc::clone(&self.aborted);
            let processor = processor.clone();
            let retry_count = options.retry_count;
            let retry_delay = options.retry_delay;
            let batch_delay = options.batch_delay;

            tasks.spawn(async move {
                let _permit = gate.acquire().await;
                if aborted.load(Ordering::SeqCst) {
                    return (index, ChunkReport::Skipped);
                }

                let items = chunk.len();
                let mut attempt = 0usize;
                loop {
                    attempt += 1;
                    match processor(chunk.clone()).await {
                        Ok(output) => {
                            if !batch_delay.is_zero() {
                                // Pace the next chunk by holding the permit
                                // through the configured delay
                                tokio::time::sleep(batch_delay).await;
                            }
                            return (index, ChunkReport::Success { items, output });
                        }
                        Err(error) => {
                            if attempt > retry_count || aborted.load(Ordering::SeqCst) {
                                return (index, ChunkReport::Failure { items: chunk, error });
                            }
                            let backoff = retry_delay * attempt as u32;
                            debug!(
                                target: "linkpipe::batch",
                                "Chunk {index} attempt {attempt} failed ({error:#}), retrying in {backoff:?}"
                            );
                            tokio::time::sleep(backoff).await;
                        }
                    }
                }
            });
        }

        let mut ordered_results: Vec<Option<Vec<R>>> = Vec::new();
        ordered_results.resize_with(total_batches, || None);
        let mut failures: Vec<BatchFailure<T>> = Vec::new();
        let mut first_failure: Option<(usize, String)> = None;

        while let Some(joined) = tasks.join_next().await {
            let (index, report) = match joined {
                Ok(pair) => pair,
                Err(e) => {
                    // A panicking chunk must not wedge the executor
                    tasks.abort_all();
                    return Err(BatchError::TaskFailed(e.to_string()));
                }
            };
            match report {
                ChunkReport::Success { items, output } => {
                    stats.processed_items += items;
                    stats.successful_batches += 1;
                    ordered_results[index] = Some(output);
                    if let Some(on_progress) = &options.on_progress {
                        on_progress(stats.processed_items, total_items);
                    }
                }
                ChunkReport::Failure { items, error } => {
                    warn!(
                        target: "linkpipe::batch",
                        "Chunk {index} failed after retries: {error:#}"
                    );
                    stats.failed_items += items.len();
                    stats.failed_batches += 1;
                    if let Some(on_error) = &options.on_error {
                        on_error(&error, &items, index);
                    }
                    if options.error_strategy == ErrorStrategy::FailFast
                        && first_failure.is_none()
                    {
                        first_failure = Some((index, format!("{error:#}")));
                        // Stop chunks that have not started yet; in-flight
                        // chunks settle on their own
                        self.aborted.store(true, Ordering::SeqCst);
                    }
                    failures.push(BatchFailure {
                        batch_index: index,
                        items,
                        error: format!("{error:#}"),
                    });
                }
                ChunkReport::Skipped => {}
            }
        }

        stats.duration_ms = started.elapsed().as_millis() as u64;

        if let Some((index, message)) = first_failure {
            return Err(BatchError::ChunkFailed { index, message });
        }
        if self.aborted.load(Ordering::SeqCst) {
            return Err(BatchError::Aborted);
        }

        let results = ordered_results.into_iter().flatten().flatten().collect();
        Ok(BatchOutcome {
            results,
            failures,
            stats,
        })
    }
}
