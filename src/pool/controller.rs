//! The pool controller: batch assembly, lazy worker start, drain-and-join
//! shutdown, and the integrity bookkeeping over both.

use crate::batching::batch::Batch;
use crate::batching::handoff::{HandoffQueue, PushError};
use crate::batching::output::{output_channel, OutputChannel, OutputSink};
use crate::pool::lifecycle::{Lifecycle, LifecycleCell};
use crate::pool::report::{CloseOutcome, ShutdownReport};
use crate::pool::worker::{Worker, WorkerActivityTracker, WorkerShared, WorkerStats};
use crate::runtime::config::PoolConfig;
use crate::runtime::error::PoolError;
use crate::runtime::fatal::panic_message;
use crate::runtime::telemetry::PoolSnapshot;
use crate::runtime::transform::BatchTransform;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;

struct ControllerState<T, R> {
    current: Batch<T>,
    idle_workers: Vec<Worker<T, R>>,
    running: Vec<(String, JoinHandle<WorkerStats>)>,
    sink: Option<OutputSink<R>>,
}

/// Bounded batching worker pool.
///
/// Items committed one at a time are grouped into batches of `block_size`,
/// handed to `worker_count` dedicated threads through a bounded queue, and
/// transformed into results collected on a shared output channel.
///
/// `commit` and `close` may be called from any thread; the "append, swap on
/// full, enqueue" sequence runs under one lock so concurrent producers cannot
/// corrupt a batch.
pub struct BatchPool<T, R> {
    config: PoolConfig,
    lifecycle: LifecycleCell,
    queue: Arc<HandoffQueue<Batch<T>>>,
    activity: Arc<WorkerActivityTracker>,
    output: OutputChannel<R>,
    items_committed: AtomicU64,
    batches_enqueued: AtomicU64,
    state: Mutex<ControllerState<T, R>>,
}

impl<T, R> BatchPool<T, R>
where
    T: Send + 'static,
    R: Send + 'static,
{
    /// Creates a pool with default queue capacities.
    ///
    /// Fails with [`PoolError::InvalidConfiguration`] if either size is zero.
    pub fn new<F>(block_size: usize, worker_count: usize, transform: F) -> Result<Self, PoolError>
    where
        F: BatchTransform<T, R>,
    {
        let config = PoolConfig::with_sizes(block_size, worker_count)?;
        Ok(Self::with_config(config, transform))
    }

    /// Creates a pool from a validated configuration. Workers are allocated
    /// here but only started when the first batch is enqueued.
    pub fn with_config<F>(config: PoolConfig, transform: F) -> Self
    where
        F: BatchTransform<T, R>,
    {
        let queue = Arc::new(HandoffQueue::with_capacity(config.queue_capacity()));
        let activity = Arc::new(WorkerActivityTracker::new());
        let (sink, output) = output_channel(config.output_capacity());
        let transform: Arc<dyn BatchTransform<T, R>> = Arc::new(transform);
        let shared = WorkerShared::new(queue.clone(), transform, sink.clone(), activity.clone());

        let idle_workers = (0..config.worker_count())
            .map(|index| Worker::new(index, config.worker_name(index), shared.clone()))
            .collect();

        tracing::info!(
            block_size = config.block_size(),
            workers = config.worker_count(),
            queue_capacity = config.queue_capacity(),
            "batch pool created"
        );

        Self {
            lifecycle: LifecycleCell::new(Lifecycle::Created),
            queue,
            activity,
            output,
            items_committed: AtomicU64::new(0),
            batches_enqueued: AtomicU64::new(0),
            state: Mutex::new(ControllerState {
                current: Batch::new(config.block_size()),
                idle_workers,
                running: Vec::new(),
                sink: Some(sink),
            }),
            config,
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, ControllerState<T, R>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds one item to the current batch, enqueueing the batch once it is full.
    ///
    /// Blocks while the handoff queue is full. Fails once `close()` has
    /// started, or when every worker has died and nothing can drain the queue.
    pub fn commit(&self, item: T) -> Result<(), PoolError> {
        let mut state = self.lock_state();
        let lifecycle = self.lifecycle.load();
        if !lifecycle.accepts_commits() {
            tracing::warn!(lifecycle = %lifecycle, "commit rejected; pool is closing or closed");
            return Err(PoolError::Rejected { lifecycle });
        }
        if lifecycle == Lifecycle::Open && self.queue.is_abandoned() {
            return Err(PoolError::WorkersExhausted);
        }

        // A full batch is only left behind by a refused enqueue; retry it first.
        if state.current.is_full() {
            self.enqueue_current(&mut state)?;
        }

        let full = state.current.push(item);
        self.items_committed.fetch_add(1, Ordering::SeqCst);
        if full {
            self.enqueue_current(&mut state)?;
        }
        Ok(())
    }

    fn enqueue_current(&self, state: &mut ControllerState<T, R>) -> Result<(), PoolError> {
        if self.lifecycle.load() == Lifecycle::Created {
            self.start_workers(state)?;
        }

        let mut batch = state.current.take();
        let seq = self.batches_enqueued.load(Ordering::SeqCst);
        batch.set_seq(seq);
        let items = batch.len();

        match self.queue.push(batch) {
            Ok(()) => {
                self.batches_enqueued.fetch_add(1, Ordering::SeqCst);
                tracing::trace!(batch = seq, items, "batch enqueued");
                Ok(())
            }
            Err(err) => {
                let error = match &err {
                    PushError::Closed(_) => PoolError::Rejected {
                        lifecycle: self.lifecycle.load(),
                    },
                    PushError::NoConsumers(_) => PoolError::WorkersExhausted,
                };
                state.current = err.into_inner();
                tracing::error!(batch = seq, items, error = %error, "batch could not be enqueued");
                Err(error)
            }
        }
    }

    fn start_workers(&self, state: &mut ControllerState<T, R>) -> Result<(), PoolError> {
        let workers = std::mem::take(&mut state.idle_workers);
        self.lifecycle.store(Lifecycle::Open);

        let mut first_error = None;
        for worker in workers {
            let name = worker.name().to_owned();
            match worker.spawn() {
                Ok(handle) => state.running.push((name, handle)),
                Err(source) => {
                    tracing::error!(worker = %name, error = %source, "failed to start worker thread");
                    if first_error.is_none() {
                        first_error = Some(PoolError::Spawn {
                            worker: name,
                            source,
                        });
                    }
                }
            }
        }

        tracing::info!(workers = state.running.len(), "workers started");
        // Run degraded if at least one thread came up.
        match first_error {
            Some(error) if state.running.is_empty() => Err(error),
            _ => Ok(()),
        }
    }

    /// Flushes the partial batch, waits for the queue to drain and every
    /// worker to exit, then validates the counters.
    ///
    /// On a clean run the counters are reset; on a mismatch they are left as
    /// they were so the caller can inspect them. Calling this on a closed pool
    /// logs a warning and returns [`CloseOutcome::AlreadyClosed`].
    pub fn close(&self) -> CloseOutcome {
        let mut state = self.lock_state();
        let lifecycle = self.lifecycle.load();
        match lifecycle {
            Lifecycle::Closing | Lifecycle::Closed => {
                tracing::warn!(lifecycle = %lifecycle, "pool already closed; close() is a no-op");
                return CloseOutcome::AlreadyClosed;
            }
            Lifecycle::Created if state.current.is_empty() => {
                state.idle_workers.clear();
                state.sink = None;
                self.queue.close();
                self.lifecycle.store(Lifecycle::Closed);
                let report = ShutdownReport::new(0, 0, 0, 0, Vec::new());
                tracing::info!("{report}");
                return CloseOutcome::Closed(report);
            }
            Lifecycle::Created | Lifecycle::Open => {}
        }

        if !state.current.is_empty() {
            if let Err(error) = self.enqueue_current(&mut state) {
                tracing::error!(
                    items = state.current.len(),
                    error = %error,
                    "final partial batch could not be flushed"
                );
            }
        }

        self.lifecycle.store(Lifecycle::Closing);
        self.queue.close();

        let running = std::mem::take(&mut state.running);
        let workers: Vec<WorkerStats> = running.into_iter().map(join_worker).collect();
        state.idle_workers.clear();
        state.sink = None;
        self.lifecycle.store(Lifecycle::Closed);

        let report = ShutdownReport::new(
            self.items_committed.load(Ordering::SeqCst),
            self.batches_enqueued.load(Ordering::SeqCst),
            state.current.len(),
            self.queue.len(),
            workers,
        );

        match report.integrity() {
            Ok(()) => {
                tracing::info!("{report}");
                self.items_committed.store(0, Ordering::SeqCst);
                self.batches_enqueued.store(0, Ordering::SeqCst);
            }
            Err(mismatch) => {
                for failure in report.failures() {
                    tracing::error!(%failure, "batch lost to transform failure");
                }
                tracing::error!(%mismatch, "pool closed with unburned work; counters kept");
                tracing::info!("{report}");
            }
        }

        CloseOutcome::Closed(report)
    }

    /// True in `Created` and `Closed`.
    pub fn is_closed(&self) -> bool {
        self.lifecycle.load().is_closed()
    }

    /// True while at least one worker is inside the transform.
    ///
    /// An open pool whose workers are all waiting for batches is not running.
    pub fn is_running(&self) -> bool {
        self.activity.busy_workers() > 0
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle.load()
    }

    /// Read side of the output channel. Results are only complete after `close()`.
    pub fn output(&self) -> OutputChannel<R> {
        let lifecycle = self.lifecycle.load();
        if lifecycle != Lifecycle::Closed {
            tracing::warn!(lifecycle = %lifecycle, "pool is still open; output is not complete");
        }
        self.output.clone()
    }

    pub fn items_committed(&self) -> u64 {
        self.items_committed.load(Ordering::SeqCst)
    }

    pub fn batches_enqueued(&self) -> u64 {
        self.batches_enqueued.load(Ordering::SeqCst)
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    pub fn snapshot(&self) -> PoolSnapshot {
        PoolSnapshot {
            lifecycle: self.lifecycle.load(),
            items_committed: self.items_committed(),
            batches_enqueued: self.batches_enqueued(),
            queued_batches: self.queue.len(),
            live_workers: self.activity.live_workers(),
            busy_workers: self.activity.busy_workers(),
        }
    }
}

fn join_worker((name, handle): (String, JoinHandle<WorkerStats>)) -> WorkerStats {
    match handle.join() {
        Ok(stats) => stats,
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            tracing::error!(worker = %name, panic = %message, "worker thread panicked outside the transform");
            WorkerStats::new(name)
        }
    }
}

impl<T, R> Drop for BatchPool<T, R> {
    fn drop(&mut self) {
        let state = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
        if state.running.is_empty() {
            return;
        }

        tracing::warn!(
            pending_items = state.current.len(),
            "batch pool dropped without close(); joining workers"
        );
        state.sink = None;
        self.queue.close();
        for (name, handle) in state.running.drain(..) {
            if handle.join().is_err() {
                tracing::error!(worker = %name, "worker thread panicked");
            }
        }
    }
}
