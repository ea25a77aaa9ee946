use crate::batching::batch::Batch;
use crate::batching::handoff::HandoffQueue;
use crate::batching::output::OutputSink;
use crate::runtime::transform::BatchTransform;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub struct WorkerShared<T, R> {
    pub(super) queue: Arc<HandoffQueue<Batch<T>>>,
    pub(super) transform: Arc<dyn BatchTransform<T, R>>,
    pub(super) output: OutputSink<R>,
    pub(super) activity: Arc<WorkerActivityTracker>,
}

impl<T, R> WorkerShared<T, R> {
    pub fn new(
        queue: Arc<HandoffQueue<Batch<T>>>,
        transform: Arc<dyn BatchTransform<T, R>>,
        output: OutputSink<R>,
        activity: Arc<WorkerActivityTracker>,
    ) -> Self {
        Self {
            queue,
            transform,
            output,
            activity,
        }
    }
}

impl<T, R> Clone for WorkerShared<T, R> {
    fn clone(&self) -> Self {
        Self {
            queue: Arc::clone(&self.queue),
            transform: Arc::clone(&self.transform),
            output: self.output.clone(),
            activity: Arc::clone(&self.activity),
        }
    }
}

/// Counts live worker threads and workers currently inside the transform.
#[derive(Debug, Default)]
pub struct WorkerActivityTracker {
    live_workers: AtomicUsize,
    busy_workers: AtomicUsize,
}

impl WorkerActivityTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks one worker thread alive until the guard drops.
    pub fn enter_live(self: &Arc<Self>) -> WorkerActivityGuard {
        self.live_workers.fetch_add(1, Ordering::SeqCst);
        WorkerActivityGuard {
            tracker: Arc::clone(self),
            kind: ActivityKind::Live,
        }
    }

    /// Marks one worker busy with a batch until the guard drops.
    pub fn enter_busy(self: &Arc<Self>) -> WorkerActivityGuard {
        self.busy_workers.fetch_add(1, Ordering::SeqCst);
        WorkerActivityGuard {
            tracker: Arc::clone(self),
            kind: ActivityKind::Busy,
        }
    }

    pub fn live_workers(&self) -> usize {
        self.live_workers.load(Ordering::SeqCst)
    }

    pub fn busy_workers(&self) -> usize {
        self.busy_workers.load(Ordering::SeqCst)
    }

    fn release(&self, kind: ActivityKind) {
        let counter = match kind {
            ActivityKind::Live => &self.live_workers,
            ActivityKind::Busy => &self.busy_workers,
        };
        counter.fetch_sub(1, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone, Copy)]
enum ActivityKind {
    Live,
    Busy,
}

pub struct WorkerActivityGuard {
    tracker: Arc<WorkerActivityTracker>,
    kind: ActivityKind,
}

impl Drop for WorkerActivityGuard {
    fn drop(&mut self) {
        self.tracker.release(self.kind);
    }
}
