use crate::batching::batch::Batch;
use crate::batching::handoff::ConsumerGuard;
use crate::runtime::fatal::TransformFailure;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::thread::{self, JoinHandle};

use super::shared::WorkerShared;
use super::types::{BatchOutcome, WorkerStats};

/// One unit of parallel execution. Created idle at pool construction and
/// started at most once on its own thread.
pub struct Worker<T, R> {
    index: usize,
    name: String,
    shared: WorkerShared<T, R>,
    _consumer: ConsumerGuard<Batch<T>>,
}

impl<T, R> Worker<T, R>
where
    T: Send + 'static,
    R: Send + 'static,
{
    /// Builds an idle worker registered as a consumer of the shared queue.
    pub fn new(index: usize, name: impl Into<String>, shared: WorkerShared<T, R>) -> Self {
        let consumer = shared.queue.register_consumer();
        Self {
            index,
            name: name.into(),
            shared,
            _consumer: consumer,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Position of this worker in the pool, `0..worker_count`.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Starts the worker on a dedicated OS thread named after the worker.
    ///
    /// If the thread cannot be created the worker is dropped, which releases
    /// its queue registration.
    pub fn spawn(self) -> io::Result<JoinHandle<WorkerStats>> {
        thread::Builder::new()
            .name(self.name.clone())
            .spawn(move || self.run())
    }

    /// Takes batches until the queue is closed and drained, or until the
    /// transform fails.
    pub fn run(self) -> WorkerStats {
        let _live = self.shared.activity.enter_live();
        tracing::info!(worker = %self.name, index = self.index, "worker started");

        let mut stats = WorkerStats::new(self.name.clone());
        while let Some(batch) = self.shared.queue.pop() {
            match self.process_batch(batch) {
                BatchOutcome::Completed(items) => stats.record_batch(items),
                BatchOutcome::Failed(failure) => {
                    tracing::error!(
                        worker = %self.name,
                        batch = failure.batch(),
                        items = failure.items(),
                        error = %failure.message(),
                        "transform failed; batch lost and worker terminating"
                    );
                    stats.record_failure(failure);
                    break;
                }
            }
        }

        tracing::info!(
            worker = %self.name,
            index = self.index,
            batches = stats.batches_completed(),
            items = stats.items_processed(),
            "worker exited"
        );
        stats
    }

    pub(super) fn process_batch(&self, batch: Batch<T>) -> BatchOutcome {
        let seq = batch.seq();
        let items = batch.len();
        let _busy = self.shared.activity.enter_busy();

        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            self.shared
                .transform
                .on_batch(batch.into_items(), &self.shared.output, &self.name)
        }));

        match result {
            Ok(Ok(())) => {
                tracing::debug!(worker = %self.name, batch = seq, items, "batch processed");
                BatchOutcome::Completed(items)
            }
            Ok(Err(error)) => {
                BatchOutcome::Failed(TransformFailure::from_error(&self.name, seq, items, &error))
            }
            Err(payload) => BatchOutcome::Failed(TransformFailure::from_panic(
                &self.name,
                seq,
                items,
                payload.as_ref(),
            )),
        }
    }
}
