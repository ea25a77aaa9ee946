use crate::batching::batch::BatchItems;
use crate::batching::output::OutputSink;
use anyhow::Result;

/// Caller-supplied work applied to one batch at a time.
///
/// Invoked concurrently from different workers on different batches. An `Err`
/// return or a panic loses the batch and terminates the calling worker; the
/// pool never retries.
pub trait BatchTransform<T, R>: Send + Sync + 'static {
    /// Processes the items of one batch, in commit order, writing any number
    /// of results to `output`. `worker` is the name of the calling worker.
    fn on_batch(&self, items: BatchItems<T>, output: &OutputSink<R>, worker: &str) -> Result<()>;
}

impl<T, R, F> BatchTransform<T, R> for F
where
    F: Fn(BatchItems<T>, &OutputSink<R>, &str) -> Result<()> + Send + Sync + 'static,
{
    fn on_batch(&self, items: BatchItems<T>, output: &OutputSink<R>, worker: &str) -> Result<()> {
        self(items, output, worker)
    }
}
