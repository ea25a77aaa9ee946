use crate::runtime::fatal::TransformFailure;

/// Counters owned by one worker thread, handed back when it is joined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerStats {
    name: String,
    batches_completed: u64,
    items_processed: u64,
    failure: Option<TransformFailure>,
}

impl WorkerStats {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            batches_completed: 0,
            items_processed: 0,
            failure: None,
        }
    }

    pub(crate) fn record_batch(&mut self, items: usize) {
        self.batches_completed += 1;
        self.items_processed += items as u64;
    }

    pub(crate) fn record_failure(&mut self, failure: TransformFailure) {
        self.failure = Some(failure);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn batches_completed(&self) -> u64 {
        self.batches_completed
    }

    pub fn items_processed(&self) -> u64 {
        self.items_processed
    }

    /// The failure that terminated this worker, if any.
    pub fn failure(&self) -> Option<&TransformFailure> {
        self.failure.as_ref()
    }
}

#[derive(Debug)]
pub(super) enum BatchOutcome {
    Completed(usize),
    Failed(TransformFailure),
}
