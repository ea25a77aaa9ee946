use std::any::Any;
use std::fmt;

/// Why a transform call did not complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The transform returned `Err`.
    Error,
    /// The transform panicked.
    Panic,
}

/// A batch lost to a failing transform. The worker that hit it terminated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformFailure {
    worker: String,
    batch: u64,
    items: usize,
    kind: FailureKind,
    message: String,
}

impl TransformFailure {
    pub(crate) fn from_error(worker: &str, batch: u64, items: usize, error: &anyhow::Error) -> Self {
        Self {
            worker: worker.to_owned(),
            batch,
            items,
            kind: FailureKind::Error,
            message: format!("{error:#}"),
        }
    }

    pub(crate) fn from_panic(
        worker: &str,
        batch: u64,
        items: usize,
        payload: &(dyn Any + Send),
    ) -> Self {
        Self {
            worker: worker.to_owned(),
            batch,
            items,
            kind: FailureKind::Panic,
            message: panic_message(payload),
        }
    }

    /// Name of the worker that was processing the batch.
    pub fn worker(&self) -> &str {
        &self.worker
    }

    /// Sequence number of the lost batch.
    pub fn batch(&self) -> u64 {
        self.batch
    }

    /// Number of items in the lost batch.
    pub fn items(&self) -> usize {
        self.items
    }

    pub fn kind(&self) -> FailureKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for TransformFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = match self.kind {
            FailureKind::Error => "failed",
            FailureKind::Panic => "panicked",
        };
        write!(
            f,
            "transform {verb} on batch {} ({} items) in worker {}: {}",
            self.batch, self.items, self.worker, self.message
        )
    }
}

impl std::error::Error for TransformFailure {}

pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
