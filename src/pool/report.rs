//! Shutdown summary produced by `close()` and the integrity check over it.

use crate::pool::worker::WorkerStats;
use crate::runtime::fatal::TransformFailure;
use std::fmt;

/// Result of calling `close()`.
#[derive(Debug, Clone, PartialEq)]
pub enum CloseOutcome {
    /// The pool drained, joined its workers and produced a report.
    Closed(ShutdownReport),
    /// The pool was already closed; nothing happened.
    AlreadyClosed,
}

impl CloseOutcome {
    pub fn report(&self) -> Option<&ShutdownReport> {
        match self {
            CloseOutcome::Closed(report) => Some(report),
            CloseOutcome::AlreadyClosed => None,
        }
    }

    pub fn into_report(self) -> Option<ShutdownReport> {
        match self {
            CloseOutcome::Closed(report) => Some(report),
            CloseOutcome::AlreadyClosed => None,
        }
    }

    pub fn is_already_closed(&self) -> bool {
        matches!(self, CloseOutcome::AlreadyClosed)
    }
}

/// Controller counters versus what the workers actually burned.
#[derive(Debug, Clone, PartialEq)]
pub struct ShutdownReport {
    items_committed: u64,
    batches_enqueued: u64,
    pending_items: usize,
    stranded_batches: usize,
    workers: Vec<WorkerStats>,
}

impl ShutdownReport {
    pub(crate) fn new(
        items_committed: u64,
        batches_enqueued: u64,
        pending_items: usize,
        stranded_batches: usize,
        workers: Vec<WorkerStats>,
    ) -> Self {
        Self {
            items_committed,
            batches_enqueued,
            pending_items,
            stranded_batches,
            workers,
        }
    }

    pub fn items_committed(&self) -> u64 {
        self.items_committed
    }

    pub fn batches_enqueued(&self) -> u64 {
        self.batches_enqueued
    }

    /// Committed items that never made it into the queue because the final
    /// flush was refused.
    pub fn pending_items(&self) -> usize {
        self.pending_items
    }

    /// Batches still sitting in the queue after every worker exited.
    pub fn stranded_batches(&self) -> usize {
        self.stranded_batches
    }

    pub fn workers(&self) -> &[WorkerStats] {
        &self.workers
    }

    pub fn batches_completed(&self) -> u64 {
        self.workers.iter().map(WorkerStats::batches_completed).sum()
    }

    pub fn items_processed(&self) -> u64 {
        self.workers.iter().map(WorkerStats::items_processed).sum()
    }

    pub fn failures(&self) -> impl Iterator<Item = &TransformFailure> {
        self.workers.iter().filter_map(WorkerStats::failure)
    }

    /// Checks that every enqueued batch and committed item was burned.
    pub fn integrity(&self) -> Result<(), IntegrityMismatch> {
        let batches_completed = self.batches_completed();
        let items_processed = self.items_processed();
        if batches_completed == self.batches_enqueued && items_processed == self.items_committed {
            return Ok(());
        }

        Err(IntegrityMismatch {
            batches_enqueued: self.batches_enqueued,
            batches_completed,
            items_committed: self.items_committed,
            items_processed,
            failures: self.failures().count(),
        })
    }

    pub fn is_clean(&self) -> bool {
        self.integrity().is_ok()
    }
}

fn percent(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        return 100.0;
    }
    100.0 * part as f64 / whole as f64
}

impl fmt::Display for ShutdownReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let batches_completed = self.batches_completed();
        let items_processed = self.items_processed();

        writeln!(f, "pool closing report")?;
        writeln!(
            f,
            "  batches burned/queued: {batches_completed}/{} ({:.1}%)",
            self.batches_enqueued,
            percent(batches_completed, self.batches_enqueued)
        )?;
        writeln!(
            f,
            "  items burned/committed: {items_processed}/{} ({:.1}%)",
            self.items_committed,
            percent(items_processed, self.items_committed)
        )?;
        if self.pending_items > 0 || self.stranded_batches > 0 {
            writeln!(
                f,
                "  never enqueued items: {}, stranded batches: {}",
                self.pending_items, self.stranded_batches
            )?;
        }
        write!(f, "  workers:")?;
        for worker in &self.workers {
            write!(
                f,
                "\n    {}: batches {}, items {}",
                worker.name(),
                worker.batches_completed(),
                worker.items_processed()
            )?;
            if let Some(failure) = worker.failure() {
                write!(f, " (lost batch {}: {})", failure.batch(), failure.message())?;
            }
        }
        Ok(())
    }
}

/// Counters disagree after drain: something was lost.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntegrityMismatch {
    pub batches_enqueued: u64,
    pub batches_completed: u64,
    pub items_committed: u64,
    pub items_processed: u64,
    pub failures: usize,
}

impl fmt::Display for IntegrityMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "not all work burned: batches {}/{}, items {}/{}, {} transform failure(s)",
            self.batches_completed,
            self.batches_enqueued,
            self.items_processed,
            self.items_committed,
            self.failures
        )
    }
}

impl std::error::Error for IntegrityMismatch {}
