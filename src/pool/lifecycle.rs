//! Pool lifecycle states and the lock-free mirror used by non-blocking queries.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

/// Authoritative lifecycle of a [`BatchPool`](crate::BatchPool).
///
/// Transitions only move forward: `Created -> Open -> Closing -> Closed`, with
/// `Created -> Closed` allowed when nothing was ever committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lifecycle {
    /// Constructed, workers allocated but not started.
    Created,
    /// At least one batch was enqueued and the workers are running.
    Open,
    /// `close()` is draining the handoff queue and joining workers.
    Closing,
    /// Drained and joined.
    Closed,
}

impl Lifecycle {
    /// `Created` and `Closed` both count as closed.
    pub fn is_closed(self) -> bool {
        matches!(self, Lifecycle::Created | Lifecycle::Closed)
    }

    /// Whether `commit` is still allowed in this state.
    pub fn accepts_commits(self) -> bool {
        matches!(self, Lifecycle::Created | Lifecycle::Open)
    }

    fn as_u8(self) -> u8 {
        match self {
            Lifecycle::Created => 0,
            Lifecycle::Open => 1,
            Lifecycle::Closing => 2,
            Lifecycle::Closed => 3,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            0 => Lifecycle::Created,
            1 => Lifecycle::Open,
            2 => Lifecycle::Closing,
            _ => Lifecycle::Closed,
        }
    }
}

impl fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Lifecycle::Created => "created",
            Lifecycle::Open => "open",
            Lifecycle::Closing => "closing",
            Lifecycle::Closed => "closed",
        };
        f.write_str(label)
    }
}

/// Atomic copy of the lifecycle.
///
/// Written only by the controller while it holds its state lock; read from
/// anywhere without blocking.
#[derive(Debug)]
pub(crate) struct LifecycleCell {
    value: AtomicU8,
}

impl LifecycleCell {
    pub(crate) fn new(initial: Lifecycle) -> Self {
        Self {
            value: AtomicU8::new(initial.as_u8()),
        }
    }

    pub(crate) fn load(&self) -> Lifecycle {
        Lifecycle::from_u8(self.value.load(Ordering::SeqCst))
    }

    pub(crate) fn store(&self, next: Lifecycle) -> Lifecycle {
        let previous = Lifecycle::from_u8(self.value.swap(next.as_u8(), Ordering::SeqCst));
        if previous != next {
            tracing::info!(from = %previous, to = %next, "pool lifecycle transition");
        }
        previous
    }
}
