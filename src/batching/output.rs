//! Bounded multi-producer output channel shared by all workers.
//!
//! Backed by `tokio::sync::mpsc` so results can be drained either from plain
//! threads (`blocking_recv`, `drain`) or from async code (`recv`).

use std::fmt;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

/// Why a result could not be delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputError {
    /// The channel is at capacity and nobody is reading it right now.
    Full,
    /// The read side is gone.
    Closed,
}

impl fmt::Display for OutputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputError::Full => f.write_str("output channel is full; drain it while committing"),
            OutputError::Closed => f.write_str("output channel is closed"),
        }
    }
}

impl std::error::Error for OutputError {}

/// Returned by [`OutputSink::try_push`] with the rejected result.
pub enum TryPushError<R> {
    Full(R),
    Closed(R),
}

impl<R> TryPushError<R> {
    pub fn into_inner(self) -> R {
        match self {
            TryPushError::Full(result) | TryPushError::Closed(result) => result,
        }
    }

    /// The failure without its payload.
    pub fn error(&self) -> OutputError {
        match self {
            TryPushError::Full(_) => OutputError::Full,
            TryPushError::Closed(_) => OutputError::Closed,
        }
    }
}

impl<R> fmt::Debug for TryPushError<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TryPushError::Full(_) => f.write_str("Full(..)"),
            TryPushError::Closed(_) => f.write_str("Closed(..)"),
        }
    }
}

impl<R> fmt::Display for TryPushError<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.error(), f)
    }
}

impl<R> std::error::Error for TryPushError<R> {}

pub(crate) fn output_channel<R>(capacity: usize) -> (OutputSink<R>, OutputChannel<R>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (
        OutputSink { tx },
        OutputChannel {
            rx: Arc::new(Mutex::new(rx)),
        },
    )
}

/// Write handle given to the transform.
#[derive(Debug)]
pub struct OutputSink<R> {
    tx: mpsc::Sender<R>,
}

impl<R> Clone for OutputSink<R> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<R> OutputSink<R> {
    /// Appends one result, failing with [`OutputError::Full`] when the
    /// channel is at capacity.
    ///
    /// A transform that propagates the error with `?` loses its batch, so an
    /// unread channel shows up in the shutdown report instead of stalling
    /// `close()`.
    pub fn push(&self, result: R) -> Result<(), OutputError> {
        self.try_push(result).map_err(|err| err.error())
    }

    /// Appends one result, waiting while the channel is full.
    ///
    /// Only safe when the caller drains the output concurrently with
    /// `commit` and `close`; otherwise a full channel blocks the worker and
    /// `close()` never returns.
    ///
    /// # Panics
    ///
    /// Panics if called from inside an async runtime; workers are plain threads.
    pub fn push_blocking(&self, result: R) -> Result<(), OutputError> {
        self.tx
            .blocking_send(result)
            .map_err(|_| OutputError::Closed)
    }

    /// Appends one result if there is room right now, handing it back otherwise.
    pub fn try_push(&self, result: R) -> Result<(), TryPushError<R>> {
        self.tx.try_send(result).map_err(|err| match err {
            mpsc::error::TrySendError::Full(result) => TryPushError::Full(result),
            mpsc::error::TrySendError::Closed(result) => TryPushError::Closed(result),
        })
    }
}

/// Read side of the output channel. Cloning shares the same receiver.
#[derive(Debug)]
pub struct OutputChannel<R> {
    rx: Arc<Mutex<mpsc::Receiver<R>>>,
}

impl<R> Clone for OutputChannel<R> {
    fn clone(&self) -> Self {
        Self {
            rx: Arc::clone(&self.rx),
        }
    }
}

impl<R> OutputChannel<R> {
    /// Takes one result without waiting.
    ///
    /// Returns `None` both when nothing is buffered and when another reader
    /// currently holds the channel (for example one parked in
    /// [`OutputChannel::blocking_recv`]).
    pub fn try_recv(&self) -> Option<R> {
        let mut rx = self.rx.try_lock().ok()?;
        rx.try_recv().ok()
    }

    /// Waits for the next result. Returns `None` once every sink is gone and
    /// the channel is drained, which is the case after `close()` returns.
    ///
    /// # Panics
    ///
    /// Panics if called from inside an async runtime; use [`OutputChannel::recv`] there.
    pub fn blocking_recv(&self) -> Option<R> {
        self.rx.blocking_lock().blocking_recv()
    }

    /// Async variant of [`OutputChannel::blocking_recv`].
    pub async fn recv(&self) -> Option<R> {
        self.rx.lock().await.recv().await
    }

    /// Takes every result currently buffered without waiting for new ones.
    ///
    /// Waits for the channel if another reader holds it, so do not call this
    /// while a different thread is parked in [`OutputChannel::blocking_recv`]
    /// on an open pool.
    ///
    /// # Panics
    ///
    /// Panics if called from inside an async runtime.
    pub fn drain(&self) -> Vec<R> {
        let mut rx = self.rx.blocking_lock();
        let mut results = Vec::new();
        while let Ok(result) = rx.try_recv() {
            results.push(result);
        }
        results
    }
}
