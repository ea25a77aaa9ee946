use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

/// Default number of batches the queue holds before producers block.
pub const DEFAULT_HANDOFF_CAPACITY: usize = 1_024;

struct QueueState<T> {
    items: VecDeque<T>,
    closed: bool,
    consumers: usize,
    abandoned: bool,
}

/// Bounded blocking FIFO between the batch assembler and the workers.
///
/// `push` waits while the queue is full, `pop` waits while it is empty and
/// open. Closing wakes every waiter; consumers then drain what is left and
/// observe `None`. Nobody polls.
pub struct HandoffQueue<T> {
    state: Mutex<QueueState<T>>,
    not_empty: Condvar,
    not_full: Condvar,
    capacity: usize,
}

/// Returned by [`HandoffQueue::push`] with the rejected item.
pub enum PushError<T> {
    /// The queue was closed.
    Closed(T),
    /// Every registered consumer has gone away.
    NoConsumers(T),
}

impl<T> PushError<T> {
    pub fn into_inner(self) -> T {
        match self {
            PushError::Closed(item) | PushError::NoConsumers(item) => item,
        }
    }
}

impl<T> fmt::Debug for PushError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PushError::Closed(_) => f.write_str("Closed(..)"),
            PushError::NoConsumers(_) => f.write_str("NoConsumers(..)"),
        }
    }
}

impl<T> fmt::Display for PushError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PushError::Closed(_) => f.write_str("handoff queue is closed"),
            PushError::NoConsumers(_) => f.write_str("handoff queue has no live consumers"),
        }
    }
}

impl<T> std::error::Error for PushError<T> {}

impl<T> HandoffQueue<T> {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_HANDOFF_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        assert!(capacity > 0, "capacity must be greater than zero");
        Self {
            state: Mutex::new(QueueState {
                items: VecDeque::with_capacity(capacity.min(DEFAULT_HANDOFF_CAPACITY)),
                closed: false,
                consumers: 0,
                abandoned: false,
            }),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
            capacity,
        }
    }

    fn lock(&self) -> MutexGuard<'_, QueueState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Enqueues `item`, waiting while the queue is at capacity.
    pub fn push(&self, item: T) -> Result<(), PushError<T>> {
        let mut state = self.lock();
        loop {
            if state.closed {
                return Err(PushError::Closed(item));
            }
            if state.abandoned {
                return Err(PushError::NoConsumers(item));
            }
            if state.items.len() < self.capacity {
                state.items.push_back(item);
                drop(state);
                self.not_empty.notify_one();
                return Ok(());
            }
            state = self
                .not_full
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Dequeues the oldest item, waiting while the queue is empty and open.
    ///
    /// Returns `None` only once the queue is closed and fully drained.
    pub fn pop(&self) -> Option<T> {
        let mut state = self.lock();
        loop {
            if let Some(item) = state.items.pop_front() {
                drop(state);
                self.not_full.notify_one();
                return Some(item);
            }
            if state.closed {
                return None;
            }
            state = self
                .not_empty
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Marks the queue closed and wakes every waiter. Idempotent.
    pub fn close(&self) {
        let mut state = self.lock();
        if state.closed {
            return;
        }
        state.closed = true;
        drop(state);
        self.not_empty.notify_all();
        self.not_full.notify_all();
    }

    /// Registers a consumer. When the last registered consumer drops its
    /// guard, blocked and future pushes fail with [`PushError::NoConsumers`].
    pub fn register_consumer(self: &Arc<Self>) -> ConsumerGuard<T> {
        self.lock().consumers += 1;
        ConsumerGuard {
            queue: Arc::clone(self),
        }
    }

    fn release_consumer(&self) {
        let mut state = self.lock();
        state.consumers = state.consumers.saturating_sub(1);
        if state.consumers == 0 {
            state.abandoned = true;
            drop(state);
            self.not_full.notify_all();
        }
    }

    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().items.is_empty()
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Whether every registered consumer has gone away.
    pub fn is_abandoned(&self) -> bool {
        self.lock().abandoned
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl<T> Default for HandoffQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Keeps a consumer registered on a [`HandoffQueue`] until dropped.
pub struct ConsumerGuard<T> {
    queue: Arc<HandoffQueue<T>>,
}

impl<T> Drop for ConsumerGuard<T> {
    fn drop(&mut self) {
        self.queue.release_consumer();
    }
}
