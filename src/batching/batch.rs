/// Upper bound on what a fresh batch reserves up front; larger batches grow
/// as items arrive.
const MAX_PREALLOCATED_ITEMS: usize = 1_024;

/// Ordered, fixed-capacity group of committed items.
///
/// Append-only until full; once handed to the queue it is only ever consumed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch<T> {
    seq: u64,
    capacity: usize,
    items: Vec<T>,
}

impl<T> Batch<T> {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            seq: 0,
            capacity,
            items: Vec::with_capacity(capacity.min(MAX_PREALLOCATED_ITEMS)),
        }
    }

    /// Appends an item and reports whether the batch is now full.
    ///
    /// Callers must swap out a full batch before pushing again.
    pub fn push(&mut self, item: T) -> bool {
        debug_assert!(!self.is_full(), "push into a full batch");
        self.items.push(item);
        self.is_full()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.items.len() >= self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Sequence number assigned when the batch was enqueued.
    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub(crate) fn set_seq(&mut self, seq: u64) {
        self.seq = seq;
    }

    /// Swaps this batch for a fresh empty one of the same capacity.
    pub(crate) fn take(&mut self) -> Batch<T> {
        std::mem::replace(self, Batch::new(self.capacity))
    }

    /// Consumes the batch into a single-pass iterator over its items.
    pub fn into_items(self) -> BatchItems<T> {
        BatchItems {
            seq: self.seq,
            inner: self.items.into_iter(),
        }
    }
}

/// Forward-only iterator handed to the transform. Yields items in commit order.
#[derive(Debug)]
pub struct BatchItems<T> {
    seq: u64,
    inner: std::vec::IntoIter<T>,
}

impl<T> BatchItems<T> {
    /// Sequence number of the batch these items came from.
    pub fn seq(&self) -> u64 {
        self.seq
    }
}

impl<T> Iterator for BatchItems<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<T> ExactSizeIterator for BatchItems<T> {}
