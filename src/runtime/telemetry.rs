use crate::pool::lifecycle::Lifecycle;
use std::sync::OnceLock;
use tracing_subscriber::EnvFilter;

static TRACING_INIT: OnceLock<()> = OnceLock::new();

/// Installs a basic tracing subscriber (if one is not already active).
///
/// The subscriber honours `RUST_LOG` if it is present, otherwise it falls back to `info`.
/// Calling this function multiple times is harmless.
pub fn init_tracing() {
    if TRACING_INIT.get().is_some() {
        return;
    }

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(true)
        .try_init();

    let _ = TRACING_INIT.set(());
}

/// Point-in-time view of a pool, taken without blocking on commit or close.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PoolSnapshot {
    pub lifecycle: Lifecycle,
    pub items_committed: u64,
    pub batches_enqueued: u64,
    pub queued_batches: usize,
    pub live_workers: usize,
    pub busy_workers: usize,
}

impl PoolSnapshot {
    /// Items committed but not yet part of an enqueued batch, given the block size.
    pub fn partial_items(&self, block_size: usize) -> u64 {
        let enqueued_capacity = self.batches_enqueued.saturating_mul(block_size as u64);
        self.items_committed.saturating_sub(enqueued_capacity)
    }
}
