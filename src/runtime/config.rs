use crate::runtime::error::PoolError;

/// Default number of completed batches the handoff queue can hold.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1_024;
/// Default number of results the output channel can hold before workers block.
pub const DEFAULT_OUTPUT_CAPACITY: usize = 1_024;
/// Default prefix for worker thread names (`{prefix}-{index}`).
pub const DEFAULT_THREAD_NAME_PREFIX: &str = "batchpool-worker";

/// Configuration for a [`BatchPool`](crate::BatchPool).
///
/// All instances must be constructed via [`PoolConfig::builder`] or [`PoolConfig::new`]
/// so invariants are validated before any pool observes the values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    block_size: usize,
    worker_count: usize,
    queue_capacity: usize,
    output_capacity: usize,
    thread_name_prefix: String,
}

pub struct PoolConfigParams {
    pub block_size: usize,
    pub worker_count: usize,
    pub queue_capacity: usize,
    pub output_capacity: usize,
    pub thread_name_prefix: String,
}

impl PoolConfig {
    /// Returns a builder to incrementally construct and validate a configuration.
    pub fn builder() -> PoolConfigBuilder {
        PoolConfigBuilder::default()
    }

    /// Constructs a configuration directly from the provided values.
    pub fn new(params: PoolConfigParams) -> Result<Self, PoolError> {
        let PoolConfigParams {
            block_size,
            worker_count,
            queue_capacity,
            output_capacity,
            thread_name_prefix,
        } = params;

        let config = Self {
            block_size,
            worker_count,
            queue_capacity,
            output_capacity,
            thread_name_prefix: thread_name_prefix.trim().to_owned(),
        };

        config.validate()?;
        Ok(config)
    }

    /// Shorthand for a config with default queue sizes.
    pub fn with_sizes(block_size: usize, worker_count: usize) -> Result<Self, PoolError> {
        Self::builder()
            .block_size(block_size)
            .worker_count(worker_count)
            .build()
    }

    /// Number of items per batch.
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Number of worker threads.
    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Maximum number of batches waiting in the handoff queue.
    pub fn queue_capacity(&self) -> usize {
        self.queue_capacity
    }

    /// Maximum number of undrained results in the output channel.
    pub fn output_capacity(&self) -> usize {
        self.output_capacity
    }

    pub fn thread_name_prefix(&self) -> &str {
        &self.thread_name_prefix
    }

    /// Name of the worker at `index`.
    pub fn worker_name(&self, index: usize) -> String {
        format!("{}-{index}", self.thread_name_prefix)
    }

    /// Performs validation on an existing configuration instance.
    pub fn validate(&self) -> Result<(), PoolError> {
        ensure_positive(self.block_size, "block_size")?;
        ensure_positive(self.worker_count, "worker_count")?;
        ensure_positive(self.queue_capacity, "queue_capacity")?;
        ensure_positive(self.output_capacity, "output_capacity")?;

        if self.thread_name_prefix.trim().is_empty() {
            return Err(PoolError::invalid("thread_name_prefix", "cannot be empty"));
        }

        Ok(())
    }
}

#[derive(Debug, Default, Clone)]
pub struct PoolConfigBuilder {
    block_size: Option<usize>,
    worker_count: Option<usize>,
    queue_capacity: Option<usize>,
    output_capacity: Option<usize>,
    thread_name_prefix: Option<String>,
}

impl PoolConfigBuilder {
    pub fn block_size(mut self, size: usize) -> Self {
        self.block_size = Some(size);
        self
    }

    pub fn worker_count(mut self, count: usize) -> Self {
        self.worker_count = Some(count);
        self
    }

    pub fn queue_capacity(mut self, batches: usize) -> Self {
        self.queue_capacity = Some(batches);
        self
    }

    pub fn output_capacity(mut self, results: usize) -> Self {
        self.output_capacity = Some(results);
        self
    }

    pub fn thread_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.thread_name_prefix = Some(prefix.into());
        self
    }

    pub fn build(self) -> Result<PoolConfig, PoolError> {
        let params = PoolConfigParams {
            block_size: self
                .block_size
                .ok_or_else(|| PoolError::invalid("block_size", "is required"))?,
            worker_count: self
                .worker_count
                .ok_or_else(|| PoolError::invalid("worker_count", "is required"))?,
            queue_capacity: self.queue_capacity.unwrap_or(DEFAULT_QUEUE_CAPACITY),
            output_capacity: self.output_capacity.unwrap_or(DEFAULT_OUTPUT_CAPACITY),
            thread_name_prefix: self
                .thread_name_prefix
                .unwrap_or_else(|| DEFAULT_THREAD_NAME_PREFIX.to_owned()),
        };

        PoolConfig::new(params)
    }
}

fn ensure_positive(value: usize, field: &'static str) -> Result<(), PoolError> {
    if value == 0 {
        return Err(PoolError::invalid(field, "must be greater than 0"));
    }
    Ok(())
}
