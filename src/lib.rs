pub mod batching;
pub mod pool;
pub mod runtime;

pub use batching::batch::{Batch, BatchItems};
pub use batching::handoff::{HandoffQueue, PushError};
pub use batching::output::{OutputChannel, OutputError, OutputSink, TryPushError};
pub use pool::controller::BatchPool;
pub use pool::lifecycle::Lifecycle;
pub use pool::report::{CloseOutcome, IntegrityMismatch, ShutdownReport};
pub use pool::worker::WorkerStats;
pub use runtime::config::{PoolConfig, PoolConfigBuilder, PoolConfigParams};
pub use runtime::error::PoolError;
pub use runtime::fatal::{FailureKind, TransformFailure};
pub use runtime::telemetry::{init_tracing, PoolSnapshot};
pub use runtime::transform::BatchTransform;
