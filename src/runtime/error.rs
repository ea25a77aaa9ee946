use crate::pool::lifecycle::Lifecycle;
use std::fmt;
use std::io;

/// Errors returned synchronously by pool construction and `commit`.
///
/// Shutdown-time problems are not errors: they travel inside the
/// [`ShutdownReport`](crate::ShutdownReport) returned by `close()`.
#[derive(Debug)]
pub enum PoolError {
    /// A configuration value violated its constraint. No pool was created.
    InvalidConfiguration { field: &'static str, reason: String },
    /// `commit` was called after `close()` started.
    Rejected { lifecycle: Lifecycle },
    /// Every worker terminated on a transform failure, so enqueued batches can
    /// no longer be drained.
    WorkersExhausted,
    /// The OS refused to start a worker thread.
    Spawn { worker: String, source: io::Error },
}

impl PoolError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        PoolError::InvalidConfiguration {
            field,
            reason: reason.into(),
        }
    }

    /// Name of the offending field for [`PoolError::InvalidConfiguration`].
    pub fn field(&self) -> Option<&'static str> {
        match self {
            PoolError::InvalidConfiguration { field, .. } => Some(field),
            _ => None,
        }
    }
}

impl fmt::Display for PoolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PoolError::InvalidConfiguration { field, reason } => {
                write!(f, "invalid configuration: {field} {reason}")
            }
            PoolError::Rejected { lifecycle } => {
                write!(f, "commit rejected: pool is {lifecycle}")
            }
            PoolError::WorkersExhausted => {
                write!(f, "all workers terminated; batches can no longer be drained")
            }
            PoolError::Spawn { worker, source } => {
                write!(f, "failed to start worker {worker}: {source}")
            }
        }
    }
}

impl std::error::Error for PoolError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PoolError::Spawn { source, .. } => Some(source),
            _ => None,
        }
    }
}
