//! Worker module split across focused submodules:
//! - `types`: per-worker stats and batch outcomes
//! - `shared`: state shared across workers (queue, transform, output, activity)
//! - `process`: worker struct plus the thread loop
//! - `tests`: worker unit tests

mod process;
mod shared;
mod types;


pub use process::Worker;
pub use shared::{WorkerActivityGuard, WorkerActivityTracker, WorkerShared};
pub use types::WorkerStats;
