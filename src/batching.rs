//! Data structures moving work through the pool: batches, the bounded handoff
//! queue between producer and workers, and the shared output channel.

pub mod batch;
pub mod handoff;
pub mod output;
