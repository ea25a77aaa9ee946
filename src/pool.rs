//! Pool orchestration covering the controller, lifecycle, worker threads, and
//! the shutdown report.

pub mod controller;
pub mod lifecycle;
pub mod report;
pub mod worker;
