//! Runtime glue that wires configs, errors, the transform seam, and telemetry.

pub mod config;
pub mod error;
pub mod fatal;
pub mod telemetry;
pub mod transform;
