//! `wrenchflow-observability` — process-level logging/tracing setup.

pub mod tracing;

pub use crate::tracing::{init, init_with_filter};
