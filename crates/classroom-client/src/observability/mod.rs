//! Observability for the classroom client.
//!
//! Structured logging goes through `tracing` with `classroom.*` targets;
//! counters and histograms go through the `metrics` facade.

pub mod metrics;
