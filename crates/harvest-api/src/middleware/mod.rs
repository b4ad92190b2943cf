//! # Middleware Stack
//!
//! - [`metrics`]: request counters and latency through the `metrics` facade.

pub mod metrics;
