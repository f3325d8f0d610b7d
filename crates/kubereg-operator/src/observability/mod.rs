//! Observability Module
//!
//! - `metrics`: Prometheus recorder and registry writer metrics
//! - `tracing`: log subscriber setup
//!
//! Bookkeeping events and metrics live in `kubereg_core::{events, metrics}`.

pub mod metrics;
pub mod tracing;

pub use metrics::{init_metrics, MetricsState};
pub use tracing::{init_tracing, TracingConfig};
