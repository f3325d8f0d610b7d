//! Kubernetes watchers
//!
//! Produce the bookkeeper's inbound work from node and service watch streams.

mod convert;
mod nodes;
mod services;

pub use convert::{node_snapshot, service_definition};
pub use nodes::{watch_nodes, NodeTracker};
pub use services::{watch_services, ServiceTracker};
