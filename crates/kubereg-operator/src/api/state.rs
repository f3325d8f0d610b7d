//! Shared application state

use crate::observability::MetricsState;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

/// State shared by the HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    /// etcd client used for liveness checks
    pub etcd_client: etcd_client::Client,
    /// Set once the initial node listing reached the bookkeeper
    pub synced: Arc<AtomicBool>,
    /// Prometheus handle, if metrics were initialized
    pub metrics_state: Option<MetricsState>,
}
