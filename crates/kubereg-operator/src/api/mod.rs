//! HTTP API Module
//!
//! - `health`: liveness and readiness probes
//! - `metrics`: Prometheus metrics endpoint

mod health;
mod metrics;
mod state;

pub use state::AppState;

use axum::{routing::get, Router};

/// Create the API router with all endpoints
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        .route("/metrics", get(metrics::get_metrics))
        .with_state(state)
}
