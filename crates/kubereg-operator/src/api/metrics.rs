//! `/metrics` endpoint
//!
//! Bookkeeper and registry writer metrics share one recorder, so a single
//! scrape covers event handling, emitted commands and applied writes.

use super::AppState;
use crate::observability::MetricsState;
use axum::{extract::State, http::StatusCode, response::IntoResponse};

const CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

pub async fn get_metrics(State(state): State<AppState>) -> impl IntoResponse {
    let (status, body) = exposition(state.metrics_state.as_ref());
    (status, [("content-type", CONTENT_TYPE)], body)
}

// The operator keeps running if the recorder failed to install.
fn exposition(metrics: Option<&MetricsState>) -> (StatusCode, String) {
    match metrics {
        Some(metrics) => (StatusCode::OK, metrics.render()),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            "kubereg metrics recorder not installed\n".to_string(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use metrics_exporter_prometheus::PrometheusBuilder;

    #[test]
    fn test_missing_recorder_is_unavailable() {
        let (status, body) = exposition(None);
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(body.contains("not installed"));
    }

    #[test]
    fn test_renders_recorded_metrics() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let state = MetricsState {
            prometheus_handle: recorder.handle(),
        };
        metrics::with_local_recorder(&recorder, || {
            kubereg_core::metrics::record_sync_skipped();
        });

        let (status, body) = exposition(Some(&state));
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("kubereg_sync_skipped_total 1"));
    }
}
