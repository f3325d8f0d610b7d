//! Prometheus Metrics
//!
//! Installs the Prometheus recorder and describes every metric, including the
//! bookkeeper's own (see `kubereg_core::metrics`).
//!
//! Registry writer metrics:
//! - `kubereg_commands_applied_total` - counter of commands applied by action
//! - `kubereg_command_retries_total` - counter of retried attempts by action
//! - `kubereg_command_failures_total` - counter of dropped commands by action

use kubereg_core::RegistryAction;
use metrics::{counter, describe_counter};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// State containing the Prometheus handle for metrics export
#[derive(Clone)]
pub struct MetricsState {
    pub prometheus_handle: PrometheusHandle,
}

/// Install the Prometheus recorder and register metric descriptions.
pub fn init_metrics() -> Result<MetricsState, Box<dyn std::error::Error + Send + Sync>> {
    let handle = PrometheusBuilder::new().install_recorder()?;

    kubereg_core::metrics::describe_metrics();
    register_metric_descriptions();

    Ok(MetricsState {
        prometheus_handle: handle,
    })
}

impl MetricsState {
    /// Prometheus exposition text for every recorded metric.
    pub fn render(&self) -> String {
        self.prometheus_handle.run_upkeep();
        self.prometheus_handle.render()
    }
}

fn register_metric_descriptions() {
    describe_counter!(
        "kubereg_commands_applied_total",
        "Registry commands applied to the backend by action"
    );
    describe_counter!(
        "kubereg_command_retries_total",
        "Registry command attempts that failed and were retried"
    );
    describe_counter!(
        "kubereg_command_failures_total",
        "Registry commands dropped after exhausting retries"
    );
}

pub fn record_command_applied(action: RegistryAction) {
    counter!("kubereg_commands_applied_total", "action" => action.to_string()).increment(1);
}

pub fn record_command_retry(action: RegistryAction) {
    counter!("kubereg_command_retries_total", "action" => action.to_string()).increment(1);
}

pub fn record_command_failure(action: RegistryAction) {
    counter!("kubereg_command_failures_total", "action" => action.to_string()).increment(1);
}
