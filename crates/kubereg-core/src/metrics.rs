//! Bookkeeper metrics
//!
//! Recorded through the `metrics` facade; the operator installs the
//! Prometheus recorder.
//!
//! Metrics tracked:
//! - `kubereg_events_total` - counter of processed work items by kind
//! - `kubereg_event_errors_total` - counter of abandoned work items by kind
//! - `kubereg_commands_total` - counter of emitted registry commands by action
//! - `kubereg_tracked_nodes` - gauge of tracked nodes
//! - `kubereg_tracked_services` - gauge of tracked services
//! - `kubereg_sync_skipped_total` - counter of skipped sync passes
//! - `kubereg_drift_removals_total` - counter of nodes removed by sync

use crate::model::{RegistryAction, WorkKind};
use metrics::{counter, describe_counter, describe_gauge, gauge};

/// Register descriptions for the bookkeeper metrics.
pub fn describe_metrics() {
    describe_counter!("kubereg_events_total", "Work items processed by kind");
    describe_counter!(
        "kubereg_event_errors_total",
        "Work items abandoned because of an error, by kind"
    );
    describe_counter!(
        "kubereg_commands_total",
        "Registry commands emitted by action"
    );
    describe_gauge!("kubereg_tracked_nodes", "Number of tracked nodes");
    describe_gauge!("kubereg_tracked_services", "Number of tracked services");
    describe_counter!(
        "kubereg_sync_skipped_total",
        "Sync passes skipped because node listing failed"
    );
    describe_counter!(
        "kubereg_drift_removals_total",
        "Tracked nodes removed because they vanished upstream"
    );
}

pub fn record_event(kind: WorkKind) {
    counter!("kubereg_events_total", "kind" => kind.to_string()).increment(1);
}

pub fn record_event_error(kind: WorkKind) {
    counter!("kubereg_event_errors_total", "kind" => kind.to_string()).increment(1);
}

pub fn record_command(action: RegistryAction) {
    counter!("kubereg_commands_total", "action" => action.to_string()).increment(1);
}

pub fn set_tracked(nodes: usize, services: usize) {
    gauge!("kubereg_tracked_nodes").set(nodes as f64);
    gauge!("kubereg_tracked_services").set(services as f64);
}

pub fn record_sync_skipped() {
    counter!("kubereg_sync_skipped_total").increment(1);
}

pub fn record_drift_removal() {
    counter!("kubereg_drift_removals_total").increment(1);
}
