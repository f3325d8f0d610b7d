//! Structured Events
//!
//! One function per bookkeeping event so field names stay consistent across
//! log lines.
//!
//! Event types:
//! - `node_added` / `node_removed` - node tracking lifecycle
//! - `node_readiness_changed` - readiness flip observed on update
//! - `node_address_changed` - primary address moved on update
//! - `service_added` / `service_removed` - service tracking lifecycle
//! - `registration_requested` / `deregistration_requested` - outbound commands
//! - `drift_detected` - node tracked locally but gone upstream
//! - `sync_skipped` - authoritative listing failed

use tracing::{debug, info, warn};

pub fn node_added(node: &str, address: &str, ready: bool) {
    info!(
        event_type = "node_added",
        node = %node,
        address = %address,
        ready = ready,
        "Added node"
    );
}

pub fn node_removed(node: &str, registrations: usize) {
    info!(
        event_type = "node_removed",
        node = %node,
        registrations = registrations,
        "Removed node"
    );
}

pub fn node_readiness_changed(node: &str, previous: bool, ready: bool) {
    info!(
        event_type = "node_readiness_changed",
        node = %node,
        previous = previous,
        ready = ready,
        "Node readiness changed"
    );
}

pub fn node_address_changed(node: &str, previous: &str, address: &str) {
    info!(
        event_type = "node_address_changed",
        node = %node,
        previous = %previous,
        address = %address,
        "Node address changed"
    );
}

pub fn service_added(service: &str, namespace: &str, nodes: usize) {
    info!(
        event_type = "service_added",
        service = %service,
        namespace = %namespace,
        nodes = nodes,
        "Added service"
    );
}

pub fn service_removed(service: &str, namespace: &str) {
    info!(
        event_type = "service_removed",
        service = %service,
        namespace = %namespace,
        "Removed service"
    );
}

pub fn registration_requested(registration_id: &str, address: &str) {
    debug!(
        event_type = "registration_requested",
        registration_id = %registration_id,
        address = %address,
        "Requesting registration"
    );
}

pub fn deregistration_requested(registration_id: &str) {
    debug!(
        event_type = "deregistration_requested",
        registration_id = %registration_id,
        "Requesting deregistration"
    );
}

pub fn drift_detected(node: &str) {
    warn!(
        event_type = "drift_detected",
        node = %node,
        "Tracked node no longer exists upstream"
    );
}

pub fn sync_skipped(error: &str) {
    warn!(
        event_type = "sync_skipped",
        error = %error,
        "Node listing failed, skipping sync"
    );
}
