//! Authoritative node listing used by the drift corrector

use std::collections::BTreeSet;
use std::future::Future;

/// Source of truth for which nodes currently exist in the cluster.
pub trait NodeLister: Send + Sync {
    /// Names of every node known upstream.
    fn list_node_names(&self) -> impl Future<Output = anyhow::Result<BTreeSet<String>>> + Send;
}
