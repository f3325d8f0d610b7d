//! Node readiness predicate

use crate::model::NodeSnapshot;

/// Decides whether a node should advertise services.
pub trait ReadinessCheck: Send + Sync {
    fn is_ready(&self, node: &NodeSnapshot) -> bool;
}

impl<F> ReadinessCheck for F
where
    F: Fn(&NodeSnapshot) -> bool + Send + Sync,
{
    fn is_ready(&self, node: &NodeSnapshot) -> bool {
        self(node)
    }
}

/// Ready when the node reports a `Ready` condition with status `True`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadyCondition;

impl ReadinessCheck for ReadyCondition {
    fn is_ready(&self, node: &NodeSnapshot) -> bool {
        node.conditions
            .iter()
            .any(|c| c.kind == "Ready" && c.status == "True")
    }
}
