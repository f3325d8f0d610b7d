//! Snapshot and command types
//!
//! The bookkeeper only ever sees these types. The operator converts
//! Kubernetes objects into snapshots and applies the emitted commands to the
//! registry backend.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Stable identifier of a (node, service) registration.
///
/// Built as `{node}-{service}`. Names containing `-` can collide
/// (`a-b` + `c` vs `a` + `b-c`); callers accept that constraint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegistrationId(String);

impl RegistrationId {
    /// Derive the registration identifier for a node and a service.
    pub fn build(node_name: &str, service_name: &str) -> Self {
        Self(format!("{node_name}-{service_name}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RegistrationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single node status condition (`Ready`, `MemoryPressure`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeCondition {
    pub kind: String,
    pub status: String,
}

/// A reachable address of a node (`InternalIP`, `Hostname`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeAddress {
    pub kind: String,
    pub address: String,
}

/// The readiness-relevant view of an upstream node.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeSnapshot {
    pub name: String,
    #[serde(default)]
    pub conditions: Vec<NodeCondition>,
    #[serde(default)]
    pub addresses: Vec<NodeAddress>,
}

impl NodeSnapshot {
    /// Address advertised for this node: the first one upstream reports.
    pub fn primary_address(&self) -> Option<&str> {
        self.addresses.first().map(|a| a.address.as_str())
    }
}

/// A port exposed by a service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServicePort {
    /// Port name, empty for single unnamed ports.
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_protocol")]
    pub protocol: String,
    pub port: u16,
    /// Port opened on every node, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_port: Option<u16>,
}

fn default_protocol() -> String {
    "TCP".to_string()
}

/// Service definition passed through to the registry untouched.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceDefinition {
    pub name: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub ports: Vec<ServicePort>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
}

impl ServiceDefinition {
    /// Whether the service can be reached through a node address.
    pub fn is_registrable(&self) -> bool {
        self.ports.iter().any(|p| p.node_port.is_some())
    }
}

/// Kind of an inbound work item, used for logs and metric labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkKind {
    NodeAdd,
    NodeRemove,
    NodeUpdate,
    ServiceAdd,
    ServiceRemove,
    ServiceUpdate,
    Sync,
}

impl fmt::Display for WorkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkKind::NodeAdd => write!(f, "node_add"),
            WorkKind::NodeRemove => write!(f, "node_remove"),
            WorkKind::NodeUpdate => write!(f, "node_update"),
            WorkKind::ServiceAdd => write!(f, "service_add"),
            WorkKind::ServiceRemove => write!(f, "service_remove"),
            WorkKind::ServiceUpdate => write!(f, "service_update"),
            WorkKind::Sync => write!(f, "sync"),
        }
    }
}

/// Inbound event produced by the cluster watchers.
#[derive(Debug, Clone, PartialEq)]
pub enum KubeWork {
    NodeAdd(NodeSnapshot),
    NodeRemove(String),
    NodeUpdate(NodeSnapshot),
    ServiceAdd(ServiceDefinition),
    ServiceRemove(ServiceDefinition),
    ServiceUpdate(ServiceDefinition),
    Sync,
}

impl KubeWork {
    pub fn kind(&self) -> WorkKind {
        match self {
            KubeWork::NodeAdd(_) => WorkKind::NodeAdd,
            KubeWork::NodeRemove(_) => WorkKind::NodeRemove,
            KubeWork::NodeUpdate(_) => WorkKind::NodeUpdate,
            KubeWork::ServiceAdd(_) => WorkKind::ServiceAdd,
            KubeWork::ServiceRemove(_) => WorkKind::ServiceRemove,
            KubeWork::ServiceUpdate(_) => WorkKind::ServiceUpdate,
            KubeWork::Sync => WorkKind::Sync,
        }
    }
}

/// Registry mutation requested by the bookkeeper.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryAction {
    Add,
    Remove,
}

impl fmt::Display for RegistryAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryAction::Add => write!(f, "add"),
            RegistryAction::Remove => write!(f, "remove"),
        }
    }
}

/// Outbound command consumed by the registry writer.
#[derive(Debug, Clone, PartialEq)]
pub struct RegistryCommand {
    pub action: RegistryAction,
    pub registration_id: RegistrationId,
    /// Node address, set for `Add` only.
    pub address: Option<String>,
    /// Full service definition, set for `Add` only.
    pub service: Option<Arc<ServiceDefinition>>,
}

impl RegistryCommand {
    pub fn add(
        registration_id: RegistrationId,
        address: impl Into<String>,
        service: Arc<ServiceDefinition>,
    ) -> Self {
        Self {
            action: RegistryAction::Add,
            registration_id,
            address: Some(address.into()),
            service: Some(service),
        }
    }

    pub fn remove(registration_id: RegistrationId) -> Self {
        Self {
            action: RegistryAction::Remove,
            registration_id,
            address: None,
            service: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registration_id_is_deterministic() {
        let a = RegistrationId::build("n1", "svc");
        let b = RegistrationId::build("n1", "svc");
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "n1-svc");
        assert_ne!(a, RegistrationId::build("n1", "svc2"));
        assert_ne!(a, RegistrationId::build("n2", "svc"));
    }

    #[test]
    fn test_registration_id_is_order_sensitive() {
        assert_ne!(
            RegistrationId::build("web", "api"),
            RegistrationId::build("api", "web")
        );
    }

    #[test]
    fn test_primary_address_is_first_reported() {
        let node = NodeSnapshot {
            name: "n1".to_string(),
            conditions: vec![],
            addresses: vec![
                NodeAddress {
                    kind: "Hostname".to_string(),
                    address: "n1.local".to_string(),
                },
                NodeAddress {
                    kind: "InternalIP".to_string(),
                    address: "10.0.0.1".to_string(),
                },
            ],
        };
        assert_eq!(node.primary_address(), Some("n1.local"));
        assert_eq!(NodeSnapshot::default().primary_address(), None);
    }

    #[test]
    fn test_service_registrable_needs_node_port() {
        let mut svc = ServiceDefinition {
            name: "web".to_string(),
            ports: vec![ServicePort {
                name: "http".to_string(),
                protocol: "TCP".to_string(),
                port: 80,
                node_port: None,
            }],
            ..Default::default()
        };
        assert!(!svc.is_registrable());
        svc.ports[0].node_port = Some(30080);
        assert!(svc.is_registrable());
    }

    #[test]
    fn test_service_port_deserialize_defaults() {
        let json = r#"{ "port": 53, "nodePort": 30053 }"#;
        let port: ServicePort = serde_json::from_str(json).unwrap();
        assert_eq!(port.name, "");
        assert_eq!(port.protocol, "TCP");
        assert_eq!(port.node_port, Some(30053));
    }

    #[test]
    fn test_work_kind_labels() {
        assert_eq!(KubeWork::Sync.kind().to_string(), "sync");
        assert_eq!(
            KubeWork::NodeRemove("n1".to_string()).kind().to_string(),
            "node_remove"
        );
        assert_eq!(RegistryAction::Add.to_string(), "add");
    }
}
