//! Kubernetes object -> snapshot conversion

use k8s_openapi::api::core::v1::{Node, Service, ServicePort as KubeServicePort};
use kube::ResourceExt;
use kubereg_core::{NodeAddress, NodeCondition, NodeSnapshot, ServiceDefinition, ServicePort};

/// Extract the readiness-relevant view of a node.
pub fn node_snapshot(node: &Node) -> NodeSnapshot {
    let status = node.status.as_ref();

    let conditions = status
        .and_then(|s| s.conditions.as_ref())
        .map(|conditions| {
            conditions
                .iter()
                .map(|c| NodeCondition {
                    kind: c.type_.clone(),
                    status: c.status.clone(),
                })
                .collect()
        })
        .unwrap_or_default();

    let addresses = status
        .and_then(|s| s.addresses.as_ref())
        .map(|addresses| {
            addresses
                .iter()
                .map(|a| NodeAddress {
                    kind: a.type_.clone(),
                    address: a.address.clone(),
                })
                .collect()
        })
        .unwrap_or_default();

    NodeSnapshot {
        name: node.name_any(),
        conditions,
        addresses,
    }
}

/// Extract the registry payload of a service.
pub fn service_definition(service: &Service) -> ServiceDefinition {
    let ports = service
        .spec
        .as_ref()
        .and_then(|spec| spec.ports.as_ref())
        .map(|ports| ports.iter().filter_map(service_port).collect())
        .unwrap_or_default();

    ServiceDefinition {
        name: service.name_any(),
        namespace: service.namespace().unwrap_or_default(),
        ports,
        labels: service.labels().clone(),
    }
}

// Ports outside the u16 range are rejected by the API server; skip them anyway.
fn service_port(port: &KubeServicePort) -> Option<ServicePort> {
    Some(ServicePort {
        name: port.name.clone().unwrap_or_default(),
        protocol: port.protocol.clone().unwrap_or_else(|| "TCP".to_string()),
        port: u16::try_from(port.port).ok()?,
        node_port: port.node_port.and_then(|p| u16::try_from(p).ok()),
    })
}


#[cfg(test)]
mod tests {
    use super::fixtures;
    use super::*;

    #[test]
    fn test_node_snapshot() {
        let snapshot = node_snapshot(&fixtures::node("n1", true, "10.0.0.1"));
        assert_eq!(snapshot.name, "n1");
        assert_eq!(snapshot.primary_address(), Some("10.0.0.1"));
        assert_eq!(snapshot.conditions.len(), 1);
        assert_eq!(snapshot.conditions[0].kind, "Ready");
        assert_eq!(snapshot.conditions[0].status, "True");
    }

    #[test]
    fn test_node_without_status() {
        let mut node = fixtures::node("n1", true, "10.0.0.1");
        node.status = None;
        let snapshot = node_snapshot(&node);
        assert!(snapshot.conditions.is_empty());
        assert!(snapshot.addresses.is_empty());
    }

    #[test]
    fn test_service_definition() {
        let def = service_definition(&fixtures::service("web", Some(30080)));
        assert_eq!(def.name, "web");
        assert_eq!(def.namespace, "default");
        assert_eq!(def.labels.get("app").map(String::as_str), Some("web"));
        assert_eq!(def.ports.len(), 1);
        assert_eq!(def.ports[0].name, "http");
        assert_eq!(def.ports[0].port, 80);
        assert_eq!(def.ports[0].node_port, Some(30080));
        assert!(def.is_registrable());
    }

    #[test]
    fn test_cluster_ip_service_is_not_registrable() {
        let def = service_definition(&fixtures::service("web", None));
        assert!(!def.is_registrable());
    }

    #[test]
    fn test_out_of_range_port_is_skipped() {
        let mut svc = fixtures::service("web", Some(30080));
        if let Some(ports) = svc.spec.as_mut().and_then(|s| s.ports.as_mut()) {
            ports[0].port = 70000;
        }
        assert!(service_definition(&svc).ports.is_empty());
    }
}
