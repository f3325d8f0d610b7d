//! Node/service state store
//!
//! Owned exclusively by the bookkeeper task, so no locking is involved.

use crate::model::{RegistrationId, ServiceDefinition};
use std::collections::HashMap;
use std::sync::Arc;

/// A node as tracked by the bookkeeper.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedNode {
    pub name: String,
    pub ready: bool,
    pub address: String,
    /// Service name -> registration currently believed to exist.
    pub registrations: HashMap<String, RegistrationId>,
}

impl TrackedNode {
    pub fn new(name: impl Into<String>, address: impl Into<String>, ready: bool) -> Self {
        Self {
            name: name.into(),
            ready,
            address: address.into(),
            registrations: HashMap::new(),
        }
    }

    /// Whether this node currently advertises the given service.
    pub fn is_registered(&self, service_name: &str) -> bool {
        self.registrations.contains_key(service_name)
    }
}

/// Known nodes and services, keyed by name.
#[derive(Debug, Default)]
pub struct StateStore {
    nodes: HashMap<String, TrackedNode>,
    services: HashMap<String, Arc<ServiceDefinition>>,
}

impl StateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node(&self, name: &str) -> Option<&TrackedNode> {
        self.nodes.get(name)
    }

    pub fn node_mut(&mut self, name: &str) -> Option<&mut TrackedNode> {
        self.nodes.get_mut(name)
    }

    pub fn contains_node(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    /// Insert a node, returning any record it replaced.
    pub fn insert_node(&mut self, node: TrackedNode) -> Option<TrackedNode> {
        self.nodes.insert(node.name.clone(), node)
    }

    pub fn remove_node(&mut self, name: &str) -> Option<TrackedNode> {
        self.nodes.remove(name)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &TrackedNode> {
        self.nodes.values()
    }

    pub fn nodes_mut(&mut self) -> impl Iterator<Item = &mut TrackedNode> {
        self.nodes.values_mut()
    }

    pub fn node_names(&self) -> Vec<String> {
        self.nodes.keys().cloned().collect()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn service(&self, name: &str) -> Option<&Arc<ServiceDefinition>> {
        self.services.get(name)
    }

    /// Insert or overwrite a service definition.
    pub fn insert_service(&mut self, service: Arc<ServiceDefinition>) -> Option<Arc<ServiceDefinition>> {
        self.services.insert(service.name.clone(), service)
    }

    pub fn remove_service(&mut self, name: &str) -> Option<Arc<ServiceDefinition>> {
        self.services.remove(name)
    }

    /// Cheap snapshot of all services, for iterating while mutating nodes.
    pub fn service_list(&self) -> Vec<Arc<ServiceDefinition>> {
        self.services.values().cloned().collect()
    }

    pub fn service_count(&self) -> usize {
        self.services.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(name: &str) -> Arc<ServiceDefinition> {
        Arc::new(ServiceDefinition {
            name: name.to_string(),
            ..Default::default()
        })
    }

    #[test]
    fn test_lookup_missing_is_none() {
        let store = StateStore::new();
        assert!(store.node("ghost").is_none());
        assert!(store.service("ghost").is_none());
        assert!(!store.contains_node("ghost"));
    }

    #[test]
    fn test_node_insert_remove() {
        let mut store = StateStore::new();
        assert!(store.insert_node(TrackedNode::new("n1", "10.0.0.1", true)).is_none());
        assert!(store.insert_node(TrackedNode::new("n2", "10.0.0.2", false)).is_none());
        assert_eq!(store.node_count(), 2);

        let mut names = store.node_names();
        names.sort();
        assert_eq!(names, vec!["n1", "n2"]);

        let removed = store.remove_node("n1").unwrap();
        assert_eq!(removed.address, "10.0.0.1");
        assert!(store.remove_node("n1").is_none());
        assert_eq!(store.node_count(), 1);
    }

    #[test]
    fn test_service_overwrite() {
        let mut store = StateStore::new();
        store.insert_service(service("web"));
        let mut updated = (*service("web")).clone();
        updated.namespace = "prod".to_string();
        let previous = store.insert_service(Arc::new(updated));

        assert!(previous.is_some());
        assert_eq!(store.service_count(), 1);
        assert_eq!(store.service("web").unwrap().namespace, "prod");
        assert_eq!(store.service_list().len(), 1);
    }

    #[test]
    fn test_registration_lookup() {
        let mut node = TrackedNode::new("n1", "10.0.0.1", true);
        assert!(!node.is_registered("web"));
        node.registrations
            .insert("web".to_string(), RegistrationId::build("n1", "web"));
        assert!(node.is_registered("web"));
    }
}
