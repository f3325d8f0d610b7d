//! Event reconciler and drift corrector
//!
//! The [`Bookkeeper`] owns all reconciliation state and reacts to one
//! [`KubeWork`] item at a time. After every item has been fully handled, each
//! ready node is registered for every known service and nothing else.

use crate::engine::CommandSink;
use crate::error::{BookkeeperError, Result};
use crate::events;
use crate::lister::NodeLister;
use crate::metrics;
use crate::model::{KubeWork, NodeSnapshot, RegistryCommand, ServiceDefinition};
use crate::readiness::{ReadinessCheck, ReadyCondition};
use crate::store::{StateStore, TrackedNode};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, instrument};

/// Reconciliation bookkeeper for one registry.
pub struct Bookkeeper<L, R = ReadyCondition> {
    store: StateStore,
    sink: CommandSink,
    lister: L,
    readiness: R,
}

impl<L: NodeLister> Bookkeeper<L, ReadyCondition> {
    /// Create a bookkeeper that emits onto `commands` and syncs against `lister`.
    pub fn new(commands: mpsc::Sender<RegistryCommand>, lister: L) -> Self {
        Self {
            store: StateStore::new(),
            sink: CommandSink::new(commands),
            lister,
            readiness: ReadyCondition,
        }
    }
}

impl<L: NodeLister, R: ReadinessCheck> Bookkeeper<L, R> {
    /// Replace the readiness predicate.
    pub fn with_readiness<R2: ReadinessCheck>(self, readiness: R2) -> Bookkeeper<L, R2> {
        Bookkeeper {
            store: self.store,
            sink: self.sink,
            lister: self.lister,
            readiness,
        }
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    /// Apply one work item.
    ///
    /// An error abandons this item only; state is left as it was before the
    /// failing step.
    pub async fn handle(&mut self, work: KubeWork) -> Result<()> {
        let result = match work {
            KubeWork::NodeAdd(node) => self.add_node(&node).await,
            KubeWork::NodeRemove(name) => self.remove_node(&name).await,
            KubeWork::NodeUpdate(node) => self.update_node(&node).await,
            KubeWork::ServiceAdd(service) => self.add_service(service).await,
            KubeWork::ServiceRemove(service) => self.remove_service(&service).await,
            KubeWork::ServiceUpdate(service) => self.update_service(service).await,
            KubeWork::Sync => self.sync().await,
        };
        metrics::set_tracked(self.store.node_count(), self.store.service_count());
        result
    }

    /// Start tracking a node, registering it everywhere if it is ready.
    #[instrument(skip_all, fields(node = %snapshot.name))]
    pub async fn add_node(&mut self, snapshot: &NodeSnapshot) -> Result<()> {
        if self.store.contains_node(&snapshot.name) {
            return Err(BookkeeperError::DuplicateNode(snapshot.name.clone()));
        }
        let address = snapshot
            .primary_address()
            .ok_or_else(|| BookkeeperError::NoAddress(snapshot.name.clone()))?;

        let ready = self.readiness.is_ready(snapshot);
        let mut node = TrackedNode::new(&snapshot.name, address, ready);
        if ready {
            let services = self.store.service_list();
            self.sink.attach_all(&mut node, &services).await?;
        }

        events::node_added(&node.name, &node.address, ready);
        self.store.insert_node(node);
        Ok(())
    }

    /// Stop tracking a node and drop all of its registrations.
    #[instrument(skip(self))]
    pub async fn remove_node(&mut self, name: &str) -> Result<()> {
        let services = self.store.service_list();
        let node = self
            .store
            .node_mut(name)
            .ok_or_else(|| BookkeeperError::UnknownNode(name.to_string()))?;
        let registrations = node.registrations.len();

        self.sink.detach_all(node, &services).await?;

        self.store.remove_node(name);
        events::node_removed(name, registrations);
        Ok(())
    }

    /// Re-evaluate readiness and attach or detach everything accordingly.
    #[instrument(skip_all, fields(node = %snapshot.name))]
    pub async fn update_node(&mut self, snapshot: &NodeSnapshot) -> Result<()> {
        let ready = self.readiness.is_ready(snapshot);
        let services = self.store.service_list();
        let node = self
            .store
            .node_mut(&snapshot.name)
            .ok_or_else(|| BookkeeperError::UnknownNode(snapshot.name.clone()))?;

        if node.ready != ready {
            events::node_readiness_changed(&node.name, node.ready, ready);
            node.ready = ready;
        }
        // A snapshot without addresses keeps the last known one.
        if let Some(address) = snapshot.primary_address() {
            if node.address != address {
                events::node_address_changed(&node.name, &node.address, address);
                node.address = address.to_string();
            }
        }

        if ready {
            self.sink.attach_all(node, &services).await
        } else {
            self.sink.detach_all(node, &services).await
        }
    }

    /// Track a service (overwriting any previous definition) and register it
    /// on every ready node.
    #[instrument(skip_all, fields(service = %service.name))]
    pub async fn add_service(&mut self, service: ServiceDefinition) -> Result<()> {
        let service = Arc::new(service);
        self.store.insert_service(Arc::clone(&service));

        let mut attached = 0;
        for node in self.store.nodes_mut().filter(|n| n.ready) {
            self.sink.attach(node, &service).await?;
            attached += 1;
        }

        events::service_added(&service.name, &service.namespace, attached);
        Ok(())
    }

    /// Deregister a service from every node and forget it.
    #[instrument(skip_all, fields(service = %service.name))]
    pub async fn remove_service(&mut self, service: &ServiceDefinition) -> Result<()> {
        for node in self.store.nodes_mut() {
            self.sink.detach(node, &service.name).await?;
        }

        if self.store.remove_service(&service.name).is_some() {
            events::service_removed(&service.name, &service.namespace);
        } else {
            info!(service = %service.name, "Removed service that was not tracked");
        }
        Ok(())
    }

    /// Replace a service definition: remove everywhere, then add again.
    pub async fn update_service(&mut self, service: ServiceDefinition) -> Result<()> {
        self.remove_service(&service).await?;
        self.add_service(service).await
    }

    /// Drop tracked nodes that no longer exist upstream.
    ///
    /// Only removes; nodes present upstream but unknown locally are left to
    /// the node watcher. If the listing fails the whole pass is skipped.
    #[instrument(skip(self))]
    pub async fn sync(&mut self) -> Result<()> {
        let upstream = match self.lister.list_node_names().await {
            Ok(names) => names,
            Err(e) => {
                metrics::record_sync_skipped();
                return Err(BookkeeperError::Listing(e));
            }
        };

        let drifted: Vec<String> = self
            .store
            .node_names()
            .into_iter()
            .filter(|name| !upstream.contains(name))
            .collect();

        for name in &drifted {
            events::drift_detected(name);
            self.remove_node(name).await?;
            metrics::record_drift_removal();
        }

        debug!(
            upstream = upstream.len(),
            tracked = self.store.node_count(),
            removed = drifted.len(),
            "Sync complete"
        );
        Ok(())
    }
}
