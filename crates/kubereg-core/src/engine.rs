//! Attach/detach engine
//!
//! Turns "node N should (not) advertise service S" into registry commands and
//! keeps the node's registration set in step with what was emitted.

use crate::error::{BookkeeperError, Result};
use crate::events;
use crate::metrics;
use crate::model::{RegistrationId, RegistryCommand, ServiceDefinition};
use crate::store::TrackedNode;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Outbound side of the bookkeeper.
///
/// Sending waits when the bounded command queue is full, which throttles
/// event processing to the pace of the registry writer.
#[derive(Debug, Clone)]
pub struct CommandSink {
    tx: mpsc::Sender<RegistryCommand>,
}

impl CommandSink {
    pub fn new(tx: mpsc::Sender<RegistryCommand>) -> Self {
        Self { tx }
    }

    async fn emit(&self, command: RegistryCommand) -> Result<()> {
        let action = command.action;
        self.tx
            .send(command)
            .await
            .map_err(|_| BookkeeperError::CommandQueueClosed)?;
        metrics::record_command(action);
        Ok(())
    }

    /// Record `service` on `node` and request its registration.
    ///
    /// Always emits, even if the pair is already registered; the registry
    /// treats a repeated add as an overwrite.
    pub async fn attach(&self, node: &mut TrackedNode, service: &Arc<ServiceDefinition>) -> Result<()> {
        let registration_id = RegistrationId::build(&node.name, &service.name);
        events::registration_requested(registration_id.as_str(), &node.address);
        self.emit(RegistryCommand::add(
            registration_id.clone(),
            node.address.clone(),
            Arc::clone(service),
        ))
        .await?;
        node.registrations
            .insert(service.name.clone(), registration_id);
        Ok(())
    }

    /// Request removal of `service` from `node` if it is registered.
    ///
    /// Detaching a pair that was never attached emits nothing.
    pub async fn detach(&self, node: &mut TrackedNode, service_name: &str) -> Result<()> {
        let Some(registration_id) = node.registrations.get(service_name).cloned() else {
            return Ok(());
        };
        events::deregistration_requested(registration_id.as_str());
        self.emit(RegistryCommand::remove(registration_id)).await?;
        node.registrations.remove(service_name);
        Ok(())
    }

    /// Attach every given service to `node`.
    pub async fn attach_all(
        &self,
        node: &mut TrackedNode,
        services: &[Arc<ServiceDefinition>],
    ) -> Result<()> {
        for service in services {
            self.attach(node, service).await?;
        }
        Ok(())
    }

    /// Detach every given service from `node`.
    pub async fn detach_all(
        &self,
        node: &mut TrackedNode,
        services: &[Arc<ServiceDefinition>],
    ) -> Result<()> {
        for service in services {
            self.detach(node, &service.name).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RegistryAction;

    fn service(name: &str) -> Arc<ServiceDefinition> {
        Arc::new(ServiceDefinition {
            name: name.to_string(),
            ..Default::default()
        })
    }

    fn drain(rx: &mut mpsc::Receiver<RegistryCommand>) -> Vec<RegistryCommand> {
        let mut out = Vec::new();
        while let Ok(cmd) = rx.try_recv() {
            out.push(cmd);
        }
        out
    }

    #[tokio::test]
    async fn test_attach_records_and_emits() {
        let (tx, mut rx) = mpsc::channel(16);
        let sink = CommandSink::new(tx);
        let mut node = TrackedNode::new("n1", "10.0.0.1", true);

        sink.attach(&mut node, &service("web")).await.unwrap();

        let cmds = drain(&mut rx);
        assert_eq!(cmds.len(), 1);
        assert_eq!(cmds[0].action, RegistryAction::Add);
        assert_eq!(cmds[0].registration_id.as_str(), "n1-web");
        assert_eq!(cmds[0].address.as_deref(), Some("10.0.0.1"));
        assert_eq!(cmds[0].service.as_ref().unwrap().name, "web");
        assert_eq!(
            node.registrations.get("web"),
            Some(&RegistrationId::build("n1", "web"))
        );
    }

    #[tokio::test]
    async fn test_reattach_emits_again() {
        let (tx, mut rx) = mpsc::channel(16);
        let sink = CommandSink::new(tx);
        let mut node = TrackedNode::new("n1", "10.0.0.1", true);
        let web = service("web");

        sink.attach(&mut node, &web).await.unwrap();
        sink.attach(&mut node, &web).await.unwrap();

        assert_eq!(drain(&mut rx).len(), 2);
        assert_eq!(node.registrations.len(), 1);
    }

    #[tokio::test]
    async fn test_detach_unattached_is_noop() {
        let (tx, mut rx) = mpsc::channel(16);
        let sink = CommandSink::new(tx);
        let mut node = TrackedNode::new("n1", "10.0.0.1", true);
        let before = node.clone();

        sink.detach(&mut node, "web").await.unwrap();

        assert!(drain(&mut rx).is_empty());
        assert_eq!(node, before);
    }

    #[tokio::test]
    async fn test_detach_emits_remove_and_forgets() {
        let (tx, mut rx) = mpsc::channel(16);
        let sink = CommandSink::new(tx);
        let mut node = TrackedNode::new("n1", "10.0.0.1", true);
        sink.attach(&mut node, &service("web")).await.unwrap();
        drain(&mut rx);

        sink.detach(&mut node, "web").await.unwrap();

        let cmds = drain(&mut rx);
        assert_eq!(cmds, vec![RegistryCommand::remove(RegistrationId::build("n1", "web"))]);
        assert!(node.registrations.is_empty());
    }

    #[tokio::test]
    async fn test_all_variants_cover_every_service() {
        let (tx, mut rx) = mpsc::channel(16);
        let sink = CommandSink::new(tx);
        let mut node = TrackedNode::new("n1", "10.0.0.1", true);
        let services = vec![service("a"), service("b"), service("c")];

        sink.attach_all(&mut node, &services).await.unwrap();
        assert_eq!(drain(&mut rx).len(), 3);
        assert_eq!(node.registrations.len(), 3);

        sink.detach_all(&mut node, &services).await.unwrap();
        let cmds = drain(&mut rx);
        assert_eq!(cmds.len(), 3);
        assert!(cmds.iter().all(|c| c.action == RegistryAction::Remove));
        assert!(node.registrations.is_empty());
    }

    #[tokio::test]
    async fn test_closed_queue_is_reported() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let sink = CommandSink::new(tx);
        let mut node = TrackedNode::new("n1", "10.0.0.1", true);

        let err = sink.attach(&mut node, &service("web")).await.unwrap_err();
        assert!(matches!(err, BookkeeperError::CommandQueueClosed));
        assert!(node.registrations.is_empty());
    }
}
