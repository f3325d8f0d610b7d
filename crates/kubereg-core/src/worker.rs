//! Bookkeeper work loop

use crate::bookkeeper::Bookkeeper;
use crate::error::{BookkeeperError, Result};
use crate::events;
use crate::lister::NodeLister;
use crate::metrics;
use crate::model::KubeWork;
use crate::readiness::ReadinessCheck;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

/// Drain `work_rx` through the bookkeeper, one item at a time.
///
/// Per-item failures are logged and the loop moves on. Returns once every
/// producer has dropped its sender, or with
/// [`BookkeeperError::CommandQueueClosed`] if the registry writer went away.
pub async fn run_bookkeeper<L, R>(
    mut work_rx: mpsc::UnboundedReceiver<KubeWork>,
    mut bookkeeper: Bookkeeper<L, R>,
) -> Result<()>
where
    L: NodeLister,
    R: ReadinessCheck,
{
    info!("Starting bookkeeper");

    while let Some(work) = work_rx.recv().await {
        let kind = work.kind();
        debug!(kind = %kind, "Processing work");
        metrics::record_event(kind);

        match bookkeeper.handle(work).await {
            Ok(()) => {}
            Err(e) if e.is_fatal() => {
                error!(kind = %kind, error = %e, "Bookkeeper cannot continue");
                return Err(e);
            }
            Err(BookkeeperError::Listing(e)) => {
                metrics::record_event_error(kind);
                events::sync_skipped(&format!("{e:#}"));
            }
            Err(e) => {
                metrics::record_event_error(kind);
                error!(kind = %kind, error = %e, "Work item failed");
            }
        }
    }

    info!(
        nodes = bookkeeper.store().node_count(),
        services = bookkeeper.store().service_count(),
        "Completed all work"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        NodeAddress, NodeCondition, NodeSnapshot, RegistryAction, RegistryCommand,
        ServiceDefinition,
    };
    use std::collections::BTreeSet;

    struct NoNodes;

    impl NodeLister for NoNodes {
        async fn list_node_names(&self) -> anyhow::Result<BTreeSet<String>> {
            Ok(BTreeSet::new())
        }
    }

    fn ready_node(name: &str) -> NodeSnapshot {
        NodeSnapshot {
            name: name.to_string(),
            conditions: vec![NodeCondition {
                kind: "Ready".to_string(),
                status: "True".to_string(),
            }],
            addresses: vec![NodeAddress {
                kind: "InternalIP".to_string(),
                address: "10.0.0.1".to_string(),
            }],
        }
    }

    fn service(name: &str) -> ServiceDefinition {
        ServiceDefinition {
            name: name.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_loop_survives_failed_items_and_drains() {
        let (work_tx, work_rx) = mpsc::unbounded_channel();
        let (cmd_tx, mut cmd_rx) = mpsc::channel(16);
        let bookkeeper = Bookkeeper::new(cmd_tx, NoNodes);

        work_tx.send(KubeWork::NodeRemove("ghost".to_string())).unwrap();
        work_tx.send(KubeWork::NodeAdd(ready_node("n1"))).unwrap();
        work_tx.send(KubeWork::NodeAdd(ready_node("n1"))).unwrap();
        work_tx.send(KubeWork::ServiceAdd(service("web"))).unwrap();
        work_tx.send(KubeWork::Sync).unwrap();
        drop(work_tx);

        run_bookkeeper(work_rx, bookkeeper).await.unwrap();

        let mut cmds: Vec<RegistryCommand> = Vec::new();
        while let Some(cmd) = cmd_rx.recv().await {
            cmds.push(cmd);
        }
        let actions: Vec<(RegistryAction, String)> = cmds
            .into_iter()
            .map(|c| (c.action, c.registration_id.to_string()))
            .collect();
        assert_eq!(
            actions,
            vec![
                (RegistryAction::Add, "n1-web".to_string()),
                (RegistryAction::Remove, "n1-web".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_loop_stops_when_registry_writer_is_gone() {
        let (work_tx, work_rx) = mpsc::unbounded_channel();
        let (cmd_tx, cmd_rx) = mpsc::channel(1);
        drop(cmd_rx);
        let bookkeeper = Bookkeeper::new(cmd_tx, NoNodes);

        work_tx.send(KubeWork::ServiceAdd(service("web"))).unwrap();
        work_tx.send(KubeWork::NodeAdd(ready_node("n1"))).unwrap();

        let err = run_bookkeeper(work_rx, bookkeeper).await.unwrap_err();
        assert!(matches!(err, BookkeeperError::CommandQueueClosed));
    }
}
