//! Node watch
//!
//! Turns the node watch stream into NodeAdd / NodeUpdate / NodeRemove work.

use super::convert::node_snapshot;
use anyhow::{Context, Result};
use futures::StreamExt;
use k8s_openapi::api::core::v1::Node;
use kube::{
    runtime::{watcher, WatchStreamExt},
    Api, ResourceExt,
};
use kubereg_core::{KubeWork, NodeSnapshot};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Remembers which nodes have been announced and how they last looked.
#[derive(Debug, Default)]
pub struct NodeTracker {
    known: HashMap<String, NodeSnapshot>,
    /// Names seen during an in-progress relist.
    relisted: Option<HashSet<String>>,
}

impl NodeTracker {
    /// Translate one watch event into work items.
    ///
    /// Re-delivered nodes whose snapshot did not change (heartbeats, label
    /// edits) produce nothing.
    pub fn on_event(&mut self, event: watcher::Event<Node>) -> Vec<KubeWork> {
        match event {
            watcher::Event::Init => {
                self.relisted = Some(HashSet::new());
                Vec::new()
            }
            watcher::Event::InitApply(node) => {
                if let Some(seen) = self.relisted.as_mut() {
                    seen.insert(node.name_any());
                }
                self.apply(&node).into_iter().collect()
            }
            watcher::Event::InitDone => self.finish_relist(),
            watcher::Event::Apply(node) => self.apply(&node).into_iter().collect(),
            watcher::Event::Delete(node) => {
                let name = node.name_any();
                self.known
                    .remove(&name)
                    .map(|_| KubeWork::NodeRemove(name))
                    .into_iter()
                    .collect()
            }
        }
    }

    fn apply(&mut self, node: &Node) -> Option<KubeWork> {
        let snapshot = node_snapshot(node);
        // Addresses may be filled in after registration (external cloud
        // providers); hold the node back until it has one.
        if snapshot.primary_address().is_none() && !self.known.contains_key(&snapshot.name) {
            debug!(node = %snapshot.name, "Node has no addresses yet, waiting");
            return None;
        }
        match self.known.insert(snapshot.name.clone(), snapshot.clone()) {
            None => Some(KubeWork::NodeAdd(snapshot)),
            Some(previous) if previous != snapshot => Some(KubeWork::NodeUpdate(snapshot)),
            Some(_) => None,
        }
    }

    // Forget nodes that disappeared while the watch was down so a returning
    // node is announced with NodeAdd again.
    fn finish_relist(&mut self) -> Vec<KubeWork> {
        let Some(seen) = self.relisted.take() else {
            return Vec::new();
        };
        let vanished: Vec<String> = self
            .known
            .keys()
            .filter(|name| !seen.contains(*name))
            .cloned()
            .collect();

        vanished
            .into_iter()
            .filter(|name| self.known.remove(name).is_some())
            .map(KubeWork::NodeRemove)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.known.len()
    }

    pub fn is_empty(&self) -> bool {
        self.known.is_empty()
    }
}

/// Watch all nodes and feed the bookkeeper until its queue closes.
///
/// `synced` flips to true once the first full listing has been delivered.
pub async fn watch_nodes(
    api: Api<Node>,
    work_tx: mpsc::UnboundedSender<KubeWork>,
    synced: Arc<AtomicBool>,
) -> Result<()> {
    info!("Starting node watch");
    let mut tracker = NodeTracker::default();
    let mut stream = watcher(api, watcher::Config::default())
        .default_backoff()
        .boxed();

    while let Some(event) = stream.next().await {
        match event {
            Ok(event) => {
                let listed = matches!(event, watcher::Event::InitDone);
                for work in tracker.on_event(event) {
                    work_tx
                        .send(work)
                        .context("Bookkeeper work queue closed")?;
                }
                if listed {
                    debug!(nodes = tracker.len(), "Node listing complete");
                    synced.store(true, Ordering::Release);
                }
            }
            Err(e) => warn!(error = %e, "Node watch error"),
        }
    }

    Ok(())
}
