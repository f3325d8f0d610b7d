//! Service watch
//!
//! Only services exposing a node port are registrable: the registry
//! advertises node addresses, so nothing else is reachable through it.

use super::convert::service_definition;
use anyhow::{Context, Result};
use futures::StreamExt;
use k8s_openapi::api::core::v1::Service;
use kube::{
    runtime::{watcher, WatchStreamExt},
    Api, ResourceExt,
};
use kubereg_core::{KubeWork, ServiceDefinition};
use std::collections::{HashMap, HashSet};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Remembers which registrable services have been announced.
#[derive(Debug, Default)]
pub struct ServiceTracker {
    known: HashMap<String, ServiceDefinition>,
    /// Names seen during an in-progress relist.
    relisted: Option<HashSet<String>>,
}

impl ServiceTracker {
    /// Translate one watch event into work items.
    pub fn on_event(&mut self, event: watcher::Event<Service>) -> Vec<KubeWork> {
        match event {
            watcher::Event::Init => {
                self.relisted = Some(HashSet::new());
                Vec::new()
            }
            watcher::Event::InitApply(service) => {
                if let Some(seen) = self.relisted.as_mut() {
                    seen.insert(service.name_any());
                }
                self.apply(&service).into_iter().collect()
            }
            watcher::Event::InitDone => self.finish_relist(),
            watcher::Event::Apply(service) => self.apply(&service).into_iter().collect(),
            watcher::Event::Delete(service) => self
                .known
                .remove(&service.name_any())
                .map(KubeWork::ServiceRemove)
                .into_iter()
                .collect(),
        }
    }

    fn apply(&mut self, service: &Service) -> Option<KubeWork> {
        let definition = service_definition(service);

        if !definition.is_registrable() {
            return match self.known.remove(&definition.name) {
                Some(previous) => {
                    debug!(service = %definition.name, "Service no longer exposes node ports");
                    Some(KubeWork::ServiceRemove(previous))
                }
                None => {
                    debug!(service = %definition.name, "Skipping service without node ports");
                    None
                }
            };
        }

        match self.known.insert(definition.name.clone(), definition.clone()) {
            None => Some(KubeWork::ServiceAdd(definition)),
            Some(previous) if previous.namespace != definition.namespace => {
                debug!(
                    service = %definition.name,
                    previous_namespace = %previous.namespace,
                    namespace = %definition.namespace,
                    "Service name reused across namespaces, replacing definition"
                );
                Some(KubeWork::ServiceUpdate(definition))
            }
            Some(previous) if previous != definition => Some(KubeWork::ServiceUpdate(definition)),
            Some(_) => None,
        }
    }

    // Services deleted while the watch was disconnected never get a Delete
    // event; anything known but absent from the relist is gone.
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
            .filter_map(|name| self.known.remove(&name))
            .map(KubeWork::ServiceRemove)
            .collect()
    }
}

/// Watch services in all namespaces and feed the bookkeeper until its queue
/// closes.
pub async fn watch_services(
    api: Api<Service>,
    work_tx: mpsc::UnboundedSender<KubeWork>,
) -> Result<()> {
    info!("Starting service watch");
    let mut tracker = ServiceTracker::default();
    let mut stream = watcher(api, watcher::Config::default())
        .default_backoff()
        .boxed();

    while let Some(event) = stream.next().await {
        match event {
            Ok(event) => {
                for work in tracker.on_event(event) {
                    work_tx
                        .send(work)
                        .context("Bookkeeper work queue closed")?;
                }
            }
            Err(e) => warn!(error = %e, "Service watch error"),
        }
    }

    Ok(())
}
