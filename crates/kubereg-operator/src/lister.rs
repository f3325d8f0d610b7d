//! Authoritative node listing backed by the Kubernetes API

use anyhow::{Context, Result};
use k8s_openapi::api::core::v1::Node;
use kube::{api::ListParams, Api, Client, ResourceExt};
use kubereg_core::NodeLister;
use std::collections::BTreeSet;
use tracing::debug;

/// Lists node names straight from the API server (not from a watch cache).
#[derive(Clone)]
pub struct KubeNodeLister {
    api: Api<Node>,
}

impl KubeNodeLister {
    pub fn new(client: Client) -> Self {
        Self {
            api: Api::all(client),
        }
    }
}

impl NodeLister for KubeNodeLister {
    async fn list_node_names(&self) -> Result<BTreeSet<String>> {
        let nodes = self
            .api
            .list_metadata(&ListParams::default())
            .await
            .context("Failed to list nodes")?;
        let names: BTreeSet<String> = nodes.items.iter().map(|n| n.name_any()).collect();
        debug!(count = names.len(), "Listed nodes");
        Ok(names)
    }
}
