//! etcd registry backend
//!
//! One JSON record per service port, stored under
//! `{prefix}/{registration_id}/{port}`. A registration is removed by deleting
//! everything under `{prefix}/{registration_id}/`.

use super::RegistryBackend;
use anyhow::{anyhow, Context, Result};
use backoff::{future::retry, ExponentialBackoff};
use etcd_client::{Client, DeleteOptions};
use kubereg_core::{RegistrationId, ServiceDefinition, ServicePort};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, warn};

/// Keys used in etcd for kubereg resources.
pub mod keys {
    pub const DEFAULT_PREFIX: &str = "/kubereg/registrations";
}

/// Registry entry for one reachable (node, service port).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryRecord {
    pub service: String,
    pub namespace: String,
    pub host: String,
    pub port: u16,
    pub protocol: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
}

/// Key prefix holding every record of a registration.
pub fn registration_prefix(prefix: &str, registration_id: &RegistrationId) -> String {
    format!("{}/{}/", prefix.trim_end_matches('/'), registration_id)
}

fn port_key(port: &ServicePort, node_port: u16) -> String {
    if port.name.is_empty() {
        node_port.to_string()
    } else {
        port.name.clone()
    }
}

/// Records to write for a registration; ports without a node port are skipped.
pub fn registry_records(
    prefix: &str,
    registration_id: &RegistrationId,
    address: &str,
    service: &ServiceDefinition,
) -> Vec<(String, RegistryRecord)> {
    let base = registration_prefix(prefix, registration_id);
    service
        .ports
        .iter()
        .filter_map(|port| {
            let node_port = port.node_port?;
            let record = RegistryRecord {
                service: service.name.clone(),
                namespace: service.namespace.clone(),
                host: address.to_string(),
                port: node_port,
                protocol: port.protocol.clone(),
                labels: service.labels.clone(),
            };
            Some((format!("{base}{}", port_key(port, node_port)), record))
        })
        .collect()
}

/// etcd-backed service registry.
#[derive(Clone)]
pub struct EtcdRegistry {
    client: Client,
    prefix: String,
}

impl EtcdRegistry {
    pub fn new(client: Client, prefix: &str) -> Self {
        Self {
            client,
            prefix: prefix.trim_end_matches('/').to_string(),
        }
    }

    /// Connect to etcd with exponential backoff.
    pub async fn connect(endpoints: &[String], prefix: &str) -> Result<Self> {
        let backoff = ExponentialBackoff {
            initial_interval: Duration::from_millis(500),
            max_interval: Duration::from_secs(10),
            max_elapsed_time: Some(Duration::from_secs(120)),
            ..Default::default()
        };

        let client = retry(backoff, || async {
            match Client::connect(endpoints, None).await {
                Ok(client) => {
                    debug!("Connected to etcd");
                    Ok(client)
                }
                Err(e) => {
                    warn!(error = %e, "etcd connection failed, retrying");
                    Err(backoff::Error::transient(e))
                }
            }
        })
        .await
        .map_err(|e| anyhow!("Failed to connect to etcd after retries: {:?}", e))?;

        Ok(Self::new(client, prefix))
    }

    /// Handle for health checks.
    pub fn client(&self) -> Client {
        self.client.clone()
    }
}

impl RegistryBackend for EtcdRegistry {
    async fn register(
        &mut self,
        registration_id: &RegistrationId,
        address: &str,
        service: &ServiceDefinition,
    ) -> Result<()> {
        let records = registry_records(&self.prefix, registration_id, address, service);
        if records.is_empty() {
            warn!(
                registration_id = %registration_id,
                service = %service.name,
                "Service has no node ports, nothing to register"
            );
        }

        for (key, record) in records {
            let json = serde_json::to_vec(&record).context("Failed to serialize to JSON")?;
            self.client
                .put(key, json, None)
                .await
                .context("Failed to put to etcd")?;
        }
        Ok(())
    }

    async fn deregister(&mut self, registration_id: &RegistrationId) -> Result<()> {
        self.client
            .delete(
                registration_prefix(&self.prefix, registration_id),
                Some(DeleteOptions::new().with_prefix()),
            )
            .await
            .context("Failed to delete from etcd")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> ServiceDefinition {
        ServiceDefinition {
            name: "dns".to_string(),
            namespace: "kube-system".to_string(),
            ports: vec![
                ServicePort {
                    name: "udp".to_string(),
                    protocol: "UDP".to_string(),
                    port: 53,
                    node_port: Some(30053),
                },
                ServicePort {
                    name: "metrics".to_string(),
                    protocol: "TCP".to_string(),
                    port: 9153,
                    node_port: None,
                },
                ServicePort {
                    name: String::new(),
                    protocol: "TCP".to_string(),
                    port: 53,
                    node_port: Some(30054),
                },
            ],
            labels: BTreeMap::from([("k8s-app".to_string(), "kube-dns".to_string())]),
        }
    }

    #[test]
    fn test_registration_prefix_normalizes_trailing_slash() {
        let id = RegistrationId::build("n1", "dns");
        assert_eq!(registration_prefix("/reg/", &id), "/reg/n1-dns/");
        assert_eq!(registration_prefix("/reg", &id), "/reg/n1-dns/");
    }

    #[test]
    fn test_records_one_per_node_port() {
        let id = RegistrationId::build("n1", "dns");
        let records = registry_records(keys::DEFAULT_PREFIX, &id, "10.0.0.1", &service());

        let keys: Vec<&str> = records.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(
            keys,
            vec![
                "/kubereg/registrations/n1-dns/udp",
                "/kubereg/registrations/n1-dns/30054",
            ]
        );

        let (_, udp) = &records[0];
        assert_eq!(udp.host, "10.0.0.1");
        assert_eq!(udp.port, 30053);
        assert_eq!(udp.protocol, "UDP");
        assert_eq!(udp.namespace, "kube-system");
        assert_eq!(udp.labels.get("k8s-app").map(String::as_str), Some("kube-dns"));
    }

    #[test]
    fn test_records_share_registration_prefix() {
        let id = RegistrationId::build("n1", "dns");
        let prefix = registration_prefix(keys::DEFAULT_PREFIX, &id);
        for (key, _) in registry_records(keys::DEFAULT_PREFIX, &id, "10.0.0.1", &service()) {
            assert!(key.starts_with(&prefix));
        }
    }

    #[test]
    fn test_record_serialization() {
        let record = RegistryRecord {
            service: "web".to_string(),
            namespace: "default".to_string(),
            host: "10.0.0.1".to_string(),
            port: 30080,
            protocol: "TCP".to_string(),
            labels: BTreeMap::new(),
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "service": "web",
                "namespace": "default",
                "host": "10.0.0.1",
                "port": 30080,
                "protocol": "TCP"
            })
        );
    }
}
