//! Registry writer
//!
//! Applies the bookkeeper's commands to the registry backend in the order
//! they were emitted.

mod etcd;
mod writer;

pub use etcd::{keys, registration_prefix, registry_records, EtcdRegistry, RegistryRecord};
pub use writer::{run_registry_writer, RetryPolicy};

use anyhow::Result;
use kubereg_core::{RegistrationId, ServiceDefinition};
use std::future::Future;

/// Storage the registry writer applies commands to.
///
/// `register` must be idempotent: registering the same id twice leaves a
/// single registration behind.
pub trait RegistryBackend: Send {
    fn register(
        &mut self,
        registration_id: &RegistrationId,
        address: &str,
        service: &ServiceDefinition,
    ) -> impl Future<Output = Result<()>> + Send;

    fn deregister(
        &mut self,
        registration_id: &RegistrationId,
    ) -> impl Future<Output = Result<()>> + Send;
}
