//! Registry command consumer

use super::RegistryBackend;
use crate::observability::metrics;
use anyhow::Result;
use backoff::{backoff::Backoff, ExponentialBackoff};
use kubereg_core::{RegistryAction, RegistryCommand};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

/// How hard the writer tries before giving up on a command.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts per command, including the first
    pub max_attempts: u32,
    /// Delay before the first retry
    pub initial_interval: Duration,
    /// Upper bound on the delay between retries
    pub max_interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_interval: Duration::from_millis(200),
            max_interval: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            initial_interval: self.initial_interval,
            current_interval: self.initial_interval,
            max_interval: self.max_interval,
            max_elapsed_time: None,
            ..Default::default()
        }
    }
}

/// Apply commands from `command_rx` one at a time, in arrival order.
///
/// A failing command is retried in place, so later commands for the same
/// registration can never overtake it. After `max_attempts` it is dropped and
/// left for the next reconciliation to repair.
pub async fn run_registry_writer<B: RegistryBackend>(
    mut command_rx: mpsc::Receiver<RegistryCommand>,
    mut backend: B,
    policy: RetryPolicy,
) {
    info!("Starting registry writer");
    let mut backoff = policy.backoff();

    while let Some(command) = command_rx.recv().await {
        let action = command.action;
        backoff.reset();
        let mut attempt = 1;

        loop {
            match apply(&mut backend, &command).await {
                Ok(()) => {
                    metrics::record_command_applied(action);
                    break;
                }
                Err(e) if attempt < policy.max_attempts => {
                    let delay = backoff.next_backoff().unwrap_or(policy.max_interval);
                    warn!(
                        registration_id = %command.registration_id,
                        action = %action,
                        attempt = attempt,
                        retry_in_ms = delay.as_millis() as u64,
                        error = %format!("{e:#}"),
                        "Registry command failed, retrying"
                    );
                    metrics::record_command_retry(action);
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    error!(
                        registration_id = %command.registration_id,
                        action = %action,
                        attempts = attempt,
                        error = %format!("{e:#}"),
                        "Registry command failed, dropping"
                    );
                    metrics::record_command_failure(action);
                    break;
                }
            }
        }
    }

    info!("Registry command queue closed, writer stopping");
}

async fn apply<B: RegistryBackend>(backend: &mut B, command: &RegistryCommand) -> Result<()> {
    match command.action {
        RegistryAction::Add => {
            let (Some(address), Some(service)) = (&command.address, &command.service) else {
                anyhow::bail!(
                    "add command for {} carries no address or service",
                    command.registration_id
                );
            };
            backend
                .register(&command.registration_id, address, service)
                .await
        }
        RegistryAction::Remove => backend.deregister(&command.registration_id).await,
    }
}
