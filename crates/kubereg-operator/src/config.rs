//! Command line and environment configuration

use crate::registry::{keys, RetryPolicy};
use clap::{Args, Parser, Subcommand};
use std::net::SocketAddr;
use std::time::Duration;

#[derive(Debug, Parser)]
#[command(name = "kubereg-operator")]
#[command(about = "Registers every ready Kubernetes node for every NodePort service in etcd")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the operator
    Run(RunArgs),
    /// Print build information
    Version,
}

#[derive(Debug, Clone, Args)]
pub struct RunArgs {
    /// etcd endpoints (comma-separated)
    #[arg(long, env = "ETCD_ENDPOINTS", default_value = "http://127.0.0.1:2379")]
    pub etcd_endpoints: String,

    /// Key prefix under which registrations are stored
    #[arg(long, env = "REGISTRY_PREFIX", default_value = keys::DEFAULT_PREFIX)]
    pub registry_prefix: String,

    /// Seconds between membership syncs against the API server
    #[arg(
        long,
        env = "RESYNC_PERIOD_SECS",
        default_value_t = 30,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub resync_period_secs: u64,

    /// Registry commands buffered before the bookkeeper waits on the writer
    #[arg(long, env = "COMMAND_QUEUE_CAPACITY", default_value_t = 1024)]
    pub command_queue_capacity: usize,

    /// Attempts per registry command before it is dropped
    #[arg(
        long,
        env = "WRITER_MAX_ATTEMPTS",
        default_value_t = 5,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub writer_max_attempts: u32,

    /// Address for the health and metrics server
    #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0:8080")]
    pub bind_addr: SocketAddr,
}

impl RunArgs {
    pub fn etcd_endpoints(&self) -> Vec<String> {
        self.etcd_endpoints
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn resync_period(&self) -> Duration {
        Duration::from_secs(self.resync_period_secs)
    }

    /// Bounded channels need room for at least one command.
    pub fn command_queue_capacity(&self) -> usize {
        self.command_queue_capacity.max(1)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.writer_max_attempts,
            ..Default::default()
        }
    }
}
