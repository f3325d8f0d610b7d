//! Kubereg Operator
//!
//! Keeps an etcd service registry in step with Kubernetes nodes and NodePort
//! services.

use anyhow::{anyhow, Context};
use clap::Parser;
use k8s_openapi::api::core::v1::{Node, Service};
use kube::Api;
use kubereg_core::{run_bookkeeper, Bookkeeper};
use kubereg_operator::{
    api::{self, AppState},
    config::{Cli, Commands, RunArgs},
    lister::KubeNodeLister,
    observability::{init_metrics, init_tracing, TracingConfig},
    registry::{run_registry_writer, EtcdRegistry},
    ticker::spawn_sync_ticker,
    version,
    watch::{watch_nodes, watch_services},
};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Install rustls crypto provider
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow!("Failed to install rustls crypto provider"))?;

    let cli = Cli::parse();

    match cli.command {
        Commands::Version => {
            println!("{}", version::build_info());
            Ok(())
        }
        Commands::Run(args) => run(args).await,
    }
}

async fn run(args: RunArgs) -> anyhow::Result<()> {
    init_tracing(&TracingConfig::from_env()).map_err(|e| anyhow!(e))?;

    info!(version = %version::full_version(), "Starting kubereg-operator");

    let metrics_state = match init_metrics() {
        Ok(state) => Some(state),
        Err(e) => {
            warn!(error = %e, "Failed to initialize metrics, continuing without");
            None
        }
    };

    let endpoints = args.etcd_endpoints();
    info!(endpoints = ?endpoints, prefix = %args.registry_prefix, "Connecting to etcd");
    let registry = EtcdRegistry::connect(&endpoints, &args.registry_prefix).await?;
    let etcd_client = registry.client();
    info!("Connected to etcd");

    let client = kube::Client::try_default()
        .await
        .context("Failed to create Kubernetes client")?;
    info!("Connected to Kubernetes");

    let (work_tx, work_rx) = mpsc::unbounded_channel();
    let (command_tx, command_rx) = mpsc::channel(args.command_queue_capacity());

    let writer_task = tokio::spawn(run_registry_writer(
        command_rx,
        registry,
        args.retry_policy(),
    ));

    let bookkeeper = Bookkeeper::new(command_tx, KubeNodeLister::new(client.clone()));
    let mut bookkeeper_task = tokio::spawn(run_bookkeeper(work_rx, bookkeeper));

    let ticker = spawn_sync_ticker(args.resync_period(), work_tx.clone());

    let synced = Arc::new(AtomicBool::new(false));
    let state = AppState {
        etcd_client,
        synced: synced.clone(),
        metrics_state,
    };
    let app = api::create_router(state);
    let listener = tokio::net::TcpListener::bind(args.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", args.bind_addr))?;
    info!(addr = %args.bind_addr, "Serving health and metrics");
    let server = async move { axum::serve(listener, app).await };

    let nodes = watch_nodes(Api::<Node>::all(client.clone()), work_tx.clone(), synced);
    let services = watch_services(Api::<Service>::all(client), work_tx.clone());

    let mut bookkeeper_done = false;
    let outcome: anyhow::Result<()> = tokio::select! {
        res = nodes => res.context("Node watch stopped"),
        res = services => res.context("Service watch stopped"),
        res = server => res.context("HTTP server stopped"),
        res = &mut bookkeeper_task => {
            bookkeeper_done = true;
            match res {
                Ok(Ok(())) => Err(anyhow!("Bookkeeper stopped unexpectedly")),
                Ok(Err(e)) => Err(anyhow!(e).context("Bookkeeper failed")),
                Err(e) => Err(anyhow!(e).context("Bookkeeper task panicked")),
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
            Ok(())
        }
    };

    if let Err(e) = &outcome {
        error!(error = %format!("{e:#}"), "Shutting down");
    }

    // Closing the work queue lets the bookkeeper drain and drop the command
    // sender, which in turn stops the writer.
    ticker.abort();
    drop(work_tx);
    if !bookkeeper_done {
        match bookkeeper_task.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(error = %e, "Bookkeeper exited with error"),
            Err(e) => warn!(error = %e, "Bookkeeper task failed"),
        }
    }
    if let Err(e) = writer_task.await {
        warn!(error = %e, "Registry writer task failed");
    }

    info!("kubereg-operator stopped");
    outcome
}
