// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use anyhow::Result;
use kube::Client;
use std::sync::Arc;
use tracing::{info, warn};

use host_secret_syncer::config::Config;
use host_secret_syncer::kubernetes::{create_virtual_client, KubeSecretStore};
use host_secret_syncer::reconcilers::SecretReconciler;
use host_secret_syncer::sync::{ReconcileDecider, Reconciler, Side, SyncManager};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    info!("Starting host secret syncer");

    // Load configuration
    let config = Config::from_env()?;
    info!(
        "Configuration loaded: mode={}, host_namespace={}, destination_namespace={}",
        config.mode, config.host_namespace, config.destination_namespace
    );

    // Host cluster client from the in-cluster or local configuration
    let host_client = Client::try_default().await?;
    info!("Connected to host cluster");

    let virtual_client = create_virtual_client(&host_client, &config).await?;
    info!("Connected to virtual cluster '{}'", config.vcluster_name);

    let physical_store = Arc::new(KubeSecretStore::new(host_client.clone(), Side::Physical));
    let virtual_store = Arc::new(
        KubeSecretStore::new(virtual_client.clone(), Side::Virtual).ensure_namespaces(true),
    );

    let decider = Arc::new(ReconcileDecider::new(&config));
    let reconciler = Reconciler::new(decider.clone(), physical_store, virtual_store);

    // Create the sync manager and get a handle for the watchers
    let (sync_manager, sync_handle) = SyncManager::new(reconciler);

    let physical_watcher = SecretReconciler::physical(
        host_client,
        &config.host_namespace,
        decider.clone(),
        sync_handle.clone(),
    );
    let virtual_watcher = SecretReconciler::virtual_side(
        virtual_client,
        config.watch_namespace.as_deref(),
        decider,
        sync_handle,
    );

    info!("Starting watchers...");

    tokio::try_join!(
        sync_manager.run(),
        physical_watcher.run(),
        virtual_watcher.run()
    )?;

    // This should never be reached as the watchers run forever
    warn!("All watchers stopped unexpectedly");
    Ok(())
}
